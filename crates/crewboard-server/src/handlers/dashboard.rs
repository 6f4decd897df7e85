//! `/dashboard` routes.

use axum::Json;
use axum::extract::State;

use crate::errors::ApiResult;
use crate::server::AppState;
use crate::views::{LogDto, RebalanceDto, StatsDto};

/// GET /dashboard/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StatsDto>> {
    let stats = state.run(|engine| engine.get_stats()).await?;
    Ok(Json(StatsDto::from(stats)))
}

/// POST /dashboard/reassign-tasks
pub async fn reassign_tasks(State(state): State<AppState>) -> ApiResult<Json<RebalanceDto>> {
    let report = state.run(|engine| engine.reassign_tasks()).await?;
    Ok(Json(RebalanceDto::from(report)))
}

/// GET /dashboard/activity-logs
pub async fn activity_logs(State(state): State<AppState>) -> ApiResult<Json<Vec<LogDto>>> {
    let logs = state.run(|engine| engine.activity_logs()).await?;
    Ok(Json(logs.into_iter().map(LogDto::from).collect()))
}
