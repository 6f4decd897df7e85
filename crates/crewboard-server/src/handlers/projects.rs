//! `/projects` routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use crewboard_core::{ProjectCreateParams, ProjectId, ProjectUpdateParams, TeamId};
use serde::Deserialize;

use super::{ApiJson, non_empty};
use crate::errors::{ApiError, ApiResult};
use crate::server::AppState;
use crate::views::{ProjectDeletionDto, ProjectDto, ProjectMutationDto};

/// Project create/update body. `team` is the owning team's id.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectBody {
    name: Option<String>,
    description: Option<String>,
    team: Option<String>,
}

/// GET /projects
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectDto>>> {
    let projects = state.run(|engine| engine.list_projects()).await?;
    Ok(Json(projects.iter().map(ProjectDto::from).collect()))
}

/// GET /projects/{id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProjectDto>> {
    let id = ProjectId::from(id);
    let detail = state.run(move |engine| engine.get_project(&id)).await?;
    Ok(Json(ProjectDto::from(&detail)))
}

/// POST /projects/createProject
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProjectBody>,
) -> ApiResult<(StatusCode, Json<ProjectDto>)> {
    let team_id = non_empty(body.team).ok_or_else(|| ApiError::Validation("team is required".into()))?;
    let params = ProjectCreateParams {
        name: body.name.unwrap_or_default(),
        description: body.description,
        team_id: TeamId::from(team_id),
    };
    let detail = state.run(move |engine| engine.create_project(&params)).await?;
    Ok((StatusCode::CREATED, Json(ProjectDto::from(&detail))))
}

/// PUT /projects/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProjectBody>,
) -> ApiResult<Json<ProjectMutationDto>> {
    let id = ProjectId::from(id);
    let updates = ProjectUpdateParams {
        name: body.name,
        description: body.description,
        team_id: non_empty(body.team).map(TeamId::from),
    };
    let mutation = state.run(move |engine| engine.update_project(&id, &updates)).await?;
    Ok(Json(ProjectMutationDto::from(mutation)))
}

/// DELETE /projects/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProjectDeletionDto>> {
    let id = ProjectId::from(id);
    let deletion = state.run(move |engine| engine.delete_project(&id)).await?;
    Ok(Json(ProjectDeletionDto::from(deletion)))
}
