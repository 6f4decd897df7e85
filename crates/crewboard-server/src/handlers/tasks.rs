//! `/tasks` routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use crewboard_core::{
    MemberId, ProjectId, TaskCreateParams, TaskFilter, TaskId, TaskPriority, TaskStatus,
    TaskUpdateParams,
};
use serde::Deserialize;

use super::{ApiJson, non_empty};
use crate::errors::{ApiError, ApiResult};
use crate::server::AppState;
use crate::views::{AutoAssignDto, TaskDto, TaskMutationDto};

/// Assignee as sent by the client. An empty or null `memberId` means
/// unassigned; `name` is display-only and ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedMemberBody {
    member_id: Option<String>,
}

impl AssignedMemberBody {
    fn into_member(self) -> Option<MemberId> {
        non_empty(self.member_id).map(MemberId::from)
    }
}

/// Task create/update body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    title: Option<String>,
    description: Option<String>,
    project: Option<String>,
    assigned_member: Option<AssignedMemberBody>,
    priority: Option<TaskPriority>,
    status: Option<TaskStatus>,
    #[serde(default)]
    override_capacity: bool,
}

/// `GET /tasks` query. Empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    project: Option<String>,
    member: Option<String>,
    status: Option<String>,
    priority: Option<String>,
}

impl TaskQuery {
    fn into_filter(self) -> ApiResult<TaskFilter> {
        Ok(TaskFilter {
            project_id: non_empty(self.project).map(ProjectId::from),
            member_id: non_empty(self.member).map(MemberId::from),
            status: non_empty(self.status)
                .map(|s| s.parse::<TaskStatus>())
                .transpose()
                .map_err(ApiError::Validation)?,
            priority: non_empty(self.priority)
                .map(|p| p.parse::<TaskPriority>())
                .transpose()
                .map_err(ApiError::Validation)?,
        })
    }
}

/// GET /tasks
pub async fn list(State(state): State<AppState>, Query(query): Query<TaskQuery>) -> ApiResult<Json<Vec<TaskDto>>> {
    let filter = query.into_filter()?;
    let tasks = state.run(move |engine| engine.list_tasks(&filter)).await?;
    Ok(Json(tasks.into_iter().map(TaskDto::from).collect()))
}

/// GET /tasks/{id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TaskDto>> {
    let id = TaskId::from(id);
    let view = state.run(move |engine| engine.get_task(&id)).await?;
    Ok(Json(TaskDto::from(view)))
}

/// POST /tasks/createTask
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TaskBody>,
) -> ApiResult<(StatusCode, Json<TaskMutationDto>)> {
    let project_id = non_empty(body.project).ok_or_else(|| ApiError::Validation("project is required".into()))?;
    let params = TaskCreateParams {
        title: body.title.unwrap_or_default(),
        description: body.description,
        project_id: ProjectId::from(project_id),
        assigned_member_id: body.assigned_member.and_then(AssignedMemberBody::into_member),
        priority: body.priority,
        status: body.status,
        override_capacity: body.override_capacity,
    };
    let mutation = state.run(move |engine| engine.create_task(&params)).await?;
    Ok((StatusCode::CREATED, Json(TaskMutationDto::changed(mutation))))
}

/// PUT /tasks/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TaskBody>,
) -> ApiResult<Json<TaskMutationDto>> {
    let id = TaskId::from(id);
    let updates = TaskUpdateParams {
        title: body.title,
        description: body.description,
        project_id: non_empty(body.project).map(ProjectId::from),
        assignment: body.assigned_member.map(AssignedMemberBody::into_member),
        priority: body.priority,
        status: body.status,
        override_capacity: body.override_capacity,
    };
    let mutation = state.run(move |engine| engine.update_task(&id, &updates)).await?;
    Ok(Json(TaskMutationDto::changed(mutation)))
}

/// DELETE /tasks/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TaskMutationDto>> {
    let id = TaskId::from(id);
    let mutation = state.run(move |engine| engine.delete_task(&id)).await?;
    Ok(Json(TaskMutationDto::deleted(mutation)))
}

/// POST /tasks/auto-assign/{id}
pub async fn auto_assign(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<AutoAssignDto>> {
    let id = TaskId::from(id);
    let outcome = state.run(move |engine| engine.auto_assign(&id)).await?;
    Ok(Json(AutoAssignDto::from(outcome)))
}
