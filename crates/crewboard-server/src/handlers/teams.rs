//! `/teams` routes: teams and their members.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use crewboard_core::{
    MemberCreateParams, MemberId, MemberUpdateParams, TeamCreateParams, TeamId, TeamUpdateParams,
};
use crewboard_engine::{MemberRemoval, TeamDeletion};
use serde::Deserialize;

use super::{ApiJson, non_empty};
use crate::errors::ApiResult;
use crate::server::AppState;
use crate::views::{Deleted, MemberDto, TeamDto};

/// Team create/update body.
#[derive(Debug, Default, Deserialize)]
pub struct TeamBody {
    name: Option<String>,
    description: Option<String>,
}

/// Member create/update body.
#[derive(Debug, Default, Deserialize)]
pub struct MemberBody {
    name: Option<String>,
    role: Option<String>,
    capacity: Option<i64>,
}

/// GET /teams
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<TeamDto>>> {
    let teams = state.run(|engine| engine.list_teams()).await?;
    Ok(Json(teams.iter().map(TeamDto::from).collect()))
}

/// GET /teams/singleTeam/{team_id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TeamDto>> {
    let id = TeamId::from(id);
    let team = state.run(move |engine| engine.get_team(&id)).await?;
    Ok(Json(TeamDto::from(&team)))
}

/// POST /teams/createTeam
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TeamBody>,
) -> ApiResult<(StatusCode, Json<TeamDto>)> {
    let params = TeamCreateParams {
        name: body.name.unwrap_or_default(),
        description: body.description,
    };
    let team = state.run(move |engine| engine.create_team(&params)).await?;
    Ok((StatusCode::CREATED, Json(TeamDto::from(&team))))
}

/// PUT /teams/updateTeam/{team_id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TeamBody>,
) -> ApiResult<Json<TeamDto>> {
    let id = TeamId::from(id);
    let updates = TeamUpdateParams {
        name: body.name,
        description: body.description,
    };
    let team = state.run(move |engine| engine.update_team(&id, &updates)).await?;
    Ok(Json(TeamDto::from(&team)))
}

/// DELETE /teams/deleteTeam/{team_id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Deleted<TeamDeletion>>> {
    let id = TeamId::from(id);
    let deletion = state.run(move |engine| engine.delete_team(&id)).await?;
    Ok(Json(Deleted::from(deletion)))
}

/// POST /teams/{team_id}/members
pub async fn add_member(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    ApiJson(body): ApiJson<MemberBody>,
) -> ApiResult<(StatusCode, Json<MemberDto>)> {
    let team_id = TeamId::from(team_id);
    let params = MemberCreateParams {
        name: body.name.unwrap_or_default(),
        role: non_empty(body.role),
        capacity: body.capacity,
    };
    let member = state.run(move |engine| engine.add_member(&team_id, &params)).await?;
    Ok((StatusCode::CREATED, Json(MemberDto::from(&member))))
}

/// PUT /teams/{team_id}/members/{member_id}
pub async fn update_member(
    State(state): State<AppState>,
    Path((team_id, member_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<MemberBody>,
) -> ApiResult<Json<MemberDto>> {
    let team_id = TeamId::from(team_id);
    let member_id = MemberId::from(member_id);
    let updates = MemberUpdateParams {
        name: body.name,
        role: body.role,
        capacity: body.capacity,
    };
    let member = state
        .run(move |engine| engine.update_member(&team_id, &member_id, &updates))
        .await?;
    Ok(Json(MemberDto::from(&member)))
}

/// DELETE /teams/{team_id}/members/{member_id}
pub async fn remove_member(
    State(state): State<AppState>,
    Path((team_id, member_id)): Path<(String, String)>,
) -> ApiResult<Json<Deleted<MemberRemoval>>> {
    let team_id = TeamId::from(team_id);
    let member_id = MemberId::from(member_id);
    let removal = state
        .run(move |engine| engine.remove_member(&team_id, &member_id))
        .await?;
    Ok(Json(Deleted::from(removal)))
}
