//! `/auth` routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use crewboard_core::UserId;
use crewboard_store::UserRepository;
use serde::Deserialize;
use tracing::info;

use super::ApiJson;
use crate::auth::Claims;
use crate::errors::{ApiError, ApiResult};
use crate::server::AppState;
use crate::views::{AuthResponse, UserDto};

/// `POST /auth/register` body.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// `POST /auth/login` body.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterBody>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let auth = state.auth.clone();
    let pool = state.engine.pool().clone();
    let user = state
        .blocking(move || auth.register(&pool, &body.name, &body.email, &body.password))
        .await?;
    info!(user_id = %user.id, "user registered");
    let token = state.auth.issue_token(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserDto::from(user),
        }),
    ))
}

/// POST /auth/login
pub async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginBody>) -> ApiResult<Json<AuthResponse>> {
    let auth = state.auth.clone();
    let pool = state.engine.pool().clone();
    let user = state
        .blocking(move || auth.login(&pool, &body.email, &body.password))
        .await?;
    let token = state.auth.issue_token(&user)?;
    Ok(Json(AuthResponse {
        token,
        user: UserDto::from(user),
    }))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> ApiResult<Json<UserDto>> {
    let pool = state.engine.pool().clone();
    let id = UserId::from(claims.sub);
    let user = state
        .blocking(move || {
            let conn = pool.get().map_err(|e| ApiError::Internal(e.to_string()))?;
            UserRepository::get(&conn, &id)?.ok_or_else(|| ApiError::Unauthorized("Unknown user".into()))
        })
        .await?;
    Ok(Json(UserDto::from(user)))
}
