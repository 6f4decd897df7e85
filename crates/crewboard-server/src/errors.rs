//! HTTP error type and wire codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crewboard_engine::{EngineError, MemberLoad};
use crewboard_store::StoreError;
use serde::Serialize;
use tracing::error;

// ── Error code constants ────────────────────────────────────────────

/// Input rejected.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
/// Assignment needs an explicit capacity override.
pub const CAPACITY_WARNING: &str = "CAPACITY_WARNING";
/// Unknown entity.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Duplicate or concurrently changed state.
pub const CONFLICT: &str = "CONFLICT";
/// Missing or bad credentials.
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
/// Unexpected failure.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad input.
    #[error("{0}")]
    Validation(String),

    /// Assignment would exceed the member's capacity.
    #[error("{message}")]
    CapacityWarning {
        /// Human-readable message.
        message: String,
        /// The member's load before the assignment.
        member: MemberLoad,
    },

    /// Unknown entity.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate or concurrently changed state.
    #[error("{0}")]
    Conflict(String),

    /// Missing or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Storage or runtime failure.
    #[error("{0}")]
    Internal(String),
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

/// Wire body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    /// Machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Member load, for capacity warnings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<&'a MemberLoad>,
}

impl ApiError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => VALIDATION_ERROR,
            Self::CapacityWarning { .. } => CAPACITY_WARNING,
            Self::NotFound(_) => NOT_FOUND,
            Self::Conflict(_) => CONFLICT,
            Self::Unauthorized(_) => UNAUTHORIZED,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::CapacityWarning { .. } | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire body for this error.
    pub fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            member: match self {
                Self::CapacityWarning { member, .. } => Some(member),
                _ => None,
            },
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => Self::Validation(msg),
            EngineError::CapacityWarning { ref member } => Self::CapacityWarning {
                message: err.to_string(),
                member: member.clone(),
            },
            EngineError::NotFound { .. } => Self::NotFound(err.to_string()),
            EngineError::Conflict(msg) => Self::Conflict(msg),
            EngineError::Store(e) => Self::from(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(error = %detail, "request failed");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
