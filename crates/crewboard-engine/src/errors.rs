//! Engine error types.
//!
//! Errors are returned to the HTTP layer, which maps each variant to a
//! status code and a stable string code.

use crewboard_store::StoreError;
use thiserror::Error;

use crate::views::MemberLoad;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected (bad capacity, empty name, member outside the team).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The assignment would push the member over capacity. Resend with an
    /// explicit override to proceed.
    #[error("{} is at capacity ({}/{}); confirm to assign anyway", member.name, member.current_tasks, member.capacity)]
    CapacityWarning {
        /// The member's load before the assignment.
        member: MemberLoad,
    },

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type (e.g., "Task", "Member").
        entity: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// The operation conflicts with existing or concurrently changed state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(err))
    }
}

impl EngineError {
    /// Create a not-found error for a team.
    pub fn team_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Team",
            id: id.into(),
        }
    }

    /// Create a not-found error for a member.
    pub fn member_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Member",
            id: id.into(),
        }
    }

    /// Create a not-found error for a project.
    pub fn project_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Project",
            id: id.into(),
        }
    }

    /// Create a not-found error for a task.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Task",
            id: id.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
