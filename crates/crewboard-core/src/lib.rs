//! # crewboard-core
//!
//! Foundation types shared by every crewboard crate:
//!
//! - **Branded IDs**: `TeamId`, `MemberId`, `ProjectId`, `TaskId`, ... as
//!   newtypes so a member id can never be passed where a task id is expected
//! - **Capacity model**: [`Capacity`] (validated 0–5) and [`Load`] with the
//!   overload / load-ratio rules used by assignment and rebalancing
//! - **Domain types**: teams, members, projects, tasks, reassignment logs
//! - **Logging**: `tracing` subscriber initialisation

#![deny(unsafe_code)]

pub mod capacity;
pub mod constants;
pub mod ids;
pub mod logging;
pub mod types;

pub use capacity::{Capacity, CapacityError, DEFAULT_CAPACITY, Load, MAX_CAPACITY, least_loaded};
pub use ids::{LogId, MemberId, ProjectId, TaskId, TeamId, UserId};
pub use types::*;
