//! # crewboard-engine
//!
//! Capacity-aware task assignment for crewboard.
//!
//! - [`Engine`]: CRUD for teams, members, projects and tasks, with every
//!   assignment checked against the assignee's capacity
//! - [`resolver`]: pure assignment decisions (manual checks, auto-assign)
//! - [`rebalancer`]: moves work off overloaded members
//! - [`stats`]: dashboard aggregation
//!
//! Mutations that decide on a member's load hold the lock of the team
//! involved ([`TeamLocks`]) and run in one `IMMEDIATE` transaction.

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod locks;
pub mod projects;
pub mod rebalancer;
pub mod resolver;
pub mod stats;
pub mod tasks;
pub mod teams;
pub mod views;

pub use engine::{Engine, EngineConfig};
pub use errors::{EngineError, Result};
pub use locks::{TeamGuard, TeamLocks};
pub use rebalancer::{PlannedMove, TeamPlan, plan_team};
pub use views::{
    AutoAssignOutcome, MemberLoad, MemberRemoval, ProjectDeletion, ProjectDetail, ProjectMutation,
    RebalanceFailure, RebalanceReport, Stats, TaskMutation, TaskView, TeamDeletion, TeamSummary,
    UnresolvedMember,
};
