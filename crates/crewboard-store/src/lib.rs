//! # crewboard-store
//!
//! `SQLite` persistence for crewboard.
//!
//! - [`connection`]: r2d2 pool with per-connection pragmas
//! - [`migrations`]: idempotent schema setup
//! - [`repositories`]: stateless SQL access per entity
//!
//! Repositories never lock or open transactions; the engine wraps them.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory, ping};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use repositories::{
    LogRepository, MemberRepository, ProjectRepository, StoredUser, TaskRepository, TeamRepository,
    UserRepository, now_iso,
};
