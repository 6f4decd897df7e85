//! # crewboard-server
//!
//! Axum REST server exposing the crewboard engine.
//!
//! - [`server`]: router, shared state, bind/serve
//! - [`handlers`]: one module per resource (`/teams`, `/projects`, `/tasks`,
//!   `/dashboard`, `/auth`)
//! - [`auth`]: password hashing, JWT issuing, bearer-token middleware
//! - [`errors`]: `{code, message}` error bodies and status mapping
//! - [`health`], [`shutdown`], [`config`]
//!
//! The engine is synchronous; handlers run it on the blocking pool.

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod views;

pub use auth::AuthService;
pub use config::ServerConfig;
pub use errors::{ApiError, ApiResult};
pub use server::{AppState, CrewboardServer};
pub use shutdown::ShutdownCoordinator;
