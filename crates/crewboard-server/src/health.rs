//! `/health` endpoint.

use std::time::Instant;

use crewboard_store::{ConnectionPool, ping};
use serde::Serialize;
use tracing::warn;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// `"ok"` when the database answers a trivial query, else `"error"`.
    pub database: &'static str,
}

/// Build a health response. Blocking: probes the database.
pub fn health_check(start_time: Instant, pool: &ConnectionPool) -> HealthResponse {
    let database = match ping(pool) {
        Ok(()) => "ok",
        Err(e) => {
            warn!(error = %e, "database health probe failed");
            "error"
        }
    };
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        database,
    }
}
