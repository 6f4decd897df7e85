//! `CrewboardServer`: Axum REST server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::middleware;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use crewboard_engine::Engine;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{AuthService, require_auth};
use crate::config::ServerConfig;
use crate::errors::{ApiError, ApiResult};
use crate::handlers::{auth, dashboard, projects, tasks, teams};
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Assignment engine.
    pub engine: Engine,
    /// Token issuing and verification.
    pub auth: Arc<AuthService>,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// Run a blocking closure on the blocking thread pool.
    pub async fn blocking<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce() -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(op)
            .await
            .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
    }

    /// Run an engine operation off the async runtime.
    pub async fn run<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&Engine) -> crewboard_engine::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine.clone();
        self.blocking(move || op(&engine).map_err(ApiError::from)).await
    }
}

/// The crewboard HTTP server.
pub struct CrewboardServer {
    config: ServerConfig,
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl CrewboardServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, engine: Engine, auth: AuthService) -> Self {
        Self {
            config,
            state: AppState {
                engine,
                auth: Arc::new(auth),
                start_time: Instant::now(),
            },
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = self.state.clone();

        let protected = Router::new()
            .route("/auth/me", get(auth::me))
            .route("/teams", get(teams::list))
            .route("/teams/singleTeam/{team_id}", get(teams::get_one))
            .route("/teams/createTeam", post(teams::create))
            .route("/teams/updateTeam/{team_id}", put(teams::update))
            .route("/teams/deleteTeam/{team_id}", axum::routing::delete(teams::delete))
            .route("/teams/{team_id}/members", post(teams::add_member))
            .route(
                "/teams/{team_id}/members/{member_id}",
                put(teams::update_member).delete(teams::remove_member),
            )
            .route("/projects", get(projects::list))
            .route("/projects/createProject", post(projects::create))
            .route(
                "/projects/{id}",
                get(projects::get_one).put(projects::update).delete(projects::delete),
            )
            .route("/tasks", get(tasks::list))
            .route("/tasks/createTask", post(tasks::create))
            .route("/tasks/auto-assign/{id}", post(tasks::auto_assign))
            .route(
                "/tasks/{id}",
                get(tasks::get_one).put(tasks::update).delete(tasks::delete),
            )
            .route("/dashboard/stats", get(dashboard::stats))
            .route("/dashboard/reassign-tasks", post(dashboard::reassign_tasks))
            .route("/dashboard/activity-logs", get(dashboard::activity_logs))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

        let api = Router::new()
            .route("/auth/register", post(auth::register))
            .route("/auth/login", post(auth::login))
            .merge(protected);

        Router::new()
            .route("/health", get(health_handler))
            .nest("/api", api)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve until the shutdown token is cancelled.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(addr = %local_addr, "crewboard server listening");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                tracing::error!(error = %e, "server error");
            }
        });
        Ok((local_addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the engine.
    pub fn engine(&self) -> &Engine {
        &self.state.engine
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let pool = state.engine.pool().clone();
    let start = state.start_time;
    let resp = tokio::task::spawn_blocking(move || health::health_check(start, &pool))
        .await
        .unwrap_or(HealthResponse {
            status: "ok",
            uptime_secs: start.elapsed().as_secs(),
            database: "error",
        });
    Json(resp)
}
