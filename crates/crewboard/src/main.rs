//! # crewboard
//!
//! Server binary: loads settings, opens the database, and serves the REST
//! API until Ctrl-C.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crewboard_core::constants::{NAME, VERSION};
use crewboard_core::logging::init_subscriber;
use crewboard_engine::{Engine, EngineConfig};
use crewboard_server::{AuthService, CrewboardServer, ServerConfig};
use crewboard_settings::{CrewboardSettings, IN_MEMORY_DB, crewboard_home, resolve_db_path};
use crewboard_store::{ConnectionConfig, ConnectionPool, new_file, new_in_memory, run_migrations};

/// crewboard task assignment server.
#[derive(Parser, Debug)]
#[command(name = NAME, version = VERSION, about = "Capacity-aware task assignment server")]
struct Cli {
    /// Settings file (default `~/.crewboard/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// `SQLite` database path, or `:memory:` (overrides settings).
    #[arg(long)]
    db_path: Option<String>,

    /// Log filter directive such as `debug` or `crewboard_engine=trace`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_settings(&self) -> Result<CrewboardSettings> {
        let settings = match &self.config {
            Some(path) => crewboard_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => crewboard_settings::load_settings().context("Failed to load settings")?,
        };
        Ok(self.apply_overrides(settings))
    }

    /// Flags win over file and environment values.
    fn apply_overrides(&self, mut settings: CrewboardSettings) -> CrewboardSettings {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.db_path {
            settings.database.path.clone_from(path);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        settings
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Open the configured database and bring its schema up to date.
fn open_pool(settings: &CrewboardSettings) -> Result<ConnectionPool> {
    let config = ConnectionConfig {
        pool_size: settings.database.pool_size,
        busy_timeout_ms: settings.database.busy_timeout_ms,
        ..ConnectionConfig::default()
    };

    let pool = if settings.database.path == IN_MEMORY_DB {
        tracing::warn!("using in-memory database, data is lost on exit");
        new_in_memory(&config).context("Failed to open in-memory database")?
    } else {
        let path = resolve_db_path(&settings.database.path, &crewboard_home());
        ensure_parent_dir(&path)?;
        tracing::info!(path = %path.display(), "opening database");
        new_file(&path, &config).context("Failed to open database")?
    };

    {
        let conn = pool.get().context("Failed to get DB connection")?;
        run_migrations(&conn).context("Failed to run migrations")?;
    }
    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;
    init_subscriber(&settings.logging.level, settings.logging.format);

    let pool = open_pool(&settings)?;
    let engine = Engine::new(pool, EngineConfig::from(&settings.engine));
    let auth = AuthService::new(&settings.auth);
    let config = ServerConfig::from(&settings.server);
    let timeout = config.shutdown_timeout();
    if crewboard_settings::init_settings(settings).is_err() {
        tracing::debug!("global settings already initialised");
    }

    let server = CrewboardServer::new(config, engine, auth);
    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;
    tracing::info!(version = VERSION, "{NAME} listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown().drain(handle, timeout).await {
        tracing::warn!(timeout_secs = timeout.as_secs(), "shutdown timed out, connections dropped");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
