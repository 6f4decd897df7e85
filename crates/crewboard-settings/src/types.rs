//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file only needs the keys it changes.

use crewboard_core::logging::LogFormat;
use crewboard_core::{DEFAULT_CAPACITY, MAX_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// { "server": { "port": 5000 }, "engine": { "recentLogsLimit": 10 } }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrewboardSettings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// `SQLite` database.
    pub database: DatabaseSettings,
    /// Assignment and rebalancing engine.
    pub engine: EngineSettings,
    /// Registration and tokens.
    pub auth: AuthSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl CrewboardSettings {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.engine.default_capacity > MAX_CAPACITY {
            return Err(SettingsError::InvalidValue(format!(
                "engine.defaultCapacity must be between 0 and {MAX_CAPACITY}, got {}",
                self.engine.default_capacity
            )));
        }
        if self.database.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "database.poolSize must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (0 picks a free port).
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file, relative to `~/.crewboard` unless absolute.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "crewboard.db".to_string(),
            pool_size: 8,
            busy_timeout_ms: 5000,
        }
    }
}

/// Engine tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Reassignment log entries included in dashboard stats.
    pub recent_logs_limit: u32,
    /// Reassignment log entries returned by the activity feed.
    pub activity_log_limit: u32,
    /// Capacity for new members that do not specify one.
    pub default_capacity: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            recent_logs_limit: 5,
            activity_log_limit: 100,
            default_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Authentication settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HS256 signing secret. Empty means a random per-process secret.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
    /// Minimum password length accepted at registration.
    pub min_password_length: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 7 * 24 * 60 * 60,
            min_password_length: 6,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = CrewboardSettings::default();
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.server.port, 5000);
        assert_eq!(s.server.shutdown_timeout_secs, 10);
        assert_eq!(s.database.path, "crewboard.db");
        assert_eq!(s.database.pool_size, 8);
        assert_eq!(s.engine.recent_logs_limit, 5);
        assert_eq!(s.engine.activity_log_limit, 100);
        assert_eq!(s.engine.default_capacity, 3);
        assert_eq!(s.auth.token_ttl_secs, 604_800);
        assert_eq!(s.auth.min_password_length, 6);
        assert_eq!(s.logging.format, LogFormat::Text);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(CrewboardSettings::default()).unwrap();
        assert!(json["server"].get("shutdownTimeoutSecs").is_some());
        assert!(json["engine"].get("recentLogsLimit").is_some());
        assert!(json["auth"].get("minPasswordLength").is_some());
        assert_eq!(json["logging"]["format"], "text");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: CrewboardSettings =
            serde_json::from_str(r#"{"engine": {"recentLogsLimit": 12}}"#).unwrap();
        assert_eq!(s.engine.recent_logs_limit, 12);
        assert_eq!(s.engine.activity_log_limit, 100);
        assert_eq!(s.server.port, 5000);
    }

    #[test]
    fn validate_rejects_capacity_above_max() {
        let mut s = CrewboardSettings::default();
        s.engine.default_capacity = 6;
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn validate_rejects_empty_pool() {
        let mut s = CrewboardSettings::default();
        s.database.pool_size = 0;
        assert!(s.validate().is_err());
        assert!(CrewboardSettings::default().validate().is_ok());
    }
}
