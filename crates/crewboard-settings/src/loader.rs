//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CrewboardSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `CREWBOARD_*` environment variable overrides
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use crewboard_core::logging::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::CrewboardSettings;

/// Special database path that opens an in-memory database.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Resolve the crewboard home directory (`~/.crewboard`).
pub fn crewboard_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".crewboard")
}

/// Resolve the path to the settings file (`~/.crewboard/settings.json`).
pub fn settings_path() -> PathBuf {
    crewboard_home().join("settings.json")
}

/// Resolve a configured database path against `home`.
///
/// Absolute paths and [`IN_MEMORY_DB`] are returned unchanged.
pub fn resolve_db_path(configured: &str, home: &Path) -> PathBuf {
    let path = Path::new(configured);
    if configured == IN_MEMORY_DB || path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CrewboardSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CrewboardSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the settings file, without env overrides.
fn load_file_layer(path: &Path) -> Result<CrewboardSettings> {
    let defaults = serde_json::to_value(CrewboardSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (the file/default value stays).
pub fn apply_env_overrides(settings: &mut CrewboardSettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("CREWBOARD_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("CREWBOARD_PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_u64("CREWBOARD_SHUTDOWN_TIMEOUT_SECS", 1, 600) {
        settings.server.shutdown_timeout_secs = v;
    }

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read_env_string("CREWBOARD_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read_env_u32("CREWBOARD_DB_POOL_SIZE", 1, 64) {
        settings.database.pool_size = v;
    }
    if let Some(v) = read_env_u32("CREWBOARD_DB_BUSY_TIMEOUT_MS", 0, 600_000) {
        settings.database.busy_timeout_ms = v;
    }

    // ── Engine ──────────────────────────────────────────────────────
    if let Some(v) = read_env_u32("CREWBOARD_RECENT_LOGS_LIMIT", 1, 1000) {
        settings.engine.recent_logs_limit = v;
    }
    if let Some(v) = read_env_u32("CREWBOARD_ACTIVITY_LOG_LIMIT", 1, 10_000) {
        settings.engine.activity_log_limit = v;
    }

    // ── Auth ────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("CREWBOARD_JWT_SECRET") {
        settings.auth.jwt_secret = v;
    }
    if let Some(v) = read_env_u64("CREWBOARD_TOKEN_TTL_SECS", 60, 31_536_000) {
        settings.auth.token_ttl_secs = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("CREWBOARD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("CREWBOARD_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "CREWBOARD_LOG_FORMAT", value = %v, "invalid log format env var, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a log format name (`text` or `json`).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    val.parse().ok()
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
