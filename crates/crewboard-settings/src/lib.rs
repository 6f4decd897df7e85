//! # crewboard-settings
//!
//! Layered configuration for crewboard.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CrewboardSettings::default()`]
//! 2. **User file**: `~/.crewboard/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CREWBOARD_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    IN_MEMORY_DB, crewboard_home, deep_merge, load_settings, load_settings_from_path,
    resolve_db_path, settings_path,
};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<CrewboardSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// Returns the value passed to [`init_settings`], or on first access loads
/// `~/.crewboard/settings.json` with env overrides, falling back to
/// compiled defaults if loading fails.
pub fn get_settings() -> &'static CrewboardSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CrewboardSettings) -> std::result::Result<(), CrewboardSettings> {
    SETTINGS.set(settings)
}
