//! Campus presence configuration.
//!
//! TOML-based configuration with serde defaults, environment overrides and
//! validation. Every section defaults sensibly so an empty file is valid.
//!
//! ```rust,no_run
//! use campus_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.presence.ws_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{CampusConfig, LogLevel, LoggingConfig, PresenceConfig, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{apply_env_overrides, load_default, load_from_path, WS_URL_ENV};

use campus_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path, apply environment overrides
/// and validate the result.
pub fn load_config() -> Result<CampusConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Same as [`load_config`] but reads an explicit file instead of the
/// platform default.
pub fn load_config_from(path: &Path) -> Result<CampusConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &CampusConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
