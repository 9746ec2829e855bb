//! Environment overrides applied on top of the file config.

use crate::schema::CampusConfig;
use tracing::debug;

/// Overrides `presence.ws_url`.
pub const WS_URL_ENV: &str = "CAMPUS_WS_URL";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut CampusConfig) {
    apply_overrides_with(config, |key| std::env::var(key).ok());
}

/// Apply overrides using an arbitrary variable lookup.
pub fn apply_overrides_with<F>(config: &mut CampusConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(WS_URL_ENV) {
        let url = url.trim();
        if !url.is_empty() {
            debug!(url = %url, "presence.ws_url overridden from {WS_URL_ENV}");
            config.presence.ws_url = url.to_string();
        }
    }
}
