//! Configuration validation.
//!
//! Collects every range or format problem into a single `ConfigError`.

mod helpers;


use crate::schema::CampusConfig;
use campus_common::ConfigError;

use helpers::{validate_range, validate_range_u64};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CampusConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_presence(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_presence(errors: &mut Vec<String>, config: &CampusConfig) {
    let presence = &config.presence;

    let url = presence.ws_url.trim();
    let known_scheme = ["http://", "https://", "ws://", "wss://"]
        .iter()
        .any(|scheme| url.starts_with(scheme));
    if !known_scheme {
        errors.push(format!(
            "presence.ws_url = {url:?} must start with http://, https://, ws:// or wss://"
        ));
    }

    validate_range_u64(
        errors,
        "presence.connect_timeout_secs",
        presence.connect_timeout_secs,
        1,
        120,
    );
    validate_range_u64(
        errors,
        "presence.heartbeat_outgoing_ms",
        presence.heartbeat_outgoing_ms,
        0,
        120_000,
    );
    validate_range_u64(
        errors,
        "presence.heartbeat_incoming_ms",
        presence.heartbeat_incoming_ms,
        0,
        120_000,
    );
    validate_range(
        errors,
        "presence.event_buffer",
        presence.event_buffer,
        1,
        65_536,
    );
}
