//! Broker endpoint resolution.
//!
//! Deployments configure the SockJS-style HTTP endpoint (for example
//! `http://localhost:8881/ws-chat`). The raw WebSocket transport of such an
//! endpoint lives under `<endpoint>/websocket`.

use campus_common::PresenceError;

const RAW_WEBSOCKET_SUFFIX: &str = "/websocket";

/// Map a configured endpoint to the URL handed to the WebSocket connector.
pub fn websocket_url(endpoint: &str) -> Result<String, PresenceError> {
    let endpoint = endpoint.trim().trim_end_matches('/');

    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Ok(endpoint.to_string());
    }

    let (scheme, rest) = if let Some(rest) = endpoint.strip_prefix("http://") {
        ("ws://", rest)
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        ("wss://", rest)
    } else {
        return Err(PresenceError::InvalidUrl(endpoint.to_string()));
    };

    if rest.is_empty() {
        return Err(PresenceError::InvalidUrl(endpoint.to_string()));
    }

    if rest.ends_with(RAW_WEBSOCKET_SUFFIX) {
        Ok(format!("{scheme}{rest}"))
    } else {
        Ok(format!("{scheme}{rest}{RAW_WEBSOCKET_SUFFIX}"))
    }
}

/// Value for the STOMP `host` header: the authority of the URL without
/// credentials.
pub fn host_header(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(|c: char| matches!(c, '/' | '?' | '#')).next()?;
    let authority = authority.rsplit('@').next()?;
    if authority.is_empty() {
        None
    } else {
        Some(authority.to_string())
    }
}
