//! Presence broker connection settings.

use serde::{Deserialize, Serialize};

/// Default broker endpoint (SockJS-style HTTP URL).
pub const DEFAULT_WS_URL: &str = "http://localhost:8881/ws-chat";

/// Presence synchronizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Broker endpoint. `http(s)://` endpoints are mapped to their raw
    /// WebSocket path; `ws(s)://` URLs are used verbatim.
    pub ws_url: String,
    /// Upper bound for the WebSocket handshake, in seconds (1-120).
    pub connect_timeout_secs: u64,
    /// Heart-beat we offer to send, in milliseconds. 0 disables (0-120000).
    pub heartbeat_outgoing_ms: u64,
    /// Heart-beat we ask the broker to send, in milliseconds (0-120000).
    pub heartbeat_incoming_ms: u64,
    /// Capacity of the update channel handed to the UI (1-65536).
    pub event_buffer: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            connect_timeout_secs: 15,
            heartbeat_outgoing_ms: 10_000,
            heartbeat_incoming_ms: 10_000,
            event_buffer: 256,
        }
    }
}
