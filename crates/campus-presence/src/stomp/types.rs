//! Configuration and event/command enums for the STOMP client.

use campus_common::{PresenceError, SubscriptionId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for one STOMP session.
#[derive(Debug, Clone)]
pub struct StompConfig {
    /// Broker endpoint as configured (`http(s)://` or `ws(s)://`).
    pub endpoint: String,
    /// WebSocket handshake timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Heart-beat we offer to send, in milliseconds.
    pub heartbeat_outgoing_ms: u64,
    /// Heart-beat we ask the broker for, in milliseconds.
    pub heartbeat_incoming_ms: u64,
}

impl Default for StompConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            connect_timeout_secs: 15,
            heartbeat_outgoing_ms: 10_000,
            heartbeat_incoming_ms: 10_000,
        }
    }
}

impl From<&campus_config::PresenceConfig> for StompConfig {
    fn from(config: &campus_config::PresenceConfig) -> Self {
        Self {
            endpoint: config.ws_url.clone(),
            connect_timeout_secs: config.connect_timeout_secs,
            heartbeat_outgoing_ms: config.heartbeat_outgoing_ms,
            heartbeat_incoming_ms: config.heartbeat_incoming_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the STOMP connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the session (`CONNECTED` frame).
    Connected {
        version: Option<String>,
        server: Option<String>,
    },
    /// A `MESSAGE` frame for one of our subscriptions.
    Message {
        destination: String,
        subscription: Option<String>,
        body: String,
    },
    /// A `RECEIPT` frame.
    Receipt { receipt_id: String },
    /// Transport or broker failure. The connection may still be open.
    Error(PresenceError),
    /// The socket is gone. Emitted once, last, and only if the WebSocket
    /// handshake had succeeded.
    Disconnected,
}

/// Commands sent to the connection task from a [`super::StompClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportCommand {
    Subscribe {
        id: SubscriptionId,
        destination: String,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
    Send {
        destination: String,
        body: String,
    },
    Disconnect,
}
