//! Inbound frame handling.

use campus_common::PresenceError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::frame::{Command, Frame, HeartBeat};
use super::types::{StompConfig, TransportEvent};

/// What the connection loop must do after a frame was handled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Continue,
    /// Session established; start heart-beats with the negotiated periods.
    Connected(HeartBeat),
}

/// Handle a single inbound frame.
pub(crate) async fn handle_frame(
    frame: Frame,
    config: &StompConfig,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> FrameOutcome {
    match frame.command {
        Command::Connected => {
            let heartbeat = HeartBeat::negotiate(
                config.heartbeat_outgoing_ms,
                config.heartbeat_incoming_ms,
                frame.get("heart-beat"),
            );
            let version = frame.get("version").map(str::to_string);
            let server = frame.get("server").map(str::to_string);
            info!(
                version = version.as_deref().unwrap_or("1.0"),
                outgoing_ms = heartbeat.outgoing.as_millis() as u64,
                incoming_ms = heartbeat.incoming.as_millis() as u64,
                "STOMP session established"
            );
            let _ = event_tx
                .send(TransportEvent::Connected { version, server })
                .await;
            FrameOutcome::Connected(heartbeat)
        }
        Command::Message => {
            let Some(destination) = frame.get("destination").map(str::to_string) else {
                warn!("MESSAGE frame without destination dropped");
                return FrameOutcome::Continue;
            };
            let subscription = frame.get("subscription").map(str::to_string);
            debug!(destination = %destination, bytes = frame.body.len(), "Message received");
            let _ = event_tx
                .send(TransportEvent::Message {
                    destination,
                    subscription,
                    body: frame.body,
                })
                .await;
            FrameOutcome::Continue
        }
        Command::Receipt => {
            let receipt_id = frame.get("receipt-id").unwrap_or_default().to_string();
            debug!(receipt_id = %receipt_id, "Receipt received");
            let _ = event_tx
                .send(TransportEvent::Receipt { receipt_id })
                .await;
            FrameOutcome::Continue
        }
        Command::Error => {
            let message = frame
                .get("message")
                .map(str::to_string)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| frame.body.trim().to_string());
            warn!(message = %message, "Broker sent ERROR frame");
            let _ = event_tx
                .send(TransportEvent::Error(PresenceError::Broker(message)))
                .await;
            FrameOutcome::Continue
        }
        other => {
            debug!(command = %other, "Unexpected client frame from broker");
            FrameOutcome::Continue
        }
    }
}
