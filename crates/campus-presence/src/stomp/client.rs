//! Public handle for interacting with a STOMP connection.

use campus_common::SubscriptionId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::connection::connection_task;
use super::types::{StompConfig, TransportCommand, TransportEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for one STOMP connection.
///
/// `subscribe` and `send` queue a command for the background connection
/// task. Teardown goes through the `request_*` methods, which never wait
/// so they also work from `Drop`. Dropping every handle closes the connection.
#[derive(Clone)]
pub struct StompClient {
    command_tx: mpsc::Sender<TransportCommand>,
}

impl StompClient {
    /// Start the background connection. Returns `(client, events, task)`.
    pub fn connect(
        config: StompConfig,
    ) -> (Self, mpsc::Receiver<TransportEvent>, JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);

        let task = tokio::spawn(connection_task(config, event_tx, command_rx));

        (Self { command_tx }, event_rx, task)
    }

    #[cfg(test)]
    pub(crate) fn from_sender(command_tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { command_tx }
    }

    /// Subscribe to a destination under the given id.
    pub async fn subscribe(&self, id: &SubscriptionId, destination: &str) {
        let _ = self
            .command_tx
            .send(TransportCommand::Subscribe {
                id: id.clone(),
                destination: destination.to_string(),
            })
            .await;
    }

    /// Send a JSON body to a destination.
    pub async fn send(&self, destination: &str, body: String) {
        let _ = self
            .command_tx
            .send(TransportCommand::Send {
                destination: destination.to_string(),
                body,
            })
            .await;
    }

    /// Queue an unsubscribe without waiting. Returns false if the
    /// connection is already gone or its queue is full.
    pub fn request_unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.try_command(TransportCommand::Unsubscribe { id: id.clone() })
    }

    /// Queue a disconnect without waiting. Returns false if the
    /// connection is already gone or its queue is full.
    pub fn request_disconnect(&self) -> bool {
        self.try_command(TransportCommand::Disconnect)
    }

    /// Whether the connection task has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    fn try_command(&self, command: TransportCommand) -> bool {
        match self.command_tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "STOMP command not queued");
                false
            }
        }
    }
}
