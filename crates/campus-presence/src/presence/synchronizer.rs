//! The owner-facing presence synchronizer.

use std::sync::Arc;
use std::time::Duration;

use campus_common::SubscriptionId;
use campus_config::PresenceConfig;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::protocol::Participant;
use crate::stomp::{StompClient, StompConfig};

use super::event_translator::{event_translator, TranslatorContext};
use super::liveness::Liveness;
use super::types::{
    ActivationHandle, ActivationInputs, ConnectionStatus, MeetingIdentity, PresenceSnapshot,
    PresenceUpdate, SessionState,
};

/// Upper bound for a connected session to finish its close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Resources owned by the current activation.
struct Activation {
    handle: ActivationHandle,
    identity: MeetingIdentity,
    subscription: SubscriptionId,
    client: StompClient,
    translator: JoinHandle<()>,
    connection: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Keeps a live roster for at most one meeting at a time.
///
/// Activating with a complete set of inputs opens a broker connection,
/// subscribes to the meeting's presence topic and requests a full sync.
/// Switching meetings, deactivating or dropping the synchronizer tears the
/// connection down and clears the roster before anything new starts.
pub struct PresenceSynchronizer {
    config: PresenceConfig,
    state: Arc<RwLock<SessionState>>,
    liveness: Liveness,
    update_tx: mpsc::Sender<PresenceUpdate>,
    active: Option<Activation>,
}

impl PresenceSynchronizer {
    /// Create an idle synchronizer. The receiver yields [`PresenceUpdate`]s
    /// for every activation this synchronizer runs.
    pub fn new(config: PresenceConfig) -> (Self, mpsc::Receiver<PresenceUpdate>) {
        let (update_tx, update_rx) = mpsc::channel(config.event_buffer.max(1));
        let synchronizer = Self {
            config,
            state: Arc::new(RwLock::new(SessionState::default())),
            liveness: Liveness::new(),
            update_tx,
            active: None,
        };
        (synchronizer, update_rx)
    }

    /// Tear down any current activation, then start a new one if `inputs`
    /// are complete. Returns `None` when they are not.
    pub async fn activate(&mut self, inputs: &ActivationInputs) -> Option<ActivationHandle> {
        self.deactivate().await;

        let Some(identity) = inputs.identity() else {
            debug!("Presence inputs incomplete, staying inactive");
            return None;
        };

        let generation = self.liveness.begin();
        let handle = ActivationHandle {
            generation: generation.id(),
        };
        {
            let mut state = self.state.write().await;
            state.roster.clear();
            state.status = ConnectionStatus::Connecting;
        }

        info!(
            meeting_id = %identity.meeting_id,
            user_id = %identity.user_id,
            endpoint = %self.config.ws_url,
            "Activating meeting presence"
        );

        let (client, transport_rx, connection) =
            StompClient::connect(StompConfig::from(&self.config));
        let subscription = SubscriptionId::new();

        let ctx = TranslatorContext {
            identity: identity.clone(),
            subscription: subscription.clone(),
            client: client.clone(),
            state: Arc::clone(&self.state),
            generation,
            update_tx: self.update_tx.clone(),
        };
        let translator = tokio::spawn(event_translator(transport_rx, ctx));

        self.active = Some(Activation {
            handle,
            identity,
            subscription,
            client,
            translator,
            connection,
        });
        Some(handle)
    }

    /// Re-evaluate with the latest inputs. An unchanged, complete identity
    /// keeps the running activation; anything else restarts or stops it.
    pub async fn update(&mut self, inputs: &ActivationInputs) -> Option<ActivationHandle> {
        if let (Some(identity), Some(active)) = (inputs.identity(), &self.active) {
            if identity == active.identity {
                return Some(active.handle);
            }
        }
        self.activate(inputs).await
    }

    /// Tear down the current activation. Returns false when there was none.
    pub async fn deactivate(&mut self) -> bool {
        let Some(activation) = self.active.take() else {
            return false;
        };

        let was_connected = self.state.read().await.status.is_connected();
        let closing = teardown(&self.liveness, activation, was_connected);
        {
            let mut state = self.state.write().await;
            state.roster.clear();
            state.status = ConnectionStatus::Closed;
        }
        let _ = self.update_tx.try_send(PresenceUpdate::Disconnected);

        if let Some(connection) = closing {
            if tokio::time::timeout(CLOSE_TIMEOUT, connection).await.is_err() {
                debug!("Presence connection did not close in time");
            }
        }
        true
    }

    /// Tear down only if `handle` names the current activation.
    pub async fn deactivate_handle(&mut self, handle: ActivationHandle) -> bool {
        if self.active_handle() != Some(handle) {
            debug!(generation = handle.generation, "Stale activation handle ignored");
            return false;
        }
        self.deactivate().await
    }

    pub async fn snapshot(&self) -> PresenceSnapshot {
        let state = self.state.read().await;
        PresenceSnapshot {
            participants: state.roster.to_vec(),
            presence_connected: state.status.is_connected(),
        }
    }

    pub async fn participants(&self) -> Vec<Participant> {
        self.state.read().await.roster.to_vec()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.status.is_connected()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.read().await.status
    }

    pub fn active_handle(&self) -> Option<ActivationHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    pub fn current_identity(&self) -> Option<&MeetingIdentity> {
        self.active.as_ref().map(|a| &a.identity)
    }
}

/// Retire the generation, then ask the connection to unsubscribe and close.
/// Nothing here awaits, so it also runs from `Drop`. Returns the connection
/// task when it was asked to close gracefully.
fn teardown(
    liveness: &Liveness,
    activation: Activation,
    was_connected: bool,
) -> Option<JoinHandle<()>> {
    liveness.invalidate();
    info!(meeting_id = %activation.identity.meeting_id, "Deactivating meeting presence");

    activation.translator.abort();
    if was_connected {
        activation.client.request_unsubscribe(&activation.subscription);
        activation.client.request_disconnect();
        Some(activation.connection)
    } else {
        // Still handshaking: nothing to unsubscribe from.
        activation.connection.abort();
        None
    }
}

impl Drop for PresenceSynchronizer {
    fn drop(&mut self) {
        if let Some(activation) = self.active.take() {
            let was_connected = self
                .state
                .try_read()
                .map(|state| state.status.is_connected())
                .unwrap_or(true);
            let _ = teardown(&self.liveness, activation, was_connected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nothing listens on port 1, so connects fail fast.
    fn unreachable_config() -> PresenceConfig {
        PresenceConfig {
            ws_url: "ws://127.0.0.1:1/ws-chat".into(),
            connect_timeout_secs: 2,
            ..Default::default()
        }
    }

    fn inputs(meeting: &str) -> ActivationInputs {
        ActivationInputs::new(meeting, "u1", "key", "token")
    }

    #[tokio::test]
    async fn incomplete_inputs_do_not_activate() {
        let (mut sync, _updates) = PresenceSynchronizer::new(unreachable_config());
        let mut partial = inputs("m1");
        partial.session_key = None;

        assert!(sync.activate(&partial).await.is_none());
        assert_eq!(sync.status().await, ConnectionStatus::Idle);
        assert!(sync.active_handle().is_none());
        assert_eq!(sync.snapshot().await, PresenceSnapshot::default());
    }

    #[tokio::test]
    async fn failed_connect_stays_connecting_and_reports() {
        let (mut sync, mut updates) = PresenceSynchronizer::new(unreachable_config());
        assert!(sync.activate(&inputs("m1")).await.is_some());
        assert_eq!(sync.status().await, ConnectionStatus::Connecting);

        let update = tokio::time::timeout(std::time::Duration::from_secs(5), updates.recv())
            .await
            .unwrap();
        assert!(matches!(update, Some(PresenceUpdate::Error(_))));
        assert_eq!(sync.status().await, ConnectionStatus::Connecting);
        assert!(!sync.is_connected().await);
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let (mut sync, _updates) = PresenceSynchronizer::new(unreachable_config());
        sync.activate(&inputs("m1")).await.unwrap();

        assert!(sync.deactivate().await);
        assert_eq!(sync.status().await, ConnectionStatus::Closed);
        assert!(sync.participants().await.is_empty());

        assert!(!sync.deactivate().await);
        assert_eq!(sync.status().await, ConnectionStatus::Closed);
    }

    #[tokio::test]
    async fn update_keeps_activation_for_same_identity() {
        let (mut sync, _updates) = PresenceSynchronizer::new(unreachable_config());
        let first = sync.update(&inputs("m1")).await.unwrap();

        let mut new_token = inputs("m1");
        new_token.join_token = Some("refreshed".into());
        assert_eq!(sync.update(&new_token).await, Some(first));

        let second = sync.update(&inputs("m2")).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(sync.current_identity().unwrap().meeting_id, "m2");

        let mut gone = inputs("m2");
        gone.meeting_id = None;
        assert!(sync.update(&gone).await.is_none());
        assert!(sync.active_handle().is_none());
        assert_eq!(sync.status().await, ConnectionStatus::Closed);
    }

    #[tokio::test]
    async fn stale_handle_is_ignored() {
        let (mut sync, _updates) = PresenceSynchronizer::new(unreachable_config());
        let old = sync.activate(&inputs("m1")).await.unwrap();
        let current = sync.activate(&inputs("m2")).await.unwrap();

        assert!(!sync.deactivate_handle(old).await);
        assert_eq!(sync.active_handle(), Some(current));

        assert!(sync.deactivate_handle(current).await);
        assert!(sync.active_handle().is_none());
    }
}
