//! Background task that folds `TransportEvent`s into the roster.

use std::sync::Arc;

use campus_common::SubscriptionId;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::{topics, PresenceEvent};
use crate::stomp::{StompClient, TransportEvent};

use super::liveness::Generation;
use super::types::{ConnectionStatus, MeetingIdentity, PresenceUpdate, SessionState};

/// Per-activation context for [`event_translator`].
pub(crate) struct TranslatorContext {
    pub identity: MeetingIdentity,
    pub subscription: SubscriptionId,
    pub client: StompClient,
    pub state: Arc<RwLock<SessionState>>,
    pub generation: Generation,
    pub update_tx: mpsc::Sender<PresenceUpdate>,
}

// ---------------------------------------------------------------------------
// Event Translator
// ---------------------------------------------------------------------------

/// Consume transport events for one activation, strictly in arrival order.
/// Every state change first checks that this activation is still live.
pub(crate) async fn event_translator(
    mut transport_rx: mpsc::Receiver<TransportEvent>,
    ctx: TranslatorContext,
) {
    let topic = topics::presence(&ctx.identity.meeting_id);
    let mut synced = false;

    while let Some(event) = transport_rx.recv().await {
        match event {
            TransportEvent::Connected { .. } => {
                {
                    let mut state = ctx.state.write().await;
                    if !ctx.generation.is_live() {
                        debug!("Connect for a retired activation ignored");
                        continue;
                    }
                    state.status = ConnectionStatus::Connected;
                }
                info!(meeting_id = %ctx.identity.meeting_id, "Presence connected");

                if !synced {
                    synced = true;
                    if ctx.generation.is_live() {
                        ctx.client.subscribe(&ctx.subscription, &topic).await;
                    }
                    if ctx.generation.is_live() {
                        request_sync(&ctx).await;
                    }
                }
                notify(&ctx, PresenceUpdate::Connected);
            }
            TransportEvent::Message {
                destination, body, ..
            } => {
                if destination != topic {
                    debug!(destination = %destination, "Message for another topic ignored");
                    continue;
                }
                let event = match PresenceEvent::parse(&body) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Malformed presence event dropped");
                        continue;
                    }
                };
                let kind = event.kind();

                let participants = {
                    let mut state = ctx.state.write().await;
                    if !ctx.generation.is_live() {
                        debug!(kind, "Presence event for a retired activation ignored");
                        continue;
                    }
                    if !state.roster.apply(event) {
                        debug!(kind, "Presence event left roster unchanged");
                        continue;
                    }
                    state.roster.to_vec()
                };
                debug!(kind, count = participants.len(), "Roster updated");
                notify(&ctx, PresenceUpdate::RosterChanged(participants));
            }
            TransportEvent::Receipt { receipt_id } => {
                debug!(receipt_id = %receipt_id, "Broker receipt");
            }
            TransportEvent::Error(e) => {
                warn!(error = %e, "Presence transport error");
                if ctx.generation.is_live() {
                    notify(&ctx, PresenceUpdate::Error(e.to_string()));
                }
            }
            TransportEvent::Disconnected => {
                {
                    let mut state = ctx.state.write().await;
                    if !ctx.generation.is_live() {
                        continue;
                    }
                    state.status = ConnectionStatus::Closed;
                }
                info!(meeting_id = %ctx.identity.meeting_id, "Presence disconnected");
                notify(&ctx, PresenceUpdate::Disconnected);
            }
        }
    }
}

/// Hand an update to the owner without waiting. When the owner is not
/// draining the channel the update is dropped; the shared state stays
/// current either way.
fn notify(ctx: &TranslatorContext, update: PresenceUpdate) {
    match ctx.update_tx.try_send(update) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(update)) => {
            debug!(?update, "Update channel full, notification dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

async fn request_sync(ctx: &TranslatorContext) {
    let destination = topics::presence_sync(&ctx.identity.meeting_id);
    match ctx.identity.sync_request().to_json() {
        Ok(body) => ctx.client.send(&destination, body).await,
        Err(e) => warn!(error = %e, "Failed to encode sync request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::liveness::Liveness;
    use crate::stomp::TransportCommand;
    use serde_json::{json, Value};

    struct Harness {
        transport_tx: mpsc::Sender<TransportEvent>,
        command_rx: mpsc::Receiver<TransportCommand>,
        update_rx: mpsc::Receiver<PresenceUpdate>,
        state: Arc<RwLock<SessionState>>,
        liveness: Liveness,
        subscription: SubscriptionId,
    }

    fn spawn_translator() -> Harness {
        let (transport_tx, transport_rx) = mpsc::channel(16);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (update_tx, update_rx) = mpsc::channel(16);
        let state = Arc::new(RwLock::new(SessionState::default()));
        let liveness = Liveness::new();
        let subscription = SubscriptionId::new();

        let ctx = TranslatorContext {
            identity: MeetingIdentity {
                meeting_id: "m1".into(),
                user_id: "u1".into(),
                session_key: "key".into(),
            },
            subscription: subscription.clone(),
            client: StompClient::from_sender(command_tx),
            state: Arc::clone(&state),
            generation: liveness.begin(),
            update_tx,
        };
        tokio::spawn(event_translator(transport_rx, ctx));

        Harness {
            transport_tx,
            command_rx,
            update_rx,
            state,
            liveness,
            subscription,
        }
    }

    fn message(destination: &str, body: Value) -> TransportEvent {
        TransportEvent::Message {
            destination: destination.into(),
            subscription: None,
            body: body.to_string(),
        }
    }

    fn connected() -> TransportEvent {
        TransportEvent::Connected {
            version: Some("1.2".into()),
            server: None,
        }
    }

    #[tokio::test]
    async fn connect_subscribes_and_requests_sync_once() {
        let mut h = spawn_translator();
        h.transport_tx.send(connected()).await.unwrap();
        h.transport_tx.send(connected()).await.unwrap();

        assert_eq!(h.update_rx.recv().await, Some(PresenceUpdate::Connected));
        assert_eq!(h.update_rx.recv().await, Some(PresenceUpdate::Connected));
        assert_eq!(h.state.read().await.status, ConnectionStatus::Connected);

        assert_eq!(
            h.command_rx.recv().await,
            Some(TransportCommand::Subscribe {
                id: h.subscription.clone(),
                destination: "/sub/meetings/m1/presence".into(),
            })
        );
        let Some(TransportCommand::Send { destination, body }) = h.command_rx.recv().await else {
            panic!("expected sync request");
        };
        assert_eq!(destination, "/pub/meetings/m1/presence/sync");
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body,
            json!({"meetingId": "m1", "userId": "u1", "sessionKey": "key"})
        );
        assert!(h.command_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_update_roster_and_notify() {
        let mut h = spawn_translator();
        let topic = "/sub/meetings/m1/presence";

        h.transport_tx
            .send(message(topic, json!({"type": "JOIN", "userId": 1, "name": "A"})))
            .await
            .unwrap();
        let Some(PresenceUpdate::RosterChanged(list)) = h.update_rx.recv().await else {
            panic!("expected roster update");
        };
        assert_eq!(list.len(), 1);

        h.transport_tx
            .send(message(topic, json!({"type": "LEAVE", "userId": 1})))
            .await
            .unwrap();
        assert_eq!(
            h.update_rx.recv().await,
            Some(PresenceUpdate::RosterChanged(vec![]))
        );
    }

    #[tokio::test]
    async fn malformed_and_foreign_messages_are_dropped() {
        let mut h = spawn_translator();
        let topic = "/sub/meetings/m1/presence";

        h.transport_tx
            .send(message(topic, json!({"type": "JOIN", "userId": 1})))
            .await
            .unwrap();
        h.update_rx.recv().await.unwrap();

        h.transport_tx
            .send(TransportEvent::Message {
                destination: topic.into(),
                subscription: None,
                body: "{not json".into(),
            })
            .await
            .unwrap();
        h.transport_tx
            .send(message(
                "/sub/meetings/m2/presence",
                json!({"type": "SYNC", "participants": []}),
            ))
            .await
            .unwrap();
        h.transport_tx
            .send(message(topic, json!({"type": "JOIN", "userId": 2})))
            .await
            .unwrap();

        let Some(PresenceUpdate::RosterChanged(list)) = h.update_rx.recv().await else {
            panic!("expected roster update");
        };
        let ids: Vec<&str> = list.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[tokio::test]
    async fn retired_generation_changes_nothing() {
        let mut h = spawn_translator();
        h.liveness.invalidate();

        h.transport_tx.send(connected()).await.unwrap();
        h.transport_tx
            .send(message(
                "/sub/meetings/m1/presence",
                json!({"type": "JOIN", "userId": 1}),
            ))
            .await
            .unwrap();
        h.transport_tx.send(TransportEvent::Disconnected).await.unwrap();
        drop(h.transport_tx);

        assert_eq!(h.update_rx.recv().await, None);
        let state = h.state.read().await;
        assert!(state.roster.is_empty());
        assert_eq!(state.status, ConnectionStatus::Idle);
        assert!(h.command_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn undrained_updates_do_not_stall_roster() {
        let mut h = spawn_translator();
        let topic = "/sub/meetings/m1/presence";

        // The update channel holds 16; nobody reads it here.
        for id in 0..40 {
            h.transport_tx
                .send(message(topic, json!({"type": "JOIN", "userId": id})))
                .await
                .unwrap();
        }
        h.transport_tx
            .send(message(topic, json!({"type": "LEAVE", "userId": 0})))
            .await
            .unwrap();
        drop(h.transport_tx);

        let mut received = 0;
        while h.update_rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 16);

        let state = h.state.read().await;
        assert_eq!(state.roster.len(), 39);
        assert!(!state.roster.contains(&crate::protocol::ParticipantId::from("0")));
    }

    #[tokio::test]
    async fn teardown_during_connect_skips_sync_request() {
        let (transport_tx, transport_rx) = mpsc::channel(4);
        // Capacity one and pre-filled, so the subscribe parks.
        let (command_tx, mut command_rx) = mpsc::channel(1);
        command_tx.try_send(TransportCommand::Disconnect).unwrap();
        let (update_tx, _update_rx) = mpsc::channel(4);
        let state = Arc::new(RwLock::new(SessionState::default()));
        let liveness = Liveness::new();

        let ctx = TranslatorContext {
            identity: MeetingIdentity {
                meeting_id: "m1".into(),
                user_id: "u1".into(),
                session_key: "key".into(),
            },
            subscription: SubscriptionId::new(),
            client: StompClient::from_sender(command_tx),
            state: Arc::clone(&state),
            generation: liveness.begin(),
            update_tx,
        };
        tokio::spawn(event_translator(transport_rx, ctx));

        transport_tx.send(connected()).await.unwrap();
        while state.read().await.status != ConnectionStatus::Connected {
            tokio::task::yield_now().await;
        }
        liveness.invalidate();
        drop(transport_tx);

        let mut commands = Vec::new();
        while let Some(command) = command_rx.recv().await {
            commands.push(command);
        }
        assert!(commands
            .iter()
            .all(|c| !matches!(c, TransportCommand::Send { .. })));
    }

    #[tokio::test]
    async fn transport_drop_closes_but_keeps_roster() {
        let mut h = spawn_translator();
        h.transport_tx.send(connected()).await.unwrap();
        h.update_rx.recv().await.unwrap();
        h.transport_tx
            .send(message(
                "/sub/meetings/m1/presence",
                json!({"type": "JOIN", "userId": 1}),
            ))
            .await
            .unwrap();
        h.update_rx.recv().await.unwrap();

        h.transport_tx.send(TransportEvent::Disconnected).await.unwrap();
        assert_eq!(h.update_rx.recv().await, Some(PresenceUpdate::Disconnected));

        let state = h.state.read().await;
        assert_eq!(state.status, ConnectionStatus::Closed);
        assert_eq!(state.roster.len(), 1);
    }
}
