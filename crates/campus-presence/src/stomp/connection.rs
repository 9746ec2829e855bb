//! Background WebSocket connection task.

use std::sync::Arc;
use std::time::Duration;

use campus_common::{new_receipt_id, PresenceError};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, info, warn};

use super::frame::{decode_frames, Command, Frame, HeartBeat};
use super::handler::{handle_frame, FrameOutcome};
use super::types::{StompConfig, TransportCommand, TransportEvent};
use crate::endpoint::{host_header, websocket_url};

/// How long we wait for the broker to acknowledge our close.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// A broker that promised heart-beats is considered gone after this many
/// silent periods.
const MISSED_HEARTBEATS: u32 = 3;

// ---------------------------------------------------------------------------
// Connection Task
// ---------------------------------------------------------------------------

/// Runs one STOMP session from handshake to close. Never reconnects.
pub(crate) async fn connection_task(
    config: StompConfig,
    event_tx: mpsc::Sender<TransportEvent>,
    command_rx: mpsc::Receiver<TransportCommand>,
) {
    let url = match websocket_url(&config.endpoint) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Cannot connect to presence broker");
            let _ = event_tx.send(TransportEvent::Error(e)).await;
            return;
        }
    };
    info!(url = %url, "Connecting to presence broker");

    let timeout_secs = config.connect_timeout_secs;
    let ws_stream = match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        tokio_tungstenite::connect_async(url.as_str()),
    )
    .await
    {
        Ok(Ok((ws_stream, _))) => ws_stream,
        Ok(Err(e)) => {
            error!(error = %e, "Failed to connect to presence broker");
            let _ = event_tx
                .send(TransportEvent::Error(PresenceError::Transport(e.to_string())))
                .await;
            return;
        }
        Err(_elapsed) => {
            error!("WebSocket connection timed out after {timeout_secs}s");
            let _ = event_tx
                .send(TransportEvent::Error(PresenceError::ConnectTimeout(
                    timeout_secs,
                )))
                .await;
            return;
        }
    };

    let (ws_write, ws_read) = ws_stream.split();
    let ws_write = Arc::new(Mutex::new(ws_write));

    let connect = connect_frame(&config, &url);
    if let Err(e) = write_frame(&ws_write, &connect).await {
        warn!(error = %e, "Failed to send CONNECT frame");
        let _ = event_tx
            .send(TransportEvent::Error(PresenceError::Transport(e.to_string())))
            .await;
        let _ = event_tx.send(TransportEvent::Disconnected).await;
        return;
    }

    let forwarder = tokio::spawn(command_forwarder(command_rx, Arc::clone(&ws_write)));

    read_loop(ws_read, forwarder, &ws_write, &config, &event_tx).await;

    info!("Presence broker connection closed");
    let _ = event_tx.send(TransportEvent::Disconnected).await;
}

fn connect_frame(config: &StompConfig, url: &str) -> Frame {
    let mut frame = Frame::new(Command::Connect).header("accept-version", "1.2,1.1,1.0");
    if let Some(host) = host_header(url) {
        frame = frame.header("host", host);
    }
    frame.header(
        "heart-beat",
        format!(
            "{},{}",
            config.heartbeat_outgoing_ms, config.heartbeat_incoming_ms
        ),
    )
}

/// Process inbound messages until the socket closes, the broker goes
/// silent, or the command side finishes (disconnect requested or every
/// client handle dropped).
async fn read_loop<R, S>(
    mut ws_read: R,
    mut forwarder: JoinHandle<()>,
    ws_write: &Arc<Mutex<S>>,
    config: &StompConfig,
    event_tx: &mpsc::Sender<TransportEvent>,
) where
    R: Stream<Item = Result<WsMessage, WsError>> + Unpin,
    S: Sink<WsMessage> + Unpin + Send + 'static,
{
    let mut heartbeat_handle: Option<JoinHandle<()>> = None;
    let mut idle_limit: Option<Duration> = None;

    loop {
        tokio::select! {
            next = next_message(&mut ws_read, idle_limit) => {
                let Some(msg_result) = next else {
                    warn!("Presence broker went silent, dropping connection");
                    let _ = event_tx
                        .send(TransportEvent::Error(PresenceError::Transport(
                            "broker heart-beat missed".to_string(),
                        )))
                        .await;
                    break;
                };
                let text = match msg_result {
                    Some(Ok(WsMessage::Text(text))) => text.as_str().to_string(),
                    Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!("Non UTF-8 binary message dropped");
                            continue;
                        }
                    },
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Presence broker closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        let _ = event_tx
                            .send(TransportEvent::Error(PresenceError::Transport(e.to_string())))
                            .await;
                        break;
                    }
                    Some(Ok(_)) => continue,
                };

                let frames = match decode_frames(&text) {
                    Ok(frames) => frames,
                    Err(e) => {
                        warn!(error = %e, "Malformed STOMP frame dropped");
                        continue;
                    }
                };
                for frame in frames {
                    if let FrameOutcome::Connected(heartbeat) =
                        handle_frame(frame, config, event_tx).await
                    {
                        if let Some(old) = heartbeat_handle.take() {
                            old.abort();
                        }
                        if !heartbeat.outgoing.is_zero() {
                            heartbeat_handle = Some(tokio::spawn(heartbeat_task(
                                Arc::clone(ws_write),
                                heartbeat.outgoing,
                            )));
                        }
                        idle_limit = idle_limit_for(heartbeat);
                    }
                }
            }
            _ = &mut forwarder => {
                debug!("Command side finished, waiting for close acknowledgement");
                let _ = tokio::time::timeout(CLOSE_GRACE, drain_until_close(&mut ws_read)).await;
                break;
            }
        }
    }

    if let Some(handle) = heartbeat_handle {
        handle.abort();
    }
    forwarder.abort();
}

fn idle_limit_for(heartbeat: HeartBeat) -> Option<Duration> {
    if heartbeat.incoming.is_zero() {
        None
    } else {
        Some(heartbeat.incoming * MISSED_HEARTBEATS)
    }
}

/// `None` when the idle limit elapsed, otherwise the next stream item.
async fn next_message<R>(
    ws_read: &mut R,
    idle_limit: Option<Duration>,
) -> Option<Option<Result<WsMessage, WsError>>>
where
    R: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    match idle_limit {
        Some(limit) => tokio::time::timeout(limit, ws_read.next()).await.ok(),
        None => Some(ws_read.next().await),
    }
}

async fn drain_until_close<R>(ws_read: &mut R)
where
    R: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(Ok(msg)) = ws_read.next().await {
        if msg.is_close() {
            break;
        }
    }
}

async fn write_frame<S>(ws_write: &Arc<Mutex<S>>, frame: &Frame) -> Result<(), S::Error>
where
    S: Sink<WsMessage> + Unpin,
{
    let mut writer = ws_write.lock().await;
    writer.send(WsMessage::Text(frame.encode().into())).await
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, every: Duration)
where
    S: Sink<WsMessage> + Unpin,
{
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        let mut writer = ws_write.lock().await;
        if writer.send(WsMessage::Text(String::from("\n").into())).await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

/// Turn client commands into frames. Returns after `Disconnect`, or when
/// every [`super::StompClient`] handle has been dropped.
async fn command_forwarder<S>(mut command_rx: mpsc::Receiver<TransportCommand>, ws_write: Arc<Mutex<S>>)
where
    S: Sink<WsMessage> + Unpin,
{
    while let Some(cmd) = command_rx.recv().await {
        let frame = match cmd {
            TransportCommand::Subscribe { id, destination } => {
                debug!(destination = %destination, id = %id, "Subscribing");
                Frame::new(Command::Subscribe)
                    .header("id", id.as_str())
                    .header("destination", destination)
                    .header("ack", "auto")
            }
            TransportCommand::Unsubscribe { id } => {
                debug!(id = %id, "Unsubscribing");
                Frame::new(Command::Unsubscribe).header("id", id.as_str())
            }
            TransportCommand::Send { destination, body } => {
                debug!(destination = %destination, "Sending");
                Frame::new(Command::Send)
                    .header("destination", destination)
                    .json_body(body)
            }
            TransportCommand::Disconnect => break,
        };
        if write_frame(&ws_write, &frame).await.is_err() {
            return;
        }
    }

    let disconnect = Frame::new(Command::Disconnect).header("receipt", new_receipt_id());
    let _ = write_frame(&ws_write, &disconnect).await;
    let mut writer = ws_write.lock().await;
    let _ = writer.send(WsMessage::Close(None)).await;
}
