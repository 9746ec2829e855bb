//! Minimal STOMP 1.2 client over a WebSocket.
//!
//! One background task per connection: performs the `CONNECT` handshake,
//! keeps heart-beats flowing, forwards subscribe / send / disconnect
//! commands and reports inbound frames as [`TransportEvent`]s. The task
//! never reconnects on its own; the owner decides what a dropped
//! connection means.

mod client;
mod connection;
mod frame;
mod handler;
mod types;

pub use client::StompClient;
pub use frame::{decode_frames, Command, Frame, FrameError, HeartBeat};
pub use types::{StompConfig, TransportEvent};

pub(crate) use types::TransportCommand;
