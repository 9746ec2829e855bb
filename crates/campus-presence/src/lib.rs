//! Live meeting presence over a STOMP message broker.
//!
//! [`PresenceSynchronizer`] owns one broker connection per meeting
//! activation and folds JOIN / LEAVE / SYNC events into an ordered
//! [`Roster`]. The wire transport lives in [`stomp`].

pub mod endpoint;
pub mod presence;
pub mod protocol;
pub mod stomp;

pub use presence::{
    ActivationHandle, ActivationInputs, ConnectionStatus, MeetingIdentity, PresenceSnapshot,
    PresenceSynchronizer, PresenceUpdate, Roster,
};
pub use protocol::{Participant, ParticipantId, PresenceEvent, SyncRequest};
