//! Meeting presence: roster reconciliation on top of the STOMP transport.
//!
//! One activation per `(meetingId, userId, sessionKey)` triple. Events from
//! the broker are applied in delivery order by a per-activation translator
//! task; a generation counter keeps retired activations from touching state.

mod event_translator;
mod liveness;
mod roster;
mod synchronizer;
mod types;

pub use roster::Roster;
pub use synchronizer::PresenceSynchronizer;
pub use types::{
    ActivationHandle, ActivationInputs, ConnectionStatus, MeetingIdentity, PresenceSnapshot,
    PresenceUpdate,
};
