//! Activation inputs, connection status and the updates handed to the owner.

use std::fmt;

use serde::Serialize;

use crate::protocol::{Participant, SyncRequest};

use super::roster::Roster;

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// Everything the owner knows about the current meeting session. Any field
/// may still be missing while the session is being set up.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ActivationInputs {
    pub meeting_id: Option<String>,
    pub user_id: Option<String>,
    pub session_key: Option<String>,
    /// Join authorization. Gates activation only; never sent to the broker.
    pub join_token: Option<String>,
}

impl ActivationInputs {
    pub fn new(
        meeting_id: impl Into<String>,
        user_id: impl Into<String>,
        session_key: impl Into<String>,
        join_token: impl Into<String>,
    ) -> Self {
        Self {
            meeting_id: Some(meeting_id.into()),
            user_id: Some(user_id.into()),
            session_key: Some(session_key.into()),
            join_token: Some(join_token.into()),
        }
    }

    /// The identity triple, or `None` unless all four inputs are present
    /// and non-empty.
    pub fn identity(&self) -> Option<MeetingIdentity> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.trim().is_empty())
        }

        present(&self.join_token)?;
        Some(MeetingIdentity {
            meeting_id: present(&self.meeting_id)?.to_string(),
            user_id: present(&self.user_id)?.to_string(),
            session_key: present(&self.session_key)?.to_string(),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.identity().is_some()
    }
}

impl fmt::Debug for ActivationInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationInputs")
            .field("meeting_id", &self.meeting_id)
            .field("user_id", &self.user_id)
            .field("session_key", &self.session_key.as_ref().map(|_| "[REDACTED]"))
            .field("join_token", &self.join_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The `(meetingId, userId, sessionKey)` triple one activation is bound to.
#[derive(Clone, PartialEq, Eq)]
pub struct MeetingIdentity {
    pub meeting_id: String,
    pub user_id: String,
    pub session_key: String,
}

impl MeetingIdentity {
    pub fn sync_request(&self) -> SyncRequest {
        SyncRequest {
            meeting_id: self.meeting_id.clone(),
            user_id: self.user_id.clone(),
            session_key: self.session_key.clone(),
        }
    }
}

impl fmt::Debug for MeetingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeetingIdentity")
            .field("meeting_id", &self.meeting_id)
            .field("user_id", &self.user_id)
            .field("session_key", &"[REDACTED]")
            .finish()
    }
}

/// Identifies one activation. Stale handles are ignored by
/// [`super::PresenceSynchronizer::deactivate_handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationHandle {
    pub(crate) generation: u64,
}

impl ActivationHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Broker connection lifecycle for the current activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Never activated.
    #[default]
    Idle,
    Connecting,
    Connected,
    /// Torn down, or the broker went away.
    Closed,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// State shared between the synchronizer and its translator task.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub roster: Roster,
    pub status: ConnectionStatus,
}

// ---------------------------------------------------------------------------
// Snapshot & Updates
// ---------------------------------------------------------------------------

/// What a UI reads: the participant list and a connected flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub participants: Vec<Participant>,
    pub presence_connected: bool,
}

/// Notifications pushed to the owner of a [`super::PresenceSynchronizer`].
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceUpdate {
    Connected,
    Disconnected,
    /// The roster after an event changed it.
    RosterChanged(Vec<Participant>),
    Error(String),
}
