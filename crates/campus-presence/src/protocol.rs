//! Wire payloads for meeting presence.
//!
//! Inbound events arrive on `/sub/meetings/{meetingId}/presence` as JSON
//! tagged by `type`. The single outbound message is the sync request sent
//! to `/pub/meetings/{meetingId}/presence/sync` after every connect.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Destination names.
pub mod topics {
    /// Presence events for one meeting.
    pub fn presence(meeting_id: &str) -> String {
        format!("/sub/meetings/{meeting_id}/presence")
    }

    /// Where the post-connect sync request is published.
    pub fn presence_sync(meeting_id: &str) -> String {
        format!("/pub/meetings/{meeting_id}/presence/sync")
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// Roster key. The broker may send `userId` as a string or a number; both
/// map to the same textual id so `1` and `"1"` name the same participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| D::Error::custom("userId must be a string or a number"))
    }
}

/// One roster entry: a `userId` plus whatever open-ended fields presence
/// events carried for it. Serializes back to the same flat JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    id: ParticipantId,
    fields: Map<String, Value>,
}

impl Participant {
    /// Build from a JSON object. Fails when `userId` is missing or is not a
    /// string or number.
    pub fn from_map(fields: Map<String, Value>) -> Option<Self> {
        let id = fields.get("userId").and_then(ParticipantId::from_value)?;
        Some(Self { id, fields })
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields, `userId` included, in first-seen order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Overlay `other`'s fields onto this entry. Fields `other` lacks are
    /// kept. Returns whether anything changed.
    pub fn merge(&mut self, other: Participant) -> bool {
        let mut changed = false;
        for (key, value) in other.fields {
            if self.fields.get(&key) != Some(&value) {
                self.fields.insert(key, value);
                changed = true;
            }
        }
        changed
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl Serialize for Participant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Participant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_map(fields)
            .ok_or_else(|| D::Error::custom("participant needs a string or numeric userId"))
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An inbound presence event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum PresenceEvent {
    /// Someone joined or updated their fields.
    Join(Participant),
    /// Someone left.
    Leave {
        #[serde(rename = "userId")]
        user_id: ParticipantId,
    },
    /// Authoritative full roster.
    Sync { participants: Vec<Participant> },
}

impl PresenceEvent {
    /// Parse a message body. Any failure means the event is dropped.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PresenceEvent::Join(_) => "JOIN",
            PresenceEvent::Leave { .. } => "LEAVE",
            PresenceEvent::Sync { .. } => "SYNC",
        }
    }
}

// ---------------------------------------------------------------------------
// Sync request
// ---------------------------------------------------------------------------

/// Body of the post-connect sync request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub meeting_id: String,
    pub user_id: String,
    pub session_key: String,
}

impl fmt::Debug for SyncRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRequest")
            .field("meeting_id", &self.meeting_id)
            .field("user_id", &self.user_id)
            .field("session_key", &"[REDACTED]")
            .finish()
    }
}

impl SyncRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
