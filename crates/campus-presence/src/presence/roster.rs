//! Ordered, `userId`-unique participant list.

use crate::protocol::{Participant, ParticipantId, PresenceEvent};

/// The local view of who is in the meeting.
///
/// Entries keep insertion order; a `SYNC` replaces everything. No two
/// entries share a `userId`. Meeting rosters are small, so lookups scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    entries: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.entries
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.entries.iter().find(|p| p.id() == id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    /// Append a new participant or merge into the existing entry.
    pub fn upsert(&mut self, participant: Participant) -> bool {
        match self.entries.iter_mut().find(|p| p.id() == participant.id()) {
            Some(existing) => existing.merge(participant),
            None => {
                self.entries.push(participant);
                true
            }
        }
    }

    /// Remove by id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        let index = self.entries.iter().position(|p| p.id() == id)?;
        Some(self.entries.remove(index))
    }

    /// Replace the whole roster. Duplicate ids in `participants` collapse
    /// into the first occurrence's position.
    pub fn replace(&mut self, participants: Vec<Participant>) -> bool {
        let mut next = Roster::new();
        for participant in participants {
            next.upsert(participant);
        }
        let changed = next.entries != self.entries;
        self.entries = next.entries;
        changed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fold one presence event into the roster. Returns whether the
    /// roster changed.
    pub fn apply(&mut self, event: PresenceEvent) -> bool {
        match event {
            PresenceEvent::Join(participant) => self.upsert(participant),
            PresenceEvent::Leave { user_id } => self.remove(&user_id).is_some(),
            PresenceEvent::Sync { participants } => self.replace(participants),
        }
    }

    pub fn to_vec(&self) -> Vec<Participant> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn event(value: Value) -> PresenceEvent {
        serde_json::from_value(value).unwrap()
    }

    fn as_json(roster: &Roster) -> Value {
        serde_json::to_value(roster.participants()).unwrap()
    }

    #[test]
    fn join_merge_leave_sync_scenario() {
        let mut roster = Roster::new();

        roster.apply(event(json!({"type": "JOIN", "userId": 1, "name": "A"})));
        assert_eq!(as_json(&roster), json!([{"userId": 1, "name": "A"}]));

        roster.apply(event(json!({"type": "JOIN", "userId": 1, "online": true})));
        assert_eq!(
            as_json(&roster),
            json!([{"userId": 1, "name": "A", "online": true}])
        );

        roster.apply(event(json!({"type": "LEAVE", "userId": 1})));
        assert_eq!(as_json(&roster), json!([]));

        roster.apply(event(
            json!({"type": "SYNC", "participants": [{"userId": 2, "name": "B"}]}),
        ));
        assert_eq!(as_json(&roster), json!([{"userId": 2, "name": "B"}]));
    }

    #[test]
    fn join_is_idempotent() {
        let join = event(json!({"type": "JOIN", "userId": "u1", "name": "A"}));

        let mut once = Roster::new();
        assert!(once.apply(join.clone()));

        let mut twice = once.clone();
        assert!(!twice.apply(join));
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn join_appends_in_arrival_order() {
        let mut roster = Roster::new();
        for id in [3, 1, 2] {
            roster.apply(event(json!({"type": "JOIN", "userId": id})));
        }
        roster.apply(event(json!({"type": "JOIN", "userId": 1, "name": "x"})));
        let ids: Vec<&str> = roster.participants().iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn string_and_numeric_ids_are_one_entry() {
        let mut roster = Roster::new();
        roster.apply(event(json!({"type": "JOIN", "userId": 5, "name": "E"})));
        roster.apply(event(json!({"type": "JOIN", "userId": "5", "online": true})));
        assert_eq!(roster.len(), 1);
        assert!(roster.contains(&ParticipantId::from("5")));
    }

    #[test]
    fn leave_for_unknown_id_is_a_no_op() {
        let mut roster = Roster::new();
        roster.apply(event(json!({"type": "JOIN", "userId": 1, "name": "A"})));
        let before = roster.clone();

        assert!(!roster.apply(event(json!({"type": "LEAVE", "userId": 99}))));
        assert_eq!(roster, before);

        let mut empty = Roster::new();
        assert!(!empty.apply(event(json!({"type": "LEAVE", "userId": 1}))));
        assert!(empty.is_empty());
    }

    #[test]
    fn sync_replaces_any_history() {
        let mut roster = Roster::new();
        roster.apply(event(json!({"type": "JOIN", "userId": "x", "name": "X"})));
        roster.apply(event(json!({"type": "JOIN", "userId": "y"})));
        roster.apply(event(json!({"type": "LEAVE", "userId": "x"})));

        roster.apply(event(json!({
            "type": "SYNC",
            "participants": [{"userId": "a"}, {"userId": "b", "name": "B"}]
        })));
        assert_eq!(
            as_json(&roster),
            json!([{"userId": "a"}, {"userId": "b", "name": "B"}])
        );
    }

    #[test]
    fn sync_with_duplicates_keeps_ids_unique() {
        let mut roster = Roster::new();
        roster.apply(event(json!({
            "type": "SYNC",
            "participants": [
                {"userId": 1, "name": "A"},
                {"userId": 2},
                {"userId": 1, "online": true}
            ]
        })));
        assert_eq!(
            as_json(&roster),
            json!([{"userId": 1, "name": "A", "online": true}, {"userId": 2}])
        );
    }

    #[test]
    fn empty_sync_clears() {
        let mut roster = Roster::new();
        roster.apply(event(json!({"type": "JOIN", "userId": 1})));
        assert!(roster.apply(event(json!({"type": "SYNC", "participants": []}))));
        assert!(roster.is_empty());
        assert!(!roster.apply(event(json!({"type": "SYNC", "participants": []}))));
    }

    #[test]
    fn stale_join_after_sync_lingers() {
        // No sequencing: a late JOIN re-adds someone the SYNC already dropped.
        let mut roster = Roster::new();
        roster.apply(event(json!({"type": "SYNC", "participants": [{"userId": 2}]})));
        roster.apply(event(json!({"type": "JOIN", "userId": 1})));
        assert_eq!(roster.len(), 2);
    }
}
