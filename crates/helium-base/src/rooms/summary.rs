// Copyright 2025 The Matrix.org Foundation C.I.C.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    events::{AnySyncRoomEvent, MemberEvent, Membership, MessageType},
    store::StateChanges,
    sync::{RoomUpdate, SummaryCounts, UnreadNotificationsCount},
};

/// A denormalized summary of everything needed to show a room in a room
/// list.
///
/// The summary is folded incrementally from the room's portion of each sync
/// response and only hits the store when a fold actually changed a field.
#[derive(Clone, Debug)]
pub struct RoomSummary {
    room_id: String,
    name: Option<String>,
    canonical_alias: Option<String>,
    aliases: Vec<String>,
    heroes: Vec<String>,
    last_message_body: Option<String>,
    unread_count: Option<u64>,
    mention_count: Option<u64>,
    encrypted: bool,
    direct: Option<bool>,
    membership: Option<Membership>,
    invite_count: u64,
    join_count: u64,
    read_marker_event_id: Option<String>,
}

impl RoomSummary {
    /// Create an empty summary for the given room.
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            name: None,
            canonical_alias: None,
            aliases: Vec::new(),
            heroes: Vec::new(),
            last_message_body: None,
            unread_count: None,
            mention_count: None,
            encrypted: false,
            direct: None,
            membership: None,
            invite_count: 0,
            join_count: 0,
            read_marker_event_id: None,
        }
    }

    /// Restore a summary from its stored record.
    pub fn load(record: RoomSummaryRecord) -> Self {
        Self {
            room_id: record.room_id,
            name: record.name,
            canonical_alias: record.canonical_alias,
            aliases: record.aliases,
            heroes: record.heroes,
            last_message_body: record.last_message_body,
            unread_count: record.unread_count,
            mention_count: record.mention_count,
            encrypted: record.encrypted,
            direct: record.direct,
            membership: record.membership,
            invite_count: record.invite_count,
            join_count: record.join_count,
            read_marker_event_id: record.read_marker_event_id,
        }
    }

    /// The unique id of the room.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Calculate the display name of the room.
    ///
    /// Resolves, in order: the explicit room name, the canonical alias, the
    /// first alias, the heroes joined with a comma, and finally the room id,
    /// so the result is never empty.
    pub fn name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(alias) = &self.canonical_alias {
            return alias.clone();
        }
        if let Some(alias) = self.aliases.first() {
            return alias.clone();
        }
        if !self.heroes.is_empty() {
            return self.heroes.join(", ");
        }
        self.room_id.clone()
    }

    /// The body of the last text message seen in the room, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message_body.as_deref()
    }

    /// The number of unread notifications in the room.
    pub fn unread_count(&self) -> Option<u64> {
        self.unread_count
    }

    /// The number of unread notifications that mention the user.
    pub fn mention_count(&self) -> Option<u64> {
        self.mention_count
    }

    /// Whether the room is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Whether the room is a direct message, if known.
    pub fn is_direct(&self) -> Option<bool> {
        self.direct
    }

    /// The user's own membership in the room, if known.
    pub fn membership(&self) -> Option<Membership> {
        self.membership
    }

    /// The number of members invited to the room.
    pub fn invite_count(&self) -> u64 {
        self.invite_count
    }

    /// The number of members that have joined the room.
    pub fn join_count(&self) -> u64 {
        self.join_count
    }

    /// The event id the user's read marker points at, if any.
    pub fn read_marker_event_id(&self) -> Option<&str> {
        self.read_marker_event_id.as_deref()
    }

    /// Flatten the summary into its stored form.
    pub fn record(&self) -> RoomSummaryRecord {
        RoomSummaryRecord {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            canonical_alias: self.canonical_alias.clone(),
            aliases: self.aliases.clone(),
            heroes: self.heroes.clone(),
            last_message_body: self.last_message_body.clone(),
            unread_count: self.unread_count,
            mention_count: self.mention_count,
            encrypted: self.encrypted,
            direct: self.direct,
            membership: self.membership,
            invite_count: self.invite_count,
            join_count: self.join_count,
            read_marker_event_id: self.read_marker_event_id.clone(),
        }
    }

    /// Fold one room's worth of sync updates into the summary.
    ///
    /// `membership` is the syncing user's own membership in the room, as
    /// determined by the section of the sync response the room came in; it
    /// is never derived from the events themselves.
    ///
    /// Returns whether anything changed. If so, the flattened record has
    /// been queued on `changes` for persisting.
    pub fn apply_sync(
        &mut self,
        update: &RoomUpdate,
        membership: Membership,
        changes: &mut StateChanges,
    ) -> bool {
        let changed = self.process_update(update, membership);
        if changed {
            debug!(room_id = %self.room_id, "room summary changed");
            changes.add_room_summary(self.record());
        }
        changed
    }

    fn process_update(&mut self, update: &RoomUpdate, membership: Membership) -> bool {
        let mut changed = false;

        if let Some(summary) = &update.summary {
            self.apply_summary_counts(summary);
            changed = true;
        }

        if self.membership != Some(membership) {
            self.membership = Some(membership);
            changed = true;
        }

        if let Some(counts) = &update.unread_notifications {
            changed = self.apply_unread_counts(counts) || changed;
        }

        // State comes before timeline: state establishes room-level facts
        // that timeline messages may then override.
        if let Some(state) = &update.state {
            for event in &state.events {
                changed = self.handle_event(event) || changed;
            }
        }
        if let Some(timeline) = &update.timeline {
            for event in &timeline.events {
                changed = self.handle_event(event) || changed;
            }
        }

        changed
    }

    /// Apply the server-side summary block.
    ///
    /// Heroes replace wholesale when present. The member counts replace the
    /// locally tracked deltas, but only when the payload carried a
    /// well-formed integer.
    fn apply_summary_counts(&mut self, summary: &SummaryCounts) {
        if let Some(heroes) = &summary.heroes {
            self.heroes = heroes.clone();
        }
        if let Some(count) = summary.joined_member_count {
            self.join_count = count;
        }
        if let Some(count) = summary.invited_member_count {
            self.invite_count = count;
        }
    }

    fn apply_unread_counts(&mut self, counts: &UnreadNotificationsCount) -> bool {
        let mut changed = false;
        if counts.notification_count.is_some() && counts.notification_count != self.unread_count {
            self.unread_count = counts.notification_count;
            changed = true;
        }
        if counts.highlight_count.is_some() && counts.highlight_count != self.mention_count {
            self.mention_count = counts.highlight_count;
            changed = true;
        }
        changed
    }

    /// Handle a single event, updating the summary in place.
    ///
    /// Returns true if the event modified the summary, false otherwise.
    fn handle_event(&mut self, event: &AnySyncRoomEvent) -> bool {
        match event {
            AnySyncRoomEvent::RoomEncryption(_) => {
                // Enabling encryption cannot be undone.
                if !self.encrypted {
                    self.encrypted = true;
                    return true;
                }
                false
            }
            AnySyncRoomEvent::RoomName(event) => {
                if event.content.name != self.name {
                    self.name = event.content.name.clone();
                    return true;
                }
                false
            }
            AnySyncRoomEvent::RoomMember(event) => self.handle_member_event(event),
            AnySyncRoomEvent::RoomMessage(event) => {
                if event.content.msgtype == MessageType::Text {
                    self.last_message_body = event.content.body.clone();
                    return true;
                }
                false
            }
            AnySyncRoomEvent::RoomCanonicalAlias(event) => {
                self.canonical_alias = event.content.alias.clone();
                true
            }
            AnySyncRoomEvent::RoomAliases(event) => {
                self.aliases = event.content.aliases.clone().unwrap_or_default();
                true
            }
            AnySyncRoomEvent::Other => false,
        }
    }

    /// Track the member counts through a membership transition.
    ///
    /// Only deltas are tracked here, not a member set, so a replayed
    /// membership event can get the counts out of sync. The summary block
    /// sent by the server overwrites the counts wholesale and acts as the
    /// reconciliation point.
    fn handle_member_event(&mut self, event: &MemberEvent) -> bool {
        let Some(content) = &event.content else {
            return false;
        };
        let membership = content.membership;
        let prev_membership = event.prev_content.as_ref().and_then(|c| c.membership);

        if membership == prev_membership {
            return false;
        }

        trace!(
            state_key = event.state_key.as_deref(),
            ?prev_membership,
            ?membership,
            "membership transition"
        );

        match prev_membership {
            Some(Membership::Invite) => {
                self.invite_count = self.invite_count.saturating_sub(1);
            }
            Some(Membership::Join) => {
                self.join_count = self.join_count.saturating_sub(1);
            }
            _ => {}
        }
        match membership {
            Some(Membership::Invite) => self.invite_count += 1,
            Some(Membership::Join) => self.join_count += 1,
            _ => {}
        }

        true
    }
}

/// The flattened, storable form of a [`RoomSummary`], keyed by room id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryRecord {
    /// The unique id of the room.
    pub room_id: String,
    /// The explicit name of the room, if any.
    pub name: Option<String>,
    /// The canonical alias of the room, if any.
    pub canonical_alias: Option<String>,
    /// The aliases the room has been given.
    pub aliases: Vec<String>,
    /// The users to generate a fallback room name from.
    pub heroes: Vec<String>,
    /// The body of the last text message in the room, if any.
    pub last_message_body: Option<String>,
    /// The number of unread notifications.
    pub unread_count: Option<u64>,
    /// The number of unread notifications mentioning the user.
    pub mention_count: Option<u64>,
    /// Whether the room is encrypted.
    pub encrypted: bool,
    /// Whether the room is a direct message, if known.
    pub direct: Option<bool>,
    /// The user's own membership in the room, if known.
    pub membership: Option<Membership>,
    /// The number of invited members.
    pub invite_count: u64,
    /// The number of joined members.
    pub join_count: u64,
    /// The event id the user's read marker points at, if any.
    pub read_marker_event_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::RoomSummary;
    use crate::{events::Membership, store::StateChanges, sync::RoomUpdate};

    const ROOM_ID: &str = "!room:example.org";

    fn update(value: serde_json::Value) -> RoomUpdate {
        serde_json::from_value(value).unwrap()
    }

    fn apply(summary: &mut RoomSummary, value: serde_json::Value) -> (bool, StateChanges) {
        let mut changes = StateChanges::default();
        let changed = summary.apply_sync(&update(value), Membership::Join, &mut changes);
        (changed, changes)
    }

    #[test]
    fn name_resolution_priority() {
        let mut summary = RoomSummary::new(ROOM_ID);
        assert_eq!(summary.name(), ROOM_ID);

        let (changed, _) = apply(
            &mut summary,
            json!({
                "summary": { "m.heroes": ["alice", "bob"] },
            }),
        );
        assert!(changed);
        assert_eq!(summary.name(), "alice, bob");

        apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.aliases", "content": { "aliases": ["#ops:example.org"] } },
                ] },
            }),
        );
        assert_eq!(summary.name(), "#ops:example.org");

        apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.canonical_alias", "content": { "alias": "#main:example.org" } },
                ] },
            }),
        );
        assert_eq!(summary.name(), "#main:example.org");

        apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Ops" } },
                ] },
            }),
        );
        assert_eq!(summary.name(), "Ops");
    }

    #[test]
    fn state_is_folded_before_timeline() {
        let mut summary = RoomSummary::new(ROOM_ID);
        let (changed, changes) = apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Foo" } },
                ] },
                "timeline": { "events": [
                    { "type": "m.room.message", "content": { "msgtype": "m.text", "body": "hi" } },
                ] },
            }),
        );

        assert!(changed);
        assert_eq!(summary.name(), "Foo");
        assert_eq!(summary.last_message(), Some("hi"));

        // The record was queued for persisting exactly once.
        assert_eq!(changes.room_summaries.len(), 1);
        let record = &changes.room_summaries[ROOM_ID];
        assert_eq!(record.name.as_deref(), Some("Foo"));
        assert_eq!(record.last_message_body.as_deref(), Some("hi"));
    }

    #[test]
    fn unchanged_fold_does_not_persist() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Foo" } },
                ] },
            }),
        );

        // Same name again, same membership: nothing to do.
        let (changed, changes) = apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Foo" } },
                ] },
            }),
        );
        assert!(!changed);
        assert!(changes.is_empty());
    }

    #[test]
    fn name_event_can_clear_the_name() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Foo" } },
                ] },
            }),
        );

        let (changed, _) = apply(
            &mut summary,
            json!({
                "state": { "events": [
                    { "type": "m.room.name", "content": {} },
                ] },
            }),
        );
        assert!(changed);
        assert_eq!(summary.name(), ROOM_ID);
    }

    #[test]
    fn non_text_messages_are_ignored() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    { "type": "m.room.message", "content": { "msgtype": "m.text", "body": "hi" } },
                ] },
            }),
        );

        let (changed, _) = apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    { "type": "m.room.message", "content": { "msgtype": "m.image", "body": "cat.png" } },
                ] },
            }),
        );
        assert!(!changed);
        assert_eq!(summary.last_message(), Some("hi"));
    }

    #[test]
    fn encryption_is_idempotent() {
        let mut summary = RoomSummary::new(ROOM_ID);
        let encryption_event = json!({
            "state": { "events": [
                { "type": "m.room.encryption", "content": { "algorithm": "m.megolm.v1.aes-sha2" } },
            ] },
        });

        let (changed, _) = apply(&mut summary, encryption_event.clone());
        assert!(changed);
        assert!(summary.is_encrypted());

        let (changed, _) = apply(&mut summary, encryption_event);
        assert!(!changed);
    }

    #[test]
    fn membership_transition_moves_the_counts() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "summary": { "m.joined_member_count": 2, "m.invited_member_count": 1 },
            }),
        );

        let (changed, _) = apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    {
                        "type": "m.room.member",
                        "content": { "membership": "join" },
                        "prev_content": { "membership": "invite" },
                        "state_key": "@carol:example.org",
                    },
                ] },
            }),
        );
        assert!(changed);
        assert_eq!(summary.invite_count(), 0);
        assert_eq!(summary.join_count(), 3);
    }

    #[test]
    fn membership_counts_only_move_for_invite_and_join() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "summary": { "m.joined_member_count": 2 },
            }),
        );

        // leave -> ban is a change, but neither state is counted.
        let (changed, _) = apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    {
                        "type": "m.room.member",
                        "content": { "membership": "ban" },
                        "prev_content": { "membership": "leave" },
                        "state_key": "@mallory:example.org",
                    },
                ] },
            }),
        );
        assert!(changed);
        assert_eq!(summary.join_count(), 2);
        assert_eq!(summary.invite_count(), 0);
    }

    #[test]
    fn replayed_membership_event_is_a_noop() {
        let mut summary = RoomSummary::new(ROOM_ID);
        let (changed, _) = apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    {
                        "type": "m.room.member",
                        "content": { "membership": "join" },
                        "prev_content": { "membership": "join" },
                        "state_key": "@alice:example.org",
                    },
                ] },
            }),
        );
        // Own membership was recorded, but the member event itself changed
        // nothing.
        assert!(changed);
        assert_eq!(summary.join_count(), 0);

        let (changed, _) = apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    {
                        "type": "m.room.member",
                        "content": { "membership": "join" },
                        "prev_content": { "membership": "join" },
                        "state_key": "@alice:example.org",
                    },
                ] },
            }),
        );
        assert!(!changed);
    }

    #[test]
    fn summary_block_always_marks_the_fold_changed() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(&mut summary, json!({}));

        let (changed, _) = apply(&mut summary, json!({ "summary": {} }));
        assert!(changed);
    }

    #[test]
    fn summary_counts_overwrite_the_tracked_deltas() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "timeline": { "events": [
                    {
                        "type": "m.room.member",
                        "content": { "membership": "join" },
                        "state_key": "@alice:example.org",
                    },
                ] },
            }),
        );
        assert_eq!(summary.join_count(), 1);

        apply(
            &mut summary,
            json!({
                "summary": { "m.joined_member_count": 5, "m.invited_member_count": 2 },
            }),
        );
        assert_eq!(summary.join_count(), 5);
        assert_eq!(summary.invite_count(), 2);
    }

    #[test]
    fn unread_counts_replace_only_on_difference() {
        let mut summary = RoomSummary::new(ROOM_ID);
        let (changed, _) = apply(
            &mut summary,
            json!({
                "unread_notifications": { "notification_count": 3, "highlight_count": 1 },
            }),
        );
        assert!(changed);
        assert_eq!(summary.unread_count(), Some(3));
        assert_eq!(summary.mention_count(), Some(1));

        let (changed, _) = apply(
            &mut summary,
            json!({
                "unread_notifications": { "notification_count": 3, "highlight_count": 1 },
            }),
        );
        assert!(!changed);
    }

    #[test]
    fn own_membership_comes_from_the_caller() {
        let mut summary = RoomSummary::new(ROOM_ID);
        let mut changes = StateChanges::default();

        let changed =
            summary.apply_sync(&update(json!({})), Membership::Invite, &mut changes);
        assert!(changed);
        assert_eq!(summary.membership(), Some(Membership::Invite));

        let changed =
            summary.apply_sync(&update(json!({})), Membership::Invite, &mut changes);
        assert!(!changed);
    }

    #[test]
    fn record_round_trip() {
        let mut summary = RoomSummary::new(ROOM_ID);
        apply(
            &mut summary,
            json!({
                "summary": { "m.heroes": ["alice"], "m.joined_member_count": 2 },
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Foo" } },
                    { "type": "m.room.encryption", "content": { "algorithm": "m.megolm.v1.aes-sha2" } },
                ] },
                "timeline": { "events": [
                    { "type": "m.room.message", "content": { "msgtype": "m.text", "body": "hi" } },
                ] },
            }),
        );

        let restored = RoomSummary::load(summary.record());
        assert_eq!(restored.record(), summary.record());
        assert_eq!(restored.name(), "Foo");
        assert_eq!(restored.last_message(), Some("hi"));
        assert!(restored.is_encrypted());
        assert_eq!(restored.join_count(), 2);
        assert_eq!(restored.membership(), Some(Membership::Join));
    }
}
