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

//! The subset of room events that room summaries are folded from.
//!
//! Events arrive in the `state` and `timeline` sections of a sync response
//! as `{ type, content, prev_content?, state_key? }` objects. The `type`
//! field selects the variant; event types that carry no summary-relevant
//! data all map to [`AnySyncRoomEvent::Other`].

use serde::{Deserialize, Serialize};

/// The membership state of a user in a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// The user has been banned from the room.
    Ban,
    /// The user has been invited to the room.
    Invite,
    /// The user is part of the room.
    Join,
    /// The user has knocked on the room.
    Knock,
    /// The user has left the room.
    Leave,
}

/// Any room event a summary can be folded from.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum AnySyncRoomEvent {
    /// `m.room.encryption`
    #[serde(rename = "m.room.encryption")]
    RoomEncryption(EncryptionEvent),
    /// `m.room.name`
    #[serde(rename = "m.room.name")]
    RoomName(NameEvent),
    /// `m.room.member`
    #[serde(rename = "m.room.member")]
    RoomMember(MemberEvent),
    /// `m.room.message`
    #[serde(rename = "m.room.message")]
    RoomMessage(MessageEvent),
    /// `m.room.canonical_alias`
    #[serde(rename = "m.room.canonical_alias")]
    RoomCanonicalAlias(CanonicalAliasEvent),
    /// `m.room.aliases`
    #[serde(rename = "m.room.aliases")]
    RoomAliases(AliasesEvent),
    /// Any other event type.
    #[serde(other)]
    Other,
}

/// An `m.room.encryption` state event.
#[derive(Clone, Debug, Deserialize)]
pub struct EncryptionEvent {
    /// The event content.
    #[serde(default)]
    pub content: EncryptionEventContent,
    /// The state key, an empty string for this event type.
    #[serde(default)]
    pub state_key: Option<String>,
}

/// The content of an `m.room.encryption` event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EncryptionEventContent {
    /// The encryption algorithm used in the room.
    pub algorithm: Option<String>,
}

/// An `m.room.name` state event.
#[derive(Clone, Debug, Deserialize)]
pub struct NameEvent {
    /// The event content.
    ///
    /// A missing or empty content clears the room name.
    #[serde(default)]
    pub content: NameEventContent,
    /// The state key, an empty string for this event type.
    #[serde(default)]
    pub state_key: Option<String>,
}

/// The content of an `m.room.name` event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NameEventContent {
    /// The name of the room.
    pub name: Option<String>,
}

/// An `m.room.member` state event.
#[derive(Clone, Debug, Deserialize)]
pub struct MemberEvent {
    /// The event content.
    #[serde(default)]
    pub content: Option<MemberEventContent>,
    /// The content of the previous membership event for the same user, as
    /// attached by the protocol layer.
    #[serde(default)]
    pub prev_content: Option<MemberEventContent>,
    /// The user id this membership event applies to.
    #[serde(default)]
    pub state_key: Option<String>,
}

/// The content of an `m.room.member` event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MemberEventContent {
    /// The membership state of the user.
    pub membership: Option<Membership>,
}

/// An `m.room.message` timeline event.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageEvent {
    /// The event content.
    #[serde(default)]
    pub content: MessageEventContent,
}

/// The content of an `m.room.message` event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageEventContent {
    /// The type of the message.
    #[serde(default)]
    pub msgtype: MessageType,
    /// The textual body of the message.
    pub body: Option<String>,
}

/// The `msgtype` of an `m.room.message` event.
///
/// Only plain text messages feed the room summary; every other message type
/// is carried but ignored there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MessageType {
    /// `m.text`
    Text,
    /// Any other message type.
    #[default]
    Other,
}

impl From<String> for MessageType {
    fn from(msgtype: String) -> Self {
        match msgtype.as_str() {
            "m.text" => Self::Text,
            _ => Self::Other,
        }
    }
}

/// An `m.room.canonical_alias` state event.
#[derive(Clone, Debug, Deserialize)]
pub struct CanonicalAliasEvent {
    /// The event content.
    #[serde(default)]
    pub content: CanonicalAliasEventContent,
    /// The state key, an empty string for this event type.
    #[serde(default)]
    pub state_key: Option<String>,
}

/// The content of an `m.room.canonical_alias` event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CanonicalAliasEventContent {
    /// The canonical alias of the room.
    pub alias: Option<String>,
}

/// An `m.room.aliases` state event.
#[derive(Clone, Debug, Deserialize)]
pub struct AliasesEvent {
    /// The event content.
    #[serde(default)]
    pub content: AliasesEventContent,
    /// The server whose aliases these are.
    #[serde(default)]
    pub state_key: Option<String>,
}

/// The content of an `m.room.aliases` event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AliasesEventContent {
    /// The aliases the room has been given.
    pub aliases: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use assert_matches2::assert_let;
    use serde_json::json;

    use super::{AnySyncRoomEvent, Membership, MessageType};

    #[test]
    fn event_type_selects_the_variant() {
        let event: AnySyncRoomEvent = serde_json::from_value(json!({
            "type": "m.room.name",
            "content": { "name": "Ops" },
            "state_key": "",
        }))
        .unwrap();

        assert_let!(AnySyncRoomEvent::RoomName(event) = event);
        assert_eq!(event.content.name.as_deref(), Some("Ops"));
    }

    #[test]
    fn unknown_event_types_deserialize_to_other() {
        let event: AnySyncRoomEvent = serde_json::from_value(json!({
            "type": "m.room.topic",
            "content": { "topic": "weekly sync" },
        }))
        .unwrap();

        assert_let!(AnySyncRoomEvent::Other = event);
    }

    #[test]
    fn member_event_carries_previous_content() {
        let event: AnySyncRoomEvent = serde_json::from_value(json!({
            "type": "m.room.member",
            "content": { "membership": "join" },
            "prev_content": { "membership": "invite" },
            "state_key": "@alice:example.org",
        }))
        .unwrap();

        assert_let!(AnySyncRoomEvent::RoomMember(event) = event);
        assert_eq!(event.content.unwrap().membership, Some(Membership::Join));
        assert_eq!(event.prev_content.unwrap().membership, Some(Membership::Invite));
    }

    #[test]
    fn non_text_msgtypes_are_carried_as_other() {
        let event: AnySyncRoomEvent = serde_json::from_value(json!({
            "type": "m.room.message",
            "content": { "msgtype": "m.image", "body": "cat.png" },
        }))
        .unwrap();

        assert_let!(AnySyncRoomEvent::RoomMessage(event) = event);
        assert_eq!(event.content.msgtype, MessageType::Other);
    }
}
