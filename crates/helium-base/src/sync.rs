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

//! This crate's representation of the result of a sync request.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::events::AnySyncRoomEvent;

/// The rooms section of a sync response.
///
/// This type is intended to be applicable regardless of the endpoint used
/// for syncing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SyncResponse {
    /// Updates to rooms.
    #[serde(default)]
    pub rooms: Rooms,
}

/// Updates to rooms in a [`SyncResponse`], keyed by room id.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Rooms {
    /// The rooms that the user has joined.
    #[serde(default)]
    pub join: BTreeMap<String, RoomUpdate>,
    /// The rooms that the user has been invited to.
    #[serde(default)]
    pub invite: BTreeMap<String, RoomUpdate>,
    /// The rooms that the user has left or been banned from.
    #[serde(default)]
    pub leave: BTreeMap<String, RoomUpdate>,
}

/// One room's worth of updates in a sync response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoomUpdate {
    /// The stripped summary the server sends along for the room.
    pub summary: Option<SummaryCounts>,
    /// Updates to the room state.
    pub state: Option<State>,
    /// The timeline of messages and state changes in the room.
    pub timeline: Option<Timeline>,
    /// The number of unread notifications in the room.
    pub unread_notifications: Option<UnreadNotificationsCount>,
}

/// The server-side room summary block: heroes and member counts.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SummaryCounts {
    /// Users that can be used to generate a room name when the room has no
    /// name or canonical alias.
    #[serde(rename = "m.heroes")]
    pub heroes: Option<Vec<String>>,
    /// The number of members with a `join` membership.
    #[serde(rename = "m.joined_member_count", default, deserialize_with = "lenient_count")]
    pub joined_member_count: Option<u64>,
    /// The number of members with an `invite` membership.
    #[serde(rename = "m.invited_member_count", default, deserialize_with = "lenient_count")]
    pub invited_member_count: Option<u64>,
}

/// The number of unread notifications in a room.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UnreadNotificationsCount {
    /// The number of unread notifications with the highlight flag set.
    pub highlight_count: Option<u64>,
    /// The total number of unread notifications.
    pub notification_count: Option<u64>,
}

/// The state events of one room in a sync response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct State {
    /// The state events.
    #[serde(default)]
    pub events: Vec<AnySyncRoomEvent>,
}

/// The timeline events of one room in a sync response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Timeline {
    /// The timeline events.
    #[serde(default)]
    pub events: Vec<AnySyncRoomEvent>,
}

/// Accept only a well-formed unsigned integer, treating anything else the
/// server may have put there as absent instead of failing the whole sync.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}
