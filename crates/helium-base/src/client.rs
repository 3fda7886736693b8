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

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    error::Result,
    events::Membership,
    rooms::RoomSummary,
    store::{MemoryStore, StateChanges, StateStore},
    sync::SyncResponse,
};

/// A no-network client that folds sync responses into per-room summaries
/// and keeps the configured state store up to date.
///
/// A transport layer drives it by deserializing sync responses and passing
/// them to [`receive_sync_response`](Self::receive_sync_response).
#[derive(Debug)]
pub struct BaseClient {
    /// Database.
    store: Arc<dyn StateStore>,
    /// The summaries of all rooms seen so far, keyed by room id.
    rooms: HashMap<String, RoomSummary>,
}

impl BaseClient {
    /// Create a new client backed by an in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create a new client backed by the given store.
    pub fn with_store(store: Arc<dyn StateStore>) -> Self {
        Self { store, rooms: HashMap::new() }
    }

    /// Look up the summary of a room the client has seen.
    pub fn get_room(&self, room_id: &str) -> Option<&RoomSummary> {
        self.rooms.get(room_id)
    }

    /// The summaries of all rooms seen so far.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomSummary> {
        self.rooms.values()
    }

    /// Receive a response from a sync call, folding every room in it.
    ///
    /// The section a room appears in (join, invite or leave) determines the
    /// user's own membership handed to the fold. Summaries that changed are
    /// saved to the store in a single batch; the ids of the changed rooms
    /// are returned.
    #[instrument(skip_all)]
    pub async fn receive_sync_response(
        &mut self,
        response: &SyncResponse,
    ) -> Result<Vec<String>> {
        let mut changes = StateChanges::default();
        let mut changed_rooms = Vec::new();

        let sections = [
            (Membership::Join, &response.rooms.join),
            (Membership::Invite, &response.rooms.invite),
            (Membership::Leave, &response.rooms.leave),
        ];
        for (membership, rooms) in sections {
            for (room_id, update) in rooms {
                let summary = self.room_mut(room_id).await?;
                if summary.apply_sync(update, membership, &mut changes) {
                    changed_rooms.push(room_id.clone());
                }
            }
        }

        if !changes.is_empty() {
            self.store.save_changes(&changes).await?;
        }
        debug!(changed = changed_rooms.len(), "received a sync response");

        Ok(changed_rooms)
    }

    /// Get the live summary for a room, restoring it from the store the
    /// first time the room is seen.
    async fn room_mut(&mut self, room_id: &str) -> Result<&mut RoomSummary> {
        if !self.rooms.contains_key(room_id) {
            let summary = match self.store.get_room_summary(room_id).await? {
                Some(record) => RoomSummary::load(record),
                None => RoomSummary::new(room_id),
            };
            self.rooms.insert(room_id.to_owned(), summary);
        }

        Ok(self
            .rooms
            .get_mut(room_id)
            .expect("the room summary was just inserted"))
    }
}

impl Default for BaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::BaseClient;
    use crate::{
        rooms::RoomSummaryRecord,
        store::{MemoryStore, Result as StoreResult, StateChanges, StateStore},
        sync::SyncResponse,
        Membership,
    };

    const ROOM_ID: &str = "!room:example.org";

    /// Counts `save_changes` calls on top of a [`MemoryStore`].
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryStore,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl StateStore for CountingStore {
        async fn save_changes(&self, changes: &StateChanges) -> StoreResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save_changes(changes).await
        }

        async fn get_room_summary(&self, room_id: &str) -> StoreResult<Option<RoomSummaryRecord>> {
            self.inner.get_room_summary(room_id).await
        }
    }

    fn sync_response(value: serde_json::Value) -> SyncResponse {
        serde_json::from_value(value).unwrap()
    }

    fn named_room_sync() -> SyncResponse {
        sync_response(json!({
            "rooms": { "join": { ROOM_ID: {
                "state": { "events": [
                    { "type": "m.room.name", "content": { "name": "Foo" } },
                ] },
            } } },
        }))
    }

    #[tokio::test]
    async fn sync_creates_and_persists_a_summary() {
        let store = Arc::new(CountingStore::default());
        let mut client = BaseClient::with_store(store.clone());

        let changed = client.receive_sync_response(&named_room_sync()).await.unwrap();
        assert_eq!(changed, [ROOM_ID.to_owned()]);

        let summary = client.get_room(ROOM_ID).unwrap();
        assert_eq!(summary.name(), "Foo");
        assert_eq!(summary.membership(), Some(Membership::Join));

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        let record = store.get_room_summary(ROOM_ID).await.unwrap().unwrap();
        assert_eq!(record.name.as_deref(), Some("Foo"));
    }

    #[tokio::test]
    async fn unchanged_sync_does_not_hit_the_store() {
        let store = Arc::new(CountingStore::default());
        let mut client = BaseClient::with_store(store.clone());

        client.receive_sync_response(&named_room_sync()).await.unwrap();
        let changed = client.receive_sync_response(&named_room_sync()).await.unwrap();

        assert!(changed.is_empty());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn summaries_are_restored_from_the_store() {
        let store = Arc::new(CountingStore::default());
        let mut client = BaseClient::with_store(store.clone());
        client.receive_sync_response(&named_room_sync()).await.unwrap();

        // A fresh client over the same store picks the summary back up.
        let mut client = BaseClient::with_store(store);
        let changed = client
            .receive_sync_response(&sync_response(json!({
                "rooms": { "join": { ROOM_ID: {} } },
            })))
            .await
            .unwrap();

        assert!(changed.is_empty());
        assert_eq!(client.get_room(ROOM_ID).unwrap().name(), "Foo");
    }

    #[tokio::test]
    async fn invited_rooms_fold_with_invite_membership() {
        let mut client = BaseClient::new();
        let changed = client
            .receive_sync_response(&sync_response(json!({
                "rooms": { "invite": { ROOM_ID: {} } },
            })))
            .await
            .unwrap();

        assert_eq!(changed, [ROOM_ID.to_owned()]);
        assert_eq!(client.get_room(ROOM_ID).unwrap().membership(), Some(Membership::Invite));
    }
}
