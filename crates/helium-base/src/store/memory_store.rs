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

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use super::{Result, StateChanges, StateStore};
use crate::rooms::RoomSummaryRecord;

/// In-memory, non-persistent implementation of the [`StateStore`].
///
/// Default if no other is configured at startup.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    room_summaries: Arc<RwLock<HashMap<String, RoomSummaryRecord>>>,
}

impl MemoryStore {
    /// Create a new empty `MemoryStore`.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_changes(&self, changes: &StateChanges) -> Result<()> {
        let mut summaries = self.room_summaries.write().expect("poisoned lock");
        for (room_id, record) in &changes.room_summaries {
            summaries.insert(room_id.clone(), record.clone());
        }
        Ok(())
    }

    async fn get_room_summary(&self, room_id: &str) -> Result<Option<RoomSummaryRecord>> {
        Ok(self.room_summaries.read().expect("poisoned lock").get(room_id).cloned())
    }
}
