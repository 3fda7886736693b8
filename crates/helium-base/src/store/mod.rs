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

//! The state store abstraction and the collected changes written through
//! it.
//!
//! Folding a sync response produces a [`StateChanges`] batch; the batch is
//! handed to a [`StateStore`] implementation in one go at the end of the
//! sync cycle. How the store makes the batch durable (transactions,
//! rollback) is its own business.

use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use thiserror::Error;

use crate::rooms::RoomSummaryRecord;

mod memory_store;

pub use memory_store::MemoryStore;

/// State changes collected during one sync cycle, to be saved in a single
/// store operation.
#[derive(Clone, Debug, Default)]
pub struct StateChanges {
    /// Changed room summaries, keyed by room id. Within one batch the last
    /// write for a room wins.
    pub room_summaries: BTreeMap<String, RoomSummaryRecord>,
}

impl StateChanges {
    /// Queue a room summary record for persisting.
    pub fn add_room_summary(&mut self, record: RoomSummaryRecord) {
        self.room_summaries.insert(record.room_id.clone(), record);
    }

    /// Whether the batch contains anything worth saving.
    pub fn is_empty(&self) -> bool {
        self.room_summaries.is_empty()
    }
}

/// Result type for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors a state store implementation can raise.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// An error happened while serializing or deserializing a record.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An error raised by the store backend itself.
    #[error("the store backend failed: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

/// An abstract state store that room summaries are persisted to.
#[async_trait]
pub trait StateStore: fmt::Debug + Send + Sync {
    /// Save the set of state changes in the store.
    async fn save_changes(&self, changes: &StateChanges) -> Result<()>;

    /// Get the stored summary record for a room, if any.
    async fn get_room_summary(&self, room_id: &str) -> Result<Option<RoomSummaryRecord>>;
}
