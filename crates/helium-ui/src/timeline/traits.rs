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

use async_trait::async_trait;

/// What the reaction view-model needs from the timeline message entry that
/// owns it.
///
/// Both requests are dispatched to the homeserver by the implementation;
/// their effect comes back to the view-model as refreshed pending state on
/// a later [`update`], not through the returned result.
///
/// [`update`]: super::ReactionsViewModel::update
#[async_trait]
pub trait MessageEntry: Send + Sync {
    /// The error the underlying request machinery can fail with.
    type Error;

    /// Send a reaction with the given key for this message.
    async fn react(&self, key: &str) -> Result<(), Self::Error>;

    /// Redact our own reaction with the given key from this message.
    async fn redact_reaction(&self, key: &str) -> Result<(), Self::Error>;
}
