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

//! Unit tests (based on private methods) for the timeline view-models.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::traits::MessageEntry;


/// A request a [`TestMessageEntry`] was asked to dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Request {
    React(String),
    Redact(String),
}

/// A message entry double that only records the requests delegated to it.
#[derive(Debug, Default)]
struct TestMessageEntry {
    requests: Mutex<Vec<Request>>,
}

impl TestMessageEntry {
    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageEntry for Arc<TestMessageEntry> {
    type Error = Infallible;

    async fn react(&self, key: &str) -> Result<(), Infallible> {
        self.requests.lock().unwrap().push(Request::React(key.to_owned()));
        Ok(())
    }

    async fn redact_reaction(&self, key: &str) -> Result<(), Infallible> {
        self.requests.lock().unwrap().push(Request::Redact(key.to_owned()));
        Ok(())
    }
}
