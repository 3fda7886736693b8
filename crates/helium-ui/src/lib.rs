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

//! Observable view-models for building the UI of a Matrix chat client.
//!
//! Everything in here is data plus change notifications; rendering is left
//! entirely to the consumer.

#![warn(missing_debug_implementations)]

pub mod timeline;

pub use timeline::{
    AnnotationAggregate, MessageEntry, ReactionAction, ReactionGroup, ReactionsViewModel,
};
