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

//! Aggregated reactions on a single timeline message.

use std::{cmp::Ordering, collections::HashMap};

use eyeball_im::{Vector, VectorDiff};
use futures_core::Stream;
use indexmap::IndexMap;
use tracing::debug;

use super::{observable_sorted_map::ObservableSortedMap, traits::MessageEntry};

/// The server-acknowledged aggregate for one reaction key, as delivered by
/// the protocol layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnotationAggregate {
    /// Whether our own user is among the reacting users.
    pub me: bool,
    /// How many users sent this reaction.
    pub count: u64,
    /// The timestamp, in milliseconds since the epoch, of the earliest of
    /// those reactions.
    pub first_timestamp: u64,
}

/// One reaction key on a message, merging the server-confirmed aggregate
/// with the count of our own unconfirmed sends and redactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionGroup {
    key: String,
    annotation: Option<AnnotationAggregate>,
    pending_count: Option<i64>,
}

impl ReactionGroup {
    pub(super) fn new(
        key: String,
        annotation: Option<AnnotationAggregate>,
        pending_count: Option<i64>,
    ) -> Self {
        Self { key, annotation, pending_count }
    }

    /// The reaction itself, e.g. an emoji.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The confirmed aggregate, if any reaction has been acknowledged by
    /// the server.
    pub fn annotation(&self) -> Option<&AnnotationAggregate> {
        self.annotation.as_ref()
    }

    /// The number of reactions to show for this key: the confirmed count
    /// plus whatever is locally in flight. A pending redaction counts
    /// negatively.
    pub fn count(&self) -> u64 {
        let confirmed = self.annotation.map_or(0, |annotation| annotation.count);
        let pending = self.pending_count.unwrap_or(0);
        if pending >= 0 {
            confirmed.saturating_add(pending.unsigned_abs())
        } else {
            confirmed.saturating_sub(pending.unsigned_abs())
        }
    }

    /// Whether one of our own sends or redactions for this key is still in
    /// flight.
    pub fn is_pending(&self) -> bool {
        self.pending_count.is_some()
    }

    /// Whether our own user reacted with this key, confirmed or not.
    pub fn have_reacted(&self) -> bool {
        self.annotation.is_some_and(|annotation| annotation.me) || self.is_pending()
    }

    fn try_update_annotation(&mut self, annotation: Option<AnnotationAggregate>) -> bool {
        if self.annotation == annotation {
            return false;
        }
        self.annotation = annotation;
        true
    }

    fn try_update_pending(&mut self, pending_count: Option<i64>) -> bool {
        if self.pending_count == pending_count {
            return false;
        }
        self.pending_count = pending_count;
        true
    }

    /// Comparator for the reaction list: most used first; ties prefer
    /// confirmed groups over pending-only ones, earliest confirmed first.
    fn compare(&self, other: &Self) -> Ordering {
        other.count().cmp(&self.count()).then_with(|| {
            match (&self.annotation, &other.annotation) {
                (Some(a), Some(b)) => a.first_timestamp.cmp(&b.first_timestamp),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
    }
}

/// The request a reaction toggle turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionAction {
    /// A new reaction was sent.
    SendRemote,
    /// Our own reaction was redacted.
    RedactRemote,
}

/// The reactions on one timeline message, aggregated per key and exposed
/// as an observable list sorted by usage.
///
/// The owning message entry refreshes the model through
/// [`update`](Self::update) whenever its confirmed or pending reaction
/// state changes, and receives the [`react`](MessageEntry::react) and
/// [`redact_reaction`](MessageEntry::redact_reaction) requests a toggle
/// turns into.
#[derive(Debug)]
pub struct ReactionsViewModel<P> {
    entry: P,
    map: ObservableSortedMap<String, ReactionGroup>,
}

impl<P: MessageEntry> ReactionsViewModel<P> {
    /// Create an empty view-model delegating requests to `entry`.
    pub fn new(entry: P) -> Self {
        Self { entry, map: ObservableSortedMap::new(ReactionGroup::compare) }
    }

    /// Merge one refresh of the confirmed and pending reaction state.
    ///
    /// Either input may be absent and is then treated as empty. Afterwards
    /// the collection holds exactly the keys present in at least one input.
    /// Subscribers are only notified for groups whose fields actually
    /// changed; a repeated call with identical inputs is silent.
    pub fn update(
        &mut self,
        annotations: Option<&HashMap<String, AnnotationAggregate>>,
        pending_annotations: Option<&IndexMap<String, i64>>,
    ) {
        if let Some(annotations) = annotations {
            for (key, &annotation) in annotations {
                if self.map.get(key).is_some() {
                    self.map.update(key, |group| group.try_update_annotation(Some(annotation)));
                } else {
                    self.map.insert(
                        key.clone(),
                        ReactionGroup::new(key.clone(), Some(annotation), None),
                    );
                }
            }
        }

        if let Some(pending) = pending_annotations {
            for (key, &count) in pending {
                if self.map.get(key).is_some() {
                    self.map.update(key, |group| group.try_update_pending(Some(count)));
                } else {
                    self.map
                        .insert(key.clone(), ReactionGroup::new(key.clone(), None, Some(count)));
                }
            }
        }

        // Reconcile the keys the inputs no longer cover.
        let keys: Vec<_> = self.map.keys().cloned().collect();
        for key in keys {
            let has_annotation = annotations.is_some_and(|a| a.contains_key(&key));
            let has_pending = pending_annotations.is_some_and(|p| p.contains_key(&key));

            if !has_annotation && !has_pending {
                self.map.remove(&key);
            } else if !has_annotation {
                self.map.update(&key, |group| group.try_update_annotation(None));
            } else if !has_pending {
                self.map.update(&key, |group| group.try_update_pending(None));
            }
        }
    }

    /// The reaction groups, most used first.
    pub fn reactions(&self) -> impl Iterator<Item = &ReactionGroup> {
        self.map.iter()
    }

    /// Get the current reaction groups along with a stream of the diffs
    /// applied to them from here on.
    pub fn subscribe(
        &self,
    ) -> (Vector<ReactionGroup>, impl Stream<Item = Vec<VectorDiff<ReactionGroup>>>) {
        self.map.stream()
    }

    /// Toggle our own reaction `key` on the message.
    ///
    /// Delegates a redact request when we have visibly reacted (a positive
    /// pending count or a confirmed `me` flag), a send request otherwise; a
    /// key without a group toggles to a send. The updated pending state is
    /// expected to come back through [`update`](Self::update) once the
    /// entry's request tracking reflects it; nothing is awaited here beyond
    /// handing the request over.
    pub async fn toggle_reaction(&self, key: &str) -> Result<ReactionAction, P::Error> {
        let have_reacted = self.map.get(key).is_some_and(|group| {
            group.pending_count.is_some_and(|count| count > 0)
                || group.annotation.is_some_and(|annotation| annotation.me)
        });

        let action = if have_reacted {
            self.entry.redact_reaction(key).await?;
            ReactionAction::RedactRemote
        } else {
            self.entry.react(key).await?;
            ReactionAction::SendRemote
        };
        debug!(key, ?action, "toggled a reaction");

        Ok(action)
    }
}
