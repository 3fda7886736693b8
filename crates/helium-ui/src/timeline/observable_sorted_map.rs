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

//! An observable map whose values are kept sorted by a comparator.

use std::{borrow::Borrow, cmp::Ordering, collections::HashMap, fmt, hash::Hash};

use eyeball_im::{ObservableVector, Vector, VectorDiff};
use futures_core::Stream;

/// A keyed collection whose values are held in an [`ObservableVector`] in
/// the order a comparator asks for.
///
/// A (key, position) map provides lookup by key; the (position, value)
/// tuples are what subscribers observe, as [`VectorDiff`]s. Every mutation
/// re-derives the value's sorted position: an update that keeps the
/// position emits a single `Set` diff, one that moves the value emits
/// `Remove` followed by `Insert`. Values inserted while equal under the
/// comparator land after the ones already present, so iteration order is
/// stable across refreshes.
pub(crate) struct ObservableSortedMap<K, V>
where
    V: Clone + 'static,
{
    /// The comparator the values are sorted by.
    compare: Box<dyn Fn(&V, &V) -> Ordering + Send + Sync>,

    /// The (key, position) tuples.
    mapping: HashMap<K, usize>,

    /// The values, where the indices are the `position` part of
    /// `Self::mapping`.
    values: ObservableVector<V>,
}

impl<K, V> ObservableSortedMap<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone + 'static,
{
    /// Create a new, empty `Self` sorting with `compare`.
    pub(crate) fn new<F>(compare: F) -> Self
    where
        F: Fn(&V, &V) -> Ordering + Send + Sync + 'static,
    {
        Self { compare: Box::new(compare), mapping: HashMap::new(), values: ObservableVector::new() }
    }

    /// The position `value` should live at: right after every present value
    /// that sorts before or equal to it, ignoring the position in `skip`.
    fn sorted_position(&self, value: &V, skip: Option<usize>) -> usize {
        self.values
            .iter()
            .enumerate()
            .filter(|(position, _)| Some(*position) != skip)
            .filter(|(_, existing)| (self.compare)(existing, value) != Ordering::Greater)
            .count()
    }

    /// Insert a new value in the collection at its sorted position.
    ///
    /// If a value already exists for the key, it is replaced and repositioned
    /// instead.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        if self.mapping.contains_key(&key) {
            self.update(&key, |existing| {
                *existing = value;
                true
            });
            return;
        }

        let position = self.sorted_position(&value, None);
        for mapped in self.mapping.values_mut() {
            if *mapped >= position {
                *mapped += 1;
            }
        }
        self.values.insert(position, value);
        self.mapping.insert(key, position);
    }

    /// Read one value based on its key, if it exists.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.mapping.get(key).and_then(|position| self.values.get(*position))
    }

    /// Let `f` mutate the value for `key` in place.
    ///
    /// `f` reports whether it changed anything. Only then is the value
    /// republished, at whatever position the comparator asks for, and only
    /// then do subscribers hear about it. Returns `f`'s verdict; an unknown
    /// key is reported as unchanged.
    pub(crate) fn update<F>(&mut self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        let Some(&old_position) = self.mapping.get(key) else {
            return false;
        };

        let mut value = self
            .values
            .get(old_position)
            .expect("mapped positions point at existing values")
            .clone();
        if !f(&mut value) {
            return false;
        }

        let new_position = self.sorted_position(&value, Some(old_position));
        if new_position == old_position {
            self.values.set(old_position, value);
        } else {
            self.values.remove(old_position);
            self.values.insert(new_position, value);

            // Reindex every mapped entry between the two positions.
            for mapped in self.mapping.values_mut() {
                if new_position < old_position {
                    if (new_position..old_position).contains(&*mapped) {
                        *mapped += 1;
                    }
                } else if ((old_position + 1)..=new_position).contains(&*mapped) {
                    *mapped -= 1;
                }
            }
            self.mapping.insert(key.clone(), new_position);
        }

        true
    }

    /// Remove a value based on its key, if it exists.
    ///
    /// Returns the removed value.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = self.mapping.remove(key)?;

        // Reindex every mapped entry that is after the removed position.
        for mapped in self.mapping.values_mut() {
            if *mapped > position {
                *mapped -= 1;
            }
        }

        Some(self.values.remove(position))
    }

    /// Return an iterator over the existing keys, in no particular order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.mapping.keys()
    }

    /// Return an iterator over the existing values, in sorted order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }

    /// The number of values in the collection.
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Get the current values along with a [`Stream`] of the diffs applied
    /// to them from here on.
    pub(crate) fn stream(&self) -> (Vector<V>, impl Stream<Item = Vec<VectorDiff<V>>>) {
        self.values.subscribe().into_values_and_batched_stream()
    }
}

impl<K, V> fmt::Debug for ObservableSortedMap<K, V>
where
    K: fmt::Debug,
    V: Clone + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableSortedMap")
            .field("mapping", &self.mapping)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}
