// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The filtered/sorted [`ListView`].

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::ViewChange;

/// Shared row predicate used for filtering.
pub type Predicate<T> = Rc<dyn Fn(&T) -> bool>;

/// Shared row comparator used for sorting.
pub type Comparator<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

/// A filtered, sorted view over owned source rows.
///
/// See the [crate docs](crate) for the commit model.
pub struct ListView<T> {
    items: Vec<T>,
    filter: Option<Predicate<T>>,
    comparator: Option<Comparator<T>>,
    reversed: bool,

    local_to_source: Vec<usize>,
    source_to_local: Vec<Option<usize>>,
    stale: bool,
    changes: Vec<ViewChange>,
}

impl<T> fmt::Debug for ListView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListView")
            .field("source_len", &self.items.len())
            .field("len", &self.local_to_source.len())
            .field("filtered", &self.filter.is_some())
            .field("sorted", &self.comparator.is_some())
            .field("reversed", &self.reversed)
            .field("stale", &self.stale)
            .field("pending_changes", &self.changes.len())
            .finish_non_exhaustive()
    }
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> ListView<T> {
    /// Creates a view over `items` with no filter and no sort.
    ///
    /// The index tables are built lazily; call [`ListView::commit`] before reading
    /// local indices.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            filter: None,
            comparator: None,
            reversed: false,
            local_to_source: Vec::new(),
            source_to_local: Vec::new(),
            stale: true,
            changes: Vec::new(),
        }
    }

    /// Number of rows passing the filter, as of the last commit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local_to_source.len()
    }

    /// Returns `true` if no rows pass the filter, as of the last commit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local_to_source.is_empty()
    }

    /// Number of source rows, including filtered-out ones.
    #[must_use]
    pub fn source_len(&self) -> usize {
        self.items.len()
    }

    /// All source rows in source order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Returns the source row at `index`.
    #[must_use]
    pub fn source(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Returns the source row at `index` mutably.
    ///
    /// Edits made through this reference are not reported; prefer
    /// [`ListView::modify`] so consumers learn about the change.
    pub fn source_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Returns the row at local position `local`.
    #[must_use]
    pub fn get(&self, local: usize) -> Option<&T> {
        let source = self.local_index_to_source(local)?;
        self.items.get(source)
    }

    /// Iterates rows in local order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.local_to_source
            .iter()
            .filter_map(|&source| self.items.get(source))
    }

    /// Translates a local position into a source index.
    #[must_use]
    pub fn local_index_to_source(&self, local: usize) -> Option<usize> {
        self.local_to_source.get(local).copied()
    }

    /// Translates a source index into a local position.
    ///
    /// Returns `None` for rows that are filtered out or out of range.
    #[must_use]
    pub fn source_index_to_local(&self, source: usize) -> Option<usize> {
        self.source_to_local.get(source).copied().flatten()
    }

    /// Returns the current filter predicate.
    #[must_use]
    pub fn filter(&self) -> Option<&Predicate<T>> {
        self.filter.as_ref()
    }

    /// Sets the filter predicate.
    pub fn set_filter(&mut self, filter: impl Fn(&T) -> bool + 'static) {
        self.set_shared_filter(Some(Rc::new(filter)));
    }

    /// Sets or clears the filter using an already shared predicate.
    pub fn set_shared_filter(&mut self, filter: Option<Predicate<T>>) {
        self.filter = filter;
        self.mark_reordered();
    }

    /// Removes the filter so every source row is visible.
    pub fn clear_filter(&mut self) {
        if self.filter.is_some() {
            self.set_shared_filter(None);
        }
    }

    /// Returns the current sort comparator.
    #[must_use]
    pub fn sort_comparator(&self) -> Option<&Comparator<T>> {
        self.comparator.as_ref()
    }

    /// Sets the sort comparator. Sorting is stable.
    pub fn set_sort_comparator(&mut self, comparator: impl Fn(&T, &T) -> Ordering + 'static) {
        self.set_shared_sort_comparator(Some(Rc::new(comparator)));
    }

    /// Sets or clears the sort comparator using an already shared comparator.
    pub fn set_shared_sort_comparator(&mut self, comparator: Option<Comparator<T>>) {
        self.comparator = comparator;
        self.mark_reordered();
    }

    /// Removes the sort comparator, restoring source order.
    pub fn clear_sort(&mut self) {
        if self.comparator.is_some() {
            self.set_shared_sort_comparator(None);
        }
    }

    /// Returns `true` if the local order is reversed.
    #[must_use]
    pub const fn reversed(&self) -> bool {
        self.reversed
    }

    /// Reverses the final local order (after filtering and sorting).
    pub fn set_reversed(&mut self, reversed: bool) {
        if self.reversed != reversed {
            self.reversed = reversed;
            self.mark_reordered();
        }
    }

    /// Appends a row.
    pub fn push(&mut self, item: T) {
        let index = self.items.len();
        self.items.push(item);
        self.record(ViewChange::Added { index, count: 1 });
    }

    /// Inserts a row at source `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > source_len()`.
    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
        self.record(ViewChange::Added { index, count: 1 });
    }

    /// Removes and returns the row at source `index`.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.record(ViewChange::Removed { index, count: 1 });
        Some(item)
    }

    /// Replaces the row at source `index`, returning the previous value.
    ///
    /// Returns `None` if `index` is out of range; `item` is dropped in that case.
    pub fn replace(&mut self, index: usize, item: T) -> Option<T> {
        let slot = self.items.get_mut(index)?;
        let previous = std::mem::replace(slot, item);
        self.record(ViewChange::Changed { index });
        Some(previous)
    }

    /// Edits the row at source `index` in place.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn modify(&mut self, index: usize, edit: impl FnOnce(&mut T)) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        edit(item);
        self.record(ViewChange::Modified { index });
        true
    }

    /// Replaces every row.
    pub fn reset(&mut self, items: Vec<T>) {
        self.items = items;
        self.mark_reset();
    }

    /// Returns `true` if mutations are pending a [`ListView::commit`].
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Rebuilds the index tables if needed and returns the batched changes.
    pub fn commit(&mut self) -> Vec<ViewChange> {
        if self.stale {
            self.rebuild();
        }
        std::mem::take(&mut self.changes)
    }

    fn record(&mut self, change: ViewChange) {
        self.stale = true;
        // Anything recorded after a reset is subsumed by it until the next commit.
        if self.changes.last() != Some(&ViewChange::Reset) {
            self.changes.push(change);
        }
    }

    fn mark_reordered(&mut self) {
        self.stale = true;
        if !matches!(
            self.changes.last(),
            Some(ViewChange::Reset | ViewChange::Reordered)
        ) {
            self.changes.push(ViewChange::Reordered);
        }
    }

    fn mark_reset(&mut self) {
        self.stale = true;
        self.changes.clear();
        self.changes.push(ViewChange::Reset);
    }

    fn rebuild(&mut self) {
        let items = &self.items;
        let mut local: Vec<usize> = match &self.filter {
            Some(filter) => (0..items.len()).filter(|&i| filter(&items[i])).collect(),
            None => (0..items.len()).collect(),
        };
        if let Some(comparator) = &self.comparator {
            local.sort_by(|&a, &b| comparator(&items[a], &items[b]));
        }
        if self.reversed {
            local.reverse();
        }

        self.source_to_local.clear();
        self.source_to_local.resize(items.len(), None);
        for (position, &source) in local.iter().enumerate() {
            self.source_to_local[source] = Some(position);
        }
        tracing::trace!(
            source_len = items.len(),
            len = local.len(),
            "ListView rebuilt index tables"
        );
        self.local_to_source = local;
        self.stale = false;
    }
}
