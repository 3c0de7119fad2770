// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis View: a filtered, sorted view over a vector of rows.
//!
//! A [`ListView`] owns its *source* rows (indexed `0..source_len`) and exposes a
//! *local* ordering (indexed `0..len`) produced by an optional filter predicate, an
//! optional sort comparator, and a `reversed` flag. Consumers translate between the
//! two index spaces with [`ListView::local_index_to_source`] and
//! [`ListView::source_index_to_local`].
//!
//! Mutations do **not** take effect immediately. Row edits and filter/sort changes
//! only mark the index tables stale and record a [`ViewChange`]; calling
//! [`ListView::commit`] rebuilds the tables and hands back the batched
//! notifications. This lets a host apply many edits and pay for one re-sort.
//!
//! ## Minimal example
//!
//! ```rust
//! use trellis_view::{ListView, ViewChange};
//!
//! let mut view = ListView::new(vec![5, 3, 8, 1]);
//! view.set_filter(|v: &i32| *v > 2);
//! view.set_sort_comparator(|a: &i32, b: &i32| a.cmp(b));
//! let changes = view.commit();
//! assert_eq!(changes, vec![ViewChange::Reordered]);
//!
//! // Local order is 3, 5, 8.
//! assert_eq!(view.len(), 3);
//! assert_eq!(view.local_index_to_source(0), Some(1));
//! assert_eq!(view.source_index_to_local(2), Some(2));
//! // Row 3 (value 1) is filtered out.
//! assert_eq!(view.source_index_to_local(3), None);
//! ```

mod change;
mod view;

pub use change::ViewChange;
pub use view::{Comparator, ListView, Predicate};
