// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notifications batched by [`ListView`](crate::ListView).

/// A change to a [`ListView`](crate::ListView), reported by
/// [`ListView::commit`](crate::ListView::commit).
///
/// Indices are *source* indices at the time the change was made.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ViewChange {
    /// `count` rows were inserted starting at `index`.
    Added {
        /// First inserted source index.
        index: usize,
        /// Number of inserted rows.
        count: usize,
    },
    /// `count` rows were removed starting at `index`.
    Removed {
        /// First removed source index.
        index: usize,
        /// Number of removed rows.
        count: usize,
    },
    /// The row at `index` was replaced with a new value.
    Changed {
        /// Replaced source index.
        index: usize,
    },
    /// The row at `index` was edited in place.
    Modified {
        /// Edited source index.
        index: usize,
    },
    /// The filter, sort order, or direction changed.
    ///
    /// Source indices still name the same rows; only local positions moved.
    Reordered,
    /// The rows were replaced wholesale.
    ///
    /// Consumers should discard anything derived from previous source indices.
    Reset,
}

impl ViewChange {
    /// Returns `true` if this change shifts or invalidates source indices
    /// recorded before it.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::Removed { .. } | Self::Reset
        )
    }
}
