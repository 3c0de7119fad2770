// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Notifications and input vocabulary of [`DataGrid`](crate::DataGrid).

use crate::columns::{ColumnId, SortDirection};

/// A cell named by display position and column identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Display position of the row.
    pub position: usize,
    /// Column identity.
    pub column: ColumnId,
    /// Source row, for data rows.
    pub source: Option<usize>,
}

/// How the grid's rows are ordered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortState {
    /// Source order.
    #[default]
    Unsorted,
    /// Ordered by one column's comparison.
    Column {
        /// The sorting column.
        id: ColumnId,
        /// Direction.
        direction: SortDirection,
    },
    /// Ordered by a comparator supplied by the host.
    Custom,
}

impl SortState {
    /// Direction for column `id`, if the grid is sorted by it.
    #[must_use]
    pub fn direction_of(&self, id: ColumnId) -> Option<SortDirection> {
        match *self {
            Self::Column {
                id: sorted,
                direction,
            } if sorted == id => Some(direction),
            _ => None,
        }
    }
}

/// Something that happened inside the grid; drained with
/// [`DataGrid::take_events`](crate::DataGrid::take_events).
#[derive(Clone, Debug, PartialEq)]
pub enum GridEvent {
    /// A body cell was clicked.
    CellClicked(CellRef),
    /// Focus moved to a cell, or was cleared.
    FocusChanged(Option<CellRef>),
    /// An editor wrote its value back to the row.
    EditCommitted(CellRef),
    /// An editor was closed without writing.
    EditCancelled(CellRef),
    /// Row ordering changed.
    SortChanged(SortState),
    /// A column moved to a new index.
    ColumnMoved {
        /// The moved column.
        column: ColumnId,
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// A column received a new width.
    ColumnResized {
        /// The resized column.
        column: ColumnId,
        /// Width after the resize.
        width: f64,
    },
}

/// Keys the grid interprets for focus and editing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NavigationKey {
    /// Previous focusable row.
    Up,
    /// Next focusable row.
    Down,
    /// Previous focusable column in the row.
    Left,
    /// Next focusable column in the row.
    Right,
    /// First focusable row.
    Home,
    /// Last focusable row.
    End,
    /// One page of rows up.
    PageUp,
    /// One page of rows down.
    PageDown,
    /// Next cell, wrapping to the next row.
    Tab,
    /// Previous cell, wrapping to the previous row.
    BackTab,
    /// Commit an open editor, or open one on the focused cell.
    Enter,
    /// Cancel an open editor.
    Escape,
}
