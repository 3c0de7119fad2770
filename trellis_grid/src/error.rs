// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for layout and editing.

/// A failure reported by a host cell factory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CellError {
    message: String,
}

impl CellError {
    /// Creates a new error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by [`DataGrid`](crate::DataGrid) layout and editing.
///
/// A layout pass that fails part way leaves the recycling pools in an
/// unspecified (but memory-safe) state; fix the fault and call
/// [`DataGrid::validate`](crate::DataGrid::validate) again.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A column's body or header cell could not be created.
    #[error("cell factory for column {column} failed")]
    ColumnCell {
        /// Column index at the time of the failure.
        column: usize,
        /// Factory error.
        #[source]
        source: CellError,
    },
    /// A group header or footer cell could not be created.
    #[error("group cell factory for group {group} failed")]
    GroupCell {
        /// Group index at the time of the failure.
        group: usize,
        /// Factory error.
        #[source]
        source: CellError,
    },
    /// A row background could not be created.
    #[error("row background factory failed")]
    RowBackground {
        /// Factory error.
        #[source]
        source: CellError,
    },
    /// An editor cell could not be created.
    #[error("editor factory for column {column} failed")]
    EditorCell {
        /// Column index of the edited cell.
        column: usize,
        /// Factory error.
        #[source]
        source: CellError,
    },
    /// The column refused to write the editor's value back to the row.
    #[error("column {column} rejected the edited value")]
    EditRejected {
        /// Column index of the edited cell.
        column: usize,
    },
}
