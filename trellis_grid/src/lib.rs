// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Grid: layout core for a virtualized, grouped data grid.
//!
//! A [`DataGrid`] shows rows of a [`ListView`] in columns, split into
//! [`Group`]s that may carry a header and a footer row. Only rows inside the
//! viewport get visuals; those visuals come from host factories and are
//! recycled between layouts through keyed [`CellPool`]s.
//!
//! The pieces, bottom up:
//!
//! - [`GroupLayout`], [`RowLocation`], and [`CellLocation`] address display
//!   rows across groups, with header and footer rows counted in.
//! - [`size_cells`] and [`size_cells_reversed`] walk rows from a fractional
//!   scroll position, measuring them through a [`RowMeasurer`], and report
//!   [`CellMetrics`]. The reversed walk finds the largest scroll position.
//! - [`resolve_column_widths`] turns [`ColumnSizing`]s into a
//!   [`ColumnGeometry`].
//! - [`CellPool`] and [`HeaderCache`] keep host [`Visual`]s alive across
//!   layouts and detach them when they scroll away.
//! - [`DataGrid`] ties these together. Mutations only mark state
//!   [`Dirty`]; [`DataGrid::validate`] lays out what changed. The grid also
//!   owns focus, the cell editor, sorting, and column moves and resizes, and
//!   reports what happened as [`GridEvent`]s.
//!
//! The grid never draws. A host implements [`Visual`] for its widget type,
//! calls `validate` before rendering, and reads frames back from its visuals.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Rect, Size};
//! use trellis_grid::{CellError, Column, ColumnId, DataGrid, FnCells, GridConfig, Visual};
//!
//! #[derive(Default)]
//! struct Label {
//!     text: String,
//!     frame: Rect,
//! }
//!
//! impl Visual for Label {
//!     fn measure_height(&mut self, _width: f64) -> f64 {
//!         20.0
//!     }
//!     fn set_frame(&mut self, frame: Rect) {
//!         self.frame = frame;
//!     }
//!     fn attach(&mut self) {}
//!     fn detach(&mut self) {}
//! }
//!
//! let rows: Vec<(u32, String)> = (0..1000).map(|i| (i, format!("row {i}"))).collect();
//! let config = GridConfig {
//!     header_visible: false,
//!     ..GridConfig::default()
//! };
//! let mut grid = DataGrid::new(config, rows);
//! grid.add_column(Column::new(
//!     ColumnId(0),
//!     "Id",
//!     FnCells::new(
//!         |row: &(u32, String)| row.0,
//!         |title| Ok::<_, CellError>(Label { text: title.to_owned(), ..Label::default() }),
//!         || Ok(Label::default()),
//!         |label: &mut Label, id: u32| label.text = id.to_string(),
//!     ),
//! ));
//! grid.set_size(Size::new(300.0, 200.0));
//! grid.validate().unwrap();
//!
//! // Ten rows fit; only they have visuals.
//! assert_eq!(grid.metrics().row_count(), 10);
//! assert_eq!(grid.live_body_cells(0), 10);
//! assert_eq!(grid.max_scroll_position(), 990.0);
//! assert_eq!(grid.body_cell(3, 0).unwrap().text, "3");
//! ```

mod addressing;
mod columns;
mod config;
mod editor;
mod error;
mod event;
mod grid;
mod group;
mod metrics;
mod navigation;
mod recycle;
mod sizer;

pub use addressing::{CellLocation, GroupLayout, GroupRows, GroupSpan, RowKind, RowLocation};
pub use columns::{
    CellFactory, Column, ColumnFlags, ColumnGeometry, ColumnId, ColumnSizing, ColumnWidth,
    FnCells, SortDirection, reorder_index, resize_column, resolve_column_widths,
};
pub use config::{GridConfig, MIN_ROW_HEIGHT, ScrollPolicy};
pub use error::{CellError, GridError};
pub use event::{CellRef, GridEvent, NavigationKey, SortState};
pub use grid::{DataGrid, Dirty, Scrollbars};
pub use group::{Group, GroupCache, GroupCellFactory, GroupCellKey, GroupMembers, GroupPart};
pub use metrics::{CellMetrics, MetricsRequest, RowMeasurer, size_cells, size_cells_reversed};
pub use recycle::{CellHandle, CellPool, HeaderCache, Visual};

pub use trellis_view::{ListView, ViewChange};
