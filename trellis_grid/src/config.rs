// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid configuration.

/// Smallest row height the grid will lay out with when a configured uniform
/// row height is degenerate.
pub const MIN_ROW_HEIGHT: f64 = 1.0;

/// Scrollbar visibility policy for one axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollPolicy {
    /// Never scroll along this axis.
    ///
    /// Horizontally, columns are squeezed to fit the viewport.
    Off,
    /// Always show the scrollbar.
    On,
    /// Show the scrollbar only when content overflows.
    #[default]
    Auto,
}

/// Options recognized by [`DataGrid`](crate::DataGrid).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GridConfig {
    /// Upper bound on rows materialized by a single metrics pass.
    pub max_rows: usize,
    /// Minimum height of any measured row.
    pub min_row_height: f64,
    /// Uniform row height, or `None` to measure rows from their content.
    pub row_height: Option<f64>,
    /// Whether the column header row is laid out.
    pub header_visible: bool,
    /// Horizontal scrollbar policy.
    pub h_scroll_policy: ScrollPolicy,
    /// Vertical scrollbar policy.
    pub v_scroll_policy: ScrollPolicy,
    /// Clicking a sortable column header toggles sorting.
    pub column_sorting_enabled: bool,
    /// Reorderable columns can be dragged to a new index.
    pub column_reordering_enabled: bool,
    /// Resizable columns can be dragged to a new width.
    pub column_resizing_enabled: bool,
    /// Editable cells open an editor on focus.
    pub editable: bool,
    /// Thickness of a visible scrollbar, taken out of the viewport.
    pub scrollbar_thickness: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_rows: 500,
            min_row_height: 0.0,
            row_height: None,
            header_visible: true,
            h_scroll_policy: ScrollPolicy::Auto,
            v_scroll_policy: ScrollPolicy::Auto,
            column_sorting_enabled: true,
            column_reordering_enabled: true,
            column_resizing_enabled: true,
            editable: false,
            scrollbar_thickness: 16.0,
        }
    }
}

impl GridConfig {
    /// Returns a copy with degenerate values replaced by safe minimums.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.max_rows == 0 {
            tracing::warn!("max_rows of 0 normalized to 1");
            config.max_rows = 1;
        }
        if !config.min_row_height.is_finite() || config.min_row_height < 0.0 {
            tracing::warn!(
                min_row_height = config.min_row_height,
                "min_row_height normalized to 0"
            );
            config.min_row_height = 0.0;
        }
        if let Some(height) = config.row_height
            && !(height.is_finite() && height > 0.0)
        {
            tracing::warn!(
                row_height = height,
                "row_height normalized to {MIN_ROW_HEIGHT}"
            );
            config.row_height = Some(MIN_ROW_HEIGHT);
        }
        if !config.scrollbar_thickness.is_finite() || config.scrollbar_thickness < 0.0 {
            config.scrollbar_thickness = 0.0;
        }
        config
    }
}
