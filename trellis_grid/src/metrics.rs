// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Row metrics: which rows fit in a viewport, and where.
//!
//! [`size_cells`] lays rows out downward from a fractional start position;
//! [`size_cells_reversed`] lays them out upward from a fractional end
//! position. Both produce a [`CellMetrics`] with the same shape, so the
//! reversed pass can size the scroll range and the forward pass can place the
//! visible cells.
//!
//! Rows are never clipped: a row that does not fit is still included whole,
//! and the part outside the viewport shows up as the fractional part of the
//! start or end position.

use kurbo::Size;

use crate::addressing::{GroupLayout, RowLocation};

/// Parameters of one metrics pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetricsRequest {
    /// Available width.
    pub width: f64,
    /// Available height.
    pub height: f64,
    /// Start position for [`size_cells`], end position for
    /// [`size_cells_reversed`].
    pub position: f64,
    /// Uniform row height, if configured.
    pub row_height: Option<f64>,
    /// Lower bound for every row's height.
    pub min_row_height: f64,
    /// Upper bound on rows laid out.
    pub max_rows: usize,
    /// Allows the uniform-height shortcut that measures nothing.
    pub allow_virtual: bool,
}

/// Measures rows on behalf of a metrics pass.
///
/// A grid implementation obtains and fills cells from its pools here; tests
/// can return canned heights.
pub trait RowMeasurer {
    /// Error raised when a row cannot be measured.
    type Error;

    /// Called before the first row of a pass.
    fn begin_pass(&mut self) {}

    /// Returns the content height of `row`.
    fn measure_row(&mut self, row: &RowLocation) -> Result<f64, Self::Error>;

    /// Called after the last row of a pass, including when measuring failed.
    fn end_pass(&mut self) {}

    /// Width of the laid out content given `available` width.
    fn content_width(&self, available: f64) -> f64 {
        available
    }
}

/// Result of a metrics pass.
///
/// `row_heights` and `row_positions` are parallel; entry `k` describes display
/// position `first_position + k`, and positions are relative to the top of the
/// viewport.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellMetrics {
    start_position: f64,
    end_position: f64,
    first_position: usize,
    row_heights: Vec<f64>,
    row_positions: Vec<f64>,
    bounds: Size,
}

impl CellMetrics {
    /// Fractional display position at the top of the viewport.
    #[must_use]
    pub const fn start_position(&self) -> f64 {
        self.start_position
    }

    /// Fractional display position at the bottom of the laid out rows.
    #[must_use]
    pub const fn end_position(&self) -> f64 {
        self.end_position
    }

    /// Fractional number of rows covered.
    #[must_use]
    pub fn visible_rows(&self) -> f64 {
        self.end_position - self.start_position
    }

    /// Display position of the first laid out row.
    #[must_use]
    pub const fn first_position(&self) -> usize {
        self.first_position
    }

    /// Number of laid out rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_heights.len()
    }

    /// Display positions of the laid out rows.
    #[must_use]
    pub fn positions(&self) -> core::ops::Range<usize> {
        self.first_position..self.first_position + self.row_heights.len()
    }

    /// Heights of the laid out rows.
    #[must_use]
    pub fn row_heights(&self) -> &[f64] {
        &self.row_heights
    }

    /// Top edges of the laid out rows.
    #[must_use]
    pub fn row_positions(&self) -> &[f64] {
        &self.row_positions
    }

    /// Size of the laid out content, clipped to the viewport.
    #[must_use]
    pub const fn bounds(&self) -> Size {
        self.bounds
    }

    /// Top edge and height of the row at display position `position`, if it was
    /// laid out.
    #[must_use]
    pub fn row_extent(&self, position: usize) -> Option<(f64, f64)> {
        let k = position.checked_sub(self.first_position)?;
        Some((*self.row_positions.get(k)?, self.row_heights[k]))
    }

    /// Converts a viewport y coordinate to a fractional display position.
    #[must_use]
    pub fn row_at_y(&self, y: f64) -> Option<f64> {
        let k = self
            .row_positions
            .partition_point(|&top| top <= y)
            .checked_sub(1)?;
        let top = self.row_positions[k];
        let height = self.row_heights[k];
        if height <= 0.0 || y >= top + height {
            return None;
        }
        Some((self.first_position + k) as f64 + (y - top) / height)
    }
}

/// Lays out rows downward from `request.position`.
///
/// The first row is offset by its hidden fraction so that
/// `row_positions[0] == -row_heights[0] * fract(start)`. Rows are added until
/// the viewport is filled, `max_rows` is reached, or the rows run out.
pub fn size_cells<M: RowMeasurer>(
    layout: &GroupLayout,
    measurer: &mut M,
    request: &MetricsRequest,
) -> Result<CellMetrics, M::Error> {
    let total = layout.total_rows();
    let start = clamp_position(request.position, total);
    #[allow(
        clippy::cast_possible_truncation,
        reason = "start is clamped to [0, total] so the floor fits in usize."
    )]
    let first = (start.floor() as usize).min(total);
    let fraction = start - first as f64;
    let available = total - first;

    let mut walk = Walk::new(request);
    walk.tail = 1.0 - fraction;
    if let Some(fixed) = fixed_height(request) {
        while walk.wants_more(available) {
            walk.push(fixed);
        }
    } else {
        measurer.begin_pass();
        let mut row = RowLocation::seek(layout, first);
        let mut measured = Ok(());
        while walk.wants_more(available) {
            if walk.len() > 0 {
                row.move_to_next_row(layout);
            }
            match measurer.measure_row(&row) {
                Ok(height) => walk.push(walk.row_height(height)),
                Err(err) => {
                    measured = Err(err);
                    break;
                }
            }
        }
        measurer.end_pass();
        measured?;
    }

    let heights = walk.heights;
    let mut positions = Vec::with_capacity(heights.len());
    let mut y = heights.first().map_or(0.0, |h| -h * fraction);
    for h in &heights {
        positions.push(y);
        y += h;
    }

    let mut end = (first + heights.len()) as f64;
    if let Some(&last) = heights.last()
        && y > request.height
        && last > 0.0
    {
        end -= ((y - request.height) / last).min(1.0);
    }
    tracing::trace!(
        start,
        end,
        rows = heights.len(),
        "forward metrics pass"
    );
    Ok(CellMetrics {
        start_position: start,
        end_position: end.max(start),
        first_position: first,
        row_positions: positions,
        row_heights: heights,
        bounds: Size::new(
            measurer.content_width(request.width),
            y.clamp(0.0, request.height.max(0.0)),
        ),
    })
}

/// Lays out rows upward so that the bottom of the viewport lands on
/// `request.position`.
///
/// With `request.position == total_rows`, the resulting start position is the
/// largest useful scroll position.
pub fn size_cells_reversed<M: RowMeasurer>(
    layout: &GroupLayout,
    measurer: &mut M,
    request: &MetricsRequest,
) -> Result<CellMetrics, M::Error> {
    let total = layout.total_rows();
    let end = clamp_position(request.position, total);
    #[allow(
        clippy::cast_possible_truncation,
        reason = "end is clamped to [0, total] so the ceiling fits in usize."
    )]
    let past_last = (end.ceil() as usize).min(total);
    // Visible share of the bottom row.
    let tail = if past_last == 0 {
        1.0
    } else {
        end - (past_last - 1) as f64
    };

    let mut walk = Walk::new(request);
    walk.tail = tail;
    if let Some(fixed) = fixed_height(request) {
        while walk.wants_more(past_last) {
            walk.push(fixed);
        }
    } else {
        measurer.begin_pass();
        let mut row = RowLocation::seek(layout, past_last);
        let mut measured = Ok(());
        while walk.wants_more(past_last) {
            row.move_to_previous_row(layout);
            match measurer.measure_row(&row) {
                Ok(height) => walk.push(walk.row_height(height)),
                Err(err) => {
                    measured = Err(err);
                    break;
                }
            }
        }
        measurer.end_pass();
        measured?;
    }

    let Walk {
        mut heights,
        extent,
        ..
    } = walk;
    heights.reverse();
    let first = past_last - heights.len();
    let overflow = (extent - request.height).max(0.0);
    let start = match heights.first() {
        Some(&h) if h > 0.0 => first as f64 + (overflow / h).min(1.0),
        _ => first as f64,
    };

    let mut positions = Vec::with_capacity(heights.len());
    let mut y = -overflow;
    for h in &heights {
        positions.push(y);
        y += h;
    }

    tracing::trace!(
        start,
        end,
        rows = heights.len(),
        "reversed metrics pass"
    );
    Ok(CellMetrics {
        start_position: start.min(end),
        end_position: end,
        first_position: first,
        row_positions: positions,
        row_heights: heights,
        bounds: Size::new(
            measurer.content_width(request.width),
            extent.min(request.height.max(0.0)),
        ),
    })
}

fn clamp_position(position: f64, total: usize) -> f64 {
    if position.is_nan() {
        return 0.0;
    }
    position.clamp(0.0, total as f64)
}

fn fixed_height(request: &MetricsRequest) -> Option<f64> {
    if !request.allow_virtual {
        return None;
    }
    request
        .row_height
        .map(|h| h.max(request.min_row_height).max(crate::config::MIN_ROW_HEIGHT))
}

/// Accumulates row heights until the viewport is filled.
struct Walk {
    heights: Vec<f64>,
    /// Height covered so far; the first row counts only its visible share.
    extent: f64,
    /// Visible share of the first row walked.
    tail: f64,
    height: f64,
    row_height: Option<f64>,
    min_row_height: f64,
    max_rows: usize,
}

impl Walk {
    fn new(request: &MetricsRequest) -> Self {
        Self {
            heights: Vec::new(),
            extent: 0.0,
            tail: 1.0,
            height: request.height,
            row_height: request.row_height,
            min_row_height: request.min_row_height.max(0.0),
            max_rows: request.max_rows.max(1),
        }
    }

    fn len(&self) -> usize {
        self.heights.len()
    }

    fn wants_more(&self, available: usize) -> bool {
        self.len() < available && self.len() < self.max_rows && self.extent < self.height
    }

    /// Height a row takes given its measured content height.
    fn row_height(&self, measured: f64) -> f64 {
        let content = self.row_height.unwrap_or(measured);
        let content = if content.is_finite() { content } else { 0.0 };
        content.max(self.min_row_height)
    }

    fn push(&mut self, height: f64) {
        let share = if self.heights.is_empty() { self.tail } else { 1.0 };
        self.extent += height * share;
        self.heights.push(height);
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::{CellMetrics, MetricsRequest, RowMeasurer, size_cells, size_cells_reversed};
    use crate::addressing::{GroupLayout, GroupSpan, RowLocation};

    /// Heights by display position, with a log of what was measured.
    struct Table {
        heights: Vec<f64>,
        measured: Vec<usize>,
        passes: usize,
    }

    impl Table {
        fn uniform(rows: usize, height: f64) -> Self {
            Self::new(vec![height; rows])
        }

        fn new(heights: Vec<f64>) -> Self {
            Self {
                heights,
                measured: Vec::new(),
                passes: 0,
            }
        }
    }

    impl RowMeasurer for Table {
        type Error = Infallible;

        fn begin_pass(&mut self) {
            self.passes += 1;
        }

        fn measure_row(&mut self, row: &RowLocation) -> Result<f64, Infallible> {
            self.measured.push(row.position());
            Ok(self.heights[row.position()])
        }
    }

    fn request(height: f64, position: f64) -> MetricsRequest {
        MetricsRequest {
            width: 100.0,
            height,
            position,
            row_height: None,
            min_row_height: 0.0,
            max_rows: 500,
            allow_virtual: false,
        }
    }

    fn assert_continuous(metrics: &CellMetrics) {
        let fraction = metrics.start_position().fract();
        let h = metrics.row_heights();
        let p = metrics.row_positions();
        assert!((p[0] + h[0] * fraction).abs() < 1e-9, "first row offset");
        for k in 0..h.len() - 1 {
            assert!((p[k + 1] - (p[k] + h[k])).abs() < 1e-9, "row {k} is not contiguous");
        }
    }

    #[test]
    fn fixed_rows_fill_the_viewport_exactly() {
        let layout = GroupLayout::single(1000);
        let mut table = Table::uniform(1000, 20.0);
        let request = MetricsRequest {
            row_height: Some(20.0),
            allow_virtual: true,
            ..request(200.0, 0.0)
        };
        let metrics = size_cells(&layout, &mut table, &request).unwrap();
        assert_eq!(metrics.visible_rows(), 10.0);
        assert_eq!(metrics.row_count(), 10);

        let tail = size_cells_reversed(
            &layout,
            &mut table,
            &MetricsRequest {
                position: 1000.0,
                ..request
            },
        )
        .unwrap();
        assert_eq!(tail.start_position(), 990.0);
        assert_eq!(tail.first_position(), 990);
        assert!(table.measured.is_empty(), "the shortcut measures nothing");
        assert_eq!(table.passes, 0);
    }

    #[test]
    fn measured_path_matches_the_shortcut_for_uniform_rows() {
        let layout = GroupLayout::single(50);
        let mut table = Table::uniform(50, 20.0);
        let virtual_request = MetricsRequest {
            row_height: Some(20.0),
            allow_virtual: true,
            ..request(130.0, 3.25)
        };
        let measured_request = MetricsRequest {
            row_height: None,
            allow_virtual: false,
            ..virtual_request
        };

        let fast = size_cells(&layout, &mut table, &virtual_request).unwrap();
        let slow = size_cells(&layout, &mut table, &measured_request).unwrap();
        assert_eq!(fast, slow);
        assert!(fast.row_heights().iter().all(|&h| h == 20.0));
        assert_continuous(&slow);

        let request = MetricsRequest {
            position: 50.0,
            ..virtual_request
        };
        let fast = size_cells_reversed(&layout, &mut table, &request).unwrap();
        let slow = size_cells_reversed(
            &layout,
            &mut table,
            &MetricsRequest {
                row_height: None,
                allow_virtual: false,
                ..request
            },
        )
        .unwrap();
        assert_eq!(fast, slow);
        assert_eq!(fast.start_position(), 50.0 - 6.5);
    }

    #[test]
    fn fractional_start_offsets_the_first_row() {
        let layout = GroupLayout::single(10);
        let mut table = Table::new(vec![
            10.0, 40.0, 20.0, 30.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0,
        ]);
        let metrics = size_cells(&layout, &mut table, &request(50.0, 1.5)).unwrap();
        // Row 1 shows its lower 20px, row 2 is whole, row 3 shows 10 of 30px.
        assert_eq!(metrics.first_position(), 1);
        assert_eq!(metrics.row_heights(), &[40.0, 20.0, 30.0]);
        assert_eq!(metrics.row_positions(), &[-20.0, 20.0, 40.0]);
        assert_continuous(&metrics);
        assert!((metrics.end_position() - (4.0 - 20.0 / 30.0)).abs() < 1e-9);
        assert_eq!(metrics.bounds().height, 50.0);
        assert_eq!(table.measured, vec![1, 2, 3]);

        assert_eq!(metrics.row_at_y(0.0), Some(1.5));
        assert_eq!(metrics.row_at_y(30.0), Some(2.5));
        assert_eq!(metrics.row_at_y(100.0), None);
        assert_eq!(metrics.row_extent(3), Some((40.0, 30.0)));
        assert_eq!(metrics.row_extent(0), None);
    }

    #[test]
    fn reversed_pass_reports_overflow_as_start_fraction() {
        let layout = GroupLayout::single(4);
        let mut table = Table::new(vec![10.0, 40.0, 20.0, 30.0]);
        let metrics = size_cells_reversed(&layout, &mut table, &request(60.0, 4.0)).unwrap();
        // 30 + 20 + 40 = 90 covers 60 with 30px hidden in row 1.
        assert_eq!(metrics.first_position(), 1);
        assert_eq!(metrics.row_heights(), &[40.0, 20.0, 30.0]);
        assert_eq!(metrics.row_positions(), &[-30.0, 10.0, 30.0]);
        assert!((metrics.start_position() - 1.75).abs() < 1e-9);
        assert_continuous(&metrics);
        assert_eq!(table.measured, vec![3, 2, 1]);
    }

    #[test]
    fn short_content_shrinks_bounds() {
        let layout = GroupLayout::new([GroupSpan::new(true, 2, false)]);
        let mut table = Table::uniform(3, 15.0);
        let metrics = size_cells(&layout, &mut table, &request(200.0, 0.0)).unwrap();
        assert_eq!(metrics.row_count(), 3);
        assert_eq!(metrics.end_position(), 3.0);
        assert_eq!(metrics.bounds().height, 45.0);

        let metrics = size_cells_reversed(&layout, &mut table, &request(200.0, 3.0)).unwrap();
        assert_eq!(metrics.start_position(), 0.0);
        assert_eq!(metrics.bounds().height, 45.0);
    }

    #[test]
    fn max_rows_and_min_height_bound_the_pass() {
        let layout = GroupLayout::single(1000);
        let mut table = Table::uniform(1000, 0.0);
        let metrics = size_cells(
            &layout,
            &mut table,
            &MetricsRequest {
                max_rows: 25,
                ..request(1000.0, 0.0)
            },
        )
        .unwrap();
        assert_eq!(metrics.row_count(), 25);

        let metrics = size_cells(
            &layout,
            &mut table,
            &MetricsRequest {
                min_row_height: 50.0,
                ..request(1000.0, 0.0)
            },
        )
        .unwrap();
        assert_eq!(metrics.row_count(), 20);
    }

    #[test]
    fn measurement_errors_propagate() {
        struct Broken;
        impl RowMeasurer for Broken {
            type Error = &'static str;
            fn measure_row(&mut self, row: &RowLocation) -> Result<f64, &'static str> {
                if row.position() == 2 {
                    Err("boom")
                } else {
                    Ok(10.0)
                }
            }
        }
        let layout = GroupLayout::single(10);
        let err = size_cells(&layout, &mut Broken, &request(100.0, 0.0)).unwrap_err();
        assert_eq!(err, "boom");
    }

    #[test]
    fn empty_layout_yields_empty_metrics() {
        let layout = GroupLayout::single(0);
        let mut table = Table::uniform(0, 10.0);
        let metrics = size_cells(&layout, &mut table, &request(100.0, 5.0)).unwrap();
        assert_eq!(metrics.row_count(), 0);
        assert_eq!(metrics.visible_rows(), 0.0);
        let metrics = size_cells_reversed(&layout, &mut table, &request(100.0, 0.0)).unwrap();
        assert_eq!(metrics.row_count(), 0);
        assert_eq!(metrics.start_position(), 0.0);
    }
}
