// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing, focus, and keyboard navigation.

use kurbo::Point;

use crate::addressing::{CellLocation, RowLocation};
use crate::error::GridError;
use crate::event::{CellRef, GridEvent, NavigationKey};
use crate::grid::{DataGrid, Focus};
use crate::recycle::Visual;
use crate::sizer::SizerMode;

impl<T: 'static, V: Visual + 'static> DataGrid<T, V> {
    /// Body cell under viewport point `(x, y)`, using the last layout.
    #[must_use]
    pub fn get_cell_from_position(&self, x: f64, y: f64) -> Option<CellLocation> {
        if y < self.header_height || !(0.0..self.body.width).contains(&x) {
            return None;
        }
        let row = self.metrics.row_at_y(y - self.header_height)?;
        let column = self.geometry.column_at_x(x + self.scroll_x)?;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "row_at_y returns a non-negative display position."
        )]
        let position = row.floor() as usize;
        let location = CellLocation::seek(&self.layout, position, column);
        location.row.is_valid().then_some(location)
    }

    /// Column whose header is under viewport point `(x, y)`.
    #[must_use]
    pub fn header_at(&self, x: f64, y: f64) -> Option<usize> {
        if !(0.0..self.header_height).contains(&y) || !(0.0..self.body.width).contains(&x) {
            return None;
        }
        self.geometry.column_at_x(x + self.scroll_x)
    }

    /// Handles a primary click at viewport point `point`.
    ///
    /// A header click toggles sorting; a body click raises
    /// [`GridEvent::CellClicked`] and focuses the cell. Returns `true` if the
    /// click hit a header or a cell.
    pub fn click_at(&mut self, point: Point) -> Result<bool, GridError> {
        self.validate()?;
        if let Some(column) = self.header_at(point.x, point.y) {
            self.click_header(column);
            return Ok(true);
        }
        let Some(location) = self.get_cell_from_position(point.x, point.y) else {
            return Ok(false);
        };
        let cell = self.cell_ref(&location);
        self.events.push(GridEvent::CellClicked(cell));
        self.focus_cell(&location)?;
        Ok(true)
    }

    fn cell_ref(&self, location: &CellLocation) -> CellRef {
        CellRef {
            position: location.position(),
            column: self.columns[location.column].id(),
            source: self.source_index(&location.row),
        }
    }

    /// The focused cell.
    #[must_use]
    pub fn focused_cell(&self) -> Option<CellLocation> {
        let focus = self.focus?;
        let column = self.column_index(focus.column)?;
        Some(CellLocation::seek(&self.layout, focus.position, column))
    }

    pub(crate) fn set_focus(&mut self, focus: Option<Focus>) {
        self.focus = focus;
        self.events
            .push(GridEvent::FocusChanged(focus.map(|focus| CellRef {
                position: focus.position,
                column: focus.column,
                source: focus.source,
            })));
    }

    /// Clears focus, committing any open editor first.
    pub fn clear_focus(&mut self) -> Result<(), GridError> {
        self.commit_edit()?;
        if self.focus.is_some() {
            self.set_focus(None);
        }
        Ok(())
    }

    /// Focuses a body cell and scrolls it into view.
    ///
    /// An editor open elsewhere is committed first. With editing enabled, an
    /// editable cell opens its editor. Returns `false` if the cell cannot take
    /// focus.
    pub fn focus_cell(&mut self, location: &CellLocation) -> Result<bool, GridError> {
        if !location.is_focusable(&self.columns) {
            return Ok(false);
        }
        let cell = self.cell_ref(location);
        if self
            .editor
            .as_ref()
            .is_some_and(|e| e.position != cell.position || e.column != cell.column)
        {
            self.commit_edit()?;
        }
        let unchanged = self
            .focus
            .is_some_and(|f| f.position == cell.position && f.column == cell.column);
        if !unchanged {
            self.set_focus(Some(Focus {
                position: cell.position,
                column: cell.column,
                source: cell.source,
            }));
        }
        if self.config.editable && location.is_editable(&self.columns) {
            self.open_editor(location)?;
        }
        // A commit above may have moved rows; scroll to where focus went.
        self.validate()?;
        if let Some(focused) = self.focused_cell() {
            self.bring_into_view(&focused)?;
        }
        Ok(true)
    }

    /// Scrolls the least distance that shows the whole row and column of
    /// `location`.
    ///
    /// A row below the viewport is brought in by laying rows out upward from
    /// its bottom edge.
    pub fn bring_into_view(&mut self, location: &CellLocation) -> Result<(), GridError> {
        self.validate()?;
        let position = location.position();
        if position >= self.layout.total_rows() {
            return Ok(());
        }

        let visible = self
            .metrics
            .row_extent(position)
            .is_some_and(|(top, height)| top >= 0.0 && top + height <= self.body.height + 1e-9);
        if !visible {
            if position as f64 <= self.scroll_position {
                self.set_scroll_position(position as f64);
            } else {
                let request = self.request((position + 1) as f64, true);
                let (anchored, _) = self.measure(SizerMode::Measure, &request, true)?;
                self.set_scroll_position(anchored.start_position());
            }
        }

        if let Some(column) = (location.column < self.geometry.len()).then_some(location.column) {
            let start = self.geometry.position(column);
            let end = start + self.geometry.width(column);
            let view_end = self.scroll_x + self.body.width;
            if start < self.scroll_x {
                self.set_horizontal_scroll(start);
            } else if end > view_end {
                self.set_horizontal_scroll((end - self.body.width).min(start));
            }
        }
        Ok(())
    }

    /// Moves focus or drives the editor in response to `key`.
    ///
    /// Returns `true` if the key did something.
    pub fn handle_key(&mut self, key: NavigationKey) -> Result<bool, GridError> {
        self.validate()?;
        match key {
            NavigationKey::Escape => Ok(self.cancel_edit()),
            NavigationKey::Enter => {
                if self.editor.is_some() {
                    return self.commit_edit();
                }
                match self.focused_cell() {
                    Some(location) => self.open_editor(&location),
                    None => Ok(false),
                }
            }
            _ => match self.navigation_target(key) {
                Some(target) => self.focus_cell(&target),
                None => Ok(false),
            },
        }
    }

    fn navigation_target(&self, key: NavigationKey) -> Option<CellLocation> {
        let layout = &self.layout;
        let columns = &self.columns;
        let count = columns.len();
        let focusable = |location: &CellLocation| location.is_focusable(columns);

        let Some(current) = self.focused_cell() else {
            let mut first = CellLocation::seek(layout, 0, 0);
            return (focusable(&first) || first.find_next_cell(layout, count, focusable))
                .then_some(first);
        };
        let column = current.column;
        let row_matches = |row: &RowLocation| focusable(&CellLocation::new(*row, column));

        let mut target = current;
        let found = match key {
            NavigationKey::Up => target.row.find_previous_row(layout, row_matches),
            NavigationKey::Down => target.row.find_next_row(layout, row_matches),
            NavigationKey::Left | NavigationKey::Right => {
                let in_row = |&c: &usize| focusable(&CellLocation::new(current.row, c));
                let next = if key == NavigationKey::Left {
                    (0..column).rev().find(in_row)
                } else {
                    (column + 1..count).find(in_row)
                };
                match next {
                    Some(c) => {
                        target.column = c;
                        true
                    }
                    None => false,
                }
            }
            NavigationKey::Home => {
                target.row = RowLocation::seek(layout, 0);
                row_matches(&target.row) || target.row.find_next_row(layout, row_matches)
            }
            NavigationKey::End => {
                target.row = RowLocation::seek(layout, layout.total_rows().saturating_sub(1));
                row_matches(&target.row) || target.row.find_previous_row(layout, row_matches)
            }
            NavigationKey::PageUp | NavigationKey::PageDown => {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "visible rows are bounded by max_rows."
                )]
                let page = (self.metrics.visible_rows().floor() as usize)
                    .saturating_sub(1)
                    .max(1);
                let last = layout.total_rows().saturating_sub(1);
                let position = if key == NavigationKey::PageUp {
                    current.position().saturating_sub(page)
                } else {
                    (current.position() + page).min(last)
                };
                target.row = RowLocation::seek(layout, position);
                row_matches(&target.row)
                    || target.row.find_next_row(layout, row_matches)
                    || target.row.find_previous_row(layout, row_matches)
            }
            NavigationKey::Tab | NavigationKey::BackTab => {
                let editing = self.config.editable;
                let stop = |location: &CellLocation| {
                    if editing {
                        location.is_editable(columns)
                    } else {
                        focusable(location)
                    }
                };
                if key == NavigationKey::Tab {
                    target.find_next_cell(layout, count, stop)
                } else {
                    target.find_previous_cell(layout, count, stop)
                }
            }
            NavigationKey::Enter | NavigationKey::Escape => false,
        };
        (found && target != current).then_some(target)
    }
}
