// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The grid controller.

use core::cmp::Ordering;
use core::fmt;

use kurbo::{Rect, Size};
use smallvec::SmallVec;
use trellis_view::{ListView, ViewChange};

use crate::addressing::{GroupLayout, RowKind, RowLocation};
use crate::columns::{
    self, Column, ColumnFlags, ColumnGeometry, ColumnId, ColumnSizing, SortDirection,
};
use crate::config::{GridConfig, ScrollPolicy};
use crate::error::{CellError, GridError};
use crate::event::{GridEvent, SortState};
use crate::group::{Group, GroupCache, GroupCellFactory, GroupCellKey, GroupMembers, GroupPart};
use crate::metrics::{CellMetrics, MetricsRequest, size_cells, size_cells_reversed};
use crate::recycle::{CellPool, Visual};
use crate::sizer::{CellSizer, Pools, SizerMode};

bitflags::bitflags! {
    /// Grid state that must be recomputed at the next [`DataGrid::validate`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Dirty: u8 {
        /// Rows, filter, or sort changed.
        const DATA    = 0b0000_0001;
        /// Group definitions changed.
        const GROUPS  = 0b0000_0010;
        /// Columns were added, removed, resized, or moved.
        const COLUMNS = 0b0000_0100;
        /// The viewport size changed.
        const SIZE    = 0b0000_1000;
        /// The scroll position changed.
        const SCROLL  = 0b0001_0000;
    }
}

/// Which scrollbars the last layout showed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Scrollbars {
    /// Vertical scrollbar.
    pub vertical: bool,
    /// Horizontal scrollbar.
    pub horizontal: bool,
}

/// The focused cell, tracked by column identity and, for data rows, by source
/// row so that focus follows its row through sorting and filtering.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Focus {
    pub(crate) position: usize,
    pub(crate) column: ColumnId,
    pub(crate) source: Option<usize>,
}

/// The open cell editor.
#[derive(Debug)]
pub(crate) struct Editor<V> {
    pub(crate) position: usize,
    pub(crate) column: ColumnId,
    pub(crate) source: usize,
    pub(crate) cell: V,
}

/// A virtualized, grouped data grid.
///
/// The grid owns its rows (through a [`ListView`]), its columns, and pools of
/// host visuals `V`. Mutations only mark state dirty; [`DataGrid::validate`]
/// recomputes group sizes, column widths, the scroll range, and the visible
/// cells in one pass.
pub struct DataGrid<T, V> {
    pub(crate) config: GridConfig,
    pub(crate) view: ListView<T>,
    pub(crate) columns: Vec<Column<T, V>>,
    pub(crate) grouped: bool,
    pub(crate) caches: Vec<GroupCache<T>>,
    pub(crate) layout: GroupLayout,
    pub(crate) pools: Pools<V>,
    group_factory: Option<Box<dyn GroupCellFactory<T, V>>>,
    background_factory: Option<Box<dyn Fn() -> Result<V, CellError>>>,
    pub(crate) sort: SortState,
    pub(crate) focus: Option<Focus>,
    pub(crate) editor: Option<Editor<V>>,
    size: Size,
    /// Width and height left for rows once the header and scrollbars are out.
    pub(crate) body: Size,
    pub(crate) scroll_position: f64,
    pub(crate) max_scroll_position: f64,
    pub(crate) scroll_x: f64,
    max_scroll_x: f64,
    pub(crate) geometry: ColumnGeometry,
    pub(crate) metrics: CellMetrics,
    pub(crate) header_height: f64,
    scrollbars: Scrollbars,
    pub(crate) dirty: Dirty,
    pub(crate) events: Vec<GridEvent>,
}

impl<T, V> fmt::Debug for DataGrid<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataGrid")
            .field("config", &self.config)
            .field("view", &self.view)
            .field("columns", &self.columns)
            .field("groups", &self.caches)
            .field("sort", &self.sort)
            .field("size", &self.size)
            .field("scroll_position", &self.scroll_position)
            .field("max_scroll_position", &self.max_scroll_position)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<T: 'static, V: Visual + 'static> DataGrid<T, V> {
    /// Creates an ungrouped grid over `rows` with no columns.
    ///
    /// The configuration is [normalized](GridConfig::normalized).
    pub fn new(config: GridConfig, rows: Vec<T>) -> Self {
        Self {
            config: config.normalized(),
            view: ListView::new(rows),
            columns: Vec::new(),
            grouped: false,
            caches: vec![GroupCache::new(Group::implicit())],
            layout: GroupLayout::single(0),
            pools: Pools::new(0),
            group_factory: None,
            background_factory: None,
            sort: SortState::Unsorted,
            focus: None,
            editor: None,
            size: Size::ZERO,
            body: Size::ZERO,
            scroll_position: 0.0,
            max_scroll_position: 0.0,
            scroll_x: 0.0,
            max_scroll_x: 0.0,
            geometry: ColumnGeometry::default(),
            metrics: CellMetrics::default(),
            header_height: 0.0,
            scrollbars: Scrollbars::default(),
            dirty: Dirty::all(),
            events: Vec::new(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Replaces the configuration.
    pub fn set_config(&mut self, config: GridConfig) {
        self.config = config.normalized();
        self.dirty = Dirty::all();
    }

    /// State waiting for the next [`DataGrid::validate`].
    #[must_use]
    pub const fn dirty(&self) -> Dirty {
        self.dirty
    }

    /// The row view.
    #[must_use]
    pub fn view(&self) -> &ListView<T> {
        &self.view
    }

    /// The row view, for mutation. Changes are picked up at the next
    /// validation.
    pub fn view_mut(&mut self) -> &mut ListView<T> {
        self.dirty |= Dirty::DATA;
        &mut self.view
    }

    /// Filters rows with `filter`.
    pub fn set_filter(&mut self, filter: impl Fn(&T) -> bool + 'static) {
        self.view_mut().set_filter(filter);
    }

    /// Shows every row.
    pub fn clear_filter(&mut self) {
        self.view_mut().clear_filter();
    }

    // --- columns ---

    /// The columns, in display order.
    #[must_use]
    pub fn columns(&self) -> &[Column<T, V>] {
        &self.columns
    }

    /// Index of the column with identity `id`.
    #[must_use]
    pub fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id() == id)
    }

    /// Appends a column.
    pub fn add_column(&mut self, column: Column<T, V>) {
        let index = self.columns.len();
        self.insert_column(index, column);
    }

    /// Inserts a column at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_column(&mut self, index: usize, column: Column<T, V>) {
        assert!(
            index <= self.columns.len(),
            "insert_column: index {index} out of range"
        );
        self.columns.insert(index, column);
        self.pools.body.insert(index, CellPool::new());
        self.dirty |= Dirty::COLUMNS;
    }

    /// Removes and returns the column at `index`, detaching its cells.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove_column(&mut self, index: usize) -> Column<T, V> {
        assert!(
            index < self.columns.len(),
            "remove_column: index {index} out of range"
        );
        let column = self.columns.remove(index);
        self.pools.body.remove(index).clear();
        let id = column.id();
        self.pools.headers.retain(|&key| key != id);
        if self.editor.as_ref().is_some_and(|e| e.column == id) {
            self.cancel_edit();
        }
        if self.focus.is_some_and(|f| f.column == id) {
            self.set_focus(None);
        }
        if self.sort.direction_of(id).is_some() {
            self.clear_sort();
        }
        self.dirty |= Dirty::COLUMNS;
        column
    }

    /// Edits the column at `index` in place.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn update_column(&mut self, index: usize, edit: impl FnOnce(&mut Column<T, V>)) {
        assert!(
            index < self.columns.len(),
            "update_column: index {index} out of range"
        );
        edit(&mut self.columns[index]);
        self.dirty |= Dirty::COLUMNS;
    }

    /// Shows or hides the column at `index`.
    pub fn set_column_visible(&mut self, index: usize, visible: bool) {
        self.update_column(index, |column| {
            column.sizing_mut().flags.set(ColumnFlags::VISIBLE, visible);
        });
    }

    /// Resolved column widths, valid after validation.
    #[must_use]
    pub fn column_widths(&self) -> &[f64] {
        self.geometry.widths()
    }

    /// Resolved column left edges, valid after validation.
    #[must_use]
    pub fn column_positions(&self) -> &[f64] {
        self.geometry.positions()
    }

    /// Resolved column geometry, valid after validation.
    #[must_use]
    pub fn column_geometry(&self) -> &ColumnGeometry {
        &self.geometry
    }

    /// Moves the column at `from` to index `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_column(&mut self, from: usize, to: usize) {
        let len = self.columns.len();
        assert!(
            from < len && to < len,
            "move_column: {from} -> {to} out of range for {len} columns"
        );
        if from == to {
            return;
        }
        let column = self.columns.remove(from);
        let id = column.id();
        self.columns.insert(to, column);
        let pool = self.pools.body.remove(from);
        self.pools.body.insert(to, pool);
        self.events.push(GridEvent::ColumnMoved {
            column: id,
            from,
            to,
        });
        self.dirty |= Dirty::COLUMNS;
    }

    /// Drops the header of column `from`, dragged to viewport x coordinate `x`.
    ///
    /// Returns the column's new index, or `None` if reordering is disabled or
    /// the column is not reorderable.
    pub fn drag_column(&mut self, from: usize, x: f64) -> Option<usize> {
        if !self.config.column_reordering_enabled
            || !self.columns.get(from)?.has(ColumnFlags::REORDERABLE)
        {
            return None;
        }
        let sizings = self.sizings();
        let to = columns::reorder_index(&sizings, &self.geometry, from, x + self.scroll_x);
        self.move_column(from, to);
        Some(to)
    }

    /// Resizes the column at `index` to `width`.
    ///
    /// Returns the width the column received, or `None` if resizing is
    /// disabled or the column is not resizable. A resize that changes nothing
    /// raises no event. Call after validation so the current widths are known.
    pub fn resize_column(&mut self, index: usize, width: f64) -> Option<f64> {
        if !self.config.column_resizing_enabled
            || !self.columns.get(index)?.has(ColumnFlags::RESIZABLE)
        {
            return None;
        }
        let before = self.sizings();
        let mut sizings = before.clone();
        let widths = if self.geometry.len() == sizings.len() {
            self.geometry.widths().to_vec()
        } else {
            vec![0.0; sizings.len()]
        };
        let width = columns::resize_column(
            &mut sizings,
            &widths,
            index,
            width,
            self.config.h_scroll_policy,
        );
        if sizings == before {
            return Some(width);
        }
        for (column, sizing) in self.columns.iter_mut().zip(sizings) {
            *column.sizing_mut() = sizing;
        }
        self.events.push(GridEvent::ColumnResized {
            column: self.columns[index].id(),
            width,
        });
        self.dirty |= Dirty::COLUMNS;
        Some(width)
    }

    fn sizings(&self) -> Vec<ColumnSizing> {
        self.columns.iter().map(|c| *c.sizing()).collect()
    }

    // --- groups ---

    /// Replaces the row groups. `None` or an empty list shows every row in one
    /// implicit group without header or footer.
    pub fn set_groups(&mut self, groups: Option<Vec<Group<T>>>) {
        self.invalidate_groups();
        self.pools.group_cells.clear();
        let groups = groups.filter(|groups| !groups.is_empty());
        self.grouped = groups.is_some();
        self.caches = match groups {
            Some(groups) => groups.into_iter().map(GroupCache::new).collect(),
            None => vec![GroupCache::new(Group::implicit())],
        };
        self.dirty |= Dirty::GROUPS;
    }

    /// The explicit groups; empty when the grid is ungrouped.
    pub fn groups(&self) -> impl Iterator<Item = &Group<T>> + '_ {
        self.caches
            .iter()
            .filter(|_| self.grouped)
            .map(GroupCache::group)
    }

    /// Edits group `index` in place.
    ///
    /// # Panics
    ///
    /// Panics if the grid is ungrouped or `index` is out of range.
    pub fn update_group(&mut self, index: usize, edit: impl FnOnce(&mut Group<T>)) {
        assert!(
            self.grouped && index < self.caches.len(),
            "update_group: no group {index}"
        );
        let cache = &mut self.caches[index];
        edit(cache.group_mut());
        for handle in cache.invalidate() {
            self.pools.group_cells.release(handle);
        }
        self.dirty |= Dirty::GROUPS;
    }

    /// Collapses or expands group `index`.
    pub fn set_group_collapsed(&mut self, index: usize, collapsed: bool) {
        self.update_group(index, |group| group.set_collapsed(collapsed));
    }

    /// Sets the factory for group header and footer visuals.
    pub fn set_group_cell_factory(&mut self, factory: impl GroupCellFactory<T, V> + 'static) {
        self.group_factory = Some(Box::new(factory));
        self.pools.group_cells.clear();
        self.invalidate_groups();
        self.dirty |= Dirty::GROUPS;
    }

    /// Sets the factory for row background visuals, or removes them.
    pub fn set_row_background_factory(
        &mut self,
        factory: Option<Box<dyn Fn() -> Result<V, CellError>>>,
    ) {
        self.background_factory = factory;
        self.pools.backgrounds.clear();
        self.dirty |= Dirty::COLUMNS;
    }

    fn invalidate_groups(&mut self) {
        for cache in &mut self.caches {
            for handle in cache.invalidate() {
                self.pools.group_cells.release(handle);
            }
        }
    }

    /// Group sizes as of the last validation.
    #[must_use]
    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    /// Number of display rows, including group headers and footers.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.layout.total_rows()
    }

    /// Element ↔ source translation over the current groups.
    #[must_use]
    pub fn group_rows(&self) -> GroupMembers<'_, T> {
        GroupMembers::new(&self.caches, &self.view)
    }

    /// Seeks to an absolute display position.
    #[must_use]
    pub fn row_at(&self, position: usize) -> RowLocation {
        RowLocation::seek(&self.layout, position)
    }

    /// Display row of source row `source`, if it is shown.
    #[must_use]
    pub fn seek_to_source(&self, source: usize) -> Option<RowLocation> {
        RowLocation::seek_to_source(&self.layout, &self.group_rows(), source)
    }

    /// Source row shown at `row`.
    #[must_use]
    pub fn source_index(&self, row: &RowLocation) -> Option<usize> {
        row.source_index(&self.group_rows())
    }

    // --- sorting ---

    /// Current row ordering.
    #[must_use]
    pub const fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Sorts rows by the column at `index`.
    ///
    /// A descending sort is the exact reverse of the ascending one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn sort_by_column(&mut self, index: usize, direction: SortDirection) {
        assert!(
            index < self.columns.len(),
            "sort_by_column: index {index} out of range"
        );
        let column = &self.columns[index];
        let id = column.id();
        let factory = column.shared_factory();
        self.view
            .set_sort_comparator(move |a, b| factory.compare_rows(a, b).unwrap_or(Ordering::Equal));
        self.view.set_reversed(direction == SortDirection::Descending);
        self.set_sort(SortState::Column { id, direction });
    }

    /// Sorts rows with a host comparator.
    pub fn set_custom_sort(&mut self, comparator: impl Fn(&T, &T) -> Ordering + 'static) {
        self.view.set_sort_comparator(comparator);
        self.view.set_reversed(false);
        self.set_sort(SortState::Custom);
    }

    /// Restores source order.
    pub fn clear_sort(&mut self) {
        self.view.clear_sort();
        self.view.set_reversed(false);
        self.set_sort(SortState::Unsorted);
    }

    fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
        self.events.push(GridEvent::SortChanged(sort));
        self.dirty |= Dirty::DATA | Dirty::COLUMNS;
    }

    /// Handles a click on the header of column `index`: sorts ascending, or
    /// flips the direction if the grid is already sorted by that column.
    ///
    /// Returns `false` if sorting is disabled or the column is not sortable.
    pub fn click_header(&mut self, index: usize) -> bool {
        let Some(column) = self.columns.get(index) else {
            return false;
        };
        if !self.config.column_sorting_enabled || !column.has(ColumnFlags::SORTABLE) {
            return false;
        }
        let direction = self
            .sort
            .direction_of(column.id())
            .map_or(SortDirection::Ascending, SortDirection::toggled);
        self.sort_by_column(index, direction);
        true
    }

    // --- geometry and scrolling ---

    /// Sets the viewport size.
    pub fn set_size(&mut self, size: Size) {
        if size != self.size {
            self.size = size;
            self.dirty |= Dirty::SIZE;
        }
    }

    /// Viewport size.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Height of the column header row, valid after validation.
    #[must_use]
    pub const fn header_height(&self) -> f64 {
        self.header_height
    }

    /// Area left for rows, valid after validation.
    #[must_use]
    pub const fn body_size(&self) -> Size {
        self.body
    }

    /// Scrollbars shown by the last layout.
    #[must_use]
    pub const fn scrollbars(&self) -> Scrollbars {
        self.scrollbars
    }

    /// Vertical scroll position in fractional display rows.
    #[must_use]
    pub const fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    /// Largest vertical scroll position, valid after validation.
    #[must_use]
    pub const fn max_scroll_position(&self) -> f64 {
        self.max_scroll_position
    }

    /// Scrolls so fractional display row `position` is at the top. The value
    /// is clamped at the next validation.
    pub fn set_scroll_position(&mut self, position: f64) {
        let position = if position.is_finite() {
            position.max(0.0)
        } else {
            0.0
        };
        if position != self.scroll_position {
            self.scroll_position = position;
            self.dirty |= Dirty::SCROLL;
        }
    }

    /// Scrolls by `rows` display rows.
    pub fn scroll_by_rows(&mut self, rows: f64) {
        self.set_scroll_position(self.scroll_position + rows);
    }

    /// Horizontal scroll offset in pixels.
    #[must_use]
    pub const fn horizontal_scroll(&self) -> f64 {
        self.scroll_x
    }

    /// Largest horizontal scroll offset, valid after validation.
    #[must_use]
    pub const fn max_horizontal_scroll(&self) -> f64 {
        self.max_scroll_x
    }

    /// Scrolls horizontally to `x` pixels. The value is clamped at the next
    /// validation.
    pub fn set_horizontal_scroll(&mut self, x: f64) {
        let x = if x.is_finite() { x.max(0.0) } else { 0.0 };
        if x != self.scroll_x {
            self.scroll_x = x;
            self.dirty |= Dirty::SCROLL;
        }
    }

    /// Metrics of the visible rows, valid after validation.
    #[must_use]
    pub fn metrics(&self) -> &CellMetrics {
        &self.metrics
    }

    // --- cells ---

    /// Body cell of the column at `column` on display row `position`, if it is
    /// laid out.
    #[must_use]
    pub fn body_cell(&self, position: usize, column: usize) -> Option<&V> {
        self.pools.body.get(column)?.get_by_key(&position)
    }

    /// Number of live body cells of the column at `column`.
    #[must_use]
    pub fn live_body_cells(&self, column: usize) -> usize {
        self.pools.body.get(column).map_or(0, CellPool::live_count)
    }

    /// Header cell of the column at `column`.
    #[must_use]
    pub fn header_cell(&self, column: usize) -> Option<&V> {
        self.pools.headers.get(&self.columns.get(column)?.id())
    }

    /// Header or footer visual of group `group`, if it is laid out.
    #[must_use]
    pub fn group_cell(&self, group: usize, part: GroupPart) -> Option<&V> {
        self.pools
            .group_cells
            .get(self.caches.get(group)?.cell(part)?)
    }

    /// Background visual of display row `position`, if it is laid out.
    #[must_use]
    pub fn row_background(&self, position: usize) -> Option<&V> {
        self.pools.backgrounds.get_by_key(&position)
    }

    /// Drains the events raised since the last call.
    pub fn take_events(&mut self) -> Vec<GridEvent> {
        core::mem::take(&mut self.events)
    }

    // --- layout ---

    /// Recomputes whatever is dirty: group sizes, column widths, the scroll
    /// range, and the visible cells.
    ///
    /// Does nothing when nothing changed. On error every part is marked dirty
    /// again so the next call starts over.
    pub fn validate(&mut self) -> Result<(), GridError> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        let dirty = core::mem::replace(&mut self.dirty, Dirty::empty());
        let result = self.run_layout(dirty);
        if result.is_err() {
            self.dirty = Dirty::all();
        }
        result
    }

    fn run_layout(&mut self, dirty: Dirty) -> Result<(), GridError> {
        let mut changes = Vec::new();
        if dirty.contains(Dirty::DATA) {
            changes = self.view.commit();
            if !changes.is_empty() {
                tracing::trace!(changes = changes.len(), "view changes committed");
                self.invalidate_groups();
            }
        }
        if dirty.intersects(Dirty::DATA | Dirty::GROUPS) {
            for cache in &mut self.caches {
                cache.refresh(&self.view);
            }
            self.layout = GroupLayout::new(self.caches.iter().map(GroupCache::span));
            self.follow_rows(&changes);
        }
        if dirty != Dirty::SCROLL {
            self.resolve_geometry()?;
        }
        self.max_scroll_x = (self.geometry.total_width() - self.body.width).max(0.0);
        self.scroll_x = self.scroll_x.clamp(0.0, self.max_scroll_x);
        self.scroll_position = self.scroll_position.clamp(0.0, self.max_scroll_position);

        let request = self.request(self.scroll_position, false);
        let (metrics, released) = self.measure(SizerMode::Layout, &request, false)?;
        self.metrics = metrics;
        self.place_cells();

        tracing::debug!(
            rows = self.layout.total_rows(),
            visible_rows = self.metrics.visible_rows(),
            scroll = self.scroll_position,
            max_scroll = self.max_scroll_position,
            live_cells = self.pools.live_count(),
            released,
            "grid validated"
        );
        Ok(())
    }

    /// Resolves column widths, the header, scrollbars, and the scroll range.
    fn resolve_geometry(&mut self) -> Result<(), GridError> {
        let thickness = self.config.scrollbar_thickness;
        let sizings = self.sizings();
        let mut vertical = self.config.v_scroll_policy == ScrollPolicy::On;
        loop {
            let width = (self.size.width - if vertical { thickness } else { 0.0 }).max(0.0);
            self.geometry =
                columns::resolve_column_widths(&sizings, width, self.config.h_scroll_policy);
            let horizontal = match self.config.h_scroll_policy {
                ScrollPolicy::On => true,
                ScrollPolicy::Off => false,
                ScrollPolicy::Auto => self.geometry.total_width() > width + 1e-9,
            };
            self.header_height = self.layout_headers()?;
            let height = (self.size.height
                - self.header_height
                - if horizontal { thickness } else { 0.0 })
            .max(0.0);
            self.body = Size::new(width, height);
            self.scrollbars = Scrollbars {
                vertical,
                horizontal,
            };

            let total = self.layout.total_rows() as f64;
            let request = self.request(total, true);
            let (tail, _) = self.measure(SizerMode::Measure, &request, true)?;
            self.max_scroll_position = tail.start_position();

            if self.config.v_scroll_policy == ScrollPolicy::Auto
                && !vertical
                && self.max_scroll_position > 0.0
            {
                vertical = true;
                continue;
            }
            return Ok(());
        }
    }

    /// Creates, fills, and measures header cells; returns the header height.
    fn layout_headers(&mut self) -> Result<f64, GridError> {
        if !self.config.header_visible || self.columns.is_empty() {
            self.pools.headers.retain(|_| false);
            return Ok(0.0);
        }
        let shown: SmallVec<[ColumnId; 16]> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.geometry.width(*i) > 0.0)
            .map(|(_, c)| c.id())
            .collect();
        self.pools.headers.retain(|id| shown.contains(id));

        let mut measured = 0.0_f64;
        for (index, column) in self.columns.iter().enumerate() {
            let width = self.geometry.width(index);
            if width <= 0.0 {
                continue;
            }
            let factory = column.factory();
            let cell = self
                .pools
                .headers
                .obtain(column.id(), column.revision(), || {
                    factory
                        .create_header(column.title())
                        .map_err(|source| GridError::ColumnCell {
                            column: index,
                            source,
                        })
                })?;
            factory.set_header_sort(cell, self.sort.direction_of(column.id()));
            if self.config.row_height.is_none() {
                measured = measured.max(cell.measure_height(width));
            }
        }
        let height = self.config.row_height.unwrap_or(measured);
        Ok(height.max(self.config.min_row_height))
    }

    pub(crate) fn request(&self, position: f64, allow_virtual: bool) -> MetricsRequest {
        MetricsRequest {
            width: self.body.width,
            height: self.body.height,
            position,
            row_height: self.config.row_height,
            min_row_height: self.config.min_row_height,
            max_rows: self.config.max_rows,
            allow_virtual,
        }
    }

    /// Runs one metrics pass over the visible columns. Returns the metrics and
    /// the number of cells released.
    pub(crate) fn measure(
        &mut self,
        mode: SizerMode,
        request: &MetricsRequest,
        reversed: bool,
    ) -> Result<(CellMetrics, usize), GridError> {
        let visible = self.geometry.visible_range(self.scroll_x, self.body.width);
        let mut sizer = CellSizer {
            mode,
            fixed: self.config.row_height.is_some(),
            view: &self.view,
            caches: &mut self.caches,
            columns: &self.columns,
            geometry: &self.geometry,
            visible,
            pools: &mut self.pools,
            group_factory: self.group_factory.as_deref(),
            background_factory: self.background_factory.as_deref(),
            row_width: self.body.width,
            released: 0,
        };
        let metrics = if reversed {
            size_cells_reversed(&self.layout, &mut sizer, request)?
        } else {
            size_cells(&self.layout, &mut sizer, request)?
        };
        Ok((metrics, sizer.released))
    }

    /// Gives every live visual its frame.
    fn place_cells(&mut self) {
        let x0 = -self.scroll_x;
        let header = self.header_height;
        for (index, column) in self.columns.iter().enumerate() {
            if let Some(cell) = self.pools.headers.get_mut(&column.id()) {
                let x = x0 + self.geometry.position(index);
                cell.set_frame(Rect::new(x, 0.0, x + self.geometry.width(index), header));
            }
        }

        let visible = self.geometry.visible_range(self.scroll_x, self.body.width);
        let row_width = self.geometry.total_width().max(self.body.width);
        let mut row = RowLocation::seek(&self.layout, self.metrics.first_position());
        for k in 0..self.metrics.row_count() {
            if k > 0 {
                row.move_to_next_row(&self.layout);
            }
            let position = row.position();
            let top = header + self.metrics.row_positions()[k];
            let bottom = top + self.metrics.row_heights()[k];
            let part = match row.kind() {
                Some(RowKind::Element(_)) => {
                    for index in visible.clone() {
                        if let Some(cell) = self.pools.body[index].get_by_key_mut(&position) {
                            let x = x0 + self.geometry.position(index);
                            cell.set_frame(Rect::new(x, top, x + self.geometry.width(index), bottom));
                        }
                    }
                    if let Some(cell) = self.pools.backgrounds.get_by_key_mut(&position) {
                        cell.set_frame(Rect::new(x0, top, x0 + row_width, bottom));
                    }
                    continue;
                }
                Some(RowKind::Header) => GroupPart::Header,
                Some(RowKind::Footer) => GroupPart::Footer,
                None => continue,
            };
            let key = GroupCellKey {
                group: row.group_index(),
                part,
            };
            if let Some(cell) = self.pools.group_cells.get_by_key_mut(&key) {
                cell.set_frame(Rect::new(0.0, top, self.body.width, bottom));
            }
        }

        if let Some(editor) = &mut self.editor
            && let Some(index) = self.columns.iter().position(|c| c.id() == editor.column)
            && let Some((y, height)) = self.metrics.row_extent(editor.position)
        {
            let x = x0 + self.geometry.position(index);
            let top = header + y;
            editor.cell.set_frame(Rect::new(
                x,
                top,
                x + self.geometry.width(index),
                top + height,
            ));
        }
    }

    /// Moves focus and the editor to wherever their rows landed.
    ///
    /// Sources are first carried through `changes`. A removed row, or a reset
    /// of all rows, drops focus and cancels the editor.
    fn follow_rows(&mut self, changes: &[ViewChange]) {
        let members = GroupMembers::new(&self.caches, &self.view);
        let reset = changes.contains(&ViewChange::Reset);
        let relocate = |position: usize, source: Option<usize>| match source {
            _ if reset => None,
            Some(source) => remap_source(source, changes).and_then(|source| {
                RowLocation::seek_to_source(&self.layout, &members, source)
                    .map(|row| (row.position(), Some(source)))
            }),
            None => Some((position, None))
                .filter(|&(p, _)| RowLocation::seek(&self.layout, p).is_valid()),
        };

        let focus = self.focus.map(|focus| {
            let moved = relocate(focus.position, focus.source);
            (focus, moved)
        });
        let editor = self
            .editor
            .as_ref()
            .map(|editor| relocate(editor.position, Some(editor.source)));

        match focus {
            Some((mut focus, Some((position, source)))) => {
                focus.position = position;
                focus.source = source;
                self.focus = Some(focus);
            }
            Some((_, None)) => self.set_focus(None),
            None => {}
        }
        match editor {
            Some(Some((position, Some(source)))) => {
                if let Some(editor) = &mut self.editor {
                    editor.position = position;
                    editor.source = source;
                }
            }
            Some(_) => {
                self.cancel_edit();
            }
            None => {}
        }
    }
}

/// Carries a source index recorded before `changes` to the index of the same
/// row after them. Returns `None` if the row was removed or the rows reset.
fn remap_source(mut source: usize, changes: &[ViewChange]) -> Option<usize> {
    for change in changes.iter().filter(|change| change.is_structural()) {
        match *change {
            ViewChange::Added { index, count } if source >= index => source += count,
            ViewChange::Removed { index, count } if source >= index => {
                if source < index + count {
                    return None;
                }
                source -= count;
            }
            ViewChange::Reset => return None,
            _ => {}
        }
    }
    Some(source)
}

#[cfg(test)]
pub(crate) mod tests {
    use kurbo::{Rect, Size};

    use super::{DataGrid, Dirty};
    use crate::columns::{Column, ColumnFlags, ColumnId, ColumnWidth, FnCells, SortDirection};
    use crate::config::{GridConfig, ScrollPolicy};
    use crate::error::{CellError, GridError};
    use crate::event::{GridEvent, SortState};
    use crate::group::{Group, GroupCellFactory, GroupPart};
    use crate::recycle::Visual;

    #[derive(Debug, Default)]
    pub(crate) struct Label {
        pub(crate) text: String,
        pub(crate) height: f64,
        pub(crate) attached: bool,
        pub(crate) frame: Option<Rect>,
    }

    impl Label {
        pub(crate) fn new(text: &str) -> Self {
            Self {
                text: text.to_owned(),
                height: 20.0,
                ..Self::default()
            }
        }
    }

    impl Visual for Label {
        fn measure_height(&mut self, _width: f64) -> f64 {
            self.height
        }

        fn set_frame(&mut self, frame: Rect) {
            self.frame = Some(frame);
        }

        fn attach(&mut self) {
            assert!(!self.attached, "label {:?} attached twice", self.text);
            self.attached = true;
        }

        fn detach(&mut self) {
            assert!(self.attached, "label {:?} detached while idle", self.text);
            self.attached = false;
        }
    }

    pub(crate) fn value_column(id: u32) -> Column<u32, Label> {
        Column::new(
            ColumnId(id),
            format!("c{id}"),
            FnCells::new(
                |row: &u32| *row,
                |title| Ok(Label::new(title)),
                || Ok(Label::new("")),
                |label: &mut Label, value: u32| label.text = value.to_string(),
            )
            .with_natural_order()
            .with_editor(
                || Ok(Label::new("")),
                |label: &Label| label.text.parse().ok(),
                |row: &mut u32, value: u32| *row = value,
            ),
        )
    }

    pub(crate) fn config() -> GridConfig {
        GridConfig {
            row_height: Some(20.0),
            header_visible: false,
            h_scroll_policy: ScrollPolicy::Off,
            v_scroll_policy: ScrollPolicy::Off,
            ..GridConfig::default()
        }
    }

    /// Two value columns over rows `0..rows`, in a 200 x 200 viewport.
    pub(crate) fn grid(rows: u32) -> DataGrid<u32, Label> {
        let mut grid = DataGrid::new(config(), (0..rows).collect());
        grid.add_column(value_column(0));
        grid.add_column(value_column(1));
        grid.set_size(Size::new(200.0, 200.0));
        grid
    }

    fn shown_sources(grid: &DataGrid<u32, Label>) -> Vec<usize> {
        (0..grid.total_rows())
            .filter_map(|p| grid.source_index(&grid.row_at(p)))
            .collect()
    }

    struct GroupLabels;

    impl GroupCellFactory<u32, Label> for GroupLabels {
        fn create(&self, _part: GroupPart) -> Result<Label, CellError> {
            Ok(Label::new(""))
        }

        fn set_group_data(
            &self,
            cell: &mut Label,
            group: &Group<u32>,
            _part: GroupPart,
            rows: usize,
        ) {
            cell.text = format!("{} ({rows})", group.name());
        }
    }

    #[test]
    fn thousand_fixed_rows_show_ten() {
        let mut grid = grid(1000);
        grid.validate().unwrap();
        assert_eq!(grid.metrics().visible_rows(), 10.0);
        assert_eq!(grid.max_scroll_position(), 990.0);
        assert_eq!(grid.live_body_cells(0), 10);
        assert_eq!(grid.live_body_cells(1), 10);
        assert_eq!(grid.body_cell(9, 1).unwrap().text, "9");
        assert!(grid.dirty().is_empty());

        grid.set_scroll_position(5000.0);
        grid.validate().unwrap();
        assert_eq!(grid.scroll_position(), 990.0);
        assert_eq!(grid.metrics().first_position(), 990);
    }

    #[test]
    fn scrolling_recycles_cells() {
        let mut grid = grid(1000);
        grid.validate().unwrap();
        grid.set_scroll_position(500.0);
        grid.validate().unwrap();
        assert_eq!(grid.live_body_cells(0), 10);
        assert!(grid.body_cell(0, 0).is_none());
        let cell = grid.body_cell(503, 0).unwrap();
        assert_eq!(cell.text, "503");
        assert!(cell.attached);
        assert_eq!(cell.frame, Some(Rect::new(0.0, 60.0, 100.0, 80.0)));

        grid.set_scroll_position(2.5);
        grid.validate().unwrap();
        assert_eq!(grid.metrics().first_position(), 2);
        let rows = grid.metrics().row_count();
        assert_eq!(grid.live_body_cells(0), rows);
        assert_eq!(grid.live_body_cells(1), rows);
        assert_eq!(grid.body_cell(2, 0).unwrap().frame.unwrap().y0, -10.0);
    }

    #[test]
    fn measured_rows_take_the_tallest_cell() {
        let mut grid = grid(100);
        let mut config = config();
        config.row_height = None;
        config.min_row_height = 25.0;
        grid.set_config(config);
        grid.validate().unwrap();
        // Labels want 20, the minimum wins.
        assert_eq!(grid.metrics().row_heights()[0], 25.0);
        assert_eq!(grid.metrics().row_count(), 8);
    }

    #[test]
    fn groups_count_their_header_rows() {
        let mut grid = grid(12);
        grid.set_group_cell_factory(GroupLabels);
        grid.set_groups(Some(vec![
            Group::new("low").with_filter(|v: &u32| *v < 5),
            Group::new("high").with_filter(|v: &u32| *v >= 5),
        ]));
        grid.set_size(Size::new(200.0, 400.0));
        grid.validate().unwrap();

        assert_eq!(grid.total_rows(), 14);
        assert!(grid.row_at(0).is_header());
        assert!(grid.row_at(6).is_header());
        assert_eq!(grid.row_at(6).group_index(), 1);
        assert_eq!(grid.source_index(&grid.row_at(7)), Some(5));
        assert_eq!(grid.group_cell(1, GroupPart::Header).unwrap().text, "high (7)");
        assert!(grid.body_cell(0, 0).is_none());

        grid.set_group_collapsed(1, true);
        grid.validate().unwrap();
        assert_eq!(grid.total_rows(), 7);
        assert_eq!(grid.group_cell(1, GroupPart::Header).unwrap().text, "high (7)");
        assert_eq!(grid.live_body_cells(0), 5);
    }

    #[test]
    fn fixed_and_flexible_columns_share_the_width() {
        let mut grid = DataGrid::new(config(), (0..3).collect::<Vec<u32>>());
        grid.add_column(value_column(0).with_width(ColumnWidth::Fixed(50.0)));
        grid.add_column(value_column(1));
        grid.set_size(Size::new(200.0, 200.0));
        grid.validate().unwrap();
        assert_eq!(grid.column_widths(), &[50.0, 150.0]);
        assert_eq!(grid.column_positions(), &[0.0, 50.0]);
    }

    #[test]
    fn filtered_rows_cannot_be_found() {
        let mut grid = grid(10);
        grid.set_filter(|v: &u32| *v != 3);
        grid.validate().unwrap();
        assert_eq!(grid.total_rows(), 9);
        assert!(grid.seek_to_source(3).is_none());
        let row = grid.seek_to_source(4).unwrap();
        assert!(row.is_valid());
        assert_eq!(row.position(), 3);
    }

    #[test]
    fn descending_is_the_reverse_of_ascending() {
        let mut grid = DataGrid::new(config(), vec![3_u32, 1, 2, 1]);
        grid.add_column(value_column(0));
        grid.set_size(Size::new(200.0, 200.0));

        grid.sort_by_column(0, SortDirection::Ascending);
        grid.validate().unwrap();
        let ascending = shown_sources(&grid);
        assert_eq!(ascending, vec![1, 3, 2, 0]);

        grid.sort_by_column(0, SortDirection::Descending);
        grid.validate().unwrap();
        let mut descending = shown_sources(&grid);
        descending.reverse();
        assert_eq!(descending, ascending);
    }

    #[test]
    fn header_clicks_toggle_the_sort() {
        let mut grid = grid(5);
        assert!(grid.click_header(0));
        assert!(grid.click_header(0));
        let id = ColumnId(0);
        assert_eq!(
            grid.sort_state(),
            SortState::Column {
                id,
                direction: SortDirection::Descending
            }
        );
        grid.validate().unwrap();
        assert_eq!(grid.body_cell(0, 1).unwrap().text, "4");

        grid.update_column(1, |c| {
            *c = value_column(1).with_flags(ColumnFlags::default() - ColumnFlags::SORTABLE);
        });
        assert!(!grid.click_header(1));
        let events = grid.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], GridEvent::SortChanged(SortState::Column { .. })));
    }

    #[test]
    fn header_cells_follow_the_sort_and_visibility() {
        let mut grid = grid(5);
        let mut config = config();
        config.header_visible = true;
        grid.set_config(config);
        grid.validate().unwrap();
        assert_eq!(grid.header_height(), 20.0);
        assert_eq!(grid.body_size(), Size::new(200.0, 180.0));
        assert_eq!(grid.header_cell(1).unwrap().text, "c1");
        assert_eq!(
            grid.body_cell(0, 0).unwrap().frame,
            Some(Rect::new(0.0, 20.0, 100.0, 40.0))
        );

        grid.set_column_visible(1, false);
        grid.validate().unwrap();
        assert!(grid.header_cell(1).is_none());
        assert_eq!(grid.live_body_cells(1), 0);
        assert_eq!(grid.column_widths(), &[200.0, 0.0]);
    }

    #[test]
    fn moves_and_resizes_raise_events() {
        let mut grid = grid(5);
        grid.validate().unwrap();
        grid.move_column(0, 1);
        assert_eq!(grid.columns()[1].id(), ColumnId(0));
        assert_eq!(grid.resize_column(0, 60.0), Some(60.0));
        grid.validate().unwrap();
        assert_eq!(grid.column_widths()[0], 60.0);
        assert_eq!(grid.body_cell(0, 1).unwrap().frame.unwrap().x0, 60.0);
        assert_eq!(
            grid.take_events(),
            vec![
                GridEvent::ColumnMoved {
                    column: ColumnId(0),
                    from: 0,
                    to: 1
                },
                GridEvent::ColumnResized {
                    column: ColumnId(1),
                    width: 60.0
                },
            ]
        );
    }

    #[test]
    fn resizing_the_last_column_without_scrolling_is_a_no_op() {
        let mut grid = grid(5);
        grid.validate().unwrap();
        assert_eq!(grid.resize_column(1, 150.0), Some(100.0));
        assert!(grid.take_events().is_empty());
        assert!(grid.dirty().is_empty());
        assert_eq!(grid.columns()[1].sizing().width, ColumnWidth::Flex(1.0));
        assert_eq!(grid.column_widths(), &[100.0, 100.0]);
    }

    #[test]
    fn dragged_headers_land_past_the_midpoint() {
        let mut grid = grid(5);
        grid.validate().unwrap();
        assert_eq!(grid.drag_column(0, 190.0), Some(1));
        assert_eq!(grid.columns()[1].id(), ColumnId(0));
        assert_eq!(
            grid.take_events(),
            vec![GridEvent::ColumnMoved {
                column: ColumnId(0),
                from: 0,
                to: 1
            }]
        );

        let mut config = config();
        config.column_reordering_enabled = false;
        grid.set_config(config);
        assert_eq!(grid.drag_column(0, 190.0), None);
        assert_eq!(grid.columns()[0].id(), ColumnId(1));
    }

    #[test]
    fn custom_sort_replaces_the_column_sort() {
        let mut grid = grid(5);
        grid.sort_by_column(0, SortDirection::Descending);
        grid.set_custom_sort(|a: &u32, b: &u32| (a % 2, a).cmp(&(b % 2, b)));
        assert_eq!(grid.sort_state(), SortState::Custom);
        grid.validate().unwrap();
        assert_eq!(shown_sources(&grid), vec![0, 2, 4, 1, 3]);
        assert_eq!(
            grid.take_events().last(),
            Some(&GridEvent::SortChanged(SortState::Custom))
        );
    }

    #[test]
    fn horizontal_scroll_culls_columns_out_of_view() {
        let mut config = config();
        config.h_scroll_policy = ScrollPolicy::Auto;
        let mut grid = DataGrid::new(config, (0..50).collect::<Vec<u32>>());
        for id in 0..3 {
            grid.add_column(value_column(id).with_width(ColumnWidth::Fixed(150.0)));
        }
        grid.set_size(Size::new(200.0, 200.0));
        grid.validate().unwrap();
        assert_eq!(grid.live_body_cells(0), 10);
        assert_eq!(grid.live_body_cells(2), 0);

        grid.set_horizontal_scroll(160.0);
        grid.validate().unwrap();
        assert_eq!(grid.live_body_cells(0), 0);
        assert_eq!(grid.live_body_cells(1), 10);
        assert_eq!(grid.live_body_cells(2), 10);
        assert_eq!(grid.body_cell(0, 1).unwrap().frame.unwrap().x0, -10.0);
    }

    #[test]
    fn factory_failures_surface_and_retry() {
        let mut grid = DataGrid::new(config(), (0..5).collect::<Vec<u32>>());
        grid.add_column(Column::new(
            ColumnId(0),
            "broken",
            FnCells::new(
                |row: &u32| *row,
                |title| Ok(Label::new(title)),
                || Err(CellError::new("out of visuals")),
                |label: &mut Label, value: u32| label.text = value.to_string(),
            ),
        ));
        grid.set_size(Size::new(200.0, 200.0));
        let err = grid.validate().unwrap_err();
        assert!(matches!(err, GridError::ColumnCell { column: 0, .. }));
        assert_eq!(grid.dirty(), Dirty::all());

        grid.remove_column(0);
        grid.add_column(value_column(0));
        grid.validate().unwrap();
        assert_eq!(grid.live_body_cells(0), 5);
    }

    #[test]
    fn row_backgrounds_span_the_row() {
        let mut grid = grid(30);
        grid.set_row_background_factory(Some(Box::new(|| Ok::<_, CellError>(Label::new("bg")))));
        grid.validate().unwrap();
        assert_eq!(
            grid.row_background(1).unwrap().frame,
            Some(Rect::new(0.0, 20.0, 200.0, 40.0))
        );
        grid.set_scroll_position(20.0);
        grid.validate().unwrap();
        assert!(grid.row_background(1).is_none());
        assert!(grid.row_background(25).unwrap().attached);
    }
}
