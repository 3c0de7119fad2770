// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Columns: cell factories, flags, and pixel width resolution.

use core::cmp::Ordering;
use core::fmt;
use core::ops::Range;
use std::rc::Rc;

use crate::addressing::CellLocation;
use crate::config::ScrollPolicy;
use crate::error::CellError;

bitflags::bitflags! {
    /// Column capabilities.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ColumnFlags: u8 {
        /// Column takes part in layout.
        const VISIBLE     = 0b0000_0001;
        /// Clicking the header sorts by this column.
        const SORTABLE    = 0b0000_0010;
        /// The column's right edge can be dragged.
        const RESIZABLE   = 0b0000_0100;
        /// The header can be dragged to a new index.
        const REORDERABLE = 0b0000_1000;
        /// Body cells open an editor.
        const EDITABLE    = 0b0001_0000;
        /// Body cells can take focus.
        const FOCUSABLE   = 0b0010_0000;
    }
}

impl Default for ColumnFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::SORTABLE | Self::RESIZABLE | Self::REORDERABLE | Self::FOCUSABLE
    }
}

/// Stable identity of a column; survives reordering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnId(pub u32);

/// Sort direction of a column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// How a column's width is chosen.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnWidth {
    /// A fixed pixel width.
    Fixed(f64),
    /// A percentage (0–100) of the available width.
    Percent(f64),
    /// A share of whatever width the other columns leave, by weight.
    Flex(f64),
}

impl ColumnWidth {
    /// Returns `true` for [`ColumnWidth::Flex`].
    #[must_use]
    pub const fn is_flexible(&self) -> bool {
        matches!(self, Self::Flex(_))
    }
}

/// The layout-relevant part of a column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnSizing {
    /// Width rule.
    pub width: ColumnWidth,
    /// Lower bound applied after every rule.
    pub min_width: f64,
    /// Capabilities.
    pub flags: ColumnFlags,
}

impl Default for ColumnSizing {
    fn default() -> Self {
        Self {
            width: ColumnWidth::Flex(1.0),
            min_width: 0.0,
            flags: ColumnFlags::default(),
        }
    }
}

impl ColumnSizing {
    fn visible(&self) -> bool {
        self.flags.contains(ColumnFlags::VISIBLE)
    }

    fn min(&self) -> f64 {
        if self.min_width.is_finite() {
            self.min_width.max(0.0)
        } else {
            0.0
        }
    }
}

/// Builds, fills, and compares the cells of one column.
///
/// `T` is the row type and `V` the host visual type.
pub trait CellFactory<T, V> {
    /// Creates the header cell showing `title`.
    fn create_header(&self, title: &str) -> Result<V, CellError>;

    /// Creates an empty body cell.
    fn create_body(&self) -> Result<V, CellError>;

    /// Creates an editor cell. Columns without an editor keep the default.
    fn create_editor(&self) -> Result<V, CellError> {
        Err(CellError::new("column has no editor"))
    }

    /// Shows `row` in a body cell. Recycled cells may hold a previous row.
    fn set_cell_data(&self, cell: &mut V, row: &T);

    /// Shows `row` in an editor cell.
    fn set_editor_data(&self, editor: &mut V, row: &T) {
        self.set_cell_data(editor, row);
    }

    /// Reflects the column's sort state on its header cell.
    fn set_header_sort(&self, _header: &mut V, _sort: Option<SortDirection>) {}

    /// Writes the editor's value back into `row`. Returns `false` if the
    /// value cannot be written.
    fn commit_cell_data(&self, _editor: &V, _row: &mut T) -> bool {
        false
    }

    /// Orders two rows by this column, or `None` if the column cannot sort.
    fn compare_rows(&self, _a: &T, _b: &T) -> Option<Ordering> {
        None
    }
}

/// A [`CellFactory`] made of plain function pointers over a cell-data type `D`.
///
/// ```
/// use trellis_grid::{CellError, CellFactory, FnCells};
///
/// struct Label(String);
///
/// let cells = FnCells::new(
///     |row: &(u32, String)| row.0,
///     |title| Ok::<_, CellError>(Label(title.to_owned())),
///     || Ok(Label(String::new())),
///     |label: &mut Label, value: u32| label.0 = value.to_string(),
/// )
/// .with_natural_order();
///
/// let mut cell = cells.create_body().unwrap();
/// cells.set_cell_data(&mut cell, &(7, "seven".into()));
/// assert_eq!(cell.0, "7");
/// let (a, b) = ((1, "a".into()), (2, "b".into()));
/// assert_eq!(cells.compare_rows(&a, &b), Some(core::cmp::Ordering::Less));
/// ```
pub struct FnCells<T, V, D> {
    get: fn(&T) -> D,
    header: fn(&str) -> Result<V, CellError>,
    body: fn() -> Result<V, CellError>,
    show: fn(&mut V, D),
    editor: Option<EditorFns<T, V, D>>,
    compare: Option<fn(&D, &D) -> Ordering>,
}

struct EditorFns<T, V, D> {
    create: fn() -> Result<V, CellError>,
    read: fn(&V) -> Option<D>,
    write: fn(&mut T, D),
}

impl<T, V, D> fmt::Debug for FnCells<T, V, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCells")
            .field("editor", &self.editor.is_some())
            .field("sortable", &self.compare.is_some())
            .finish_non_exhaustive()
    }
}

impl<T, V, D> FnCells<T, V, D> {
    /// Creates a read-only, unsortable factory.
    ///
    /// `get` extracts the cell data from a row, `header` and `body` create
    /// visuals, and `show` puts data into a body cell.
    pub fn new(
        get: fn(&T) -> D,
        header: fn(&str) -> Result<V, CellError>,
        body: fn() -> Result<V, CellError>,
        show: fn(&mut V, D),
    ) -> Self {
        Self {
            get,
            header,
            body,
            show,
            editor: None,
            compare: None,
        }
    }

    /// Adds an editor: `create` builds it, `read` parses its current value,
    /// and `write` stores a parsed value into the row.
    #[must_use]
    pub fn with_editor(
        mut self,
        create: fn() -> Result<V, CellError>,
        read: fn(&V) -> Option<D>,
        write: fn(&mut T, D),
    ) -> Self {
        self.editor = Some(EditorFns {
            create,
            read,
            write,
        });
        self
    }

    /// Sorts rows by comparing their cell data with `compare`.
    #[must_use]
    pub fn with_compare(mut self, compare: fn(&D, &D) -> Ordering) -> Self {
        self.compare = Some(compare);
        self
    }

    /// Sorts rows by the natural order of their cell data.
    #[must_use]
    pub fn with_natural_order(self) -> Self
    where
        D: Ord,
    {
        self.with_compare(Ord::cmp)
    }
}

impl<T, V, D> CellFactory<T, V> for FnCells<T, V, D> {
    fn create_header(&self, title: &str) -> Result<V, CellError> {
        (self.header)(title)
    }

    fn create_body(&self) -> Result<V, CellError> {
        (self.body)()
    }

    fn create_editor(&self) -> Result<V, CellError> {
        match &self.editor {
            Some(editor) => (editor.create)(),
            None => Err(CellError::new("column has no editor")),
        }
    }

    fn set_cell_data(&self, cell: &mut V, row: &T) {
        (self.show)(cell, (self.get)(row));
    }

    fn commit_cell_data(&self, editor: &V, row: &mut T) -> bool {
        let Some(fns) = &self.editor else {
            return false;
        };
        match (fns.read)(editor) {
            Some(value) => {
                (fns.write)(row, value);
                true
            }
            None => false,
        }
    }

    fn compare_rows(&self, a: &T, b: &T) -> Option<Ordering> {
        let compare = self.compare?;
        Some(compare(&(self.get)(a), &(self.get)(b)))
    }
}

/// A grid column.
pub struct Column<T, V> {
    id: ColumnId,
    title: String,
    sizing: ColumnSizing,
    factory: Rc<dyn CellFactory<T, V>>,
    revision: u32,
}

impl<T, V> fmt::Debug for Column<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("sizing", &self.sizing)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl<T, V> Column<T, V> {
    /// Creates a flexible column with default flags.
    pub fn new(
        id: ColumnId,
        title: impl Into<String>,
        factory: impl CellFactory<T, V> + 'static,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            sizing: ColumnSizing::default(),
            factory: Rc::new(factory),
            revision: 0,
        }
    }

    /// Sets the width rule.
    #[must_use]
    pub fn with_width(mut self, width: ColumnWidth) -> Self {
        self.sizing.width = width;
        self
    }

    /// Sets the minimum width.
    #[must_use]
    pub fn with_min_width(mut self, min_width: f64) -> Self {
        self.sizing.min_width = min_width;
        self
    }

    /// Replaces the capability flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.sizing.flags = flags;
        self
    }

    /// Stable identity.
    #[must_use]
    pub const fn id(&self) -> ColumnId {
        self.id
    }

    /// Header title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Layout-relevant settings.
    #[must_use]
    pub const fn sizing(&self) -> &ColumnSizing {
        &self.sizing
    }

    pub(crate) fn sizing_mut(&mut self) -> &mut ColumnSizing {
        &mut self.sizing
    }

    /// Capability flags.
    #[must_use]
    pub const fn flags(&self) -> ColumnFlags {
        self.sizing.flags
    }

    /// Returns `true` if all of `flags` are set.
    #[must_use]
    pub const fn has(&self, flags: ColumnFlags) -> bool {
        self.sizing.flags.contains(flags)
    }

    /// The cell factory.
    #[must_use]
    pub fn factory(&self) -> &dyn CellFactory<T, V> {
        &*self.factory
    }

    pub(crate) fn shared_factory(&self) -> Rc<dyn CellFactory<T, V>> {
        Rc::clone(&self.factory)
    }

    /// Replaces the cell factory; cached header cells are recreated.
    pub fn set_factory(&mut self, factory: impl CellFactory<T, V> + 'static) {
        self.factory = Rc::new(factory);
        self.revision = self.revision.wrapping_add(1);
    }

    /// Factory revision, bumped by [`Column::set_factory`].
    #[must_use]
    pub const fn revision(&self) -> u32 {
        self.revision
    }
}

impl CellLocation {
    /// Returns `true` if the location is a data row in a visible, focusable
    /// column.
    #[must_use]
    pub fn is_focusable<T, V>(&self, columns: &[Column<T, V>]) -> bool {
        self.row.is_element_row()
            && columns
                .get(self.column)
                .is_some_and(|c| c.has(ColumnFlags::VISIBLE | ColumnFlags::FOCUSABLE))
    }

    /// Returns `true` if the location is a data row in a visible, editable
    /// column.
    #[must_use]
    pub fn is_editable<T, V>(&self, columns: &[Column<T, V>]) -> bool {
        self.row.is_element_row()
            && columns
                .get(self.column)
                .is_some_and(|c| c.has(ColumnFlags::VISIBLE | ColumnFlags::EDITABLE))
    }
}

/// Resolved pixel widths and left edges of all columns, in column order.
///
/// Hidden columns have zero width.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnGeometry {
    widths: Vec<f64>,
    positions: Vec<f64>,
    total_width: f64,
}

impl ColumnGeometry {
    /// Builds geometry from widths laid out left to right.
    #[must_use]
    pub fn from_widths(widths: Vec<f64>) -> Self {
        let mut positions = Vec::with_capacity(widths.len());
        let mut x = 0.0;
        for &w in &widths {
            positions.push(x);
            x += w;
        }
        Self {
            widths,
            positions,
            total_width: x,
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    /// Returns `true` if there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Widths in column order.
    #[must_use]
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    /// Left edges in column order.
    #[must_use]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Sum of all widths.
    #[must_use]
    pub const fn total_width(&self) -> f64 {
        self.total_width
    }

    /// Width of column `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn width(&self, index: usize) -> f64 {
        self.widths[index]
    }

    /// Left edge of column `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn position(&self, index: usize) -> f64 {
        self.positions[index]
    }

    /// Column under content x coordinate `x`.
    #[must_use]
    pub fn column_at_x(&self, x: f64) -> Option<usize> {
        if x.is_nan() || x < 0.0 {
            return None;
        }
        // Hidden columns share their start with the next column, so the last
        // start at or before `x` is the one with a width.
        let index = self.positions.partition_point(|&p| p <= x).checked_sub(1)?;
        (x < self.positions[index] + self.widths[index]).then_some(index)
    }

    /// Columns that intersect `[scroll_x, scroll_x + width)`.
    #[must_use]
    pub fn visible_range(&self, scroll_x: f64, width: f64) -> Range<usize> {
        let end_x = scroll_x + width;
        let start = self
            .positions
            .iter()
            .zip(&self.widths)
            .position(|(&p, &w)| w > 0.0 && p + w > scroll_x)
            .unwrap_or(self.widths.len());
        let end = self.positions.partition_point(|&p| p < end_x).max(start);
        start..end
    }
}

/// Resolves pixel widths for `columns` in `available` pixels.
///
/// Fixed and percent columns take their preferred width. Flexible columns
/// share what is left by weight. When the result still overflows and
/// horizontal scrolling is [`ScrollPolicy::Off`], inflexible columns are
/// shrunk toward their minimum widths. No column ends below its minimum.
#[must_use]
pub fn resolve_column_widths(
    columns: &[ColumnSizing],
    available: f64,
    h_policy: ScrollPolicy,
) -> ColumnGeometry {
    let available = if available.is_finite() {
        available.max(0.0)
    } else {
        0.0
    };
    let mut widths: Vec<f64> = columns
        .iter()
        .map(|c| {
            if !c.visible() {
                return 0.0;
            }
            let preferred = match c.width {
                ColumnWidth::Fixed(w) => w,
                ColumnWidth::Percent(p) => available * p / 100.0,
                ColumnWidth::Flex(_) => 0.0,
            };
            let preferred = if preferred.is_finite() { preferred } else { 0.0 };
            preferred.max(c.min())
        })
        .collect();

    let inflexible: f64 = columns
        .iter()
        .zip(&widths)
        .filter(|(c, _)| !c.width.is_flexible())
        .map(|(_, w)| w)
        .sum();
    distribute_flex(columns, &mut widths, available - inflexible);

    let total: f64 = widths.iter().sum();
    if h_policy == ScrollPolicy::Off && total > available {
        let shrinkable: f64 = columns
            .iter()
            .zip(&widths)
            .filter(|(c, _)| c.visible() && !c.width.is_flexible())
            .map(|(c, w)| w - c.min())
            .sum();
        if shrinkable > 0.0 {
            let factor = ((total - available) / shrinkable).min(1.0);
            for (c, w) in columns.iter().zip(widths.iter_mut()) {
                if c.visible() && !c.width.is_flexible() {
                    *w -= (*w - c.min()) * factor;
                }
            }
        }
    }
    ColumnGeometry::from_widths(widths)
}

/// Shares `space` among visible flexible columns by weight, pinning any
/// column whose share would fall under its minimum.
fn distribute_flex(columns: &[ColumnSizing], widths: &mut [f64], mut space: f64) {
    let mut open: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.visible() && c.width.is_flexible())
        .map(|(i, _)| i)
        .collect();
    let weight = |c: &ColumnSizing| match c.width {
        ColumnWidth::Flex(w) if w.is_finite() && w > 0.0 => w,
        _ => 0.0,
    };
    loop {
        let total_weight: f64 = open.iter().map(|&i| weight(&columns[i])).sum();
        if open.is_empty() || total_weight <= 0.0 {
            return;
        }
        let share = space.max(0.0) / total_weight;
        let pinned: Vec<usize> = open
            .iter()
            .copied()
            .filter(|&i| share * weight(&columns[i]) < columns[i].min())
            .collect();
        if pinned.is_empty() {
            for &i in &open {
                widths[i] = share * weight(&columns[i]);
            }
            return;
        }
        for &i in &pinned {
            widths[i] = columns[i].min();
            space -= widths[i];
        }
        open.retain(|i| !pinned.contains(i));
    }
}

/// Resizes column `index` to `new_width` and returns the width it received.
///
/// The column becomes fixed-width. When horizontal scrolling is
/// [`ScrollPolicy::Off`], the change is taken out of (or given to) the later
/// visible resizable columns so the total width stays the same; the resize is
/// limited by how far those columns can shrink.
///
/// # Panics
///
/// Panics if `index` is out of range or `widths` does not match `columns`.
pub fn resize_column(
    columns: &mut [ColumnSizing],
    widths: &[f64],
    index: usize,
    new_width: f64,
    h_policy: ScrollPolicy,
) -> f64 {
    assert!(
        index < columns.len() && widths.len() == columns.len(),
        "resize_column: column {index} out of range"
    );
    let old = widths[index];
    let mut width = new_width.max(columns[index].min());

    if h_policy == ScrollPolicy::Off {
        let later: Vec<usize> = (index + 1..columns.len())
            .filter(|&i| {
                columns[i]
                    .flags
                    .contains(ColumnFlags::VISIBLE | ColumnFlags::RESIZABLE)
            })
            .collect();
        if later.is_empty() {
            return old;
        }
        let delta = width - old;
        if delta > 0.0 {
            let room: f64 = later.iter().map(|&i| widths[i] - columns[i].min()).sum();
            let taken = delta.min(room.max(0.0));
            width = old + taken;
            let factor = if room > 0.0 { taken / room } else { 0.0 };
            for &i in &later {
                let w = widths[i] - (widths[i] - columns[i].min()) * factor;
                columns[i].width = ColumnWidth::Fixed(w);
            }
        } else {
            let share = -delta / later.len() as f64;
            for &i in &later {
                columns[i].width = ColumnWidth::Fixed(widths[i] + share);
            }
        }
    }
    columns[index].width = ColumnWidth::Fixed(width);
    width
}

/// Index a dragged column `from` should move to when dropped at content x
/// coordinate `x`.
///
/// Only visible, reorderable columns are drop targets; the result is meant for
/// a remove-then-insert move.
#[must_use]
pub fn reorder_index(
    columns: &[ColumnSizing],
    geometry: &ColumnGeometry,
    from: usize,
    x: f64,
) -> usize {
    let targets = || {
        (0..columns.len().min(geometry.len())).filter(move |&i| {
            i != from
                && columns[i]
                    .flags
                    .contains(ColumnFlags::VISIBLE | ColumnFlags::REORDERABLE)
        })
    };
    if let Some(before) =
        targets().find(|&i| geometry.position(i) + geometry.width(i) / 2.0 > x)
    {
        return if before > from { before - 1 } else { before };
    }
    match targets().last() {
        Some(after) if after > from => after,
        Some(after) => after + 1,
        None => from,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ColumnFlags, ColumnGeometry, ColumnSizing, ColumnWidth, reorder_index,
        resize_column, resolve_column_widths,
    };
    use crate::config::ScrollPolicy;

    fn fixed(w: f64) -> ColumnSizing {
        ColumnSizing {
            width: ColumnWidth::Fixed(w),
            ..ColumnSizing::default()
        }
    }

    fn flex() -> ColumnSizing {
        ColumnSizing::default()
    }

    #[test]
    fn flexible_column_takes_the_slack() {
        let geometry =
            resolve_column_widths(&[fixed(50.0), flex()], 200.0, ScrollPolicy::Off);
        assert_eq!(geometry.widths(), &[50.0, 150.0]);
        assert_eq!(geometry.positions(), &[0.0, 50.0]);
        assert_eq!(geometry.total_width(), 200.0);
    }

    #[test]
    fn flex_weights_and_minimums() {
        let mut narrow = flex();
        narrow.min_width = 80.0;
        let wide = ColumnSizing {
            width: ColumnWidth::Flex(2.0),
            ..ColumnSizing::default()
        };
        // 100 split 1:2 would give the first column 33, under its minimum.
        let geometry = resolve_column_widths(&[narrow, wide], 100.0, ScrollPolicy::Auto);
        assert_eq!(geometry.widths(), &[80.0, 20.0]);
    }

    #[test]
    fn overflow_shrinks_inflexible_columns_only_without_scrolling() {
        let mut a = fixed(100.0);
        a.min_width = 60.0;
        let b = fixed(100.0);
        let columns = [a, b, ColumnSizing {
            width: ColumnWidth::Percent(10.0),
            flags: ColumnFlags::default() - ColumnFlags::VISIBLE,
            ..ColumnSizing::default()
        }];

        let scrolling = resolve_column_widths(&columns, 100.0, ScrollPolicy::Auto);
        assert_eq!(scrolling.widths(), &[100.0, 100.0, 0.0]);

        let squeezed = resolve_column_widths(&columns, 100.0, ScrollPolicy::Off);
        // 100 of overflow over 140 shrinkable pixels.
        let factor = 100.0 / 140.0;
        assert!((squeezed.width(0) - (100.0 - 40.0 * factor)).abs() < 1e-9);
        assert!((squeezed.width(1) - (100.0 - 100.0 * factor)).abs() < 1e-9);
        assert!((squeezed.total_width() - 100.0).abs() < 1e-9);
        assert!(squeezed.width(0) >= 60.0);
    }

    #[test]
    fn column_lookup_skips_hidden_columns() {
        let geometry = ColumnGeometry::from_widths(vec![50.0, 0.0, 100.0]);
        assert_eq!(geometry.column_at_x(-1.0), None);
        assert_eq!(geometry.column_at_x(0.0), Some(0));
        assert_eq!(geometry.column_at_x(49.9), Some(0));
        assert_eq!(geometry.column_at_x(50.0), Some(2));
        assert_eq!(geometry.column_at_x(150.0), None);
        assert_eq!(geometry.visible_range(60.0, 10.0), 2..3);
        assert_eq!(geometry.visible_range(0.0, 60.0), 0..3);
        assert_eq!(geometry.visible_range(0.0, 50.0), 0..1);
    }

    #[test]
    fn resize_redistributes_among_later_columns_without_scrolling() {
        let mut columns = [fixed(100.0), fixed(100.0), fixed(100.0)];
        columns[2].min_width = 90.0;
        let widths = [100.0, 100.0, 100.0];
        let got = resize_column(&mut columns, &widths, 0, 140.0, ScrollPolicy::Off);
        assert_eq!(got, 140.0);
        let geometry = resolve_column_widths(&columns, 300.0, ScrollPolicy::Off);
        assert!((geometry.total_width() - 300.0).abs() < 1e-9);
        assert!(geometry.width(2) >= 90.0);

        // Scrolling lets the total grow instead.
        let mut columns = [fixed(100.0), fixed(100.0)];
        resize_column(&mut columns, &[100.0, 100.0], 0, 150.0, ScrollPolicy::Auto);
        assert_eq!(columns[1].width, ColumnWidth::Fixed(100.0));
        assert_eq!(columns[0].width, ColumnWidth::Fixed(150.0));
    }

    #[test]
    fn last_column_cannot_resize_without_scrolling() {
        let mut columns = [fixed(100.0), ColumnSizing::default()];
        let got = resize_column(&mut columns, &[100.0, 100.0], 1, 150.0, ScrollPolicy::Off);
        assert_eq!(got, 100.0);
        assert_eq!(columns[0].width, ColumnWidth::Fixed(100.0));
        assert_eq!(columns[1].width, ColumnWidth::Flex(1.0));
    }

    #[test]
    fn reorder_targets_midpoints() {
        let columns = [fixed(100.0), fixed(100.0), fixed(100.0)];
        let geometry = resolve_column_widths(&columns, 300.0, ScrollPolicy::Auto);
        assert_eq!(reorder_index(&columns, &geometry, 0, 160.0), 1);
        assert_eq!(reorder_index(&columns, &geometry, 0, 290.0), 2);
        assert_eq!(reorder_index(&columns, &geometry, 2, 10.0), 0);
        assert_eq!(reorder_index(&columns, &geometry, 2, 140.0), 1);

        let mut pinned = columns;
        pinned[0].flags -= ColumnFlags::REORDERABLE;
        assert_eq!(reorder_index(&pinned, &geometry, 2, 10.0), 1);
    }
}
