// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Row and cell addressing over the fully expanded display order.
//!
//! A *display position* addresses one row of the expanded sequence: for each
//! group, an optional header row, the group's visible element rows, and an
//! optional footer row. [`GroupLayout`] is an immutable snapshot of those
//! per-group spans; every addressing operation takes it explicitly, so cursors
//! never hold references into the grid.

/// What a display row shows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// The group's header row.
    Header,
    /// An element row; carries the group-local element index.
    Element(usize),
    /// The group's footer row.
    Footer,
}

/// Display span of one group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupSpan {
    /// Display position of the group's first row.
    pub start: usize,
    /// Whether a header row is shown.
    pub header: bool,
    /// Number of element rows shown (zero when collapsed or hidden).
    pub list_len: usize,
    /// Whether a footer row is shown.
    pub footer: bool,
}

impl GroupSpan {
    /// Creates a span; `start` is assigned by [`GroupLayout::new`].
    #[must_use]
    pub const fn new(header: bool, list_len: usize, footer: bool) -> Self {
        Self {
            start: 0,
            header,
            list_len,
            footer,
        }
    }

    /// Number of display rows in this group.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.header as usize + self.list_len + self.footer as usize
    }

    /// Display position one past the group's last row.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.size()
    }

    /// Group position of the first element row.
    #[must_use]
    pub const fn list_start(&self) -> usize {
        self.header as usize
    }

    /// Group position of the footer row (or one past the last element row).
    #[must_use]
    pub const fn footer_index(&self) -> usize {
        self.list_start() + self.list_len
    }

    /// Classifies the row at `group_position`.
    #[must_use]
    pub const fn kind_at(&self, group_position: usize) -> Option<RowKind> {
        if self.header && group_position == 0 {
            return Some(RowKind::Header);
        }
        let element = group_position - self.list_start();
        if element < self.list_len {
            Some(RowKind::Element(element))
        } else if self.footer && element == self.list_len {
            Some(RowKind::Footer)
        } else {
            None
        }
    }
}

/// Immutable snapshot of every group's display span.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupLayout {
    spans: Vec<GroupSpan>,
    total: usize,
}

impl GroupLayout {
    /// Builds a layout from spans in display order, assigning their starts.
    pub fn new(spans: impl IntoIterator<Item = GroupSpan>) -> Self {
        let mut total = 0;
        let spans = spans
            .into_iter()
            .map(|mut span| {
                span.start = total;
                total += span.size();
                span
            })
            .collect();
        Self { spans, total }
    }

    /// A layout with one header-less, footer-less group of `len` rows.
    #[must_use]
    pub fn single(len: usize) -> Self {
        Self::new([GroupSpan::new(false, len, false)])
    }

    /// Total number of display rows.
    #[must_use]
    pub const fn total_rows(&self) -> usize {
        self.total
    }

    /// Number of groups, including ones that render nothing.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.spans.len()
    }

    /// All spans in display order.
    #[must_use]
    pub fn spans(&self) -> &[GroupSpan] {
        &self.spans
    }

    /// Span of group `group`.
    #[must_use]
    pub fn span(&self, group: usize) -> Option<&GroupSpan> {
        self.spans.get(group)
    }

    /// Index of the group owning display `position`.
    ///
    /// Groups that render nothing never own a position.
    #[must_use]
    pub fn group_at(&self, position: usize) -> Option<usize> {
        if position >= self.total {
            return None;
        }
        Some(self.spans.partition_point(|span| span.end() <= position))
    }

    /// Classifies display `position`.
    #[must_use]
    pub fn kind_at(&self, position: usize) -> Option<RowKind> {
        let group = self.group_at(position)?;
        let span = &self.spans[group];
        span.kind_at(position - span.start)
    }
}

/// Element ↔ source translation for each group.
///
/// The grid implements this over its group caches and the base view; tests can
/// implement it over plain vectors.
pub trait GroupRows {
    /// Source index of element `element` of group `group`.
    fn element_source(&self, group: usize, element: usize) -> Option<usize>;

    /// Element index of source row `source` within group `group`, if it is a
    /// member of that group.
    fn source_element(&self, group: usize, source: usize) -> Option<usize>;
}

/// A cursor over display positions.
///
/// Holds the absolute `position` together with the owning `group_index` and the
/// offset within that group, `group_position`. The three stay consistent with
/// the [`GroupLayout`] the location was created from; after the layout changes,
/// re-seek.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowLocation {
    position: usize,
    group_index: usize,
    group_position: usize,
    kind: Option<RowKind>,
}

impl RowLocation {
    /// Seeks to an absolute display position.
    ///
    /// Out-of-range positions produce an invalid location whose group fields are
    /// clamped to one past the end of the last group.
    #[must_use]
    pub fn seek(layout: &GroupLayout, position: usize) -> Self {
        if let Some(group) = layout.group_at(position) {
            let span = &layout.spans[group];
            let group_position = position - span.start;
            return Self {
                position,
                group_index: group,
                group_position,
                kind: span.kind_at(group_position),
            };
        }
        let group_index = layout.spans.len().saturating_sub(1);
        let group_position = layout.spans.get(group_index).map_or(0, GroupSpan::size);
        Self {
            position,
            group_index,
            group_position,
            kind: None,
        }
    }

    /// Seeks to the display row of source row `source`.
    ///
    /// Groups are tested in display order and the first one showing the row
    /// wins. Returns `None` if the row is filtered out, collapsed, or hidden in
    /// every group.
    #[must_use]
    pub fn seek_to_source(
        layout: &GroupLayout,
        rows: &impl GroupRows,
        source: usize,
    ) -> Option<Self> {
        layout
            .spans
            .iter()
            .enumerate()
            .filter(|(_, span)| span.list_len > 0)
            .find_map(|(group, span)| {
                let element = rows.source_element(group, source)?;
                (element < span.list_len)
                    .then(|| Self::seek(layout, span.start + span.list_start() + element))
            })
    }

    /// Absolute display position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Index of the owning group.
    #[must_use]
    pub const fn group_index(&self) -> usize {
        self.group_index
    }

    /// Offset within the owning group's header/rows/footer block.
    #[must_use]
    pub const fn group_position(&self) -> usize {
        self.group_position
    }

    /// What this row shows, or `None` if the location is out of range.
    #[must_use]
    pub const fn kind(&self) -> Option<RowKind> {
        self.kind
    }

    /// Returns `true` if the location addresses an existing row.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.kind.is_some()
    }

    /// Returns `true` for a group header row.
    #[must_use]
    pub const fn is_header(&self) -> bool {
        matches!(self.kind, Some(RowKind::Header))
    }

    /// Returns `true` for a group footer row.
    #[must_use]
    pub const fn is_footer(&self) -> bool {
        matches!(self.kind, Some(RowKind::Footer))
    }

    /// Returns `true` for a data row.
    #[must_use]
    pub const fn is_element_row(&self) -> bool {
        matches!(self.kind, Some(RowKind::Element(_)))
    }

    /// Group-local element index for data rows.
    #[must_use]
    pub const fn element_index(&self) -> Option<usize> {
        match self.kind {
            Some(RowKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Source index of a data row; `None` for headers, footers, and invalid rows.
    #[must_use]
    pub fn source_index(&self, rows: &impl GroupRows) -> Option<usize> {
        rows.element_source(self.group_index, self.element_index()?)
    }

    /// Returns `true` if a row follows this one.
    #[must_use]
    pub const fn has_next(&self, layout: &GroupLayout) -> bool {
        self.position + 1 < layout.total
    }

    /// Returns `true` if a row precedes this one.
    ///
    /// A location one past the last row has a previous row, so a backwards walk
    /// may start at [`GroupLayout::total_rows`].
    #[must_use]
    pub const fn has_previous(&self, layout: &GroupLayout) -> bool {
        self.position > 0 && self.position <= layout.total
    }

    /// Steps to the next row, skipping groups that render nothing.
    ///
    /// # Panics
    ///
    /// Panics if [`RowLocation::has_next`] is `false`.
    pub fn move_to_next_row(&mut self, layout: &GroupLayout) {
        assert!(
            self.has_next(layout),
            "move_to_next_row called on the last row (position {})",
            self.position
        );
        self.position += 1;
        self.group_position += 1;
        while self.group_position >= layout.spans[self.group_index].size() {
            self.group_index += 1;
            self.group_position = 0;
        }
        self.kind = layout.spans[self.group_index].kind_at(self.group_position);
    }

    /// Steps to the previous row, skipping groups that render nothing.
    ///
    /// # Panics
    ///
    /// Panics if [`RowLocation::has_previous`] is `false`.
    pub fn move_to_previous_row(&mut self, layout: &GroupLayout) {
        assert!(
            self.has_previous(layout),
            "move_to_previous_row called on the first row (position {})",
            self.position
        );
        self.position -= 1;
        if self.group_position == 0 {
            loop {
                self.group_index -= 1;
                let size = layout.spans[self.group_index].size();
                if size > 0 {
                    self.group_position = size - 1;
                    break;
                }
            }
        } else {
            self.group_position -= 1;
        }
        self.kind = layout.spans[self.group_index].kind_at(self.group_position);
    }

    /// Steps forward until `predicate` matches.
    ///
    /// Returns `false` and leaves the location unchanged if the last row is
    /// reached without a match.
    pub fn find_next_row(
        &mut self,
        layout: &GroupLayout,
        mut predicate: impl FnMut(&Self) -> bool,
    ) -> bool {
        let origin = *self;
        while self.has_next(layout) {
            self.move_to_next_row(layout);
            if predicate(self) {
                return true;
            }
        }
        *self = origin;
        false
    }

    /// Steps backward until `predicate` matches.
    ///
    /// Returns `false` and leaves the location unchanged if the first row is
    /// reached without a match.
    pub fn find_previous_row(
        &mut self,
        layout: &GroupLayout,
        mut predicate: impl FnMut(&Self) -> bool,
    ) -> bool {
        let origin = *self;
        while self.has_previous(layout) {
            self.move_to_previous_row(layout);
            if predicate(self) {
                return true;
            }
        }
        *self = origin;
        false
    }
}

/// A [`RowLocation`] plus a column index.
///
/// Equality and hashing consider only the display position and the column.
#[derive(Copy, Clone, Debug)]
pub struct CellLocation {
    /// Row part of the location.
    pub row: RowLocation,
    /// Column index.
    pub column: usize,
}

impl PartialEq for CellLocation {
    fn eq(&self, other: &Self) -> bool {
        self.row.position == other.row.position && self.column == other.column
    }
}

impl Eq for CellLocation {}

impl core::hash::Hash for CellLocation {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.row.position.hash(state);
        self.column.hash(state);
    }
}

impl CellLocation {
    /// Creates a cell location.
    #[must_use]
    pub const fn new(row: RowLocation, column: usize) -> Self {
        Self { row, column }
    }

    /// Seeks to `position` and pairs it with `column`.
    #[must_use]
    pub fn seek(layout: &GroupLayout, position: usize, column: usize) -> Self {
        Self::new(RowLocation::seek(layout, position), column)
    }

    /// Display position of the row.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.row.position
    }

    /// Steps to the next cell in reading order until `predicate` matches,
    /// wrapping from the last column of a row to the first column of the next.
    ///
    /// Returns `false` and leaves the location unchanged if no cell matches.
    pub fn find_next_cell(
        &mut self,
        layout: &GroupLayout,
        column_count: usize,
        mut predicate: impl FnMut(&Self) -> bool,
    ) -> bool {
        if column_count == 0 {
            return false;
        }
        let origin = *self;
        loop {
            if self.column + 1 < column_count {
                self.column += 1;
            } else if self.row.has_next(layout) {
                self.row.move_to_next_row(layout);
                self.column = 0;
            } else {
                *self = origin;
                return false;
            }
            if predicate(self) {
                return true;
            }
        }
    }

    /// Steps to the previous cell in reading order until `predicate` matches,
    /// wrapping from the first column of a row to the last column of the
    /// previous one.
    ///
    /// Returns `false` and leaves the location unchanged if no cell matches.
    pub fn find_previous_cell(
        &mut self,
        layout: &GroupLayout,
        column_count: usize,
        mut predicate: impl FnMut(&Self) -> bool,
    ) -> bool {
        if column_count == 0 {
            return false;
        }
        let origin = *self;
        loop {
            if self.column > 0 && self.column <= column_count {
                self.column -= 1;
            } else if self.row.has_previous(layout) {
                self.row.move_to_previous_row(layout);
                self.column = column_count - 1;
            } else {
                *self = origin;
                return false;
            }
            if predicate(self) {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CellLocation, GroupLayout, GroupRows, GroupSpan, RowKind, RowLocation};

    /// Groups over explicit source indices, in group-local order.
    struct Members(Vec<Vec<usize>>);

    impl GroupRows for Members {
        fn element_source(&self, group: usize, element: usize) -> Option<usize> {
            self.0.get(group)?.get(element).copied()
        }

        fn source_element(&self, group: usize, source: usize) -> Option<usize> {
            self.0.get(group)?.iter().position(|&s| s == source)
        }
    }

    fn two_groups() -> GroupLayout {
        // Sizes 5 and 7, both with headers.
        GroupLayout::new([
            GroupSpan::new(true, 5, false),
            GroupSpan::new(true, 7, false),
        ])
    }

    #[test]
    fn headers_sit_at_group_starts() {
        let layout = two_groups();
        assert_eq!(layout.total_rows(), 14);
        assert!(RowLocation::seek(&layout, 0).is_header());
        assert!(RowLocation::seek(&layout, 6).is_header());
        let row = RowLocation::seek(&layout, 7);
        assert_eq!(row.group_index(), 1);
        assert_eq!(row.group_position(), 1);
        assert_eq!(row.kind(), Some(RowKind::Element(0)));
    }

    #[test]
    fn every_position_has_exactly_one_kind() {
        let layout = GroupLayout::new([
            GroupSpan::new(true, 3, true),
            GroupSpan::new(false, 0, false),
            GroupSpan::new(true, 0, true),
            GroupSpan::new(false, 2, true),
        ]);
        let sizes: usize = layout.spans().iter().map(GroupSpan::size).sum();
        assert_eq!(sizes, layout.total_rows());
        for p in 0..layout.total_rows() {
            let row = RowLocation::seek(&layout, p);
            let flags = [row.is_header(), row.is_element_row(), row.is_footer()];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "position {p}");
        }
    }

    #[test]
    fn stepping_matches_seeking_in_both_directions() {
        let layout = GroupLayout::new([
            GroupSpan::new(true, 2, true),
            GroupSpan::new(false, 0, false),
            GroupSpan::new(false, 0, false),
            GroupSpan::new(true, 1, false),
            GroupSpan::new(false, 0, false),
        ]);
        let mut row = RowLocation::seek(&layout, 0);
        for p in 1..layout.total_rows() {
            row.move_to_next_row(&layout);
            assert_eq!(row, RowLocation::seek(&layout, p));
        }
        assert!(!row.has_next(&layout));

        // Walk back from one past the end.
        let mut row = RowLocation::seek(&layout, layout.total_rows());
        assert!(!row.is_valid());
        for p in (0..layout.total_rows()).rev() {
            row.move_to_previous_row(&layout);
            assert_eq!(row, RowLocation::seek(&layout, p));
        }
        assert!(!row.has_previous(&layout));
    }

    #[test]
    fn out_of_range_seek_is_invalid_and_clamped() {
        let layout = two_groups();
        let row = RowLocation::seek(&layout, 40);
        assert!(!row.is_valid());
        assert_eq!(row.group_index(), 1);
        assert_eq!(row.group_position(), 8);

        let empty = GroupLayout::default();
        let row = RowLocation::seek(&empty, 0);
        assert!(!row.is_valid());
        assert_eq!(row.group_index(), 0);
    }

    #[test]
    #[should_panic(expected = "move_to_next_row called on the last row")]
    fn stepping_past_the_end_panics() {
        let layout = GroupLayout::single(2);
        let mut row = RowLocation::seek(&layout, 1);
        row.move_to_next_row(&layout);
    }

    #[test]
    fn seek_to_source_round_trips_through_groups() {
        let layout = GroupLayout::new([
            GroupSpan::new(true, 2, false),
            GroupSpan::new(true, 3, true),
        ]);
        let members = Members(vec![vec![4, 1], vec![0, 1, 3]]);

        // Row 1 belongs to both groups; the first one wins.
        let row = RowLocation::seek_to_source(&layout, &members, 1).unwrap();
        assert_eq!(row.position(), 2);
        let row = RowLocation::seek_to_source(&layout, &members, 3).unwrap();
        assert_eq!(row.position(), 6);
        assert!(RowLocation::seek_to_source(&layout, &members, 2).is_none());

        for source in [0, 1, 3, 4] {
            let row = RowLocation::seek_to_source(&layout, &members, source).unwrap();
            assert_eq!(row.source_index(&members), Some(source));
        }
        assert_eq!(RowLocation::seek(&layout, 0).source_index(&members), None);
    }

    #[test]
    fn collapsed_groups_do_not_resolve_sources() {
        let layout = GroupLayout::new([
            GroupSpan::new(true, 0, false),
            GroupSpan::new(true, 2, false),
        ]);
        let members = Members(vec![vec![0], vec![1, 0]]);
        let row = RowLocation::seek_to_source(&layout, &members, 0).unwrap();
        assert_eq!(row.group_index(), 1);
        assert_eq!(row.position(), 3);
    }

    #[test]
    fn find_rows_skip_headers_and_restore_on_miss() {
        let layout = two_groups();
        let mut row = RowLocation::seek(&layout, 5);
        assert!(row.find_next_row(&layout, RowLocation::is_element_row));
        assert_eq!(row.position(), 7);
        assert!(row.find_previous_row(&layout, RowLocation::is_element_row));
        assert_eq!(row.position(), 5);

        let mut row = RowLocation::seek(&layout, 1);
        assert!(!row.find_previous_row(&layout, RowLocation::is_element_row));
        assert_eq!(row.position(), 1);
    }

    #[test]
    fn cell_navigation_wraps_between_rows() {
        let layout = two_groups();
        let mut cell = CellLocation::seek(&layout, 5, 2);
        assert!(cell.find_next_cell(&layout, 3, |c| c.row.is_element_row()));
        assert_eq!((cell.position(), cell.column), (7, 0));
        assert!(cell.find_previous_cell(&layout, 3, |c| c.row.is_element_row()));
        assert_eq!((cell.position(), cell.column), (5, 2));

        let mut last = CellLocation::seek(&layout, 13, 2);
        assert!(!last.find_next_cell(&layout, 3, |_| true));
        assert_eq!((last.position(), last.column), (13, 2));
    }

    #[test]
    fn cell_equality_ignores_group_bookkeeping() {
        let a = CellLocation::new(RowLocation::seek(&GroupLayout::single(10), 3), 1);
        let b = CellLocation::new(
            RowLocation::seek(
                &GroupLayout::new([GroupSpan::new(true, 9, false)]),
                3,
            ),
            1,
        );
        assert_eq!(a, b);
    }
}
