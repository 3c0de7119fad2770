// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Row groups and their cached derived state.

use std::fmt;
use std::rc::Rc;

use trellis_view::{ListView, Predicate};

use crate::addressing::{GroupRows, GroupSpan};
use crate::error::CellError;
use crate::recycle::CellHandle;

/// A named partition of the rows with its own filter, optional header and
/// footer rows, and collapse/visibility flags.
pub struct Group<T> {
    name: String,
    filter: Option<Predicate<T>>,
    visible: bool,
    collapsed: bool,
    header: bool,
    footer: bool,
}

impl<T> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("filtered", &self.filter.is_some())
            .field("visible", &self.visible)
            .field("collapsed", &self.collapsed)
            .field("header", &self.header)
            .field("footer", &self.footer)
            .finish()
    }
}

impl<T> Clone for Group<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            filter: self.filter.clone(),
            visible: self.visible,
            collapsed: self.collapsed,
            header: self.header,
            footer: self.footer,
        }
    }
}

impl<T> Group<T> {
    /// Creates a visible, expanded group with a header row and no filter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
            visible: true,
            collapsed: false,
            header: true,
            footer: false,
        }
    }

    /// The synthetic group used when no groups are configured: every row, no
    /// header, no footer.
    #[must_use]
    pub fn implicit() -> Self {
        Self {
            header: false,
            ..Self::new("")
        }
    }

    /// Restricts the group to rows matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Fn(&T) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    /// Sets whether a header row is shown.
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Sets whether a footer row is shown.
    #[must_use]
    pub fn with_footer(mut self, footer: bool) -> Self {
        self.footer = footer;
        self
    }

    /// Sets whether the element rows are hidden.
    #[must_use]
    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if `row` belongs to this group.
    pub fn matches(&self, row: &T) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(row))
    }

    /// Replaces the filter; `None` accepts every row.
    pub fn set_filter(&mut self, filter: Option<Predicate<T>>) {
        self.filter = filter;
    }

    /// Whether the group renders at all.
    #[must_use]
    pub const fn visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the whole group.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether the element rows are hidden.
    #[must_use]
    pub const fn collapsed(&self) -> bool {
        self.collapsed
    }

    /// Collapses or expands the group.
    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    /// Whether a header row is configured.
    #[must_use]
    pub const fn header(&self) -> bool {
        self.header
    }

    /// Configures the header row.
    pub fn set_header(&mut self, header: bool) {
        self.header = header;
    }

    /// Whether a footer row is configured.
    #[must_use]
    pub const fn footer(&self) -> bool {
        self.footer
    }

    /// Configures the footer row.
    pub fn set_footer(&mut self, footer: bool) {
        self.footer = footer;
    }
}

/// Builds and fills group header and footer visuals.
pub trait GroupCellFactory<T, V> {
    /// Creates an empty header or footer visual.
    fn create(&self, part: GroupPart) -> Result<V, CellError>;

    /// Shows `group` in a header or footer visual; `rows` is the number of
    /// rows in the group, collapsed or not.
    fn set_group_data(&self, cell: &mut V, group: &Group<T>, part: GroupPart, rows: usize);
}

/// Which group row a group visual belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupPart {
    /// The header row.
    Header,
    /// The footer row.
    Footer,
}

/// Pool key of a group header or footer visual.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupCellKey {
    /// Group index.
    pub group: usize,
    /// Header or footer.
    pub part: GroupPart,
}

/// Per-group cached state: the group's rows within the base view, derived
/// counts, and handles of its header/footer visuals.
pub struct GroupCache<T> {
    group: Group<T>,
    /// Base-view local indices of member rows, ascending.
    rows: Vec<usize>,
    stale: bool,
    header_cell: Option<CellHandle>,
    footer_cell: Option<CellHandle>,
}

impl<T> fmt::Debug for GroupCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCache")
            .field("group", &self.group)
            .field("rows", &self.rows.len())
            .field("stale", &self.stale)
            .field("header_cell", &self.header_cell)
            .field("footer_cell", &self.footer_cell)
            .finish()
    }
}

impl<T> GroupCache<T> {
    /// Wraps `group`; derived state is computed on the first refresh.
    pub fn new(group: Group<T>) -> Self {
        Self {
            group,
            rows: Vec::new(),
            stale: true,
            header_cell: None,
            footer_cell: None,
        }
    }

    /// The group definition.
    #[must_use]
    pub fn group(&self) -> &Group<T> {
        &self.group
    }

    /// The group definition, for editing. Call [`GroupCache::invalidate`]
    /// afterwards.
    pub fn group_mut(&mut self) -> &mut Group<T> {
        &mut self.group
    }

    /// Marks derived state stale and gives up the cached header/footer visuals.
    ///
    /// The caller releases the returned handles to the pool they came from.
    pub fn invalidate(&mut self) -> impl Iterator<Item = CellHandle> + use<T> {
        self.stale = true;
        [self.header_cell.take(), self.footer_cell.take()]
            .into_iter()
            .flatten()
    }

    /// Returns `true` if derived state must be recomputed.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recomputes membership against `view` if stale.
    pub fn refresh(&mut self, view: &ListView<T>) {
        if !self.stale {
            return;
        }
        self.rows.clear();
        if self.group.filter.is_some() {
            let group = &self.group;
            self.rows.extend(
                (0..view.len())
                    .filter(|&local| view.get(local).is_some_and(|row| group.matches(row))),
            );
        } else {
            self.rows.extend(0..view.len());
        }
        self.stale = false;
    }

    /// Base-view local indices of member rows, ascending.
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        debug_assert!(!self.stale, "GroupCache read while stale");
        &self.rows
    }

    /// Whether the header row renders.
    #[must_use]
    pub const fn show_header(&self) -> bool {
        self.group.visible && self.group.header
    }

    /// Whether the element rows render.
    #[must_use]
    pub const fn show_list(&self) -> bool {
        self.group.visible && !self.group.collapsed
    }

    /// Whether the footer row renders.
    #[must_use]
    pub const fn show_footer(&self) -> bool {
        self.group.visible && self.group.footer
    }

    /// Number of element rows rendered.
    #[must_use]
    pub fn list_size(&self) -> usize {
        if self.show_list() { self.rows().len() } else { 0 }
    }

    /// Number of display rows rendered.
    #[must_use]
    pub fn size(&self) -> usize {
        usize::from(self.show_header()) + usize::from(self.show_footer()) + self.list_size()
    }

    /// Group position of the first element row.
    #[must_use]
    pub fn list_start_index(&self) -> usize {
        usize::from(self.show_header())
    }

    /// Group position of the last element row, if any are rendered.
    #[must_use]
    pub fn list_last_index(&self) -> Option<usize> {
        let start = self.list_start_index();
        (start + self.list_size())
            .checked_sub(1)
            .filter(|&last| last >= start)
    }

    /// Group position of the footer row.
    #[must_use]
    pub fn footer_index(&self) -> usize {
        self.list_start_index() + self.list_size()
    }

    /// Display span of this group; `start` is filled in by the layout.
    #[must_use]
    pub fn span(&self) -> GroupSpan {
        GroupSpan::new(self.show_header(), self.list_size(), self.show_footer())
    }

    /// Handle of the cached header or footer visual.
    #[must_use]
    pub const fn cell(&self, part: GroupPart) -> Option<CellHandle> {
        match part {
            GroupPart::Header => self.header_cell,
            GroupPart::Footer => self.footer_cell,
        }
    }

    /// Records the handle of the header or footer visual.
    pub fn set_cell(&mut self, part: GroupPart, handle: CellHandle) {
        match part {
            GroupPart::Header => self.header_cell = Some(handle),
            GroupPart::Footer => self.footer_cell = Some(handle),
        }
    }
}

/// [`GroupRows`] over a set of group caches and their base view.
#[derive(Debug)]
pub struct GroupMembers<'a, T> {
    caches: &'a [GroupCache<T>],
    view: &'a ListView<T>,
}

impl<'a, T> GroupMembers<'a, T> {
    /// Pairs refreshed `caches` with the `view` they were refreshed against.
    pub fn new(caches: &'a [GroupCache<T>], view: &'a ListView<T>) -> Self {
        Self { caches, view }
    }
}

impl<T> GroupRows for GroupMembers<'_, T> {
    fn element_source(&self, group: usize, element: usize) -> Option<usize> {
        let local = *self.caches.get(group)?.rows().get(element)?;
        self.view.local_index_to_source(local)
    }

    fn source_element(&self, group: usize, source: usize) -> Option<usize> {
        let local = self.view.source_index_to_local(source)?;
        self.caches.get(group)?.rows().binary_search(&local).ok()
    }
}

#[cfg(test)]
mod tests {
    use trellis_view::ListView;

    use super::{Group, GroupCache, GroupMembers};
    use crate::addressing::{GroupLayout, RowLocation};

    fn view() -> ListView<u32> {
        let mut view = ListView::new((0..12).collect());
        view.commit();
        view
    }

    #[test]
    fn derived_sizes_follow_flags() {
        let view = view();
        let mut cache = GroupCache::new(Group::new("even").with_filter(|v: &u32| v % 2 == 0));
        cache.refresh(&view);
        assert_eq!(cache.rows(), &[0, 2, 4, 6, 8, 10]);
        assert_eq!(cache.size(), 7);
        assert_eq!(cache.list_start_index(), 1);
        assert_eq!(cache.list_last_index(), Some(6));
        assert_eq!(cache.footer_index(), 7);

        cache.group_mut().set_footer(true);
        cache.group_mut().set_collapsed(true);
        let _ = cache.invalidate();
        cache.refresh(&view);
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.list_last_index(), None);
        assert_eq!(cache.footer_index(), 1);

        cache.group_mut().set_visible(false);
        let _ = cache.invalidate();
        cache.refresh(&view);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn implicit_group_is_identity() {
        let view = view();
        let mut cache = GroupCache::new(Group::<u32>::implicit());
        cache.refresh(&view);
        assert!(!cache.show_header());
        assert_eq!(cache.size(), 12);
    }

    #[test]
    fn members_translate_through_the_base_view() {
        let mut view = ListView::new((0..10).collect::<Vec<u32>>());
        view.set_filter(|v| *v != 3);
        view.set_sort_comparator(|a: &u32, b: &u32| b.cmp(a));
        view.commit();

        let mut caches = vec![
            GroupCache::new(Group::new("low").with_filter(|v: &u32| *v < 5)),
            GroupCache::new(Group::new("high").with_filter(|v: &u32| *v >= 5)),
        ];
        for cache in &mut caches {
            cache.refresh(&view);
        }
        let layout = GroupLayout::new(caches.iter().map(GroupCache::span));
        let members = GroupMembers::new(&caches, &view);

        assert!(RowLocation::seek_to_source(&layout, &members, 3).is_none());
        for source in [0, 1, 2, 4, 5, 9] {
            let row = RowLocation::seek_to_source(&layout, &members, source).unwrap();
            assert_eq!(row.source_index(&members), Some(source));
        }
        // Descending order puts 9 first in the "high" group, after the "low" block.
        let first_high = RowLocation::seek(&layout, 5);
        assert!(first_high.is_header());
        let row = RowLocation::seek(&layout, 6);
        assert_eq!(row.source_index(&members), Some(9));
    }
}
