// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The grid's [`RowMeasurer`]: fills and measures pooled cells.

use core::ops::Range;

use trellis_view::ListView;

use crate::addressing::{RowKind, RowLocation};
use crate::columns::{CellFactory, Column, ColumnGeometry, ColumnId};
use crate::error::{CellError, GridError};
use crate::group::{GroupCache, GroupCellFactory, GroupCellKey, GroupPart};
use crate::metrics::RowMeasurer;
use crate::recycle::{CellPool, HeaderCache, Visual};

/// Every recycling pool a grid owns.
#[derive(Debug)]
pub(crate) struct Pools<V> {
    /// One pool per column, keyed by display position.
    pub(crate) body: Vec<CellPool<usize, V>>,
    pub(crate) group_cells: CellPool<GroupCellKey, V>,
    pub(crate) backgrounds: CellPool<usize, V>,
    pub(crate) headers: HeaderCache<ColumnId, V>,
}

impl<V: Visual> Pools<V> {
    pub(crate) fn new(columns: usize) -> Self {
        Self {
            body: (0..columns).map(|_| CellPool::new()).collect(),
            group_cells: CellPool::new(),
            backgrounds: CellPool::new(),
            headers: HeaderCache::new(),
        }
    }

    fn begin_pass(&mut self) {
        for pool in &mut self.body {
            pool.begin_pass();
        }
        self.group_cells.begin_pass();
        self.backgrounds.begin_pass();
    }

    fn release_unused(&mut self) -> usize {
        self.body
            .iter_mut()
            .map(CellPool::release_unused)
            .sum::<usize>()
            + self.group_cells.release_unused()
            + self.backgrounds.release_unused()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.body.iter().map(CellPool::live_count).sum::<usize>()
            + self.group_cells.live_count()
            + self.backgrounds.live_count()
    }
}

/// What a sizer does with the rows it is asked about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SizerMode {
    /// Measure only. Live cells are reused as they are; other rows are measured
    /// on an idle cell that stays detached.
    Measure,
    /// Obtain, fill, and keep a cell for every visible column of every row;
    /// the pools run one pass per metrics pass.
    Layout,
}

pub(crate) struct CellSizer<'a, T, V> {
    pub(crate) mode: SizerMode,
    /// Skip content measurement; the row height is configured.
    pub(crate) fixed: bool,
    pub(crate) view: &'a ListView<T>,
    pub(crate) caches: &'a mut [GroupCache<T>],
    pub(crate) columns: &'a [Column<T, V>],
    pub(crate) geometry: &'a ColumnGeometry,
    pub(crate) visible: Range<usize>,
    pub(crate) pools: &'a mut Pools<V>,
    pub(crate) group_factory: Option<&'a dyn GroupCellFactory<T, V>>,
    pub(crate) background_factory: Option<&'a dyn Fn() -> Result<V, CellError>>,
    /// Width group visuals are measured at.
    pub(crate) row_width: f64,
    pub(crate) released: usize,
}

impl<T, V: Visual> CellSizer<'_, T, V> {
    fn measure_element(
        &mut self,
        position: usize,
        group: usize,
        element: usize,
    ) -> Result<f64, GridError> {
        let (view, columns) = (self.view, self.columns);
        let source = self.caches[group]
            .rows()
            .get(element)
            .and_then(|&local| view.local_index_to_source(local));
        let Some(row) = source.and_then(|source| view.source(source)) else {
            return Ok(0.0);
        };

        let mut height = 0.0_f64;
        for index in self.visible.clone() {
            let width = self.geometry.width(index);
            if width <= 0.0 {
                continue;
            }
            let factory = columns[index].factory();
            let create = || {
                factory
                    .create_body()
                    .map_err(|source| GridError::ColumnCell {
                        column: index,
                        source,
                    })
            };
            let fixed = self.fixed;
            let fill = |cell: &mut V| show(factory, cell, row, width, fixed);
            let pool = &mut self.pools.body[index];
            let measured = match self.mode {
                SizerMode::Layout => {
                    let handle = pool.obtain(position, create)?;
                    pool.get_mut(handle).map_or(0.0, fill)
                }
                SizerMode::Measure => match pool.get_by_key_mut(&position) {
                    Some(cell) => fill(cell),
                    None => pool.with_idle(create, fill)?,
                },
            };
            height = height.max(measured);
        }

        if self.mode == SizerMode::Layout
            && let Some(make) = self.background_factory
        {
            self.pools
                .backgrounds
                .obtain(position, || {
                    make().map_err(|source| GridError::RowBackground { source })
                })?;
        }
        Ok(height)
    }

    fn measure_group(&mut self, group: usize, part: GroupPart) -> Result<f64, GridError> {
        let Some(factory) = self.group_factory else {
            return Ok(0.0);
        };
        let create = || {
            factory
                .create(part)
                .map_err(|source| GridError::GroupCell { group, source })
        };
        let key = GroupCellKey { group, part };
        let pool = &mut self.pools.group_cells;
        let cache = &mut self.caches[group];
        let (width, fixed) = (self.row_width, self.fixed);
        let fill = |cell: &mut V, cache: &GroupCache<T>| {
            factory.set_group_data(cell, cache.group(), part, cache.rows().len());
            if fixed { 0.0 } else { cell.measure_height(width) }
        };
        match self.mode {
            SizerMode::Layout => {
                let handle = pool.obtain(key, create)?;
                cache.set_cell(part, handle);
                Ok(pool.get_mut(handle).map_or(0.0, |cell| fill(cell, cache)))
            }
            SizerMode::Measure => match pool.get_by_key_mut(&key) {
                Some(cell) => Ok(fill(cell, cache)),
                None => pool.with_idle(create, |cell| fill(cell, cache)),
            },
        }
    }
}

fn show<T, V: Visual>(
    factory: &dyn CellFactory<T, V>,
    cell: &mut V,
    row: &T,
    width: f64,
    fixed: bool,
) -> f64 {
    factory.set_cell_data(cell, row);
    if fixed { 0.0 } else { cell.measure_height(width) }
}

impl<T, V: Visual> RowMeasurer for CellSizer<'_, T, V> {
    type Error = GridError;

    fn begin_pass(&mut self) {
        if self.mode == SizerMode::Layout {
            self.pools.begin_pass();
        }
    }

    fn measure_row(&mut self, row: &RowLocation) -> Result<f64, GridError> {
        match row.kind() {
            Some(RowKind::Element(element)) => {
                self.measure_element(row.position(), row.group_index(), element)
            }
            Some(RowKind::Header) => self.measure_group(row.group_index(), GroupPart::Header),
            Some(RowKind::Footer) => self.measure_group(row.group_index(), GroupPart::Footer),
            None => Ok(0.0),
        }
    }

    fn end_pass(&mut self) {
        if self.mode == SizerMode::Layout {
            self.released = self.pools.release_unused();
        }
    }

    fn content_width(&self, _available: f64) -> f64 {
        self.geometry.total_width()
    }
}
