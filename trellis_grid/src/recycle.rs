// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recycling pools for visual cells.
//!
//! A [`CellPool`] is an arena of cell slots addressed by generational
//! [`CellHandle`]s. Each slot is either *live* (tracked under a key for the
//! current layout and attached to the host scene) or *idle* (detached and on the
//! free list). Within a pass, [`CellPool::obtain`] stamps the slots it touches;
//! [`CellPool::release_unused`] then detaches every live slot that was not
//! stamped and bumps its generation, so handles from earlier passes stop
//! resolving.

use std::hash::Hash;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use kurbo::Rect;

/// A host-side visual object the grid sizes and positions.
///
/// This is the only contact point with the rendering layer.
pub trait Visual {
    /// Returns the height this visual wants when laid out `width` wide.
    fn measure_height(&mut self, width: f64) -> f64;

    /// Positions the visual in grid coordinates.
    fn set_frame(&mut self, frame: Rect);

    /// Adds the visual to the host scene.
    fn attach(&mut self);

    /// Removes the visual from the host scene.
    fn detach(&mut self);
}

/// Generational handle to a pooled cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellHandle(u32, u32);

impl CellHandle {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Pools never approach 2^32 slots; they are bounded by the viewport."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Slot<K, V> {
    generation: u32,
    key: Option<K>,
    used_pass: u64,
    cell: V,
}

/// A keyed recycling pool of visuals.
#[derive(Debug)]
pub struct CellPool<K, V> {
    slots: Vec<Slot<K, V>>,
    by_key: HashMap<K, usize>,
    free_list: Vec<usize>,
    pass: u64,
    in_pass: bool,
}

impl<K, V> Default for CellPool<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            by_key: HashMap::new(),
            free_list: Vec::new(),
            pass: 0,
            in_pass: false,
        }
    }
}

impl<K, V> CellPool<K, V>
where
    K: Copy + Eq + Hash,
    V: Visual,
{
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a layout pass. Every live slot is considered unused until
    /// obtained or marked again.
    pub fn begin_pass(&mut self) {
        debug_assert!(!self.in_pass, "CellPool passes must not interleave");
        self.pass += 1;
        self.in_pass = true;
    }

    /// Returns `true` between [`CellPool::begin_pass`] and
    /// [`CellPool::release_unused`].
    #[must_use]
    pub const fn in_pass(&self) -> bool {
        self.in_pass
    }

    /// Returns the cell tracked under `key`, reusing an idle cell or calling
    /// `create` if none is tracked, and marks it used for this pass.
    ///
    /// A reused idle cell keeps its previous content; callers must always feed
    /// it fresh data. If `create` fails the pool is left unchanged.
    pub fn obtain<E>(
        &mut self,
        key: K,
        create: impl FnOnce() -> Result<V, E>,
    ) -> Result<CellHandle, E> {
        debug_assert!(self.in_pass, "CellPool::obtain called outside a pass");
        if let Some(&idx) = self.by_key.get(&key) {
            let slot = &mut self.slots[idx];
            slot.used_pass = self.pass;
            return Ok(CellHandle::new(idx, slot.generation));
        }

        let idx = match self.free_list.pop() {
            Some(idx) => idx,
            None => {
                let cell = create()?;
                self.slots.push(Slot {
                    generation: 1,
                    key: None,
                    used_pass: 0,
                    cell,
                });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[idx];
        slot.key = Some(key);
        slot.used_pass = self.pass;
        slot.cell.attach();
        self.by_key.insert(key, idx);
        Ok(CellHandle::new(idx, slot.generation))
    }

    /// Runs `f` on an idle, detached cell without tracking it, creating one on
    /// the free list if none is idle.
    ///
    /// Used to measure rows that are not going to be shown.
    pub fn with_idle<E, R>(
        &mut self,
        create: impl FnOnce() -> Result<V, E>,
        f: impl FnOnce(&mut V) -> R,
    ) -> Result<R, E> {
        let idx = match self.free_list.last() {
            Some(&idx) => idx,
            None => {
                let cell = create()?;
                self.slots.push(Slot {
                    generation: 1,
                    key: None,
                    used_pass: 0,
                    cell,
                });
                let idx = self.slots.len() - 1;
                self.free_list.push(idx);
                idx
            }
        };
        Ok(f(&mut self.slots[idx].cell))
    }

    /// Marks a live cell as used for this pass without looking it up by key.
    ///
    /// Returns `false` if the handle is stale.
    pub fn mark_used(&mut self, handle: CellHandle) -> bool {
        let pass = self.pass;
        match self.live_slot_mut(handle) {
            Some(slot) => {
                slot.used_pass = pass;
                true
            }
            None => false,
        }
    }

    /// Ends the pass: detaches every live cell not used during it and returns
    /// it to the free list. Returns the number of released cells.
    pub fn release_unused(&mut self) -> usize {
        let mut released = 0;
        for idx in 0..self.slots.len() {
            let slot = &self.slots[idx];
            if slot.key.is_some() && slot.used_pass != self.pass {
                self.release_slot(idx);
                released += 1;
            }
        }
        self.in_pass = false;
        released
    }

    /// Detaches a single live cell and returns it to the free list.
    ///
    /// Returns `false` if the handle is stale.
    pub fn release(&mut self, handle: CellHandle) -> bool {
        if self.live_slot_mut(handle).is_none() {
            return false;
        }
        self.release_slot(handle.idx());
        true
    }

    /// Detaches the cell tracked under `key`, if any.
    pub fn release_key(&mut self, key: &K) -> bool {
        match self.by_key.get(key) {
            Some(&idx) => {
                self.release_slot(idx);
                true
            }
            None => false,
        }
    }

    fn release_slot(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        if let Some(key) = slot.key.take() {
            self.by_key.remove(&key);
            slot.cell.detach();
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(idx);
        }
    }

    fn live_slot_mut(&mut self, handle: CellHandle) -> Option<&mut Slot<K, V>> {
        self.slots
            .get_mut(handle.idx())
            .filter(|slot| slot.generation == handle.1 && slot.key.is_some())
    }

    /// Handle of the cell tracked under `key`.
    #[must_use]
    pub fn handle_for(&self, key: &K) -> Option<CellHandle> {
        let &idx = self.by_key.get(key)?;
        Some(CellHandle::new(idx, self.slots[idx].generation))
    }

    /// Returns a live cell.
    #[must_use]
    pub fn get(&self, handle: CellHandle) -> Option<&V> {
        self.slots
            .get(handle.idx())
            .filter(|slot| slot.generation == handle.1 && slot.key.is_some())
            .map(|slot| &slot.cell)
    }

    /// Returns a live cell mutably.
    pub fn get_mut(&mut self, handle: CellHandle) -> Option<&mut V> {
        self.live_slot_mut(handle).map(|slot| &mut slot.cell)
    }

    /// Returns the live cell tracked under `key`.
    #[must_use]
    pub fn get_by_key(&self, key: &K) -> Option<&V> {
        self.by_key.get(key).map(|&idx| &self.slots[idx].cell)
    }

    /// Returns the live cell tracked under `key` mutably.
    pub fn get_by_key_mut(&mut self, key: &K) -> Option<&mut V> {
        let &idx = self.by_key.get(key)?;
        Some(&mut self.slots[idx].cell)
    }

    /// Number of live (attached) cells.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.by_key.len()
    }

    /// Number of idle cells ready for reuse.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.free_list.len()
    }

    /// Iterates live cells with their keys.
    pub fn live(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.key.map(|key| (key, &slot.cell)))
    }

    /// Detaches every live cell and drops all cells.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.key.take().is_some() {
                slot.cell.detach();
            }
        }
        self.slots.clear();
        self.by_key.clear();
        self.free_list.clear();
        self.in_pass = false;
    }
}

/// Persistent per-key cells tagged with a factory revision, used for column
/// header cells.
///
/// A cached cell is recreated only when the requested revision differs from
/// the one it was created with.
#[derive(Debug)]
pub struct HeaderCache<K, V> {
    cells: HashMap<K, (u32, V)>,
}

impl<K, V> Default for HeaderCache<K, V> {
    fn default() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }
}

impl<K, V> HeaderCache<K, V>
where
    K: Copy + Eq + Hash,
    V: Visual,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell for `key`, creating (and attaching) it on a miss or a
    /// revision change.
    pub fn obtain<E>(
        &mut self,
        key: K,
        revision: u32,
        create: impl FnOnce() -> Result<V, E>,
    ) -> Result<&mut V, E> {
        match self.cells.entry(key) {
            Entry::Occupied(mut entry) => {
                if entry.get().0 != revision {
                    let mut cell = create()?;
                    cell.attach();
                    let (_, mut old) = entry.insert((revision, cell));
                    old.detach();
                }
                Ok(&mut entry.into_mut().1)
            }
            Entry::Vacant(entry) => {
                let mut cell = create()?;
                cell.attach();
                Ok(&mut entry.insert((revision, cell)).1)
            }
        }
    }

    /// Returns the cached cell for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.cells.get(key).map(|(_, cell)| cell)
    }

    /// Returns the cached cell for `key` mutably.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.cells.get_mut(key).map(|(_, cell)| cell)
    }

    /// Drops cells whose key fails `keep`, detaching them first.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.cells.retain(|key, (_, cell)| {
            let keep = keep(key);
            if !keep {
                cell.detach();
            }
            keep
        });
    }

    /// Number of cached cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cells are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
