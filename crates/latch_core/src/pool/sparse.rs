// sparse.rs - Entity-index addressed component storage
//
// Entity index `i` lives in page `i >> shift` at local slot `i & mask`.
// Pages are allocated lazily and never move once allocated, so a live
// component keeps its address across unrelated destroys and across growth.

use super::{occupied_error, ComponentPool, EntityOrdering};
use crate::ecs::{Entity, GenerationCounter, PoolError, Stamp};
use crate::settings::{PoolSettings, SettingsError};
use std::slice;
use tracing::trace;

type Slot<T> = Option<(Entity, T)>;

struct SparsePage<T> {
    slots: Box<[Slot<T>]>,
    live: usize,
}

impl<T> SparsePage<T> {
    fn with_rows(rows: usize) -> Self {
        Self {
            slots: (0..rows).map(|_| None).collect(),
            live: 0,
        }
    }
}

/// Sparse component pool.
///
/// Removal clears a presence marker and never relocates anything, so
/// iteration order is entity-index order. Memory grows with the highest
/// touched entity index (rounded up to whole pages), not with the live count.
pub struct SparsePool<T> {
    rows_per_page: usize,
    shift: u32,
    mask: usize,
    pages: Vec<Option<SparsePage<T>>>,
    len: usize,
    generations: GenerationCounter,
}

impl<T> SparsePool<T> {
    pub const DEFAULT_ROWS_PER_PAGE: usize = 256;

    pub fn new() -> Self {
        Self::with_rows_per_page(Self::DEFAULT_ROWS_PER_PAGE)
    }

    /// `rows_per_page` must be a non-zero power of two.
    pub fn with_rows_per_page(rows_per_page: usize) -> Self {
        assert!(rows_per_page.is_power_of_two() && rows_per_page > 0);
        Self {
            rows_per_page,
            shift: rows_per_page.trailing_zeros(),
            mask: rows_per_page - 1,
            pages: Vec::new(),
            len: 0,
            generations: GenerationCounter::new(),
        }
    }

    pub fn with_settings(settings: &PoolSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::with_rows_per_page(settings.sparse_rows_per_page))
    }

    #[inline]
    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Number of pages currently backed by memory.
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }

    /// Release pages that no longer hold any live component.
    pub fn shrink_to_fit(&mut self) {
        for page in &mut self.pages {
            if page.as_ref().map_or(false, |p| p.live == 0) {
                *page = None;
            }
        }
        while self.pages.last().map_or(false, |p| p.is_none()) {
            self.pages.pop();
        }
    }

    #[inline]
    fn page_of(&self, idx: usize) -> usize {
        idx >> self.shift
    }

    #[inline]
    fn local_of(&self, idx: usize) -> usize {
        idx & self.mask
    }

    fn slot(&self, idx: usize) -> Option<&Slot<T>> {
        let page = self.pages.get(self.page_of(idx))?.as_ref()?;
        page.slots.get(self.local_of(idx))
    }

    fn slot_mut(&mut self, idx: usize) -> Option<&mut Slot<T>> {
        let (pid, local) = (self.page_of(idx), self.local_of(idx));
        let page = self.pages.get_mut(pid)?.as_mut()?;
        page.slots.get_mut(local)
    }

    fn ensure_page(&mut self, pid: usize) -> &mut SparsePage<T> {
        if pid >= self.pages.len() {
            self.pages.resize_with(pid + 1, || None);
        }
        let rows = self.rows_per_page;
        self.pages[pid].get_or_insert_with(|| SparsePage::with_rows(rows))
    }
}

impl<T> Default for SparsePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComponentPool for SparsePool<T> {
    type Component = T;
    type Iter<'a> = SparseIter<'a, T> where Self: 'a;
    type IterMut<'a> = SparseIterMut<'a, T> where Self: 'a;

    const ORDERING: EntityOrdering = EntityOrdering::EntityIndex;

    fn create(&mut self, entity: Entity, value: T) -> Result<&mut T, PoolError> {
        if let Some(occupant) = self.occupant(entity) {
            return Err(occupied_error(entity, occupant));
        }
        let idx = entity.slot();
        let (pid, local) = (self.page_of(idx), self.local_of(idx));
        self.len += 1;
        self.generations.bump();
        trace!(?entity, page = pid, "sparse pool create");
        let page = self.ensure_page(pid);
        page.live += 1;
        let slot = &mut page.slots[local];
        let (_, stored) = slot.insert((entity, value));
        Ok(stored)
    }

    fn destroy(&mut self, entity: Entity) -> Result<(), PoolError> {
        if !self.has(entity) {
            return Err(PoolError::MissingEntity { entity });
        }
        let idx = entity.slot();
        let (pid, local) = (self.page_of(idx), self.local_of(idx));
        if let Some(page) = self.pages.get_mut(pid).and_then(Option::as_mut) {
            page.slots[local] = None;
            page.live -= 1;
        }
        self.len -= 1;
        self.generations.bump();
        trace!(?entity, page = pid, "sparse pool destroy");
        Ok(())
    }

    fn get(&self, entity: Entity) -> Result<&T, PoolError> {
        match self.slot(entity.slot()) {
            Some(Some((occupant, value))) if *occupant == entity => Ok(value),
            _ => Err(PoolError::MissingEntity { entity }),
        }
    }

    fn get_mut(&mut self, entity: Entity) -> Result<&mut T, PoolError> {
        match self.slot_mut(entity.slot()) {
            Some(Some((occupant, value))) if *occupant == entity => Ok(value),
            _ => Err(PoolError::MissingEntity { entity }),
        }
    }

    fn occupant(&self, entity: Entity) -> Option<Entity> {
        self.slot(entity.slot())?.as_ref().map(|(occupant, _)| *occupant)
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.pages.clear();
        self.len = 0;
        self.generations.bump();
    }

    #[inline]
    fn extent(&self) -> usize {
        self.pages.len() << self.shift
    }

    fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.slot(pos)?.as_ref().map(|(entity, _)| *entity)
    }

    fn value_at(&self, pos: usize) -> Option<&T> {
        self.slot(pos)?.as_ref().map(|(_, value)| value)
    }

    fn value_at_mut(&mut self, pos: usize) -> Option<&mut T> {
        self.slot_mut(pos)?.as_mut().map(|(_, value)| value)
    }

    fn position_of(&self, entity: Entity) -> Option<usize> {
        self.has(entity).then(|| entity.slot())
    }

    fn iter(&self) -> SparseIter<'_, T> {
        SparseIter {
            pages: self.pages.iter(),
            slots: Default::default(),
        }
    }

    fn iter_mut(&mut self) -> SparseIterMut<'_, T> {
        SparseIterMut {
            pages: self.pages.iter_mut(),
            slots: Default::default(),
        }
    }

    #[inline]
    fn stamp(&self) -> Stamp {
        self.generations.stamp()
    }
}

/// Live components of a [`SparsePool`] in entity-index order.
pub struct SparseIter<'a, T> {
    pages: slice::Iter<'a, Option<SparsePage<T>>>,
    slots: slice::Iter<'a, Slot<T>>,
}

impl<'a, T> Iterator for SparseIter<'a, T> {
    type Item = (Entity, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(slot) = self.slots.next() {
                if let Some((entity, value)) = slot {
                    return Some((*entity, value));
                }
                continue;
            }
            // Unallocated pages hold nothing; skip them whole.
            if let Some(page) = self.pages.next()?.as_ref() {
                self.slots = page.slots.iter();
            }
        }
    }
}

/// Mutable counterpart of [`SparseIter`].
pub struct SparseIterMut<'a, T> {
    pages: slice::IterMut<'a, Option<SparsePage<T>>>,
    slots: slice::IterMut<'a, Slot<T>>,
}

impl<'a, T> Iterator for SparseIterMut<'a, T> {
    type Item = (Entity, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(slot) = self.slots.next() {
                if let Some((entity, value)) = slot {
                    return Some((*entity, value));
                }
                continue;
            }
            if let Some(page) = self.pages.next()?.as_mut() {
                self.slots = page.slots.iter_mut();
            }
        }
    }
}
