use crate::ecs::{Entity, PoolError};
use crate::pool::{occupied_error, ComponentPool};
use std::collections::HashMap;
use std::mem;

/// Pending component creations for one pool, applied in FIFO order.
///
/// At most one entry per entity index may be outstanding, whatever its
/// generation: two pending creates for one index could never both apply.
pub struct CreationQueue<T> {
    entries: Vec<(Entity, T)>,
    pending: HashMap<u32, Entity>,
}

impl<T> CreationQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pending: HashMap::new(),
        }
    }

    /// Rejected with `DuplicateCreate` when `entity` is already queued, and
    /// with `IndexOccupied` when another generation of its index is.
    pub fn enqueue(&mut self, entity: Entity, value: T) -> Result<(), PoolError> {
        if let Some(&queued) = self.pending.get(&entity.index()) {
            return Err(occupied_error(entity, queued));
        }
        self.pending.insert(entity.index(), entity);
        self.entries.push((entity, value));
        Ok(())
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.pending_at(entity.index()) == Some(entity)
    }

    /// The handle queued for creation at `index`, if any.
    #[inline]
    pub fn pending_at(&self, index: u32) -> Option<Entity> {
        self.pending.get(&index).copied()
    }

    /// Withdraw `entity`'s entry, handing back its value.
    pub fn cancel(&mut self, entity: Entity) -> Option<T> {
        if !self.contains(entity) {
            return None;
        }
        self.pending.remove(&entity.index());
        let row = self.entries.iter().position(|(queued, _)| *queued == entity)?;
        Some(self.entries.remove(row).1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard every pending entry without applying it.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    /// Entities with a pending creation, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().map(|(entity, _)| *entity)
    }

    /// Apply every entry to `pool`, oldest first.
    ///
    /// Stops at the first rejected entry: that entry is dropped, the ones
    /// after it stay queued, and the pool's error is returned.
    pub fn flush_into<P>(&mut self, pool: &mut P) -> Result<usize, PoolError>
    where
        P: ComponentPool<Component = T>,
    {
        let mut entries = mem::take(&mut self.entries).into_iter();
        let mut applied = 0;
        while let Some((entity, value)) = entries.next() {
            self.pending.remove(&entity.index());
            if let Err(err) = pool.create(entity, value) {
                self.entries.extend(entries);
                return Err(err);
            }
            applied += 1;
        }
        Ok(applied)
    }
}

impl<T> Default for CreationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
