//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that component pools key their
//! storage on. Pools never mint or retire handles themselves; that belongs to
//! the allocator. [`EntityPool`] is the minimal allocator the pools consume
//! for population sizing, and optionally logs [`EntityEvent`]s that queued
//! pools replay to follow entity lifetimes.

use std::collections::BTreeSet;
use std::vec;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in the allocator's index space (pools address by it)
/// - Generation: Incremented when the allocator recycles the index
///
/// Example:
/// ```ignore
/// let entity = entities.create().unwrap();
/// entities.destroy(entity);
/// // entity handle is now stale (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Handle for `index` at generation zero.
    pub const fn from_index(index: u32) -> Self {
        Self::new(index, 0)
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Storage slot this entity maps to in index-addressed pools.
    #[inline]
    pub(crate) fn slot(&self) -> usize {
        self.index as usize
    }

    /// Serialize to 64-bit integer (for networking/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

/// Allocator lifecycle change, in the order it happened.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityEvent {
    Created(Entity),
    Destroyed(Entity),
}

impl EntityEvent {
    pub fn entity(&self) -> Entity {
        match *self {
            EntityEvent::Created(entity) | EntityEvent::Destroyed(entity) => entity,
        }
    }
}

/// Fixed-capacity entity allocator.
///
/// Hands out the lowest free index first and bumps the generation of an
/// index every time it is returned, so recycled handles never compare equal
/// to the ones they replace.
pub struct EntityPool {
    generations: Vec<u32>,
    free: Vec<u32>,
    live: BTreeSet<u32>,
    events: Vec<EntityEvent>,
    recording: bool,
}

impl EntityPool {
    /// Create an allocator for a population of at most `max_entities`.
    pub fn new(max_entities: usize) -> Self {
        let max = max_entities.min(u32::MAX as usize) as u32;
        Self {
            generations: vec![0; max as usize],
            // Popped from the back, so lowest index first.
            free: (0..max).rev().collect(),
            live: BTreeSet::new(),
            events: Vec::new(),
            recording: false,
        }
    }

    /// Start logging lifecycle events for [`EntityPool::drain_events`].
    pub fn with_events(mut self) -> Self {
        self.recording = true;
        self
    }

    /// Allocate a handle, or `None` once the population is exhausted.
    pub fn create(&mut self) -> Option<Entity> {
        let index = self.free.pop()?;
        self.live.insert(index);
        let entity = Entity::new(index, self.generations[index as usize]);
        self.record(EntityEvent::Created(entity));
        Some(entity)
    }

    /// Retire a handle and recycle its index.
    ///
    /// Returns `false` for handles that are stale or not from this pool.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.slot();
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.live.remove(&entity.index);
        self.free.push(entity.index);
        self.record(EntityEvent::Destroyed(entity));
        true
    }

    /// Take every event logged since the last drain, oldest first.
    ///
    /// Always empty unless the pool was built [`with_events`](Self::with_events).
    pub fn drain_events(&mut self) -> vec::Drain<'_, EntityEvent> {
        self.events.drain(..)
    }

    fn record(&mut self, event: EntityEvent) {
        if self.recording {
            self.events.push(event);
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.live.contains(&entity.index)
            && self.generations.get(entity.slot()) == Some(&entity.generation)
    }

    /// Population bound (maximum number of simultaneously live entities).
    pub fn size(&self) -> usize {
        self.generations.len()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live entities in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live
            .iter()
            .map(move |&index| Entity::new(index, self.generations[index as usize]))
    }
}
