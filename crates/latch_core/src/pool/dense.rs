// dense.rs - Packed component storage with swap-remove
//
// Components live in a gap-free column; a sparse lookup table maps entity
// index -> row. Destroy swaps the last row into the hole and patches the
// lookup entry of the row that moved.

use super::{occupied_error, ComponentPool, DenseColumn, EntityOrdering};
use crate::ecs::{Entity, EntityPool, GenerationCounter, PoolError, Stamp};
use crate::settings::PoolSettings;
use std::iter::{Copied, Zip};
use std::slice;
use tracing::trace;

pub type DenseIter<'a, T> = Zip<Copied<slice::Iter<'a, Entity>>, slice::Iter<'a, T>>;
pub type DenseIterMut<'a, T> = Zip<Copied<slice::Iter<'a, Entity>>, slice::IterMut<'a, T>>;

/// Dense component pool.
///
/// Create and destroy are O(1). Iteration walks one contiguous array in
/// insertion order, except that every destroy moves the current last
/// component into the destroyed one's row.
pub struct DensePool<T> {
    column: DenseColumn<T>,
    lookup: Vec<Option<u32>>,
    generations: GenerationCounter,
}

impl<T> DensePool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            column: DenseColumn::with_capacity(rows),
            lookup: Vec::new(),
            generations: GenerationCounter::new(),
        }
    }

    pub fn with_settings(settings: &PoolSettings) -> Self {
        Self::with_capacity(settings.dense_initial_capacity)
    }

    /// Seed a clone of `default` for every live entity of `entities`.
    pub fn from_population(entities: &EntityPool, default: T) -> Self
    where
        T: Clone,
    {
        let mut pool = Self::with_capacity(entities.len());
        pool.lookup.resize(entities.size(), None);
        for entity in entities.iter() {
            let row = pool.column.push(entity, default.clone());
            pool.lookup[entity.slot()] = Some(row as u32);
        }
        pool
    }

    /// Remove `entity`'s component and hand it back.
    pub fn take(&mut self, entity: Entity) -> Result<T, PoolError> {
        let row = self
            .position_of(entity)
            .ok_or(PoolError::MissingEntity { entity })?;
        let lookup = &mut self.lookup;
        let (_, value) = self
            .column
            .free_one_swap_remove(row, |moved, _from, to| {
                lookup[moved.slot()] = Some(to as u32);
            })
            .ok_or(PoolError::MissingEntity { entity })?;
        self.lookup[entity.slot()] = None;
        self.generations.bump();
        trace!(?entity, row, "dense pool destroy");
        Ok(value)
    }

    /// Live entities in row order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        self.column.entities()
    }

    /// Live components in row order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.column.values()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.column.values_mut()
    }

    #[inline]
    fn row_of(&self, entity: Entity) -> Option<usize> {
        self.lookup
            .get(entity.slot())
            .copied()
            .flatten()
            .map(|row| row as usize)
    }
}

impl<T> Default for DensePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComponentPool for DensePool<T> {
    type Component = T;
    type Iter<'a> = DenseIter<'a, T> where Self: 'a;
    type IterMut<'a> = DenseIterMut<'a, T> where Self: 'a;

    const ORDERING: EntityOrdering = EntityOrdering::Insertion;

    fn create(&mut self, entity: Entity, value: T) -> Result<&mut T, PoolError> {
        if let Some(occupant) = self.occupant(entity) {
            return Err(occupied_error(entity, occupant));
        }
        let slot = entity.slot();
        if slot >= self.lookup.len() {
            self.lookup.resize(slot + 1, None);
        }
        let row = self.column.push(entity, value);
        self.lookup[slot] = Some(row as u32);
        self.generations.bump();
        trace!(?entity, row, "dense pool create");
        self.column
            .get_mut(row)
            .ok_or(PoolError::MissingEntity { entity })
    }

    fn destroy(&mut self, entity: Entity) -> Result<(), PoolError> {
        self.take(entity).map(drop)
    }

    fn get(&self, entity: Entity) -> Result<&T, PoolError> {
        self.position_of(entity)
            .and_then(|row| self.column.get(row))
            .ok_or(PoolError::MissingEntity { entity })
    }

    fn get_mut(&mut self, entity: Entity) -> Result<&mut T, PoolError> {
        match self.position_of(entity) {
            Some(row) => self
                .column
                .get_mut(row)
                .ok_or(PoolError::MissingEntity { entity }),
            None => Err(PoolError::MissingEntity { entity }),
        }
    }

    fn occupant(&self, entity: Entity) -> Option<Entity> {
        self.row_of(entity).and_then(|row| self.column.entity(row))
    }

    #[inline]
    fn len(&self) -> usize {
        self.column.len()
    }

    fn clear(&mut self) {
        self.column.clear();
        self.lookup.clear();
        self.generations.bump();
    }

    #[inline]
    fn extent(&self) -> usize {
        self.column.len()
    }

    #[inline]
    fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.column.entity(pos)
    }

    #[inline]
    fn value_at(&self, pos: usize) -> Option<&T> {
        self.column.get(pos)
    }

    #[inline]
    fn value_at_mut(&mut self, pos: usize) -> Option<&mut T> {
        self.column.get_mut(pos)
    }

    fn position_of(&self, entity: Entity) -> Option<usize> {
        let row = self.row_of(entity)?;
        (self.column.entity(row) == Some(entity)).then_some(row)
    }

    fn iter(&self) -> DenseIter<'_, T> {
        self.column.iter()
    }

    fn iter_mut(&mut self) -> DenseIterMut<'_, T> {
        self.column.iter_mut()
    }

    #[inline]
    fn stamp(&self) -> Stamp {
        self.generations.stamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: u32) -> Entity {
        Entity::from_index(i)
    }

    #[test]
    fn create_get_has() {
        let mut pool = DensePool::new();
        *pool.create(e(4), 1u32).unwrap() += 1;
        assert!(pool.has(e(4)));
        assert!(!pool.has(e(3)));
        assert_eq!(pool.get(e(4)), Ok(&2));
        assert_eq!(pool.get(e(3)), Err(PoolError::MissingEntity { entity: e(3) }));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn duplicate_create_is_reported() {
        let mut pool = DensePool::new();
        pool.create(e(0), "a").unwrap();
        assert_eq!(
            pool.create(e(0), "b").unwrap_err(),
            PoolError::DuplicateCreate { entity: e(0) }
        );
        assert_eq!(pool.get(e(0)), Ok(&"a"));
    }

    #[test]
    fn stale_generation_is_not_present() {
        let mut pool = DensePool::new();
        let old = Entity::new(2, 0);
        let new = Entity::new(2, 1);
        pool.create(old, 1u8).unwrap();
        assert!(!pool.has(new));
        assert_eq!(
            pool.create(new, 2).unwrap_err(),
            PoolError::IndexOccupied { entity: new, occupant: old }
        );
        assert!(pool.destroy(new).is_err());
        pool.destroy(old).unwrap();
        pool.create(new, 3).unwrap();
        assert_eq!(pool.get(new), Ok(&3));
    }

    #[test]
    fn destroy_moves_last_into_hole() {
        let mut pool = DensePool::new();
        for i in 0..5 {
            pool.create(e(i), i).unwrap();
        }
        assert_eq!(pool.position_of(e(1)), Some(1));
        assert_eq!(pool.position_of(e(4)), Some(4));

        pool.destroy(e(1)).unwrap();

        assert_eq!(pool.position_of(e(4)), Some(1));
        for i in [0, 2, 3] {
            assert_eq!(pool.position_of(e(i)), Some(i as usize), "entity {i} must not move");
        }
        assert_eq!(pool.entities(), &[e(0), e(4), e(2), e(3)]);
        assert_eq!(pool.as_slice(), &[0, 4, 2, 3]);
    }

    #[test]
    fn destroy_missing_is_reported() {
        let mut pool: DensePool<u32> = DensePool::new();
        assert_eq!(
            pool.destroy(e(9)),
            Err(PoolError::MissingEntity { entity: e(9) })
        );
    }

    #[test]
    fn take_returns_value() {
        let mut pool = DensePool::new();
        pool.create(e(0), String::from("zero")).unwrap();
        assert_eq!(pool.take(e(0)).unwrap(), "zero");
        assert!(pool.is_empty());
    }

    #[test]
    fn clear_empties_and_bumps_generation() {
        let mut pool = DensePool::new();
        pool.create(e(0), 0u8).unwrap();
        let before = pool.stamp();
        pool.clear();
        assert_eq!(pool.len(), 0);
        assert!(!pool.has(e(0)));
        assert_ne!(pool.stamp(), before);
    }

    #[test]
    fn from_population_seeds_live_entities() {
        let mut entities = EntityPool::new(8);
        let a = entities.create().unwrap();
        let b = entities.create().unwrap();
        let c = entities.create().unwrap();
        entities.destroy(b);

        let pool = DensePool::from_population(&entities, 7u16);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(a), Ok(&7));
        assert_eq!(pool.get(c), Ok(&7));
        assert!(!pool.has(b));
    }

    #[test]
    fn iter_mut_updates_in_place() {
        let mut pool = DensePool::new();
        for i in 0..3 {
            pool.create(e(i), i).unwrap();
        }
        for (_, v) in pool.iter_mut() {
            *v *= 10;
        }
        let collected: Vec<_> = pool.iter().map(|(e, v)| (e.index(), *v)).collect();
        assert_eq!(collected, vec![(0, 0), (1, 10), (2, 20)]);
    }
}
