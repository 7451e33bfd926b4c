// saturated.rs - Population-sized component storage
//
// One slot per entity index of the population, allocated up front. Destroy
// flips a slot to Retired in place; iteration walks the whole population and
// skips anything that is not Live.

use super::{occupied_error, ComponentPool, EntityOrdering};
use crate::ecs::{Entity, EntityPool, GenerationCounter, PoolError, Stamp};
use crate::settings::PoolSettings;
use std::mem;
use std::slice;
use tracing::{debug, trace, warn};

enum Slot<T> {
    Vacant,
    Live(Entity, T),
    /// Destroyed but not yet reclaimed. The value stays in place until the
    /// index is recreated, the pool is cleared, or `reclaim_retired` runs.
    Retired(Entity, T),
}

/// Saturated component pool.
///
/// Meant for components nearly every entity carries. Create never
/// reallocates while the entity index stays inside the population, and
/// destroy never moves a slot. Iteration cost is proportional to the
/// population, not to the live count.
pub struct SaturatedPool<T> {
    slots: Vec<Slot<T>>,
    live: usize,
    population: usize,
    generations: GenerationCounter,
}

impl<T> SaturatedPool<T> {
    pub fn with_population(population: usize) -> Self {
        Self {
            slots: (0..population).map(|_| Slot::Vacant).collect(),
            live: 0,
            population,
            generations: GenerationCounter::new(),
        }
    }

    /// Size to the index space of `entities`.
    pub fn for_population(entities: &EntityPool) -> Self {
        Self::with_population(entities.size())
    }

    /// Size to `entities` and seed a clone of `default` for every live entity.
    pub fn from_population(entities: &EntityPool, default: T) -> Self
    where
        T: Clone,
    {
        let mut pool = Self::for_population(entities);
        for entity in entities.iter() {
            pool.slots[entity.slot()] = Slot::Live(entity, default.clone());
            pool.live += 1;
        }
        pool
    }

    pub fn with_settings(settings: &PoolSettings) -> Self {
        Self::with_population(settings.saturated_population)
    }

    /// Population the pool was sized for.
    #[inline]
    pub fn population(&self) -> usize {
        self.population
    }

    /// Live components in entity-index order.
    pub fn entity_iter(&self) -> SaturatedIter<'_, T> {
        SaturatedIter {
            slots: self.slots.iter(),
        }
    }

    /// Handles whose slots are retired but not yet reclaimed, in index order.
    pub fn retired(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Retired(entity, _) => Some(*entity),
            _ => None,
        })
    }

    pub fn retired_count(&self) -> usize {
        self.retired().count()
    }

    /// Drop every retired value, turning its slot vacant.
    ///
    /// No slot moves and no live entity changes, so outstanding windows stay
    /// valid. Returns the number of slots reclaimed.
    pub fn reclaim_retired(&mut self) -> usize {
        let mut reclaimed = 0;
        for slot in &mut self.slots {
            if let Slot::Retired(entity, _) = slot {
                trace!(?entity, "reclaiming retired slot");
                *slot = Slot::Vacant;
                reclaimed += 1;
            }
        }
        debug!(reclaimed, "saturated pool reclaimed retired slots");
        reclaimed
    }

    fn live_slot(&self, idx: usize) -> Option<(Entity, &T)> {
        match self.slots.get(idx)? {
            Slot::Live(entity, value) => Some((*entity, value)),
            _ => None,
        }
    }

    fn live_slot_mut(&mut self, idx: usize) -> Option<(Entity, &mut T)> {
        match self.slots.get_mut(idx)? {
            Slot::Live(entity, value) => Some((*entity, value)),
            _ => None,
        }
    }
}

impl<T> ComponentPool for SaturatedPool<T> {
    type Component = T;
    type Iter<'a> = SaturatedIter<'a, T> where Self: 'a;
    type IterMut<'a> = SaturatedIterMut<'a, T> where Self: 'a;

    const ORDERING: EntityOrdering = EntityOrdering::EntityIndex;

    fn create(&mut self, entity: Entity, value: T) -> Result<&mut T, PoolError> {
        if let Some(occupant) = self.occupant(entity) {
            return Err(occupied_error(entity, occupant));
        }
        let idx = entity.slot();
        if idx >= self.slots.len() {
            warn!(
                ?entity,
                population = self.population,
                "saturated pool grown past its population"
            );
            self.slots.resize_with(idx + 1, || Slot::Vacant);
        }
        self.slots[idx] = Slot::Live(entity, value);
        self.live += 1;
        self.generations.bump();
        trace!(?entity, "saturated pool create");
        self.live_slot_mut(idx)
            .map(|(_, value)| value)
            .ok_or(PoolError::MissingEntity { entity })
    }

    fn destroy(&mut self, entity: Entity) -> Result<(), PoolError> {
        if !self.has(entity) {
            return Err(PoolError::MissingEntity { entity });
        }
        let slot = &mut self.slots[entity.slot()];
        if let Slot::Live(occupant, value) = mem::replace(slot, Slot::Vacant) {
            *slot = Slot::Retired(occupant, value);
        }
        self.live -= 1;
        self.generations.bump();
        trace!(?entity, "saturated pool destroy");
        Ok(())
    }

    fn get(&self, entity: Entity) -> Result<&T, PoolError> {
        match self.live_slot(entity.slot()) {
            Some((occupant, value)) if occupant == entity => Ok(value),
            _ => Err(PoolError::MissingEntity { entity }),
        }
    }

    fn get_mut(&mut self, entity: Entity) -> Result<&mut T, PoolError> {
        match self.live_slot_mut(entity.slot()) {
            Some((occupant, value)) if occupant == entity => Ok(value),
            _ => Err(PoolError::MissingEntity { entity }),
        }
    }

    fn occupant(&self, entity: Entity) -> Option<Entity> {
        self.live_slot(entity.slot()).map(|(occupant, _)| occupant)
    }

    #[inline]
    fn len(&self) -> usize {
        self.live
    }

    /// Every slot becomes vacant; the population-sized storage is kept.
    fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Vacant;
        }
        debug!(dropped = self.live, "saturated pool cleared");
        self.live = 0;
        self.generations.bump();
    }

    #[inline]
    fn extent(&self) -> usize {
        self.slots.len()
    }

    fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.live_slot(pos).map(|(entity, _)| entity)
    }

    fn value_at(&self, pos: usize) -> Option<&T> {
        self.live_slot(pos).map(|(_, value)| value)
    }

    fn value_at_mut(&mut self, pos: usize) -> Option<&mut T> {
        self.live_slot_mut(pos).map(|(_, value)| value)
    }

    fn position_of(&self, entity: Entity) -> Option<usize> {
        self.has(entity).then(|| entity.slot())
    }

    fn iter(&self) -> SaturatedIter<'_, T> {
        self.entity_iter()
    }

    fn iter_mut(&mut self) -> SaturatedIterMut<'_, T> {
        SaturatedIterMut {
            slots: self.slots.iter_mut(),
        }
    }

    #[inline]
    fn stamp(&self) -> Stamp {
        self.generations.stamp()
    }
}

/// Entity iterator of a [`SaturatedPool`]: live slots only, ascending index.
pub struct SaturatedIter<'a, T> {
    slots: slice::Iter<'a, Slot<T>>,
}

impl<'a, T> Iterator for SaturatedIter<'a, T> {
    type Item = (Entity, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(|slot| match slot {
            Slot::Live(entity, value) => Some((*entity, value)),
            _ => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.slots.size_hint().1)
    }
}

pub struct SaturatedIterMut<'a, T> {
    slots: slice::IterMut<'a, Slot<T>>,
}

impl<'a, T> Iterator for SaturatedIterMut<'a, T> {
    type Item = (Entity, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(|slot| match slot {
            Slot::Live(entity, value) => Some((*entity, value)),
            _ => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.slots.size_hint().1)
    }
}
