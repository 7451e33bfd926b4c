//! Component pools
//!
//! Three storage strategies behind one capability trait:
//! - [`DensePool`]: packed arrays, swap-remove, order not stable across destroys
//! - [`SparsePool`]: paged, entity-index addressed, never relocates
//! - [`SaturatedPool`]: pre-sized to the entity population, destroy is a marker flip
//!
//! Pools are selected at compile time; generic code (queues, windows, zip)
//! only talks to [`ComponentPool`].

mod column;
mod dense;
mod saturated;
mod sparse;

pub use column::DenseColumn;
pub use dense::{DenseIter, DenseIterMut, DensePool};
pub use saturated::{SaturatedIter, SaturatedIterMut, SaturatedPool};
pub use sparse::{SparseIter, SparseIterMut, SparsePool};

use crate::ecs::{Entity, PoolError, Stamp, View, ViewMut, Window};

/// How a pool's positions relate to entities.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntityOrdering {
    /// Position follows insertion order, reshuffled by swap-removal.
    Insertion,
    /// Position equals entity index.
    EntityIndex,
}

/// Storage for one component type across many entities.
///
/// Structural operations (`create`, `destroy`, `clear`) bump the pool's
/// generation and invalidate outstanding [`Window`]s. `get_mut` and the
/// `*_mut` accessors are in-place and never do.
pub trait ComponentPool {
    type Component;

    type Iter<'a>: Iterator<Item = (Entity, &'a Self::Component)>
    where
        Self: 'a;

    type IterMut<'a>: Iterator<Item = (Entity, &'a mut Self::Component)>
    where
        Self: 'a;

    const ORDERING: EntityOrdering;

    fn create(
        &mut self,
        entity: Entity,
        value: Self::Component,
    ) -> Result<&mut Self::Component, PoolError>;

    fn destroy(&mut self, entity: Entity) -> Result<(), PoolError>;

    fn get(&self, entity: Entity) -> Result<&Self::Component, PoolError>;

    fn get_mut(&mut self, entity: Entity) -> Result<&mut Self::Component, PoolError>;

    /// Entity currently holding the storage slot of `entity`'s index, if any.
    fn occupant(&self, entity: Entity) -> Option<Entity>;

    fn has(&self, entity: Entity) -> bool {
        self.occupant(entity) == Some(entity)
    }

    /// Number of live components.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias of [`ComponentPool::len`].
    fn count(&self) -> usize {
        self.len()
    }

    fn clear(&mut self);

    /// Number of addressable positions (live or not).
    fn extent(&self) -> usize;

    fn entity_at(&self, pos: usize) -> Option<Entity>;

    fn value_at(&self, pos: usize) -> Option<&Self::Component>;

    fn value_at_mut(&mut self, pos: usize) -> Option<&mut Self::Component>;

    fn position_of(&self, entity: Entity) -> Option<usize>;

    fn iter(&self) -> Self::Iter<'_>;

    fn iter_mut(&mut self) -> Self::IterMut<'_>;

    fn stamp(&self) -> Stamp;

    /// Snapshot descriptor stamped with the current generation.
    fn window(&self) -> Window {
        Window::new(self.stamp(), self.extent())
    }

    fn view(&self, window: &Window) -> Result<View<'_, Self>, PoolError>
    where
        Self: Sized,
    {
        window.bind(self)
    }

    fn view_mut(&mut self, window: &Window) -> Result<ViewMut<'_, Self>, PoolError>
    where
        Self: Sized,
    {
        window.bind_mut(self)
    }
}

/// Map an occupied slot to the error a create for `entity` should report.
pub(crate) fn occupied_error(entity: Entity, occupant: Entity) -> PoolError {
    if occupant == entity {
        PoolError::DuplicateCreate { entity }
    } else {
        PoolError::IndexOccupied { entity, occupant }
    }
}
