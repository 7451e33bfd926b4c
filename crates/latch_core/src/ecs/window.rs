// window.rs - Generation-stamped views over a pool's storage
//
// A pool bumps its generation on every structural mutation. Windows carry
// the (pool, generation) stamp they were issued under and are rejected once
// either half no longer matches.

use crate::ecs::{Entity, PoolError};
use crate::pool::ComponentPool;
use rayon::prelude::*;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum number of positions handed to one rayon job in `par_for_each`.
const PAR_MIN_BATCH: usize = 1024;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a pool instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PoolId(u64);

impl PoolId {
    fn next() -> Self {
        Self(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity plus structural generation of a pool at one point in time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Stamp {
    pub pool: PoolId,
    pub generation: u64,
}

/// Per-pool structural generation counter.
#[derive(Debug)]
pub struct GenerationCounter {
    pool: PoolId,
    current: u64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self {
            pool: PoolId::next(),
            current: 0,
        }
    }

    /// Invalidate every window issued so far.
    #[inline]
    pub fn bump(&mut self) {
        self.current = self.current.wrapping_add(1);
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current
    }

    #[inline]
    pub fn stamp(&self) -> Stamp {
        Stamp {
            pool: self.pool,
            generation: self.current,
        }
    }
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Detached snapshot descriptor over a pool's positions `0..extent`.
///
/// A window does not borrow its pool, so the pool can keep receiving queued
/// work while a caller walks positions. Every access re-checks the stamp;
/// [`Window::bind`] checks once and hands out a borrow-protected [`View`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Window {
    stamp: Stamp,
    extent: usize,
}

impl Window {
    pub(crate) fn new(stamp: Stamp, extent: usize) -> Self {
        Self { stamp, extent }
    }

    #[inline]
    pub fn pool(&self) -> PoolId {
        self.stamp.pool
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.stamp.generation
    }

    /// Number of addressable positions when the window was issued.
    #[inline]
    pub fn extent(&self) -> usize {
        self.extent
    }

    #[inline]
    pub fn positions(&self) -> Range<usize> {
        0..self.extent
    }

    /// Compare against a pool's current stamp.
    pub fn check(&self, current: Stamp) -> Result<(), PoolError> {
        if current.pool != self.stamp.pool {
            return Err(PoolError::ForeignWindow {
                window_pool: self.stamp.pool,
                pool: current.pool,
            });
        }
        if current.generation != self.stamp.generation {
            return Err(PoolError::StaleWindow {
                issued: self.stamp.generation,
                current: current.generation,
            });
        }
        Ok(())
    }

    pub fn is_valid_for<P: ComponentPool>(&self, pool: &P) -> bool {
        self.check(pool.stamp()).is_ok()
    }

    /// Validate once and borrow the pool for read access.
    pub fn bind<'a, P: ComponentPool>(&self, pool: &'a P) -> Result<View<'a, P>, PoolError> {
        self.check(pool.stamp())?;
        Ok(View { pool, window: *self })
    }

    /// Validate once and borrow the pool for in-place mutation.
    pub fn bind_mut<'a, P: ComponentPool>(
        &self,
        pool: &'a mut P,
    ) -> Result<ViewMut<'a, P>, PoolError> {
        self.check(pool.stamp())?;
        Ok(ViewMut { pool, window: *self })
    }

    /// Checked lookup by entity.
    pub fn get<'a, P: ComponentPool>(
        &self,
        pool: &'a P,
        entity: Entity,
    ) -> Result<&'a P::Component, PoolError> {
        self.check(pool.stamp())?;
        pool.get(entity)
    }

    /// Checked mutable lookup by entity.
    pub fn get_mut<'a, P: ComponentPool>(
        &self,
        pool: &'a mut P,
        entity: Entity,
    ) -> Result<&'a mut P::Component, PoolError> {
        self.check(pool.stamp())?;
        pool.get_mut(entity)
    }

    /// Checked positional access. `Ok(None)` for absent slots and for
    /// positions outside the window.
    pub fn entry<'a, P: ComponentPool>(
        &self,
        pool: &'a P,
        pos: usize,
    ) -> Result<Option<(Entity, &'a P::Component)>, PoolError> {
        self.check(pool.stamp())?;
        if pos >= self.extent {
            return Ok(None);
        }
        Ok(pool.entity_at(pos).zip(pool.value_at(pos)))
    }
}

/// Read access to a pool through a validated window.
///
/// Holding the view borrows the pool, so its generation cannot move while
/// the view is alive.
pub struct View<'a, P: ComponentPool> {
    pool: &'a P,
    window: Window,
}

impl<'a, P: ComponentPool> Clone for View<'a, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, P: ComponentPool> Copy for View<'a, P> {}

impl<'a, P: ComponentPool> View<'a, P> {
    #[inline]
    pub fn window(&self) -> Window {
        self.window
    }

    #[inline]
    pub fn pool(&self) -> &'a P {
        self.pool
    }

    /// Live component count.
    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    #[inline]
    pub fn extent(&self) -> usize {
        self.window.extent
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.pool.has(entity)
    }

    pub fn get(&self, entity: Entity) -> Result<&'a P::Component, PoolError> {
        self.pool.get(entity)
    }

    #[inline]
    pub fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.pool.entity_at(pos)
    }

    #[inline]
    pub fn value_at(&self, pos: usize) -> Option<&'a P::Component> {
        self.pool.value_at(pos)
    }

    pub fn position_of(&self, entity: Entity) -> Option<usize> {
        self.pool.position_of(entity)
    }

    pub fn iter(&self) -> P::Iter<'a> {
        self.pool.iter()
    }

    /// Value for `entity`, trying `pos` first and falling back to a keyed
    /// lookup when the position holds someone else.
    #[inline]
    pub(crate) fn aligned(&self, pos: usize, entity: Entity) -> Option<&'a P::Component> {
        if self.pool.entity_at(pos) == Some(entity) {
            return self.pool.value_at(pos);
        }
        self.pool.get(entity).ok()
    }

    #[inline]
    pub(crate) fn probe(&self, pos: usize, entity: Entity) -> bool {
        self.pool.entity_at(pos) == Some(entity) || self.pool.has(entity)
    }

    /// Batched parallel read of every live component.
    pub fn par_for_each<F>(&self, f: F)
    where
        P: Sync,
        F: Fn(Entity, &P::Component) + Send + Sync,
    {
        let pool = self.pool;
        (0..self.window.extent)
            .into_par_iter()
            .with_min_len(PAR_MIN_BATCH)
            .for_each(|pos| {
                if let (Some(entity), Some(value)) = (pool.entity_at(pos), pool.value_at(pos)) {
                    f(entity, value);
                }
            });
    }
}

impl<'a, P: ComponentPool> IntoIterator for View<'a, P> {
    type Item = (Entity, &'a P::Component);
    type IntoIter = P::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.pool.iter()
    }
}

/// In-place mutable access to a pool through a validated window.
///
/// Structural operations are not reachable from here, so the window stays
/// valid for the view's whole lifetime.
pub struct ViewMut<'a, P: ComponentPool> {
    pool: &'a mut P,
    window: Window,
}

impl<'a, P: ComponentPool> ViewMut<'a, P> {
    #[inline]
    pub fn window(&self) -> Window {
        self.window
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    #[inline]
    pub fn extent(&self) -> usize {
        self.window.extent
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.pool.has(entity)
    }

    pub fn get(&self, entity: Entity) -> Result<&P::Component, PoolError> {
        self.pool.get(entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut P::Component, PoolError> {
        self.pool.get_mut(entity)
    }

    #[inline]
    pub fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.pool.entity_at(pos)
    }

    pub fn position_of(&self, entity: Entity) -> Option<usize> {
        self.pool.position_of(entity)
    }

    pub fn iter(&self) -> P::Iter<'_> {
        self.pool.iter()
    }

    pub fn iter_mut(&mut self) -> P::IterMut<'_> {
        self.pool.iter_mut()
    }

    #[inline]
    pub(crate) fn aligned_mut(&mut self, pos: usize, entity: Entity) -> Option<&mut P::Component> {
        if self.pool.entity_at(pos) == Some(entity) {
            return self.pool.value_at_mut(pos);
        }
        self.pool.get_mut(entity).ok()
    }

    #[inline]
    pub(crate) fn probe(&self, pos: usize, entity: Entity) -> bool {
        self.pool.entity_at(pos) == Some(entity) || self.pool.has(entity)
    }
}

impl<'a, P: ComponentPool> IntoIterator for ViewMut<'a, P> {
    type Item = (Entity, &'a mut P::Component);
    type IntoIter = P::IterMut<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.pool.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{DensePool, SparsePool};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn generation_bump_rejects_old_window() {
        let mut pool = DensePool::new();
        pool.create(Entity::from_index(0), 1u32).unwrap();
        let window = pool.window();
        assert!(window.is_valid_for(&pool));

        pool.create(Entity::from_index(1), 2).unwrap();
        assert_eq!(
            window.check(pool.stamp()),
            Err(PoolError::StaleWindow {
                issued: window.generation(),
                current: pool.stamp().generation,
            })
        );
        assert!(pool.view(&window).is_err());
    }

    #[test]
    fn window_from_other_pool_is_foreign() {
        let a: DensePool<u32> = DensePool::new();
        let b: DensePool<u32> = DensePool::new();
        let window = a.window();
        assert!(matches!(
            window.bind(&b),
            Err(PoolError::ForeignWindow { .. })
        ));
    }

    #[test]
    fn entry_is_bounds_checked() {
        let mut pool = SparsePool::with_rows_per_page(4);
        pool.create(Entity::from_index(2), 'c').unwrap();
        let window = pool.window();
        assert_eq!(window.extent(), 4);
        assert_eq!(window.entry(&pool, 1).unwrap(), None);
        assert_eq!(
            window.entry(&pool, 2).unwrap(),
            Some((Entity::from_index(2), &'c'))
        );
        assert_eq!(window.entry(&pool, 99).unwrap(), None);
    }

    #[test]
    fn get_mut_does_not_invalidate() {
        let mut pool = DensePool::new();
        let e = Entity::from_index(3);
        pool.create(e, 10u32).unwrap();
        let window = pool.window();
        *window.get_mut(&mut pool, e).unwrap() += 5;
        assert_eq!(window.get(&pool, e), Ok(&15));
    }

    #[test]
    fn par_for_each_visits_every_live_component() {
        let mut pool = DensePool::new();
        for i in 0..5000u32 {
            pool.create(Entity::from_index(i), i as usize).unwrap();
        }
        let window = pool.window();
        let view = pool.view(&window).unwrap();
        let sum = AtomicUsize::new(0);
        view.par_for_each(|_, v| {
            sum.fetch_add(*v, Ordering::Relaxed);
        });
        assert_eq!(sum.into_inner(), (0..5000usize).sum::<usize>());
    }
}
