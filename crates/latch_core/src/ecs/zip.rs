// zip.rs - Lockstep iteration over several pools
//
// The first member of a tie drives: its positions are walked in order and
// every other member is asked for the same entity. A member answers from the
// same position when that position holds the entity, and through its keyed
// lookup otherwise. Pools populated in the same order (and every pair of
// index-addressed pools) stay on the positional path.

use crate::ecs::{Entity, View, ViewMut};
use crate::pool::{ComponentPool, EntityOrdering};
use std::iter::FusedIterator;

/// A read-only participant in a [`Zip`].
pub trait ZipMember {
    type Item;

    /// Positions this member walks when it drives.
    fn extent(&self) -> usize;

    fn entity_at(&self, pos: usize) -> Option<Entity>;

    /// This member's item for `entity`, with `pos` as the alignment hint.
    fn fetch(&self, pos: usize, entity: Entity) -> Option<Self::Item>;
}

/// A participant in [`Tie::next_mut`].
///
/// Items may borrow from the member itself, so a mutable member hands out
/// one exclusive borrow per step.
pub trait ZipMemberMut {
    type Item<'s>
    where
        Self: 's;

    fn extent(&self) -> usize;

    fn entity_at(&self, pos: usize) -> Option<Entity>;

    /// Whether `fetch_mut` would succeed for `entity`.
    fn probe(&self, pos: usize, entity: Entity) -> bool;

    fn fetch_mut<'s>(&'s mut self, pos: usize, entity: Entity) -> Option<Self::Item<'s>>;
}

/// Optional member: yields `Option<item>` instead of filtering the entity out.
#[derive(Debug, Clone, Copy)]
pub struct Maybe<M>(pub M);

impl<'a, P: ComponentPool> ZipMember for View<'a, P> {
    type Item = &'a P::Component;

    #[inline]
    fn extent(&self) -> usize {
        View::extent(self)
    }

    #[inline]
    fn entity_at(&self, pos: usize) -> Option<Entity> {
        View::entity_at(self, pos)
    }

    #[inline]
    fn fetch(&self, pos: usize, entity: Entity) -> Option<Self::Item> {
        self.aligned(pos, entity)
    }
}

impl<M: ZipMember> ZipMember for Maybe<M> {
    type Item = Option<M::Item>;

    #[inline]
    fn extent(&self) -> usize {
        self.0.extent()
    }

    #[inline]
    fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.0.entity_at(pos)
    }

    #[inline]
    fn fetch(&self, pos: usize, entity: Entity) -> Option<Self::Item> {
        Some(self.0.fetch(pos, entity))
    }
}

impl<'a, P: ComponentPool> ZipMemberMut for View<'a, P> {
    type Item<'s> = &'a P::Component where Self: 's;

    #[inline]
    fn extent(&self) -> usize {
        View::extent(self)
    }

    #[inline]
    fn entity_at(&self, pos: usize) -> Option<Entity> {
        View::entity_at(self, pos)
    }

    #[inline]
    fn probe(&self, pos: usize, entity: Entity) -> bool {
        View::probe(self, pos, entity)
    }

    #[inline]
    fn fetch_mut<'s>(&'s mut self, pos: usize, entity: Entity) -> Option<Self::Item<'s>> {
        self.aligned(pos, entity)
    }
}

impl<'a, P: ComponentPool> ZipMemberMut for ViewMut<'a, P> {
    type Item<'s> = &'s mut P::Component where Self: 's;

    #[inline]
    fn extent(&self) -> usize {
        ViewMut::extent(self)
    }

    #[inline]
    fn entity_at(&self, pos: usize) -> Option<Entity> {
        ViewMut::entity_at(self, pos)
    }

    #[inline]
    fn probe(&self, pos: usize, entity: Entity) -> bool {
        ViewMut::probe(self, pos, entity)
    }

    #[inline]
    fn fetch_mut<'s>(&'s mut self, pos: usize, entity: Entity) -> Option<Self::Item<'s>> {
        self.aligned_mut(pos, entity)
    }
}

impl<M: ZipMemberMut> ZipMemberMut for Maybe<M> {
    type Item<'s> = Option<M::Item<'s>> where Self: 's;

    #[inline]
    fn extent(&self) -> usize {
        self.0.extent()
    }

    #[inline]
    fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.0.entity_at(pos)
    }

    #[inline]
    fn probe(&self, _pos: usize, _entity: Entity) -> bool {
        true
    }

    #[inline]
    fn fetch_mut<'s>(&'s mut self, pos: usize, entity: Entity) -> Option<Self::Item<'s>> {
        if self.0.probe(pos, entity) {
            Some(self.0.fetch_mut(pos, entity))
        } else {
            Some(None)
        }
    }
}

macro_rules! impl_zip_member_tuple {
    ($first:ident $(, $rest:ident)*) => {
        #[allow(non_snake_case)]
        impl<$first: ZipMember $(, $rest: ZipMember)*> ZipMember for ($first, $($rest,)*) {
            type Item = ($first::Item, $($rest::Item,)*);

            #[inline]
            fn extent(&self) -> usize {
                self.0.extent()
            }

            #[inline]
            fn entity_at(&self, pos: usize) -> Option<Entity> {
                self.0.entity_at(pos)
            }

            #[inline]
            fn fetch(&self, pos: usize, entity: Entity) -> Option<Self::Item> {
                let ($first, $($rest,)*) = self;
                Some(($first.fetch(pos, entity)?, $($rest.fetch(pos, entity)?,)*))
            }
        }

        #[allow(non_snake_case)]
        impl<$first: ZipMemberMut $(, $rest: ZipMemberMut)*> ZipMemberMut for ($first, $($rest,)*) {
            type Item<'s> = ($first::Item<'s>, $($rest::Item<'s>,)*) where Self: 's;

            #[inline]
            fn extent(&self) -> usize {
                self.0.extent()
            }

            #[inline]
            fn entity_at(&self, pos: usize) -> Option<Entity> {
                self.0.entity_at(pos)
            }

            #[inline]
            fn probe(&self, pos: usize, entity: Entity) -> bool {
                let ($first, $($rest,)*) = self;
                $first.probe(pos, entity) $(&& $rest.probe(pos, entity))*
            }

            #[inline]
            fn fetch_mut<'s>(&'s mut self, pos: usize, entity: Entity) -> Option<Self::Item<'s>> {
                let ($first, $($rest,)*) = self;
                Some(($first.fetch_mut(pos, entity)?, $($rest.fetch_mut(pos, entity)?,)*))
            }
        }
    };
}

impl_zip_member_tuple!(A);
impl_zip_member_tuple!(A, B);
impl_zip_member_tuple!(A, B, C);
impl_zip_member_tuple!(A, B, C, D);

/// A bundle of windows bound for lockstep iteration.
///
/// Building a tie does no work. Read-only ties become a [`Zip`] iterator.
/// A tie led by a [`ViewMut`] followed by read-only members becomes a
/// [`ZipMut`] iterator (or is driven by [`Tie::for_each`]). Any mix of
/// mutable members can be stepped with [`Tie::next_mut`].
pub struct Tie<M> {
    members: M,
    cursor: usize,
}

/// Bundle `members` (a view, a `Maybe`, or a tuple of up to four of them).
pub fn tie<M>(members: M) -> Tie<M> {
    Tie { members, cursor: 0 }
}

/// Shorthand for `tie(members).zip()`.
pub fn zip<M: ZipMember>(members: M) -> Zip<M> {
    tie(members).zip()
}

impl<M> Tie<M> {
    #[inline]
    pub fn members(&self) -> &M {
        &self.members
    }

    pub fn into_members(self) -> M {
        self.members
    }
}

impl<M: ZipMember> Tie<M> {
    pub fn zip(self) -> Zip<M> {
        let end = self.members.extent();
        Zip {
            members: self.members,
            pos: self.cursor,
            end,
        }
    }
}

impl<M: ZipMember> IntoIterator for Tie<M> {
    type Item = (Entity, M::Item);
    type IntoIter = Zip<M>;

    fn into_iter(self) -> Zip<M> {
        self.zip()
    }
}

impl<M: ZipMemberMut> Tie<M> {
    /// Advance to the next entity every member can serve.
    ///
    /// The returned items borrow the tie until they are dropped.
    pub fn next_mut(&mut self) -> Option<(Entity, M::Item<'_>)> {
        let end = self.members.extent();
        while self.cursor < end {
            let pos = self.cursor;
            self.cursor += 1;
            let Some(entity) = self.members.entity_at(pos) else {
                continue;
            };
            // Probe first so a miss never holds a borrow across iterations.
            if self.members.probe(pos, entity) {
                return self.members.fetch_mut(pos, entity).map(|item| (entity, item));
            }
        }
        None
    }

    /// Restart from the first driving position.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl<'a, P: ComponentPool, M: ZipMember> Tie<(ViewMut<'a, P>, M)> {
    /// Iterate with exclusive access to the leading pool's components.
    pub fn zip_mut(self) -> ZipMut<'a, P, M> {
        let (driver, others) = self.members;
        ZipMut {
            driver: driver.into_iter(),
            row: 0,
            others,
        }
    }

    /// Call `f` for every entity in the intersection of the members.
    pub fn for_each<F>(self, mut f: F)
    where
        F: FnMut(Entity, (&'a mut P::Component, M::Item)),
    {
        self.zip_mut().for_each(|(entity, items)| f(entity, items));
    }
}

/// Lazy, single-pass sequence of `(entity, items)` over a [`Tie`].
pub struct Zip<M> {
    members: M,
    pos: usize,
    end: usize,
}

impl<M: ZipMember> Iterator for Zip<M> {
    type Item = (Entity, M::Item);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.end {
            let pos = self.pos;
            self.pos += 1;
            if let Some(entity) = self.members.entity_at(pos) {
                if let Some(item) = self.members.fetch(pos, entity) {
                    return Some((entity, item));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.end - self.pos))
    }
}

impl<M: ZipMember> FusedIterator for Zip<M> {}

/// [`Zip`] whose leading member is mutable.
///
/// The leader is walked through its pool's `iter_mut`, so every yielded
/// `&mut` is disjoint and lives as long as the view it came from.
pub struct ZipMut<'a, P: ComponentPool + 'a, M> {
    driver: P::IterMut<'a>,
    row: usize,
    others: M,
}

impl<'a, P: ComponentPool + 'a, M: ZipMember> Iterator for ZipMut<'a, P, M> {
    type Item = (Entity, (&'a mut P::Component, M::Item));

    fn next(&mut self) -> Option<Self::Item> {
        for (entity, value) in self.driver.by_ref() {
            let pos = match P::ORDERING {
                EntityOrdering::Insertion => self.row,
                EntityOrdering::EntityIndex => entity.slot(),
            };
            self.row += 1;
            if let Some(rest) = self.others.fetch(pos, entity) {
                return Some((entity, (value, rest)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{DensePool, SaturatedPool, SparsePool};
    use crate::ecs::{PoolError, Window};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(f32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(f32);

    fn e(i: u32) -> Entity {
        Entity::from_index(i)
    }

    #[test]
    fn same_creation_order_stays_aligned() {
        let mut pos = DensePool::new();
        let mut vel = DensePool::new();
        for i in 0..8 {
            pos.create(e(i), Position(i as f32)).unwrap();
            vel.create(e(i), Velocity(i as f32 * 10.0)).unwrap();
        }
        let (pw, vw) = (pos.window(), vel.window());
        let pairs: Vec<_> = zip((pos.view(&pw).unwrap(), vel.view(&vw).unwrap())).collect();

        assert_eq!(pairs.len(), 8);
        for (entity, (p, v)) in pairs {
            assert_eq!(p.0, entity.index() as f32);
            assert_eq!(v.0, entity.index() as f32 * 10.0);
        }
    }

    #[test]
    fn intersection_across_variants() {
        let mut dense = DensePool::new();
        let mut sparse = SparsePool::with_rows_per_page(4);
        let mut saturated = SaturatedPool::with_population(10);
        for i in [7, 2, 5, 0] {
            dense.create(e(i), i).unwrap();
        }
        for i in [0, 5, 6, 7] {
            sparse.create(e(i), i * 2).unwrap();
        }
        for i in 0..10 {
            if i != 5 {
                saturated.create(e(i), i * 3).unwrap();
            }
        }

        let (dw, sw, tw) = (dense.window(), sparse.window(), saturated.window());
        let hits: Vec<(u32, u32, u32, u32)> = zip((
            dense.view(&dw).unwrap(),
            sparse.view(&sw).unwrap(),
            saturated.view(&tw).unwrap(),
        ))
        .map(|(e, (a, b, c))| (e.index(), *a, *b, *c))
        .collect();

        // Dense drives, so results follow dense insertion order.
        assert_eq!(hits, vec![(7, 7, 14, 21), (0, 0, 0, 0)]);
    }

    #[test]
    fn reordered_dense_pools_fall_back_to_lookup() {
        let mut a = DensePool::new();
        let mut b = DensePool::new();
        for i in 0..4 {
            a.create(e(i), i).unwrap();
        }
        for i in (0..4).rev() {
            b.create(e(i), i + 100).unwrap();
        }
        let (aw, bw) = (a.window(), b.window());
        for (entity, (x, y)) in zip((a.view(&aw).unwrap(), b.view(&bw).unwrap())) {
            assert_eq!(*x, entity.index());
            assert_eq!(*y, entity.index() + 100);
        }
    }

    #[test]
    fn maybe_keeps_entities_without_the_component() {
        let mut hp = SparsePool::new();
        let mut shield = SparsePool::new();
        for i in 0..3 {
            hp.create(e(i), 10 * i).unwrap();
        }
        shield.create(e(1), 99u32).unwrap();

        let (hw, sw) = (hp.window(), shield.window());
        let rows: Vec<_> = zip((hp.view(&hw).unwrap(), Maybe(shield.view(&sw).unwrap())))
            .map(|(e, (h, s))| (e.index(), *h, s.copied()))
            .collect();
        assert_eq!(rows, vec![(0, 0, None), (1, 10, Some(99)), (2, 20, None)]);
    }

    #[test]
    fn tie_for_each_writes_through_mutable_member() {
        let mut pos = SaturatedPool::with_population(4);
        let mut vel = SparsePool::new();
        for i in 0..4 {
            pos.create(e(i), Position(0.0)).unwrap();
        }
        vel.create(e(1), Velocity(2.0)).unwrap();
        vel.create(e(3), Velocity(-1.0)).unwrap();

        let (pw, vw) = (pos.window(), vel.window());
        tie((pos.view_mut(&pw).unwrap(), vel.view(&vw).unwrap())).for_each(|_, (p, v)| {
            p.0 += v.0;
        });

        assert_eq!(pos.get(e(0)), Ok(&Position(0.0)));
        assert_eq!(pos.get(e(1)), Ok(&Position(2.0)));
        assert_eq!(pos.get(e(3)), Ok(&Position(-1.0)));
        assert!(pw.is_valid_for(&pos));
    }

    #[test]
    fn next_mut_steps_lazily() {
        let mut a = DensePool::new();
        let mut b = DensePool::new();
        for i in 0..3 {
            a.create(e(i), i).unwrap();
            b.create(e(i), 0u32).unwrap();
        }
        let (aw, bw) = (a.window(), b.window());
        let mut tied = tie((a.view(&aw).unwrap(), b.view_mut(&bw).unwrap()));
        let mut visited = 0;
        while let Some((_, (src, dst))) = tied.next_mut() {
            *dst = *src * 2;
            visited += 1;
        }
        assert_eq!(visited, 3);
        drop(tied);
        assert_eq!(b.as_slice(), &[0, 2, 4]);
    }

    #[test]
    fn zip_over_stale_window_is_refused() {
        fn pairs(
            a: &DensePool<u8>,
            aw: &Window,
            b: &SparsePool<u8>,
            bw: &Window,
        ) -> Result<usize, PoolError> {
            Ok(zip((a.view(aw)?, b.view(bw)?)).count())
        }

        let mut a = DensePool::new();
        let mut b = SparsePool::new();
        a.create(e(0), 1).unwrap();
        b.create(e(0), 2).unwrap();
        let (aw, bw) = (a.window(), b.window());
        assert_eq!(pairs(&a, &aw, &b, &bw), Ok(1));

        b.create(e(1), 3).unwrap();
        assert!(matches!(
            pairs(&a, &aw, &b, &bw),
            Err(PoolError::StaleWindow { .. })
        ));
        assert_eq!(pairs(&a, &aw, &b, &b.window()), Ok(1));
    }

    #[test]
    fn zip_is_fused_and_bounded() {
        let mut a = SparsePool::with_rows_per_page(4);
        a.create(e(1), ()).unwrap();
        let window = a.window();
        let mut it = zip(a.view(&window).unwrap());
        assert_eq!(it.size_hint(), (0, Some(4)));
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }
}
