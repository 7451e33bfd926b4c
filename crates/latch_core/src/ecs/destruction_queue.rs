use crate::ecs::{Entity, PoolError};
use crate::pool::ComponentPool;
use std::collections::HashSet;
use std::mem;

/// Pending component removals for one pool, applied in FIFO order.
#[derive(Default)]
pub struct DestructionQueue {
    entries: Vec<Entity>,
    pending: HashSet<Entity>,
}

impl DestructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A second enqueue for the same entity reports `MissingEntity`: once
    /// the first one applies there is nothing left to remove.
    pub fn enqueue(&mut self, entity: Entity) -> Result<(), PoolError> {
        if !self.pending.insert(entity) {
            return Err(PoolError::MissingEntity { entity });
        }
        self.entries.push(entity);
        Ok(())
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.pending.contains(&entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    pub fn pending(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().copied()
    }

    /// Withdraw `entity`'s entry. Returns whether one was queued.
    pub fn cancel(&mut self, entity: Entity) -> bool {
        if !self.pending.remove(&entity) {
            return false;
        }
        self.entries.retain(|queued| *queued != entity);
        true
    }

    /// Same failure contract as the creation queue's flush.
    pub fn flush_into<P: ComponentPool>(&mut self, pool: &mut P) -> Result<usize, PoolError> {
        let mut entries = mem::take(&mut self.entries).into_iter();
        let mut applied = 0;
        while let Some(entity) = entries.next() {
            self.pending.remove(&entity);
            if let Err(err) = pool.destroy(entity) {
                self.entries.extend(entries);
                return Err(err);
            }
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SparsePool;

    fn e(i: u32) -> Entity {
        Entity::from_index(i)
    }

    #[test]
    fn double_destroy_is_missing() {
        let mut queue = DestructionQueue::new();
        queue.enqueue(e(4)).unwrap();
        assert_eq!(
            queue.enqueue(e(4)),
            Err(PoolError::MissingEntity { entity: e(4) })
        );
    }

    #[test]
    fn flush_removes_in_order() {
        let mut pool = SparsePool::new();
        for i in 0..4 {
            pool.create(e(i), i).unwrap();
        }
        let mut queue = DestructionQueue::new();
        queue.enqueue(e(2)).unwrap();
        queue.enqueue(e(0)).unwrap();
        assert_eq!(queue.flush_into(&mut pool), Ok(2));
        let live: Vec<u32> = pool.iter().map(|(e, _)| e.index()).collect();
        assert_eq!(live, vec![1, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_withdraws_entry() {
        let mut queue = DestructionQueue::new();
        queue.enqueue(e(1)).unwrap();
        queue.enqueue(e(2)).unwrap();
        assert!(queue.cancel(e(1)));
        assert!(!queue.cancel(e(1)));
        assert_eq!(queue.pending().collect::<Vec<_>>(), vec![e(2)]);
        queue.enqueue(e(1)).unwrap();
    }

    #[test]
    fn absent_entity_fails_flush() {
        let mut pool: SparsePool<u8> = SparsePool::new();
        let mut queue = DestructionQueue::new();
        queue.enqueue(e(9)).unwrap();
        queue.enqueue(e(10)).unwrap();
        assert_eq!(
            queue.flush_into(&mut pool),
            Err(PoolError::MissingEntity { entity: e(9) })
        );
        assert_eq!(queue.pending().collect::<Vec<_>>(), vec![e(10)]);
    }
}
