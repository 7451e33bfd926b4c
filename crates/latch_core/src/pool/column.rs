use crate::ecs::Entity;
use std::iter::{Copied, Zip};
use std::slice;

/// Packed, gap-free pair of arrays: owning entity and component value per row.
///
/// Rows are appended at the end and removed by swapping the last row into the
/// hole, so indices are only stable until the next removal.
pub struct DenseColumn<T> {
    entities: Vec<Entity>,
    values: Vec<T>,
}

impl<T> DenseColumn<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            entities: Vec::with_capacity(rows),
            values: Vec::with_capacity(rows),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Append a row, returning its index.
    #[inline]
    pub fn push(&mut self, entity: Entity, value: T) -> usize {
        let row = self.values.len();
        self.entities.push(entity);
        self.values.push(value);
        row
    }

    #[inline]
    pub fn entity(&self, row: usize) -> Option<Entity> {
        self.entities.get(row).copied()
    }

    #[inline]
    pub fn get(&self, row: usize) -> Option<&T> {
        self.values.get(row)
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        self.values.get_mut(row)
    }

    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Remove a single row via swap-remove, invoking `fix_index(moved, from, to)`
    /// if the last row moved into the hole.
    ///
    /// Returns the removed row, or `None` if `row` is out of bounds.
    pub fn free_one_swap_remove(
        &mut self,
        row: usize,
        mut fix_index: impl FnMut(Entity, usize, usize),
    ) -> Option<(Entity, T)> {
        if row >= self.values.len() {
            return None;
        }
        let last = self.values.len() - 1;
        let entity = self.entities.swap_remove(row);
        let value = self.values.swap_remove(row);
        if row != last {
            fix_index(self.entities[row], last, row);
        }
        Some((entity, value))
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.values.clear();
    }

    pub fn iter(&self) -> Zip<Copied<slice::Iter<'_, Entity>>, slice::Iter<'_, T>> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> Zip<Copied<slice::Iter<'_, Entity>>, slice::IterMut<'_, T>> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T> Default for DenseColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_of(n: u32) -> DenseColumn<u32> {
        let mut column = DenseColumn::new();
        for i in 0..n {
            column.push(Entity::from_index(i), i * 10);
        }
        column
    }

    #[test]
    fn swap_remove_reports_single_move() {
        let mut column = column_of(4);
        let mut moves = Vec::new();
        let removed = column.free_one_swap_remove(1, |e, from, to| moves.push((e, from, to)));
        assert_eq!(removed, Some((Entity::from_index(1), 10)));
        assert_eq!(moves, vec![(Entity::from_index(3), 3, 1)]);
        assert_eq!(column.values(), &[0, 30, 20]);
    }

    #[test]
    fn removing_last_row_moves_nothing() {
        let mut column = column_of(3);
        let mut moved = false;
        column.free_one_swap_remove(2, |_, _, _| moved = true);
        assert!(!moved);
        assert_eq!(column.len(), 2);
    }

    #[test]
    fn out_of_bounds_is_none() {
        let mut column = column_of(1);
        assert!(column.free_one_swap_remove(5, |_, _, _| {}).is_none());
        assert_eq!(column.len(), 1);
    }
}
