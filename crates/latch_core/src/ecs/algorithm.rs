//! Entity-list driven traversal of a [`Tie`].
//!
//! [`Zip`](crate::ecs::Zip) walks the first member's storage. These helpers
//! walk a caller-supplied entity sequence instead (an allocator's live list,
//! a selection, a sorted subset) and resolve every member by keyed lookup.

use crate::ecs::{Entity, Tie, ZipMember};

/// Call `f` for each entity of `entities` that every member of `tie` holds,
/// in the order `entities` yields them.
pub fn for_each_in<I, M, F>(entities: I, tie: Tie<M>, mut f: F)
where
    I: IntoIterator<Item = Entity>,
    M: ZipMember,
    F: FnMut(Entity, M::Item),
{
    let members = tie.into_members();
    for entity in entities {
        if let Some(item) = members.fetch(entity.slot(), entity) {
            f(entity, item);
        }
    }
}

/// True when `pred` holds for every entity of `entities` present in `tie`.
/// Entities missing from a member are skipped, not counted as failures.
pub fn all_in<I, M, F>(entities: I, tie: Tie<M>, mut pred: F) -> bool
where
    I: IntoIterator<Item = Entity>,
    M: ZipMember,
    F: FnMut(Entity, M::Item) -> bool,
{
    let members = tie.into_members();
    entities.into_iter().all(|entity| {
        members
            .fetch(entity.slot(), entity)
            .map_or(true, |item| pred(entity, item))
    })
}

/// True when `pred` holds for at least one entity of `entities` present in `tie`.
pub fn any_in<I, M, F>(entities: I, tie: Tie<M>, mut pred: F) -> bool
where
    I: IntoIterator<Item = Entity>,
    M: ZipMember,
    F: FnMut(Entity, M::Item) -> bool,
{
    let members = tie.into_members();
    entities.into_iter().any(|entity| {
        members
            .fetch(entity.slot(), entity)
            .map_or(false, |item| pred(entity, item))
    })
}
