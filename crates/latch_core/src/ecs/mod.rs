//! Entity Component System core types.
//!
//! Entity handles, deferred mutation queues, generation-stamped windows and
//! the zip/tie machinery that walks several pools in lockstep. Storage
//! strategies themselves live in [`crate::pool`].

mod algorithm;
mod creation_queue;
mod destruction_queue;
mod entity;
mod pool_error;
mod queued_pool;
mod window;
mod zip;

pub use algorithm::{all_in, any_in, for_each_in};
pub use creation_queue::CreationQueue;
pub use destruction_queue::DestructionQueue;
pub use entity::{Entity, EntityEvent, EntityPool};
pub use pool_error::{PendingOp, PoolError};
pub use queued_pool::{FlushReport, QueuedPool, Staging};
pub use window::{GenerationCounter, PoolId, Stamp, View, ViewMut, Window};
pub use zip::{tie, zip, Maybe, Tie, Zip, ZipMember, ZipMemberMut, ZipMut};
