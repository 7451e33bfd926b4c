//! Latch Engine Core
//!
//! Component storage for the entity-component system:
//! - Entity handles and a minimal allocator
//! - Dense, sparse and saturated component pools
//! - Deferred creation/destruction queues flushed at a single point
//! - Generation-stamped windows and lockstep multi-pool iteration

pub mod ecs;
pub mod pool;
pub mod settings;

/// Commonly used types in one import.
pub mod prelude {
    pub use crate::ecs::{
        tie, zip, Entity, EntityEvent, EntityPool, FlushReport, Maybe, PoolError, QueuedPool,
        View, ViewMut, Window,
    };
    pub use crate::pool::{ComponentPool, DensePool, SaturatedPool, SparsePool};
    pub use crate::settings::PoolSettings;
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
