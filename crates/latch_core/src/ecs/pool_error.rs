use crate::ecs::{Entity, PoolId};
use std::fmt;
use thiserror::Error;

/// Which queued intent an entity already has outstanding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PendingOp {
    Create,
    Destroy,
}

impl fmt::Display for PendingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOp::Create => f.write_str("creation"),
            PendingOp::Destroy => f.write_str("destruction"),
        }
    }
}

/// Errors reported by component pools, their queues and their windows.
///
/// Every variant is a recoverable usage error surfaced at the offending call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("entity {entity:?} already has this component (live or pending creation)")]
    DuplicateCreate { entity: Entity },

    #[error("entity {entity:?} has no such component and none is pending creation")]
    MissingEntity { entity: Entity },

    #[error("entity {entity:?} already has a pending {pending}")]
    ConflictingQueueState { entity: Entity, pending: PendingOp },

    #[error("window issued at generation {issued} used after pool moved to generation {current}")]
    StaleWindow { issued: u64, current: u64 },

    #[error("window issued by pool {window_pool} used against pool {pool}")]
    ForeignWindow { window_pool: PoolId, pool: PoolId },

    #[error("slot for entity {entity:?} is still held by {occupant:?}")]
    IndexOccupied { entity: Entity, occupant: Entity },
}
