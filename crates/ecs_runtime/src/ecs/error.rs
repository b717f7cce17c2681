//! ECS error types
//!
//! Every condition the runtime treats as fatal surfaces as an [`EcsError`].
//! Recoverable conditions (removing a component the entity does not own,
//! destroying leftovers at shutdown) are logged and skipped instead.

use thiserror::Error;

use super::entity::EntityId;
use super::signal::SignalId;
use super::system_pool::SystemPoolId;

/// Result alias used throughout the ECS
pub type EcsResult<T> = Result<T, EcsError>;

/// Fatal ECS errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A second component of the same type was queued for one entity
    #[error("entity {entity} already has a `{component}` component (queued add #{op_index} rejected at commit)")]
    DuplicateComponent {
        /// Entity that received the duplicate
        entity: EntityId,
        /// Component type name
        component: &'static str,
        /// Position of the offending operation in the pool's replay log
        op_index: usize,
    },

    /// Component access on an entity that does not own it
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        /// Entity that was queried
        entity: EntityId,
        /// Component type name
        component: &'static str,
    },

    /// Operation on an entity that is not alive
    #[error("entity {0} is not alive")]
    EntityNotAlive(EntityId),

    /// Every entity id up to the configured limit is in use
    #[error("entity id space exhausted (limit {limit})")]
    EntityIdsExhausted {
        /// Highest id the manager may issue
        limit: u32,
    },

    /// No system pool registered under this id
    #[error("system pool {0} not found")]
    SystemPoolNotFound(SystemPoolId),

    /// The pool is already inside its own update
    #[error("system pool {0} is already updating")]
    SystemPoolBusy(SystemPoolId),

    /// A system pool with this id already exists
    #[error("system pool {0} already exists")]
    SystemPoolExists(SystemPoolId),

    /// A system type is not part of the pool
    #[error("system `{system}` not found in pool {pool}")]
    SystemNotFound {
        /// Pool that was searched
        pool: SystemPoolId,
        /// System type name
        system: &'static str,
    },

    /// A system type was added twice to the same pool
    #[error("system `{system}` already registered in pool {pool}")]
    DuplicateSystem {
        /// Pool the system was added to
        pool: SystemPoolId,
        /// System type name
        system: &'static str,
    },

    /// Global data of this type already exists
    #[error("global data `{0}` already exists")]
    GlobalDataExists(&'static str),

    /// Global data of this type was never added
    #[error("global data `{0}` not found")]
    GlobalDataMissing(&'static str),

    /// Two signal types declared the same identifier
    #[error("signal id {id} declared by both `{existing}` and `{incoming}`")]
    SignalIdCollision {
        /// The shared identifier
        id: SignalId,
        /// Type registered first
        existing: &'static str,
        /// Type that collided with it
        incoming: &'static str,
    },

    /// A mutable query named the same component type twice
    #[error("component `{0}` appears twice in one query")]
    DuplicateQueryComponent(&'static str),

    /// A component factory could not build its component
    #[error("factory for `{component}` failed: {reason}")]
    Factory {
        /// Registered factory name
        component: String,
        /// Why construction failed
        reason: String,
    },

    /// No factory registered under this name
    #[error("no component factory named `{0}`")]
    UnknownFactory(String),
}
