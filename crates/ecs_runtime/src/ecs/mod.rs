//! Entity-Component-System runtime
//!
//! Entities are plain ids, components live in one pool per type, systems are
//! grouped into ordered pools that share an update cadence and a signal
//! queue. Every structural change (components and systems alike) is queued
//! and becomes visible at a well-defined commit point of the tick.

pub mod component;
pub mod entity;
pub mod entity_set;
pub mod error;
pub mod factory;
pub mod manager;
pub mod query;
pub mod signal;
pub mod system;
pub mod system_pool;

#[cfg(test)]
mod tests;

pub use component::{Component, ComponentListener, ComponentPool, ListenerFns};
pub use entity::{Entity, EntityId, EntityMut};
pub use entity_set::EntitySet;
pub use error::{EcsError, EcsResult};
pub use factory::ComponentFactories;
pub use manager::EcsManager;
pub use query::{Query, View, ViewIter};
pub use signal::{Signal, SignalEnvelope, SignalId};
pub use system::System;
pub use system_pool::{Placement, SystemOrderer, SystemPool, SystemPoolId};
