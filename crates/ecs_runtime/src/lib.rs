//! # ECS Runtime
//!
//! An Entity-Component-System runtime for game simulation loops.
//!
//! ## Features
//!
//! - **Deferred commits**: component and system changes queue up and apply
//!   at fixed points of the tick, so systems always see a stable world
//! - **Contiguous pools**: one densely packed store per component type
//! - **Ordered system pools**: systems run in an explicit, reorderable order
//! - **Broadcast signals**: typed messages delivered to subscribed systems
//! - **Global data**: one instance per type, shared by every system
//!
//! ## Quick Start
//!
//! ```rust
//! use ecs_runtime::prelude::*;
//!
//! struct Position(f32);
//! impl Component for Position {}
//!
//! struct Drift;
//! impl System for Drift {
//!     fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()> {
//!         manager.each_mut::<(Position,), _>(|_, (position,)| position.0 += 1.0)
//!     }
//! }
//!
//! fn main() -> Result<(), EcsError> {
//!     const GAME: SystemPoolId = SystemPoolId::new(0);
//!
//!     let mut manager = EcsManager::new();
//!     manager.create_system_pool(GAME)?;
//!     manager.add_system(GAME, Drift)?;
//!
//!     let entity = manager.create_entity()?;
//!     manager.add_component(entity, Position(0.0))?;
//!
//!     manager.update_systems(GAME)?;
//!     assert_eq!(manager.get_component::<Position>(entity)?.0, 1.0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod foundation;

/// Common imports for runtime users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EcsConfig},
        ecs::{
            Component, ComponentFactories, ComponentListener, EcsError, EcsManager, EcsResult,
            Entity, EntityId, EntityMut, ListenerFns, Query, Signal, SignalEnvelope, SignalId,
            System, SystemPoolId, View,
        },
    };
}
