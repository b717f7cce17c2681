//! Sandbox components, signals, and shared world data
//!
//! Components are pure data. Those that can be placed from a config file
//! derive `Deserialize` and are registered with the factory table.

use ecs_runtime::ecs::{Component, ComponentFactories, EntityId, Signal, SignalId};
use nalgebra::Vector3;
use serde::Deserialize;

/// 3D vector used for positions and velocities
pub type Vec3 = Vector3<f32>;

/// World-space position
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Transform {
    pub position: Vec3,
}
impl Component for Transform {}

/// Linear velocity in units per second
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
}
impl Component for Velocity {}

/// Hit points; the entity is destroyed when `current` reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}
impl Component for Health {}

impl Health {
    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }
}

/// Bounding sphere for collision checks
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Collider {
    pub radius: f32,
}
impl Component for Collider {}

/// Register every placeable component under its type name
pub fn register_factories(factories: &mut ComponentFactories) {
    factories.register_deserialize::<Transform>("Transform");
    factories.register_deserialize::<Velocity>("Velocity");
    factories.register_deserialize::<Health>("Health");
    factories.register_deserialize::<Collider>("Collider");
}

/// Two colliders overlapped this tick
#[derive(Debug, Clone, Copy)]
pub struct Collision {
    pub a: EntityId,
    pub b: EntityId,
}
impl Signal for Collision {
    const ID: SignalId = SignalId::from_u128(0x3f9a_61c2_d4e8_4b07_9c15_a2f3_70e6_b841);
}

/// An entity ran out of health and was destroyed
#[derive(Debug, Clone, Copy)]
pub struct Destroyed(pub EntityId);
impl Signal for Destroyed {
    const ID: SignalId = SignalId::from_u128(0x7c04_e93b_15a6_4f2d_8e71_0b5c_d3a8_962f);
}

/// Sent every `frame_signal_interval` ticks
#[derive(Debug, Clone, Copy)]
pub struct FrameCount(pub u64);
impl Signal for FrameCount {
    const ID: SignalId = SignalId::from_u128(0xa1d7_5e30_8f4c_42b9_b6e0_c935_1f7a_04d2);
}

/// Simulation clock shared by all systems
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    pub frame: u64,
    pub dt: f32,
}

/// Gameplay tuning shared by all systems
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    pub arena_half_extent: f32,
    pub collision_damage: f32,
    pub decay_per_second: f32,
    pub frame_signal_interval: u64,
}

/// Totals gathered by the render-side statistics system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub frames_reported: u64,
    pub collisions: u64,
    pub destroyed: u64,
    pub last_live: usize,
    pub last_mean_health: f32,
}
