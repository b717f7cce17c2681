//! Sandbox run settings

use ecs_runtime::config::{Config, EcsConfig};
use serde::{Deserialize, Serialize};

/// Settings for one sandbox run, loaded from TOML or RON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Number of ticks to run
    pub ticks: u32,
    /// Fixed simulation step in seconds
    pub time_step: f32,
    /// Entities spawned at random positions and velocities
    pub random_entities: usize,
    /// Half the side length of the cubic arena
    pub arena_half_extent: f32,
    /// Health lost by each side of a collision
    pub collision_damage: f32,
    /// Health lost per second by every entity
    pub decay_per_second: f32,
    /// Ticks between frame-count signals
    pub frame_signal_interval: u64,
    /// Seed for the random spawner; entropy when absent
    pub seed: Option<u64>,
    /// Runtime settings, including the log filter
    pub ecs: EcsConfig,
    /// Hand-placed entities as component-name to field tables
    pub spawn: Vec<toml::Table>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            ticks: 300,
            time_step: 1.0 / 60.0,
            random_entities: 16,
            arena_half_extent: 20.0,
            collision_damage: 5.0,
            decay_per_second: 1.0,
            frame_signal_interval: 60,
            seed: None,
            ecs: EcsConfig::default(),
            spawn: Vec::new(),
        }
    }
}

impl Config for SandboxConfig {}
