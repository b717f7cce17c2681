//! Headless ECS sandbox
//!
//! Runs a small arena simulation through the ECS tick protocol and logs
//! periodic statistics. Pass a TOML or RON settings file as the first
//! argument; defaults apply otherwise.

mod components;
mod config;
mod systems;
mod world;

use ecs_runtime::config::{Config, ConfigError};
use ecs_runtime::ecs::EcsError;
use ecs_runtime::foundation::logging;

use crate::components::{FrameClock, Stats};
use crate::config::SandboxConfig;

#[derive(thiserror::Error, Debug)]
enum SandboxError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),
}

fn main() -> Result<(), SandboxError> {
    let config = match std::env::args().nth(1) {
        Some(path) => SandboxConfig::load_from_file(&path)?,
        None => SandboxConfig::default(),
    };
    logging::init(&config.ecs.log_filter);
    log::info!(
        "Starting sandbox: {} ticks at {:.4}s per tick",
        config.ticks,
        config.time_step
    );

    let mut manager = world::build_world(&config)?;
    world::run(&mut manager, config.ticks)?;

    let frame = manager.global_data::<FrameClock>()?.frame;
    let stats = manager.global_data::<Stats>()?.clone();
    log::info!(
        "Finished after {frame} frames: {} live, {} collisions, {} destroyed",
        manager.entity_count(),
        stats.collisions,
        stats.destroyed
    );

    manager.shutdown()?;
    Ok(())
}
