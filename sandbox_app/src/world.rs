//! World setup and the tick loop

use ecs_runtime::ecs::{ComponentFactories, EcsManager, EcsResult, SystemPoolId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::components::{
    register_factories, Collider, FrameClock, Health, Rules, Stats, Transform, Vec3, Velocity,
};
use crate::config::SandboxConfig;
use crate::systems::{CollisionSystem, DamageSystem, FrameCounterSystem, MovementSystem, RenderStatsSystem};

/// Gameplay systems
pub const GAME: SystemPoolId = SystemPoolId::new(0);
/// Read-only presentation systems, updated after [`GAME`]
pub const RENDER: SystemPoolId = SystemPoolId::new(1);

/// Build a manager holding the configured entities, global data, and both system pools
pub fn build_world(config: &SandboxConfig) -> EcsResult<EcsManager> {
    let mut manager = EcsManager::with_config(config.ecs.clone());

    manager.add_global_data(FrameClock {
        frame: 0,
        dt: config.time_step,
    })?;
    manager.add_global_data(Rules {
        arena_half_extent: config.arena_half_extent,
        collision_damage: config.collision_damage,
        decay_per_second: config.decay_per_second,
        frame_signal_interval: config.frame_signal_interval,
    })?;
    manager.add_global_data(Stats::default())?;

    let mut factories = ComponentFactories::new();
    register_factories(&mut factories);
    for components in &config.spawn {
        let entity = manager.create_entity()?;
        factories.apply_all(&mut manager, entity, components)?;
    }

    let mut rng = config
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    for _ in 0..config.random_entities {
        spawn_random(&mut manager, &mut rng, config.arena_half_extent)?;
    }
    log::info!(
        "Spawned {} placed and {} random entities",
        config.spawn.len(),
        config.random_entities
    );

    manager.create_system_pool(GAME)?;
    manager.add_system(GAME, MovementSystem)?;
    manager.add_system(GAME, CollisionSystem::default())?;
    manager.add_system(GAME, DamageSystem)?;
    manager
        .add_system(GAME, FrameCounterSystem)?
        .before::<MovementSystem>();

    manager.create_system_pool(RENDER)?;
    manager.add_system(RENDER, RenderStatsSystem)?;
    Ok(manager)
}

fn spawn_random(manager: &mut EcsManager, rng: &mut impl Rng, half_extent: f32) -> EcsResult<()> {
    let extent = half_extent.max(1.0);
    let mut point = |scale: f32| {
        Vec3::new(
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
        )
    };
    let position = point(extent);
    let linear = point(4.0);
    let max = 20.0 + (position.norm() % 20.0);

    let entity = manager.create_entity()?;
    manager
        .entity_mut(entity)
        .add_component(Transform { position })?
        .add_component(Velocity { linear })?
        .add_component(Health { current: max, max })?
        .add_component(Collider { radius: 1.0 })?;
    Ok(())
}

/// Update both pools once per tick
pub fn run(manager: &mut EcsManager, ticks: u32) -> EcsResult<()> {
    for _ in 0..ticks {
        manager.update_systems(GAME)?;
        manager.update_systems(RENDER)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ecs_runtime::ecs::EcsError;

    fn seeded(random_entities: usize) -> SandboxConfig {
        SandboxConfig {
            random_entities,
            seed: Some(42),
            decay_per_second: 0.0,
            ..SandboxConfig::default()
        }
    }

    fn positions(manager: &EcsManager) -> Vec<Vec3> {
        manager
            .view::<(Transform,)>()
            .iter()
            .map(|(_, (transform,))| transform.position)
            .collect()
    }

    #[test]
    fn test_world_contains_placed_and_random_entities() {
        let config: SandboxConfig = toml::from_str(include_str!("../sandbox.toml")).unwrap();
        let manager = build_world(&config).unwrap();
        assert_eq!(manager.entity_count(), 2 + config.random_entities);

        // Components stay queued until the first update
        assert_eq!(manager.component_count::<Transform>(), 0);
        assert!(manager.has_pending_updates());
    }

    #[test]
    fn test_frame_counter_runs_before_movement() {
        let mut manager = build_world(&seeded(0)).unwrap();
        run(&mut manager, 1).unwrap();
        let names = manager.system_pool(GAME).unwrap().system_names();
        assert!(names[0].ends_with("FrameCounterSystem"));
        assert!(names[1].ends_with("MovementSystem"));
    }

    #[test]
    fn test_same_seed_same_simulation() {
        let mut first = build_world(&seeded(8)).unwrap();
        let mut second = build_world(&seeded(8)).unwrap();
        run(&mut first, 30).unwrap();
        run(&mut second, 30).unwrap();

        let (a, b) = (positions(&first), positions(&second));
        assert_eq!(a.len(), 8);
        for (a, b) in a.iter().zip(&b) {
            assert_relative_eq!(*a, *b);
        }
        assert_eq!(first.global_data::<FrameClock>().unwrap().frame, 30);
    }

    #[test]
    fn test_head_on_pair_collides_and_loses_health() {
        let mut config = seeded(0);
        config.spawn = toml::from_str::<SandboxConfig>(include_str!("../sandbox.toml"))
            .unwrap()
            .spawn;
        let mut manager = build_world(&config).unwrap();

        // 10 units apart closing at 8 units/s: contact after about a second
        run(&mut manager, 120).unwrap();
        let stats = manager.global_data::<Stats>().unwrap();
        assert!(stats.collisions >= 1);
        let healths: Vec<f32> = manager
            .view::<(Health,)>()
            .iter()
            .map(|(_, (health,))| health.current)
            .collect();
        assert!(healths.iter().all(|&current| current < 40.0));
    }

    #[test]
    fn test_unknown_component_in_spawn_table_fails() {
        let mut config = seeded(0);
        config.spawn = vec![toml::from_str("Sprite = { path = 'ship.png' }").unwrap()];
        assert!(matches!(
            build_world(&config),
            Err(EcsError::UnknownFactory(name)) if name == "Sprite"
        ));
    }
}
