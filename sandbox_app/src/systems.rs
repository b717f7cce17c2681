//! Sandbox systems
//!
//! The game pool runs frame counting, movement, collision detection, and
//! damage. The render pool only reads committed state and gathers stats.

use std::collections::HashSet;

use ecs_runtime::ecs::{EcsManager, EcsResult, EntityId, Signal, SignalEnvelope, SignalId, System};

use crate::components::{
    Collider, Collision, Destroyed, FrameClock, FrameCount, Health, Rules, Stats, Transform, Velocity, Vec3,
};

/// Advances the frame clock and periodically broadcasts [`FrameCount`]
pub struct FrameCounterSystem;

impl System for FrameCounterSystem {
    fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()> {
        let interval = manager.global_data::<Rules>()?.frame_signal_interval;
        let clock = manager.global_data_mut::<FrameClock>()?;
        clock.frame += 1;
        let frame = clock.frame;

        if interval > 0 && frame % interval == 0 {
            manager.send_signal(FrameCount(frame))?;
        }
        Ok(())
    }
}

/// Integrates velocities and bounces entities off the arena walls
pub struct MovementSystem;

impl System for MovementSystem {
    fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()> {
        let dt = manager.global_data::<FrameClock>()?.dt;
        let bound = manager.global_data::<Rules>()?.arena_half_extent;

        manager.each_mut::<(Transform, Velocity), _>(|_, (transform, velocity)| {
            transform.position += velocity.linear * dt;
            for axis in 0..3 {
                let coordinate = transform.position[axis];
                if coordinate.abs() > bound {
                    transform.position[axis] = coordinate.clamp(-bound, bound);
                    velocity.linear[axis] = -velocity.linear[axis];
                }
            }
        })
    }
}

/// Broadcasts [`Collision`] when two colliders start overlapping
#[derive(Default)]
pub struct CollisionSystem {
    touching: HashSet<(EntityId, EntityId)>,
}

impl System for CollisionSystem {
    fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()> {
        let bodies: Vec<(EntityId, Vec3, f32)> = manager
            .view::<(Transform, Collider)>()
            .iter()
            .map(|(entity, (transform, collider))| (entity.id(), transform.position, collider.radius))
            .collect();

        let mut touching = HashSet::new();
        for (i, &(a, position_a, radius_a)) in bodies.iter().enumerate() {
            for &(b, position_b, radius_b) in &bodies[i + 1..] {
                let reach = radius_a + radius_b;
                if (position_a - position_b).norm_squared() <= reach * reach {
                    let pair = if a < b { (a, b) } else { (b, a) };
                    touching.insert(pair);
                }
            }
        }

        for &(a, b) in touching.difference(&self.touching) {
            log::debug!("Collision between {a} and {b}");
            manager.send_signal(Collision { a, b })?;
        }
        self.touching = touching;
        Ok(())
    }
}

/// Applies collision damage and health decay, destroying depleted entities
pub struct DamageSystem;

impl System for DamageSystem {
    fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()> {
        let dt = manager.global_data::<FrameClock>()?.dt;
        let decay = manager.global_data::<Rules>()?.decay_per_second * dt;

        let mut depleted = Vec::new();
        manager.each_mut::<(Health,), _>(|entity, (health,)| {
            health.current -= decay;
            if health.current <= 0.0 {
                depleted.push(entity);
            }
        })?;

        for entity in depleted {
            log::info!("Entity {entity} destroyed");
            manager.send_signal(Destroyed(entity))?;
            manager.destroy_entity(entity)?;
        }
        Ok(())
    }

    fn is_signal_subscribed(&self, id: SignalId) -> bool {
        id == Collision::ID
    }

    fn handle_signal(&mut self, manager: &mut EcsManager, signal: &SignalEnvelope) -> EcsResult<()> {
        let Some(&Collision { a, b }) = signal.downcast::<Collision>() else {
            return Ok(());
        };
        let damage = manager.global_data::<Rules>()?.collision_damage;
        for entity in [a, b] {
            if let Some(health) = manager.find_component_mut::<Health>(entity) {
                health.current -= damage;
            }
        }
        Ok(())
    }
}

/// Read-only observer in the render pool
pub struct RenderStatsSystem;

impl System for RenderStatsSystem {
    fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()> {
        let (live, total_health) = manager
            .view::<(Health, Transform)>()
            .iter()
            .fold((0_usize, 0.0_f32), |(count, sum), (_, (health, _))| {
                (count + 1, sum + health.fraction())
            });

        let stats = manager.global_data_mut::<Stats>()?;
        stats.last_live = live;
        #[allow(clippy::cast_precision_loss)]
        let mean = if live == 0 { 0.0 } else { total_health / live as f32 };
        stats.last_mean_health = mean;
        Ok(())
    }

    fn is_signal_subscribed(&self, id: SignalId) -> bool {
        id == FrameCount::ID || id == Collision::ID || id == Destroyed::ID
    }

    fn handle_signal(&mut self, manager: &mut EcsManager, signal: &SignalEnvelope) -> EcsResult<()> {
        let stats = manager.global_data_mut::<Stats>()?;
        if let Some(FrameCount(frame)) = signal.downcast::<FrameCount>() {
            stats.frames_reported += 1;
            log::info!(
                "Frame {frame}: {} live, mean health {:.0}%, {} collisions, {} destroyed",
                stats.last_live,
                stats.last_mean_health * 100.0,
                stats.collisions,
                stats.destroyed
            );
        } else if signal.is::<Collision>() {
            stats.collisions += 1;
        } else if signal.is::<Destroyed>() {
            stats.destroyed += 1;
        }
        Ok(())
    }
}
