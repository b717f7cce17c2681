//! ECS manager: entity lifecycle, component pools, global data, system pools
//!
//! The manager owns every component pool (type-erased, keyed by `TypeId`),
//! the live-entity set, id recycling, per-world global data, and the system
//! pools. [`EcsManager::update_systems`] drives one pool through a tick:
//!
//! 1. deliver the pool's queued signals to its subscribed systems
//! 2. commit every component pool's queued adds and removals
//! 3. commit the pool's queued system adds, removals, and moves
//! 4. run the pool's systems in order
//!
//! Signals delivered in step 1 may queue component changes; step 2 makes
//! them visible before this pool's systems run in step 4.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashMap};

use super::component::{AnyComponentPool, Component, ComponentListener, ComponentPool};
use super::entity::{Entity, EntityId, EntityMut};
use super::entity_set::EntitySet;
use super::error::{EcsError, EcsResult};
use super::query::{Query, View};
use super::signal::{Signal, SignalEnvelope, SignalRegistry};
use super::system::System;
use super::system_pool::{self, SystemOrderer, SystemPool, SystemPoolId};
use crate::config::EcsConfig;

/// Upper bound on follow-up passes when listeners keep queuing changes
const MAX_COMMIT_PASSES: usize = 32;

/// Top-level ECS registry and tick orchestrator
pub struct EcsManager {
    config: EcsConfig,
    next_entity_id: u32,
    free_ids: BTreeSet<u32>,
    live: EntitySet,
    pub(crate) pools: HashMap<TypeId, Box<dyn AnyComponentPool>>,
    /// Pool registration order, which is also commit order
    pool_order: Vec<TypeId>,
    committing: bool,
    global_data: HashMap<TypeId, Box<dyn Any>>,
    system_pools: HashMap<SystemPoolId, SystemPool>,
    /// System pool creation order, which is also signal fan-out order
    system_pool_order: Vec<SystemPoolId>,
    signals: SignalRegistry,
}

impl EcsManager {
    /// Create a manager with default settings
    pub fn new() -> Self {
        Self::with_config(EcsConfig::default())
    }

    /// Create a manager with the given settings
    pub fn with_config(config: EcsConfig) -> Self {
        log::debug!(
            "Creating ECS manager (max entity id {}, capacity {})",
            config.max_entity_id,
            config.initial_entity_capacity
        );
        Self {
            live: EntitySet::with_capacity(config.initial_entity_capacity),
            config,
            next_entity_id: 1,
            free_ids: BTreeSet::new(),
            pools: HashMap::new(),
            pool_order: Vec::new(),
            committing: false,
            global_data: HashMap::new(),
            system_pools: HashMap::new(),
            system_pool_order: Vec::new(),
            signals: SignalRegistry::default(),
        }
    }

    /// Active settings
    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    // ── Entities ──────────────────────────────────────────────────────

    /// Create an entity, reusing the smallest recycled id first
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        let raw = if let Some(raw) = self.free_ids.pop_first() {
            raw
        } else {
            let raw = self.next_entity_id;
            if raw == 0 || raw > self.config.max_entity_id {
                return Err(EcsError::EntityIdsExhausted {
                    limit: self.config.max_entity_id,
                });
            }
            // Wraps to 0 only after u32::MAX was issued; 0 then reads as exhausted
            self.next_entity_id = raw.wrapping_add(1);
            raw
        };

        let id = EntityId::from_raw(raw);
        self.live.emplace(id);
        Ok(id)
    }

    /// Destroy a live entity, queuing removal of each of its components
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.live.erase(id) {
            return Err(EcsError::EntityNotAlive(id));
        }

        for pool in self.pools.values_mut() {
            pool.erase(id);
        }

        self.free_ids.insert(id.raw());
        // Fold trailing recycled ids back into the counter
        while let Some(&last) = self.free_ids.last() {
            if last.wrapping_add(1) != self.next_entity_id {
                break;
            }
            self.free_ids.pop_last();
            self.next_entity_id = last;
        }
        Ok(())
    }

    /// Whether `id` is alive
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.live.contains(id)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Live entities in creation order
    pub fn live_entities(&self) -> &[EntityId] {
        self.live.list()
    }

    /// The id counter: the id issued next when no recycled id is available
    pub fn next_entity_id(&self) -> u32 {
        self.next_entity_id
    }

    /// Read-only handle to `id`
    pub fn entity(&self, id: EntityId) -> Entity<'_> {
        Entity::new(id, self)
    }

    /// Mutable handle to `id`
    pub fn entity_mut(&mut self, id: EntityId) -> EntityMut<'_> {
        EntityMut::new(id, self)
    }

    // ── Components ────────────────────────────────────────────────────

    /// Queue `component` for `entity`; visible after the next commit.
    ///
    /// The pool for `T` is created immediately if needed.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> EcsResult<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::EntityNotAlive(entity));
        }
        self.pool_or_insert::<T>().emplace(entity, component);
        Ok(())
    }

    /// Queue removal of `entity`'s `T`. Returns `false` when the entity owns
    /// no committed `T`.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> bool {
        let queued = self.pool_mut::<T>().is_some_and(|pool| pool.erase(entity));
        if !queued {
            log::warn!(
                "Removing `{}` from entity {entity}, which does not own one; ignored",
                type_name::<T>()
            );
        }
        queued
    }

    /// Whether `entity` owns a committed `T`
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.pools
            .get(&TypeId::of::<T>())
            .is_some_and(|pool| pool.contains(entity))
    }

    /// `entity`'s committed `T`
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        self.find_component(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })
    }

    /// `entity`'s committed `T`, mutably
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        self.find_component_mut(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })
    }

    /// `entity`'s committed `T` if present
    pub fn find_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.pool::<T>()?.find_component(entity)
    }

    /// `entity`'s committed `T` if present, mutably
    pub fn find_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.pool_mut::<T>()?.find_component_mut(entity)
    }

    /// Number of committed `T` components
    pub fn component_count<T: Component>(&self) -> usize {
        self.pool::<T>().map_or(0, ComponentPool::len)
    }

    /// The pool for `T`, if one was ever created
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any().downcast_ref::<ComponentPool<T>>())
    }

    /// The pool for `T` mutably, if one was ever created
    pub fn pool_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        self.pools
            .get_mut(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any_mut().downcast_mut::<ComponentPool<T>>())
    }

    pub(crate) fn pool_or_insert<T: Component>(&mut self) -> &mut ComponentPool<T> {
        let type_id = TypeId::of::<T>();
        if !self.pools.contains_key(&type_id) {
            log::debug!("Created component pool for `{}`", type_name::<T>());
            self.pools.insert(type_id, Box::new(ComponentPool::<T>::new()));
            self.pool_order.push(type_id);
        }
        self.pools
            .get_mut(&type_id)
            .and_then(|pool| pool.as_any_mut().downcast_mut::<ComponentPool<T>>())
            .unwrap_or_else(|| unreachable!("pool keyed by TypeId of its component"))
    }

    /// Attach the Added/Removed listener of `T`'s pool, replacing any previous one
    pub fn set_listener<T: Component>(&mut self, listener: impl ComponentListener<T>) {
        self.pool_or_insert::<T>().set_listener(Box::new(listener));
    }

    /// Detach `T`'s listener. Returns whether one was attached.
    pub fn clear_listener<T: Component>(&mut self) -> bool {
        self.pool_mut::<T>().is_some_and(ComponentPool::clear_listener)
    }

    /// Whether any component pool has queued changes
    pub fn has_pending_updates(&self) -> bool {
        self.pools.values().any(|pool| pool.has_pending())
    }

    /// Commit every component pool, in pool creation order.
    ///
    /// Each pool commits all-or-nothing: a duplicate add aborts that pool's
    /// batch without touching its storage, and the error is returned. Pools
    /// already committed in this call stay committed. Listener callbacks run
    /// during the pool's replay; changes they queue (including the removals
    /// queued by destroying an entity) are applied by further passes before
    /// this returns, so no committed component outlives its entity. A commit
    /// requested from inside a listener is ignored.
    pub fn commit_entity_updates(&mut self) -> EcsResult<()> {
        if self.committing {
            log::warn!("Nested component commit requested from a listener; ignored");
            return Ok(());
        }
        self.committing = true;
        let result = self.commit_until_settled();
        self.committing = false;
        result
    }

    fn commit_until_settled(&mut self) -> EcsResult<()> {
        let mut passes = 0;
        loop {
            let applied = self.commit_pools()?;
            passes += 1;
            if applied == 0 || !self.has_pending_updates() {
                return Ok(());
            }
            if passes == MAX_COMMIT_PASSES {
                log::warn!(
                    "Listeners still queuing changes after {MAX_COMMIT_PASSES} commit passes; \
                     the rest waits for the next commit"
                );
                return Ok(());
            }
        }
    }

    /// One pass over every pool. Returns how many changes took effect.
    fn commit_pools(&mut self) -> EcsResult<usize> {
        let mut total = 0;
        for index in 0..self.pool_order.len() {
            let type_id = self.pool_order[index];
            let Some(pool) = self.pools.get_mut(&type_id) else {
                continue;
            };
            if !pool.has_pending() {
                continue;
            }
            let name = pool.component_name();
            let batch = pool.begin_commit()?;
            let applied = batch.replay(self);
            log::trace!("Committed {applied} change(s) to `{name}`");
            total += applied;
        }
        Ok(total)
    }

    // ── Iteration ─────────────────────────────────────────────────────

    /// Lazy read-only view over entities holding every component of `Q`
    pub fn view<Q: Query>(&self) -> View<'_, Q> {
        View::new(self)
    }

    /// Call `f` for every entity holding every component of `Q`
    pub fn each<'a, Q, Func>(&'a self, mut f: Func)
    where
        Q: Query,
        Func: FnMut(Entity<'a>, Q::Item<'a>),
    {
        for (entity, item) in self.view::<Q>() {
            f(entity, item);
        }
    }

    /// First entity holding every component of `Q` for which `predicate` holds
    pub fn find<'a, Q, Func>(&'a self, mut predicate: Func) -> Option<EntityId>
    where
        Q: Query,
        Func: FnMut(Entity<'a>, Q::Item<'a>) -> bool,
    {
        self.view::<Q>()
            .into_iter()
            .find_map(|(entity, item)| {
                let id = entity.id();
                predicate(entity, item).then_some(id)
            })
    }

    /// Call `f` with mutable access to the components of every entity
    /// holding every component of `Q`
    pub fn each_mut<'a, Q, Func>(&'a mut self, f: Func) -> EcsResult<()>
    where
        Q: Query,
        Func: FnMut(EntityId, Q::ItemMut<'a>),
    {
        Q::for_each_mut(self, f)
    }

    // ── Global data ───────────────────────────────────────────────────

    /// Add the single per-world instance of `T`
    pub fn add_global_data<T: 'static>(&mut self, value: T) -> EcsResult<&mut T> {
        let type_id = TypeId::of::<T>();
        if self.global_data.contains_key(&type_id) {
            return Err(EcsError::GlobalDataExists(type_name::<T>()));
        }
        let slot = self.global_data.entry(type_id).or_insert_with(|| Box::new(value));
        slot.downcast_mut::<T>()
            .ok_or(EcsError::GlobalDataMissing(type_name::<T>()))
    }

    /// The per-world `T`
    pub fn global_data<T: 'static>(&self) -> EcsResult<&T> {
        self.global_data
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or(EcsError::GlobalDataMissing(type_name::<T>()))
    }

    /// The per-world `T`, mutably
    pub fn global_data_mut<T: 'static>(&mut self) -> EcsResult<&mut T> {
        self.global_data
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
            .ok_or(EcsError::GlobalDataMissing(type_name::<T>()))
    }

    /// Whether a per-world `T` exists
    pub fn has_global_data<T: 'static>(&self) -> bool {
        self.global_data.contains_key(&TypeId::of::<T>())
    }

    /// Remove and return the per-world `T`
    pub fn remove_global_data<T: 'static>(&mut self) -> Option<T> {
        let Some(value) = self.global_data.remove(&TypeId::of::<T>()) else {
            log::warn!("Removing global data `{}`, which does not exist", type_name::<T>());
            return None;
        };
        value.downcast::<T>().ok().map(|value| *value)
    }

    // ── Systems ───────────────────────────────────────────────────────

    /// Create an empty system pool
    pub fn create_system_pool(&mut self, id: SystemPoolId) -> EcsResult<&mut SystemPool> {
        if self.system_pools.contains_key(&id) {
            return Err(EcsError::SystemPoolExists(id));
        }
        log::debug!("Created system {id}");
        self.system_pool_order.push(id);
        Ok(self.system_pools.entry(id).or_insert_with(|| SystemPool::new(id)))
    }

    /// The system pool `id`
    pub fn system_pool(&self, id: SystemPoolId) -> EcsResult<&SystemPool> {
        self.system_pools
            .get(&id)
            .ok_or(EcsError::SystemPoolNotFound(id))
    }

    /// The system pool `id`, mutably
    pub fn system_pool_mut(&mut self, id: SystemPoolId) -> EcsResult<&mut SystemPool> {
        self.system_pools
            .get_mut(&id)
            .ok_or(EcsError::SystemPoolNotFound(id))
    }

    /// Ids of every system pool in creation order
    pub fn system_pool_ids(&self) -> &[SystemPoolId] {
        &self.system_pool_order
    }

    /// Queue `system` for addition to pool `id`
    pub fn add_system<S: System>(&mut self, id: SystemPoolId, system: S) -> EcsResult<SystemOrderer<'_>> {
        self.system_pool_mut(id)?.add_system(system)
    }

    /// Queue removal of system `S` from pool `id`
    pub fn remove_system<S: System>(&mut self, id: SystemPoolId) -> EcsResult<()> {
        self.system_pool_mut(id)?.remove_system::<S>()
    }

    // ── Signals ───────────────────────────────────────────────────────

    /// Broadcast `signal` to every system pool's queue.
    ///
    /// Each pool delivers it at the start of its next update. Pools with no
    /// subscribed system simply drop it then.
    pub fn send_signal<S: Signal>(&mut self, signal: S) -> EcsResult<()> {
        self.signals.validate::<S>()?;
        let envelope = SignalEnvelope::new(signal);
        for pool in self.system_pools.values_mut() {
            pool.queue_signal(envelope.clone());
        }
        Ok(())
    }

    // ── Tick ──────────────────────────────────────────────────────────

    /// Run one tick of system pool `id`: deliver signals, commit components,
    /// commit system changes, run systems
    pub fn update_systems(&mut self, id: SystemPoolId) -> EcsResult<()> {
        let pool = self.system_pool_mut(id)?;
        if pool.is_running() {
            return Err(EcsError::SystemPoolBusy(id));
        }

        let signals = pool.take_signals();
        if !signals.is_empty() {
            let mut systems = pool.take_systems();
            let delivered = system_pool::deliver_signals(&mut systems, &signals, self);
            self.restore_systems(id, systems);
            let delivered = delivered?;
            log::trace!("{id}: {} signal(s), {delivered} handler call(s)", signals.len());
        }

        self.commit_entity_updates()?;
        self.system_pool_mut(id)?.commit_system_updates()?;

        let mut systems = self.system_pool_mut(id)?.take_systems();
        let result = system_pool::run_systems(&mut systems, self);
        self.restore_systems(id, systems);
        result
    }

    /// Update every system pool once, in creation order
    pub fn update_all_systems(&mut self) -> EcsResult<()> {
        for index in 0..self.system_pool_order.len() {
            let id = self.system_pool_order[index];
            self.update_systems(id)?;
        }
        Ok(())
    }

    fn restore_systems(&mut self, id: SystemPoolId, systems: Vec<system_pool::SystemEntry>) {
        if let Some(pool) = self.system_pools.get_mut(&id) {
            pool.restore_systems(systems);
        }
    }

    // ── Teardown ──────────────────────────────────────────────────────

    /// Destroy every remaining entity, commit, and drop all systems and
    /// global data. Removed listeners fire for the destroyed components.
    pub fn shutdown(&mut self) -> EcsResult<()> {
        let leftovers: Vec<EntityId> = self.live.list().to_vec();
        if !leftovers.is_empty() && self.config.warn_on_leftover_entities {
            log::warn!("Cleaning up {} entities still alive at shutdown", leftovers.len());
        }
        for id in leftovers {
            if self.config.warn_on_leftover_entities {
                log::warn!("Destroying leftover entity {id}");
            }
            self.destroy_entity(id)?;
        }
        self.commit_entity_updates()?;

        for pool in self.system_pools.values_mut() {
            pool.clear();
        }
        self.system_pools.clear();
        self.system_pool_order.clear();
        self.global_data.clear();
        log::debug!("ECS manager shut down");
        Ok(())
    }
}

impl Default for EcsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EcsManager {
    fn drop(&mut self) {
        if !self.live.is_empty() && self.config.warn_on_leftover_entities {
            log::warn!(
                "ECS manager dropped with {} live entities; their components are discarded without listeners",
                self.live.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ListenerFns;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct HealthC {
        current: i32,
        max: i32,
    }
    impl Component for HealthC {}

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(u8);
    impl Component for Marker {}

    struct Camera {
        zoom: f32,
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut manager = EcsManager::new();
        let first = manager.create_entity().unwrap();
        assert_eq!(first.raw(), 1);
        assert!(first.is_valid());
        assert!(!manager.is_alive(EntityId::INVALID));
    }

    #[test]
    fn test_trailing_ids_fold_into_counter() {
        let mut manager = EcsManager::new();
        let _a = manager.create_entity().unwrap();
        let b = manager.create_entity().unwrap();
        let c = manager.create_entity().unwrap();
        assert_eq!(manager.next_entity_id(), 4);

        manager.destroy_entity(c).unwrap();
        manager.destroy_entity(b).unwrap();
        assert_eq!(manager.next_entity_id(), 2);

        assert_eq!(manager.create_entity().unwrap().raw(), 2);
        assert_eq!(manager.create_entity().unwrap().raw(), 3);
    }

    #[test]
    fn test_out_of_order_ids_recycle_smallest_first() {
        let mut manager = EcsManager::new();
        let ids: Vec<_> = (0..5).map(|_| manager.create_entity().unwrap()).collect();
        manager.destroy_entity(ids[3]).unwrap();
        manager.destroy_entity(ids[1]).unwrap();
        assert_eq!(manager.next_entity_id(), 6);

        assert_eq!(manager.create_entity().unwrap(), ids[1]);
        assert_eq!(manager.create_entity().unwrap(), ids[3]);
        assert_eq!(manager.create_entity().unwrap().raw(), 6);
    }

    #[test]
    fn test_gap_fills_then_folds() {
        let mut manager = EcsManager::new();
        let ids: Vec<_> = (0..4).map(|_| manager.create_entity().unwrap()).collect();
        manager.destroy_entity(ids[2]).unwrap();
        assert_eq!(manager.next_entity_id(), 5);

        // Destroying 4 folds both 4 and the parked 3
        manager.destroy_entity(ids[3]).unwrap();
        assert_eq!(manager.next_entity_id(), 3);
    }

    #[test]
    fn test_live_ids_never_collide() {
        let mut manager = EcsManager::new();
        let mut live: Vec<EntityId> = Vec::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..400 {
            if live.is_empty() || rng.gen_ratio(2, 3) {
                let id = manager.create_entity().unwrap();
                assert!(!live.contains(&id), "{id} issued twice");
                live.push(id);
            } else {
                let victim = live.remove(rng.gen_range(0..live.len()));
                manager.destroy_entity(victim).unwrap();
            }
        }
        assert_eq!(manager.entity_count(), live.len());
    }

    #[test]
    fn test_id_exhaustion() {
        let mut manager = EcsManager::with_config(EcsConfig {
            max_entity_id: 2,
            ..EcsConfig::default()
        });
        manager.create_entity().unwrap();
        let second = manager.create_entity().unwrap();
        assert_eq!(
            manager.create_entity(),
            Err(EcsError::EntityIdsExhausted { limit: 2 })
        );

        manager.destroy_entity(second).unwrap();
        assert_eq!(manager.create_entity().unwrap(), second);
    }

    #[test]
    fn test_destroy_dead_entity_fails() {
        let mut manager = EcsManager::new();
        let id = manager.create_entity().unwrap();
        manager.destroy_entity(id).unwrap();
        assert_eq!(manager.destroy_entity(id), Err(EcsError::EntityNotAlive(id)));
    }

    #[test]
    fn test_health_scenario() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        manager
            .add_component(entity, HealthC { current: 8, max: 10 })
            .unwrap();
        manager.commit_entity_updates().unwrap();
        assert_eq!(manager.get_component::<HealthC>(entity).unwrap().current, 8);

        assert!(manager.remove_component::<HealthC>(entity));
        manager.commit_entity_updates().unwrap();
        assert!(!manager.has_component::<HealthC>(entity));
    }

    #[test]
    fn test_get_missing_component_is_error() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        assert!(matches!(
            manager.get_component::<HealthC>(entity),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_add_to_dead_entity_is_error() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        manager.destroy_entity(entity).unwrap();
        assert_eq!(
            manager.add_component(entity, Marker(1)),
            Err(EcsError::EntityNotAlive(entity))
        );
    }

    #[test]
    fn test_remove_unknown_component_returns_false() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        assert!(!manager.remove_component::<Marker>(entity));

        // The pool exists but this entity has nothing in it
        let other = manager.create_entity().unwrap();
        manager.add_component(other, Marker(1)).unwrap();
        manager.commit_entity_updates().unwrap();
        assert!(!manager.remove_component::<Marker>(entity));
        assert!(!manager.has_pending_updates());
        assert!(manager.has_component::<Marker>(other));
    }

    #[test]
    fn test_duplicate_add_rejected_at_commit() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        manager.add_component(entity, Marker(1)).unwrap();
        manager.add_component(entity, Marker(2)).unwrap();

        let err = manager.commit_entity_updates().unwrap_err();
        assert!(matches!(
            err,
            EcsError::DuplicateComponent { op_index: 1, .. }
        ));
        // All-or-nothing: neither add landed
        assert!(!manager.has_component::<Marker>(entity));
        assert!(!manager.has_pending_updates());
    }

    #[test]
    fn test_remove_then_add_in_one_tick() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        manager.add_component(entity, Marker(1)).unwrap();
        manager.commit_entity_updates().unwrap();

        assert!(manager.remove_component::<Marker>(entity));
        manager.add_component(entity, Marker(2)).unwrap();
        manager.commit_entity_updates().unwrap();

        assert_eq!(manager.get_component::<Marker>(entity).unwrap(), &Marker(2));
    }

    #[test]
    fn test_destroy_queues_component_removal() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        manager.add_component(entity, Marker(1)).unwrap();
        manager.add_component(entity, HealthC { current: 1, max: 1 }).unwrap();
        manager.commit_entity_updates().unwrap();

        manager.destroy_entity(entity).unwrap();
        // Still committed until the next commit
        assert!(manager.has_component::<Marker>(entity));
        manager.commit_entity_updates().unwrap();
        assert_eq!(manager.component_count::<Marker>(), 0);
        assert_eq!(manager.component_count::<HealthC>(), 0);
    }

    #[test]
    fn test_pending_add_for_destroyed_entity_is_dropped() {
        let mut manager = EcsManager::new();
        let entity = manager.create_entity().unwrap();
        manager.add_component(entity, Marker(1)).unwrap();
        manager.destroy_entity(entity).unwrap();
        manager.commit_entity_updates().unwrap();
        assert_eq!(manager.component_count::<Marker>(), 0);
    }

    #[test]
    fn test_listener_sees_committed_state_and_can_spawn() {
        let mut manager = EcsManager::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let added_log = Rc::clone(&log);
        let removed_log = Rc::clone(&log);
        manager.set_listener::<HealthC>(
            ListenerFns::new()
                .on_added(move |manager, entity| {
                    let health = manager.get_component::<HealthC>(entity).unwrap().current;
                    added_log.borrow_mut().push(format!("added {health}"));
                    let spawned = manager.create_entity().unwrap();
                    manager.add_component(spawned, Marker(9)).unwrap();
                })
                .on_removed(move |_, _, health: HealthC| {
                    removed_log.borrow_mut().push(format!("removed {}", health.current));
                }),
        );

        let entity = manager.create_entity().unwrap();
        manager.add_component(entity, HealthC { current: 5, max: 5 }).unwrap();
        manager.commit_entity_updates().unwrap();
        assert_eq!(*log.borrow(), vec!["added 5".to_string()]);
        assert_eq!(manager.entity_count(), 2);

        // Marker's pool was created by the listener; a follow-up pass commits it
        assert_eq!(manager.component_count::<Marker>(), 1);
        assert!(!manager.has_pending_updates());

        manager.remove_component::<HealthC>(entity);
        manager.commit_entity_updates().unwrap();
        assert_eq!(log.borrow().last().map(String::as_str), Some("removed 5"));
        assert!(manager.pool::<HealthC>().unwrap().has_listener());

        assert!(manager.clear_listener::<HealthC>());
        assert!(!manager.pool::<HealthC>().unwrap().has_listener());
    }

    #[test]
    fn test_global_data_lifecycle() {
        let mut manager = EcsManager::new();
        manager.add_global_data(Camera { zoom: 1.0 }).unwrap();
        assert!(matches!(
            manager.add_global_data(Camera { zoom: 2.0 }),
            Err(EcsError::GlobalDataExists(_))
        ));

        manager.global_data_mut::<Camera>().unwrap().zoom = 3.0;
        assert!((manager.global_data::<Camera>().unwrap().zoom - 3.0).abs() < f32::EPSILON);

        let removed = manager.remove_global_data::<Camera>().unwrap();
        assert!((removed.zoom - 3.0).abs() < f32::EPSILON);
        assert!(!manager.has_global_data::<Camera>());
        assert!(matches!(
            manager.global_data::<Camera>(),
            Err(EcsError::GlobalDataMissing(_))
        ));
        assert!(manager.remove_global_data::<Camera>().is_none());
    }

    #[test]
    fn test_entity_handles() {
        let mut manager = EcsManager::new();
        let id = manager.create_entity().unwrap();
        manager
            .entity_mut(id)
            .add_component(Marker(4))
            .unwrap()
            .add_component(HealthC { current: 2, max: 3 })
            .unwrap();
        manager.commit_entity_updates().unwrap();

        let entity = manager.entity(id);
        assert!(entity.is_alive());
        assert!(entity.has_component::<Marker>());
        assert_eq!(entity.get_component::<HealthC>().unwrap().max, 3);

        let mut handle = manager.entity_mut(id);
        handle.get_component_mut::<HealthC>().unwrap().current = 3;
        handle.destroy().unwrap();
        assert!(!manager.is_alive(id));
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut manager = EcsManager::new();
        for i in 0..5 {
            let id = manager.create_entity().unwrap();
            manager.add_component(id, Marker(i)).unwrap();
        }
        manager.commit_entity_updates().unwrap();

        let found = manager.find::<(Marker,), _>(|_, (marker,)| marker.0 >= 3);
        assert_eq!(found.map(EntityId::raw), Some(4));

        let mut sum = 0;
        manager.each::<(Marker,), _>(|_, (marker,)| sum += u32::from(marker.0));
        assert_eq!(sum, 10);
    }

    #[test]
    fn test_shutdown_destroys_leftovers() {
        let mut manager = EcsManager::new();
        let removed = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&removed);
        manager.set_listener::<Marker>(ListenerFns::new().on_removed(move |_, _, _| {
            *counter.borrow_mut() += 1;
        }));

        for i in 0..3 {
            let id = manager.create_entity().unwrap();
            manager.add_component(id, Marker(i)).unwrap();
        }
        manager.commit_entity_updates().unwrap();
        manager.add_global_data(Camera { zoom: 1.0 }).unwrap();

        manager.shutdown().unwrap();
        assert_eq!(manager.entity_count(), 0);
        assert_eq!(*removed.borrow(), 3);
        assert!(!manager.has_global_data::<Camera>());
        assert_eq!(manager.next_entity_id(), 1);
    }
}
