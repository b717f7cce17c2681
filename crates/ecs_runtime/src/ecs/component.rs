//! Component trait, per-type component pools, and the deferred commit path
//!
//! A [`ComponentPool`] stores the values of one component type contiguously,
//! next to an [`EntitySet`] recording which entity owns each slot. Structural
//! changes never touch the storage directly: adds and removals are appended
//! to an ordered log and replayed when the manager commits.
//!
//! Pool lifecycle:
//!
//! ```text
//! Idle --emplace/erase--> Queued --commit--> (validate, replay) --> Idle
//! ```
//!
//! Validation runs over the whole log before the first mutation, so a
//! duplicate add leaves the pool exactly as it was before the commit.

use std::any::{type_name, Any};
use std::fmt;
use std::ops::{Index, IndexMut};

use super::entity::EntityId;
use super::entity_set::EntitySet;
use super::error::{EcsError, EcsResult};
use super::manager::EcsManager;

/// Marker trait for components
///
/// Components are plain data. Implement it explicitly for every type that
/// should be attachable to an entity.
pub trait Component: 'static {}

/// Callbacks fired while a pool commits
///
/// Both run synchronously during the commit, after the storage change took
/// effect, and receive the owning manager so they can queue further work.
/// Structural changes they queue are applied by a follow-up pass of the
/// same commit.
pub trait ComponentListener<T: Component>: 'static {
    /// A component was attached to `entity`
    fn on_added(&mut self, _manager: &mut EcsManager, _entity: EntityId) {}

    /// A component was detached from `entity`; `component` is the removed value
    fn on_removed(&mut self, _manager: &mut EcsManager, _entity: EntityId, _component: T) {}
}

type AddedFn = Box<dyn FnMut(&mut EcsManager, EntityId)>;
type RemovedFn<T> = Box<dyn FnMut(&mut EcsManager, EntityId, T)>;

/// Closure-backed [`ComponentListener`]
pub struct ListenerFns<T: Component> {
    added: Option<AddedFn>,
    removed: Option<RemovedFn<T>>,
}

impl<T: Component> ListenerFns<T> {
    /// Listener with no callbacks
    pub fn new() -> Self {
        Self {
            added: None,
            removed: None,
        }
    }

    /// Set the Added callback
    #[must_use]
    pub fn on_added(mut self, f: impl FnMut(&mut EcsManager, EntityId) + 'static) -> Self {
        self.added = Some(Box::new(f));
        self
    }

    /// Set the Removed callback
    #[must_use]
    pub fn on_removed(mut self, f: impl FnMut(&mut EcsManager, EntityId, T) + 'static) -> Self {
        self.removed = Some(Box::new(f));
        self
    }
}

impl<T: Component> Default for ListenerFns<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentListener<T> for ListenerFns<T> {
    fn on_added(&mut self, manager: &mut EcsManager, entity: EntityId) {
        if let Some(added) = self.added.as_mut() {
            added(manager, entity);
        }
    }

    fn on_removed(&mut self, manager: &mut EcsManager, entity: EntityId, component: T) {
        if let Some(removed) = self.removed.as_mut() {
            removed(manager, entity, component);
        }
    }
}

/// One queued structural change
enum PendingOp<T> {
    Add(EntityId, T),
    Remove(EntityId),
}

/// Storage and mutation queue for one component type
pub struct ComponentPool<T: Component> {
    components: Vec<T>,
    entities: EntitySet,
    pending: Vec<PendingOp<T>>,
    listener: Option<Box<dyn ComponentListener<T>>>,
}

impl<T: Component> ComponentPool<T> {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty pool with room for `capacity` components
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: Vec::with_capacity(capacity),
            entities: EntitySet::with_capacity(capacity),
            pending: Vec::new(),
            listener: None,
        }
    }

    /// Queue `component` for `entity`. Takes effect at the next commit,
    /// which is also where duplicates are rejected.
    pub fn emplace(&mut self, entity: EntityId, component: T) {
        self.pending.push(PendingOp::Add(entity, component));
    }

    /// Queue removal of `entity`'s component.
    ///
    /// Only committed state is consulted: returns `false` without queuing
    /// when the entity does not own a committed component, even if an add
    /// for it is pending in this same tick.
    pub fn erase(&mut self, entity: EntityId) -> bool {
        if !self.entities.contains(entity) {
            return false;
        }
        self.pending.push(PendingOp::Remove(entity));
        true
    }

    /// Whether structural changes are waiting for a commit
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of queued structural changes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of committed components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the pool holds no committed components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Owners of the committed components, in slot order
    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    /// Owner of slot `index`
    pub fn entity_at(&self, index: usize) -> Option<EntityId> {
        self.entities.get(index)
    }

    /// Whether `entity` owns a committed component
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    /// Slot of `entity`'s component
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        self.entities.find(entity)
    }

    /// Component in slot `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.components.get(index)
    }

    /// Mutable component in slot `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.components.get_mut(index)
    }

    /// Component owned by `entity`
    pub fn find_component(&self, entity: EntityId) -> Option<&T> {
        self.entities.find(entity).map(|index| &self.components[index])
    }

    /// Mutable component owned by `entity`
    pub fn find_component_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities
            .find(entity)
            .map(|index| &mut self.components[index])
    }

    /// Iterate `(owner, component)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.components.iter())
    }

    /// Iterate `(owner, component)` pairs mutably in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.components.iter_mut())
    }

    pub(crate) fn split_mut(&mut self) -> (&EntitySet, &mut [T]) {
        (&self.entities, &mut self.components)
    }

    pub(crate) fn set_listener(&mut self, listener: Box<dyn ComponentListener<T>>) {
        self.listener = Some(listener);
    }

    pub(crate) fn clear_listener(&mut self) -> bool {
        self.listener.take().is_some()
    }

    /// Whether a listener is attached
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Take the queued log, validating it against committed state.
    ///
    /// On a duplicate add the whole log is discarded and the pool stays
    /// untouched.
    fn take_validated(&mut self) -> EcsResult<Vec<PendingOp<T>>> {
        let ops = std::mem::take(&mut self.pending);
        let mut present = std::collections::HashMap::new();
        for (op_index, op) in ops.iter().enumerate() {
            match op {
                PendingOp::Add(entity, _) => {
                    let owned = present
                        .entry(*entity)
                        .or_insert_with(|| self.entities.contains(*entity));
                    if *owned {
                        return Err(EcsError::DuplicateComponent {
                            entity: *entity,
                            component: type_name::<T>(),
                            op_index,
                        });
                    }
                    *owned = true;
                }
                PendingOp::Remove(entity) => {
                    present.insert(*entity, false);
                }
            }
        }
        Ok(ops)
    }

    fn apply_add(&mut self, entity: EntityId, component: T) {
        self.components.push(component);
        self.entities.emplace(entity);
    }

    fn apply_remove(&mut self, entity: EntityId) -> Option<T> {
        let Some(index) = self.entities.find(entity) else {
            log::warn!(
                "Removing `{}` from entity {entity}, which does not own one; skipped",
                type_name::<T>()
            );
            return None;
        };
        self.entities.erase(entity);
        Some(self.components.remove(index))
    }

    fn clear(&mut self) {
        self.components.clear();
        self.entities.clear();
        self.pending.clear();
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Index<usize> for ComponentPool<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.components[index]
    }
}

impl<T: Component> IndexMut<usize> for ComponentPool<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.components[index]
    }
}

impl<T: Component> fmt::Debug for ComponentPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentPool")
            .field("component", &type_name::<T>())
            .field("len", &self.components.len())
            .field("pending", &self.pending.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Type-erased view of a [`ComponentPool`] used by the manager
pub(crate) trait AnyComponentPool {
    fn component_name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn contains(&self, entity: EntityId) -> bool;
    fn erase(&mut self, entity: EntityId) -> bool;
    fn has_pending(&self) -> bool;
    /// Validate and detach the queued log together with the listener
    fn begin_commit(&mut self) -> EcsResult<Box<dyn PendingCommit>>;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyComponentPool for ComponentPool<T> {
    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn len(&self) -> usize {
        self.components.len()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    fn erase(&mut self, entity: EntityId) -> bool {
        ComponentPool::erase(self, entity)
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn begin_commit(&mut self) -> EcsResult<Box<dyn PendingCommit>> {
        let ops = self.take_validated()?;
        Ok(Box::new(CommitBatch {
            ops,
            listener: self.listener.take(),
        }))
    }

    fn clear(&mut self) {
        ComponentPool::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A validated log detached from its pool, replayed against the manager
pub(crate) trait PendingCommit {
    /// Apply every operation in order. Returns how many took effect.
    fn replay(self: Box<Self>, manager: &mut EcsManager) -> usize;
}

struct CommitBatch<T: Component> {
    ops: Vec<PendingOp<T>>,
    listener: Option<Box<dyn ComponentListener<T>>>,
}

impl<T: Component> PendingCommit for CommitBatch<T> {
    fn replay(self: Box<Self>, manager: &mut EcsManager) -> usize {
        let CommitBatch { ops, mut listener } = *self;
        let mut applied = 0;

        for op in ops {
            match op {
                PendingOp::Add(entity, component) => {
                    if !manager.is_alive(entity) {
                        log::warn!(
                            "Dropping queued `{}` for entity {entity}, which is no longer alive",
                            type_name::<T>()
                        );
                        continue;
                    }
                    manager.pool_or_insert::<T>().apply_add(entity, component);
                    applied += 1;
                    if let Some(listener) = listener.as_mut() {
                        listener.on_added(manager, entity);
                    }
                }
                PendingOp::Remove(entity) => {
                    let Some(removed) = manager.pool_or_insert::<T>().apply_remove(entity) else {
                        continue;
                    };
                    applied += 1;
                    if let Some(listener) = listener.as_mut() {
                        listener.on_removed(manager, entity, removed);
                    }
                }
            }
        }

        if let Some(listener) = listener {
            let pool = manager.pool_or_insert::<T>();
            if pool.listener.is_none() {
                pool.listener = Some(listener);
            }
        }
        applied
    }
}
