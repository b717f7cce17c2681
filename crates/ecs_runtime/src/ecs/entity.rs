//! Entity identifiers and handles

use std::fmt;

use super::component::Component;
use super::error::EcsResult;
use super::manager::EcsManager;

/// Entity identifier
///
/// An opaque 32-bit id. `0` is reserved as [`EntityId::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// The reserved id no live entity ever has
    pub const INVALID: Self = Self(0);

    /// Wrap a raw id
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is anything other than [`EntityId::INVALID`]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only entity handle
#[derive(Clone, Copy)]
pub struct Entity<'a> {
    id: EntityId,
    manager: &'a EcsManager,
}

impl<'a> Entity<'a> {
    pub(crate) fn new(id: EntityId, manager: &'a EcsManager) -> Self {
        Self { id, manager }
    }

    /// Get the entity id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the entity is alive
    pub fn is_alive(&self) -> bool {
        self.manager.is_alive(self.id)
    }

    /// Whether the entity owns a committed `T`
    pub fn has_component<T: Component>(&self) -> bool {
        self.manager.has_component::<T>(self.id)
    }

    /// Get the entity's `T`, failing if it has none
    pub fn get_component<T: Component>(&self) -> EcsResult<&'a T> {
        self.manager.get_component::<T>(self.id)
    }

    /// Get the entity's `T` if present
    pub fn find_component<T: Component>(&self) -> Option<&'a T> {
        self.manager.find_component::<T>(self.id)
    }
}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&self.id).finish()
    }
}

/// Mutable entity handle
///
/// Structural changes go through the manager's queues exactly like the
/// equivalent [`EcsManager`] calls.
pub struct EntityMut<'a> {
    id: EntityId,
    manager: &'a mut EcsManager,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(id: EntityId, manager: &'a mut EcsManager) -> Self {
        Self { id, manager }
    }

    /// Get the entity id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the entity is alive
    pub fn is_alive(&self) -> bool {
        self.manager.is_alive(self.id)
    }

    /// Queue `component` for this entity
    pub fn add_component<T: Component>(&mut self, component: T) -> EcsResult<&mut Self> {
        self.manager.add_component(self.id, component)?;
        Ok(self)
    }

    /// Queue removal of this entity's `T`
    pub fn remove_component<T: Component>(&mut self) -> bool {
        self.manager.remove_component::<T>(self.id)
    }

    /// Whether the entity owns a committed `T`
    pub fn has_component<T: Component>(&self) -> bool {
        self.manager.has_component::<T>(self.id)
    }

    /// Get the entity's `T`, failing if it has none
    pub fn get_component<T: Component>(&self) -> EcsResult<&T> {
        self.manager.get_component::<T>(self.id)
    }

    /// Get the entity's `T` mutably, failing if it has none
    pub fn get_component_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.manager.get_component_mut::<T>(self.id)
    }

    /// Destroy the entity, consuming the handle
    pub fn destroy(self) -> EcsResult<()> {
        self.manager.destroy_entity(self.id)
    }
}

impl fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityMut").field(&self.id).finish()
    }
}
