//! Named component constructors fed from key/value tables
//!
//! Loaders hand the ECS a component name plus a `toml::Table` of fields; the
//! registered factory builds the typed value and queues it on an entity
//! through [`EcsManager::add_component`]. Nothing here reads files.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use super::component::Component;
use super::entity::EntityId;
use super::error::{EcsError, EcsResult};
use super::manager::EcsManager;

type FactoryFn = Box<dyn Fn(&mut EcsManager, EntityId, &toml::Table) -> EcsResult<()>>;

/// Registry of component factories keyed by name
#[derive(Default)]
pub struct ComponentFactories {
    factories: HashMap<String, FactoryFn>,
}

impl ComponentFactories {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `build` under `name`, replacing any previous factory
    pub fn register<T, F>(&mut self, name: impl Into<String>, build: F)
    where
        T: Component,
        F: Fn(&toml::Table) -> Result<T, String> + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let factory: FactoryFn = Box::new(move |manager, entity, table| {
            let component = build(table).map_err(|reason| EcsError::Factory {
                component: label.clone(),
                reason,
            })?;
            manager.add_component(entity, component)
        });
        if self.factories.insert(name.clone(), factory).is_some() {
            log::warn!("Replaced component factory `{name}`");
        }
    }

    /// Register a factory that deserializes `T` straight from the table
    pub fn register_deserialize<T>(&mut self, name: impl Into<String>)
    where
        T: Component + DeserializeOwned,
    {
        self.register::<T, _>(name, |table| {
            toml::Value::Table(table.clone())
                .try_into::<T>()
                .map_err(|e| e.to_string())
        });
    }

    /// Build the component `name` from `table` and queue it on `entity`
    pub fn apply(
        &self,
        manager: &mut EcsManager,
        entity: EntityId,
        name: &str,
        table: &toml::Table,
    ) -> EcsResult<()> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EcsError::UnknownFactory(name.to_string()))?;
        factory(manager, entity, table)
    }

    /// Apply every `name = { fields }` entry of `components` to `entity`.
    ///
    /// Stops at the first failure; components queued before it stay queued.
    pub fn apply_all(
        &self,
        manager: &mut EcsManager,
        entity: EntityId,
        components: &toml::Table,
    ) -> EcsResult<usize> {
        let empty = toml::Table::new();
        for (name, fields) in components {
            let table = match fields {
                toml::Value::Table(table) => table,
                // `Marker = {}` and bare `Marker = true` both mean "no fields"
                _ => &empty,
            };
            self.apply(manager, entity, name, table)?;
        }
        Ok(components.len())
    }

    /// Whether a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
