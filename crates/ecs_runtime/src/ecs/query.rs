//! Views over entities holding a set of components
//!
//! A query is a tuple of component types. The first element is the primary
//! type: iteration walks the primary pool's committed entity list and skips
//! entities lacking any of the other types. Only committed state is read, so
//! a view is safe to use inside a system while queued changes are pending.

use std::any::{type_name, TypeId};
use std::marker::PhantomData;

use super::component::{Component, ComponentPool};
use super::entity::{Entity, EntityId};
use super::error::{EcsError, EcsResult};
use super::manager::EcsManager;

/// A tuple of component types usable with [`EcsManager::view`],
/// [`EcsManager::each`], and [`EcsManager::each_mut`]
pub trait Query: 'static {
    /// The type whose pool drives iteration
    type Primary: Component;
    /// Shared references to every component in the tuple
    type Item<'a>;
    /// Mutable references to every component in the tuple
    type ItemMut<'a>;

    /// Gather the remaining components of `entity`, or `None` if any is missing
    fn fetch<'a>(
        manager: &'a EcsManager,
        entity: EntityId,
        primary: &'a Self::Primary,
    ) -> Option<Self::Item<'a>>;

    /// Call `f` with mutable access to every matching entity's components.
    ///
    /// Fails if the tuple names one component type twice.
    fn for_each_mut<'m, Func>(manager: &'m mut EcsManager, f: Func) -> EcsResult<()>
    where
        Func: FnMut(EntityId, Self::ItemMut<'m>);
}

macro_rules! impl_query {
    ($first:ident $(, $rest:ident)*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<$first: Component, $($rest: Component),*> Query for ($first, $($rest,)*) {
            type Primary = $first;
            type Item<'a> = (&'a $first, $(&'a $rest,)*);
            type ItemMut<'a> = (&'a mut $first, $(&'a mut $rest,)*);

            fn fetch<'a>(
                manager: &'a EcsManager,
                entity: EntityId,
                primary: &'a $first,
            ) -> Option<Self::Item<'a>> {
                Some((primary, $(manager.find_component::<$rest>(entity)?,)*))
            }

            fn for_each_mut<'m, Func>(manager: &'m mut EcsManager, mut f: Func) -> EcsResult<()>
            where
                Func: FnMut(EntityId, Self::ItemMut<'m>),
            {
                let ids = [TypeId::of::<$first>(), $(TypeId::of::<$rest>(),)*];
                let names = [type_name::<$first>(), $(type_name::<$rest>(),)*];
                for (i, id) in ids.iter().enumerate() {
                    if ids[..i].contains(id) {
                        return Err(EcsError::DuplicateQueryComponent(names[i]));
                    }
                }

                let [$first, $($rest,)*] = manager.pools.get_disjoint_mut(
                    [&TypeId::of::<$first>(), $(&TypeId::of::<$rest>(),)*],
                );
                let (Some($first), $(Some($rest),)*) = ($first, $($rest,)*) else {
                    return Ok(());
                };
                let Some($first) = $first.as_any_mut().downcast_mut::<ComponentPool<$first>>() else {
                    return Ok(());
                };
                $(
                    let Some($rest) = $rest.as_any_mut().downcast_mut::<ComponentPool<$rest>>() else {
                        return Ok(());
                    };
                    // Slot-indexed loans, each handed out at most once
                    let mut $rest = {
                        let (entities, components) = $rest.split_mut();
                        (entities, components.iter_mut().map(Some).collect::<Vec<_>>())
                    };
                )*

                let (primary_entities, primary_components) = $first.split_mut();
                for (entity, primary) in primary_entities.iter().copied().zip(primary_components.iter_mut()) {
                    $(
                        let Some($rest) = $rest.0.find(entity).and_then(|slot| $rest.1[slot].take()) else {
                            continue;
                        };
                    )*
                    f(entity, (primary, $($rest,)*));
                }
                Ok(())
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);

/// Lazy read-only view over the entities matching `Q`
pub struct View<'a, Q: Query> {
    manager: &'a EcsManager,
    pool: Option<&'a ComponentPool<Q::Primary>>,
    _query: PhantomData<Q>,
}

impl<'a, Q: Query> View<'a, Q> {
    pub(crate) fn new(manager: &'a EcsManager) -> Self {
        Self {
            manager,
            pool: manager.pool::<Q::Primary>(),
            _query: PhantomData,
        }
    }

    /// Start a fresh traversal
    pub fn iter(&self) -> ViewIter<'a, Q> {
        ViewIter {
            manager: self.manager,
            pool: self.pool,
            index: 0,
            _query: PhantomData,
        }
    }

    /// Ids of every matching entity, in primary pool order
    pub fn entities(&self) -> Vec<EntityId> {
        self.iter().map(|(entity, _)| entity.id()).collect()
    }
}

impl<'a, Q: Query> IntoIterator for View<'a, Q> {
    type Item = (Entity<'a>, Q::Item<'a>);
    type IntoIter = ViewIter<'a, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, Q: Query> IntoIterator for &View<'a, Q> {
    type Item = (Entity<'a>, Q::Item<'a>);
    type IntoIter = ViewIter<'a, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward-only iterator produced by a [`View`]
pub struct ViewIter<'a, Q: Query> {
    manager: &'a EcsManager,
    pool: Option<&'a ComponentPool<Q::Primary>>,
    index: usize,
    _query: PhantomData<Q>,
}

impl<'a, Q: Query> Iterator for ViewIter<'a, Q> {
    type Item = (Entity<'a>, Q::Item<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let pool = self.pool?;
        while self.index < pool.len() {
            let index = self.index;
            self.index += 1;
            let entity = pool.entity_at(index)?;
            if let Some(item) = Q::fetch(self.manager, entity, &pool[index]) {
                return Some((Entity::new(entity, self.manager), item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pool.map_or(0, |pool| pool.len().saturating_sub(self.index));
        (0, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    #[derive(Debug, PartialEq)]
    struct Frozen;
    impl Component for Frozen {}

    fn populated() -> (EcsManager, Vec<EntityId>) {
        let mut manager = EcsManager::new();
        let mut ids = Vec::new();
        for i in 0..4 {
            let entity = manager.create_entity().unwrap();
            manager.add_component(entity, Position(i * 10)).unwrap();
            if i % 2 == 0 {
                manager.add_component(entity, Velocity(i + 1)).unwrap();
            }
            ids.push(entity);
        }
        manager.commit_entity_updates().unwrap();
        (manager, ids)
    }

    #[test]
    fn test_view_skips_entities_missing_components() {
        let (manager, ids) = populated();
        let view = manager.view::<(Position, Velocity)>();
        assert_eq!(view.entities(), vec![ids[0], ids[2]]);

        let values: Vec<_> = view.iter().map(|(_, (p, v))| (p.0, v.0)).collect();
        assert_eq!(values, vec![(0, 1), (20, 3)]);
    }

    #[test]
    fn test_view_restarts_cleanly() {
        let (manager, _) = populated();
        let view = manager.view::<(Position,)>();
        let mut first = view.iter();
        first.next();
        first.next();
        assert_eq!(view.iter().count(), 4);
    }

    #[test]
    fn test_view_over_unknown_type_is_empty() {
        let (manager, _) = populated();
        assert_eq!(manager.view::<(Frozen, Position)>().iter().count(), 0);
    }

    #[test]
    fn test_view_ignores_pending_adds() {
        let (mut manager, ids) = populated();
        manager.add_component(ids[1], Velocity(99)).unwrap();
        assert_eq!(manager.view::<(Position, Velocity)>().iter().count(), 2);

        manager.commit_entity_updates().unwrap();
        assert_eq!(manager.view::<(Position, Velocity)>().iter().count(), 3);
    }

    #[test]
    fn test_each_mut_updates_all_components() {
        let (mut manager, ids) = populated();
        manager
            .each_mut::<(Position, Velocity), _>(|_, (p, v)| {
                p.0 += v.0;
                v.0 = 0;
            })
            .unwrap();

        assert_eq!(manager.get_component::<Position>(ids[0]).unwrap(), &Position(1));
        assert_eq!(manager.get_component::<Position>(ids[1]).unwrap(), &Position(10));
        assert_eq!(manager.get_component::<Position>(ids[2]).unwrap(), &Position(23));
        assert_eq!(manager.get_component::<Velocity>(ids[2]).unwrap(), &Velocity(0));
    }

    #[test]
    fn test_each_mut_rejects_repeated_type() {
        let (mut manager, _) = populated();
        let result = manager.each_mut::<(Position, Position), _>(|_, _| {});
        assert!(matches!(result, Err(EcsError::DuplicateQueryComponent(_))));
    }

    #[test]
    fn test_entity_handle_from_view() {
        let (manager, ids) = populated();
        let (entity, _) = manager.view::<(Velocity,)>().iter().next().unwrap();
        assert_eq!(entity.id(), ids[0]);
        assert!(entity.has_component::<Position>());
        assert_eq!(entity.get_component::<Position>().unwrap(), &Position(0));
    }
}
