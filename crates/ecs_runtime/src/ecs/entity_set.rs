//! Dense, insertion-ordered set of entity ids
//!
//! Every component pool keeps one of these next to its component vector so
//! slot `i` of the storage always belongs to `list()[i]`. Removal is an
//! ordered vector erase followed by reindexing the tail, so iteration order
//! stays the order in which entities were inserted.

use std::collections::HashMap;

use super::entity::EntityId;

/// Ordered list of entity ids with O(1) average lookup of each id's slot
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    list: Vec<EntityId>,
    indices: HashMap<EntityId, usize>,
}

impl EntitySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `capacity` ids
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
            indices: HashMap::with_capacity(capacity),
        }
    }

    /// Append `id` if absent. Returns whether it was newly inserted.
    pub fn emplace(&mut self, id: EntityId) -> bool {
        if self.indices.contains_key(&id) {
            return false;
        }
        self.indices.insert(id, self.list.len());
        self.list.push(id);
        true
    }

    /// Remove `id`, shifting every later id down one slot.
    /// Returns whether removal occurred.
    pub fn erase(&mut self, id: EntityId) -> bool {
        let Some(index) = self.indices.remove(&id) else {
            return false;
        };
        self.list.remove(index);
        for (slot, shifted) in self.list.iter().enumerate().skip(index) {
            self.indices.insert(*shifted, slot);
        }
        true
    }

    /// Slot of `id`, or `None` if it is not in the set
    pub fn find(&self, id: EntityId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    /// Whether `id` is in the set
    pub fn contains(&self, id: EntityId) -> bool {
        self.indices.contains_key(&id)
    }

    /// Id stored at `index`
    pub fn get(&self, index: usize) -> Option<EntityId> {
        self.list.get(index).copied()
    }

    /// All ids in slot order
    pub fn list(&self) -> &[EntityId] {
        &self.list
    }

    /// Number of ids in the set
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Remove every id
    pub fn clear(&mut self) {
        self.list.clear();
        self.indices.clear();
    }

    /// Iterate ids in slot order
    pub fn iter(&self) -> std::slice::Iter<'_, EntityId> {
        self.list.iter()
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a EntityId;
    type IntoIter = std::slice::Iter<'a, EntityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}
