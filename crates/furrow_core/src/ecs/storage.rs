// storage.rs - Sparse per-type component storage
//
// Each component type gets one map from entity id to value. The registry
// keeps them behind `AnyStorage` so it can strip an entity without knowing
// its component types.

use crate::ecs::{Component, ComponentId, ComponentView, EntityId};
use std::any::Any;
use std::collections::hash_map::{Entry, HashMap};

pub(crate) trait AnyStorage: Send + Sync {
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    fn contains(&self, entity: EntityId) -> bool;
    fn view(&self, entity: EntityId, id: ComponentId) -> Option<ComponentView>;
    fn entity_ids(&self) -> Vec<EntityId>;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct SparseStorage<T: Component> {
    items: HashMap<EntityId, T>,
}

impl<T: Component> SparseStorage<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    pub fn insert(&mut self, entity: EntityId, value: T) -> &mut T {
        match self.items.entry(entity) {
            Entry::Occupied(mut slot) => {
                slot.insert(value);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(value),
        }
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.items.get(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.items.get_mut(&entity)
    }

    pub fn take(&mut self, entity: EntityId) -> Option<T> {
        self.items.remove(&entity)
    }
}

impl<T: Component> AnyStorage for SparseStorage<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.items.remove(&entity).is_some()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.items.contains_key(&entity)
    }

    fn view(&self, entity: EntityId, id: ComponentId) -> Option<ComponentView> {
        self.items.get(&entity).map(|component| component.view(id))
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
