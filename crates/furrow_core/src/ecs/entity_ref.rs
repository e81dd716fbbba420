//! Borrowed entity views
//!
//! An entity never owns a pointer to its registry. These wrappers pair an
//! id with a borrow for the duration of a call chain.

use crate::ecs::{Component, ComponentView, Entity, Registry, RegistryError};

/// Shared view of one live entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'r> {
    registry: &'r Registry,
    entity: Entity,
}

impl<'r> EntityRef<'r> {
    pub(crate) fn new(registry: &'r Registry, entity: Entity) -> Self {
        Self { registry, entity }
    }

    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn get<T: Component>(&self) -> Option<&'r T> {
        self.registry.get_component::<T>(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.entity)
    }

    pub fn name(&self) -> Option<&'r str> {
        self.registry.name(self.entity)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.registry.has_tag(self.entity, tag)
    }

    pub fn parent(&self) -> Option<Entity> {
        self.registry.parent(self.entity)
    }

    pub fn children(&self) -> Vec<Entity> {
        self.registry.children(self.entity)
    }

    pub fn is_enabled(&self) -> bool {
        self.registry.is_enabled(self.entity)
    }

    pub fn components(&self) -> Vec<ComponentView> {
        self.registry.components(self.entity)
    }
}

/// Exclusive view of one live entity.
pub struct EntityMut<'r> {
    registry: &'r mut Registry,
    entity: Entity,
}

impl<'r> EntityMut<'r> {
    pub(crate) fn new(registry: &'r mut Registry, entity: Entity) -> Self {
        Self { registry, entity }
    }

    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn registry(&mut self) -> &mut Registry {
        self.registry
    }

    pub fn add<T: Component>(&mut self, component: T) -> Result<&mut T, RegistryError> {
        self.registry.add_component(self.entity, component)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.registry.get_component::<T>(self.entity)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.registry.get_component_mut::<T>(self.entity)
    }

    pub fn remove<T: Component>(&mut self) -> Option<T> {
        self.registry.remove_component::<T>(self.entity)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), RegistryError> {
        self.registry.set_name(self.entity, name)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> Result<(), RegistryError> {
        self.registry.add_tag(self.entity, tag)
    }

    pub fn set_parent(&mut self, parent: Entity) -> Result<(), RegistryError> {
        self.registry.set_parent(self.entity, parent)
    }

    pub fn create_child(&mut self) -> Result<Entity, RegistryError> {
        self.registry.create_child(self.entity)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), RegistryError> {
        self.registry.set_enabled(self.entity, enabled)
    }

    /// Queue this entity for destruction.
    pub fn kill(self) -> bool {
        self.registry.kill_entity(self.entity)
    }
}
