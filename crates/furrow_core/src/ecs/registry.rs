// registry.rs - Entity, component and relationship indices
//
// The registry is the only owner of entity state. Every index is kept in
// pairs (name <-> entity, tag <-> entity, parent <-> children) and the
// per-entity signature mirrors which sparse storages hold the entity.

use crate::ecs::storage::{AnyStorage, SparseStorage};
use crate::ecs::system::SystemRegistry;
use crate::ecs::{
    Component, ComponentId, ComponentKey, ComponentMeta, ComponentView, Entity, EntityId,
    EntityMut, EntityRef, InvariantViolation, RegistryError, Signature, SystemDescriptor,
    SystemHandle, SystemRegistrationError, MAX_COMPONENTS,
};
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, error, trace};

/// Deferred entity initialisation, run once the entity id exists.
pub trait Prefab {
    fn init(self, entity: EntityMut<'_>) -> Result<(), RegistryError>;
}

impl<F> Prefab for F
where
    F: FnOnce(EntityMut<'_>) -> Result<(), RegistryError>,
{
    fn init(self, entity: EntityMut<'_>) -> Result<(), RegistryError> {
        self(entity)
    }
}

#[derive(Debug, Clone, Copy)]
struct EntityState {
    signature: Signature,
    enabled: bool,
}

pub struct Registry {
    next_id: EntityId,
    free_ids: Vec<EntityId>,
    entities: BTreeMap<EntityId, EntityState>,
    component_ids: HashMap<TypeId, ComponentId>,
    metas: Vec<ComponentMeta>,
    storages: Vec<Box<dyn AnyStorage>>,
    names: HashMap<EntityId, String>,
    name_index: HashMap<String, EntityId>,
    tags: HashMap<EntityId, BTreeSet<String>>,
    tag_index: HashMap<String, BTreeSet<EntityId>>,
    parents: HashMap<EntityId, EntityId>,
    children: HashMap<EntityId, Vec<EntityId>>,
    pending_kills: Vec<EntityId>,
    systems: SystemRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            free_ids: Vec::new(),
            entities: BTreeMap::new(),
            component_ids: HashMap::new(),
            metas: Vec::new(),
            storages: Vec::new(),
            names: HashMap::new(),
            name_index: HashMap::new(),
            tags: HashMap::new(),
            tag_index: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            pending_kills: Vec::new(),
            systems: SystemRegistry::default(),
        }
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    /// Create an entity, reusing the most recently released id if any.
    pub fn create_entity(&mut self) -> Entity {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        self.entities.insert(
            id,
            EntityState {
                signature: Signature::empty(),
                enabled: true,
            },
        );
        trace!(entity = id, "entity created");
        Entity::new(id)
    }

    /// Create an entity and run `prefab` on it.
    ///
    /// If the prefab fails the entity is destroyed immediately and its id
    /// released.
    pub fn create_entity_with<P: Prefab>(&mut self, prefab: P) -> Result<Entity, RegistryError> {
        let entity = self.create_entity();
        match prefab.init(EntityMut::new(self, entity)) {
            Ok(()) => Ok(entity),
            Err(err) => {
                self.destroy_now(entity.id());
                Err(err)
            }
        }
    }

    /// Create an entity already parented to `parent`.
    pub fn create_child(&mut self, parent: Entity) -> Result<Entity, RegistryError> {
        self.ensure_alive(parent)?;
        let child = self.create_entity();
        self.set_parent(child, parent)?;
        Ok(child)
    }

    /// Queue `entity` for destruction at the next [`flush_kills`](Self::flush_kills).
    ///
    /// The entity stays readable until then but no longer shows up in
    /// system queries.
    pub fn kill_entity(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        if !self.pending_kills.contains(&entity.id()) {
            self.pending_kills.push(entity.id());
        }
        true
    }

    pub fn is_pending_kill(&self, entity: Entity) -> bool {
        self.pending_kills.contains(&entity.id())
    }

    /// Destroy every queued entity. Returns how many were destroyed.
    pub fn flush_kills(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_kills);
        let mut destroyed = 0;
        for id in pending {
            if self.entities.contains_key(&id) {
                self.destroy_now(id);
                destroyed += 1;
            }
        }
        if destroyed > 0 {
            debug!(destroyed, "flushed entity kills");
        }
        destroyed
    }

    fn destroy_now(&mut self, id: EntityId) {
        for storage in &mut self.storages {
            storage.remove_entity(id);
        }

        if let Some(name) = self.names.remove(&id) {
            self.name_index.remove(&name);
        }
        if let Some(tags) = self.tags.remove(&id) {
            for tag in tags {
                self.unindex_tag(&tag, id);
            }
        }

        self.detach_from_parent(id);
        if let Some(children) = self.children.remove(&id) {
            for child in children {
                self.parents.remove(&child);
            }
        }

        self.entities.remove(&id);
        self.pending_kills.retain(|pending| *pending != id);
        self.free_ids.push(id);
        trace!(entity = id, "entity destroyed");
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity.id())
    }

    /// Look up a live entity by raw id.
    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        self.entities.contains_key(&id).then(|| Entity::new(id))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All live entities in id order.
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.keys().map(|id| Entity::new(*id)).collect()
    }

    pub fn entity(&self, entity: Entity) -> Option<EntityRef<'_>> {
        self.is_alive(entity).then(|| EntityRef::new(self, entity))
    }

    pub fn entity_mut(&mut self, entity: Entity) -> Option<EntityMut<'_>> {
        if self.is_alive(entity) {
            Some(EntityMut::new(self, entity))
        } else {
            None
        }
    }

    /// Drop every entity, component type, index and system.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), RegistryError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(RegistryError::NoSuchEntity(entity.id()))
        }
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    /// Assign a unique name. A name held by another entity is rejected.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> Result<(), RegistryError> {
        self.ensure_alive(entity)?;
        let name = name.into();

        if let Some(&holder) = self.name_index.get(&name) {
            if holder == entity.id() {
                return Ok(());
            }
            return Err(RegistryError::NameTaken { name, holder });
        }

        if let Some(previous) = self.names.insert(entity.id(), name.clone()) {
            self.name_index.remove(&previous);
        }
        self.name_index.insert(name, entity.id());
        Ok(())
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.names.get(&entity.id()).map(String::as_str)
    }

    pub fn has_name(&self, entity: Entity) -> bool {
        self.names.contains_key(&entity.id())
    }

    pub fn remove_name(&mut self, entity: Entity) -> Option<String> {
        let name = self.names.remove(&entity.id())?;
        self.name_index.remove(&name);
        Some(name)
    }

    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.name_index.get(name).map(|id| Entity::new(*id))
    }

    /// The entity's name, or its id when unnamed.
    pub fn name_or_identifier(&self, entity: Entity) -> String {
        match self.name(entity) {
            Some(name) => name.to_string(),
            None => entity.id().to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub fn add_tag(&mut self, entity: Entity, tag: impl Into<String>) -> Result<(), RegistryError> {
        self.ensure_alive(entity)?;
        let tag = tag.into();
        self.tag_index
            .entry(tag.clone())
            .or_default()
            .insert(entity.id());
        self.tags.entry(entity.id()).or_default().insert(tag);
        Ok(())
    }

    pub fn remove_tag(&mut self, entity: Entity, tag: &str) -> bool {
        let removed = match self.tags.get_mut(&entity.id()) {
            Some(tags) => {
                let removed = tags.remove(tag);
                if tags.is_empty() {
                    self.tags.remove(&entity.id());
                }
                removed
            }
            None => false,
        };
        if removed {
            self.unindex_tag(tag, entity.id());
        }
        removed
    }

    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.tags
            .get(&entity.id())
            .is_some_and(|tags| tags.contains(tag))
    }

    /// Tags of `entity` in lexical order.
    pub fn tags(&self, entity: Entity) -> Vec<&str> {
        self.tags
            .get(&entity.id())
            .map(|tags| tags.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn remove_all_tags(&mut self, entity: Entity) -> usize {
        let Some(tags) = self.tags.remove(&entity.id()) else {
            return 0;
        };
        for tag in &tags {
            self.unindex_tag(tag, entity.id());
        }
        tags.len()
    }

    pub fn entities_with_tag(&self, tag: &str) -> Vec<Entity> {
        self.tag_index
            .get(tag)
            .map(|ids| ids.iter().map(|id| Entity::new(*id)).collect())
            .unwrap_or_default()
    }

    fn unindex_tag(&mut self, tag: &str, id: EntityId) {
        if let Some(ids) = self.tag_index.get_mut(tag) {
            ids.remove(&id);
            if ids.is_empty() {
                self.tag_index.remove(tag);
            }
        }
    }

    // ------------------------------------------------------------------
    // Parent / child
    // ------------------------------------------------------------------

    /// Link `child` under `parent`, moving it from any previous parent.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), RegistryError> {
        self.ensure_alive(child)?;
        self.ensure_alive(parent)?;

        if child == parent || self.is_ancestor(child.id(), parent.id()) {
            return Err(RegistryError::ParentCycle {
                child: child.id(),
                parent: parent.id(),
            });
        }
        if self.parents.get(&child.id()) == Some(&parent.id()) {
            return Ok(());
        }

        self.detach_from_parent(child.id());
        self.parents.insert(child.id(), parent.id());
        self.children.entry(parent.id()).or_default().push(child.id());
        Ok(())
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.parents.get(&entity.id()).map(|id| Entity::new(*id))
    }

    pub fn has_parent(&self, entity: Entity) -> bool {
        self.parents.contains_key(&entity.id())
    }

    pub fn remove_parent(&mut self, entity: Entity) -> Option<Entity> {
        self.detach_from_parent(entity.id()).map(Entity::new)
    }

    /// Children of `entity` in the order they were attached.
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.children
            .get(&entity.id())
            .map(|ids| ids.iter().map(|id| Entity::new(*id)).collect())
            .unwrap_or_default()
    }

    /// Live entities without a parent, in id order.
    pub fn entities_at_root(&self) -> Vec<Entity> {
        self.entities
            .keys()
            .filter(|id| !self.parents.contains_key(id))
            .map(|id| Entity::new(*id))
            .collect()
    }

    fn detach_from_parent(&mut self, child: EntityId) -> Option<EntityId> {
        let parent = self.parents.remove(&child)?;
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|id| *id != child);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
        Some(parent)
    }

    fn is_ancestor(&self, ancestor: EntityId, mut node: EntityId) -> bool {
        // bounded so a corrupted chain cannot spin forever
        for _ in 0..=self.entities.len() {
            match self.parents.get(&node) {
                Some(&parent) if parent == ancestor => return true,
                Some(&parent) => node = parent,
                None => return false,
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach `component`, replacing any previous value of the same type.
    /// The first add of a type assigns it the next component id.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<&mut T, RegistryError> {
        self.ensure_alive(entity)?;
        let id = self.component_id_or_register::<T>()?;

        let storage = self
            .storages
            .get_mut(id as usize)
            .and_then(|storage| storage.as_any_mut().downcast_mut::<SparseStorage<T>>())
            .ok_or(RegistryError::StorageMismatch { name: T::NAME })?;
        if let Some(state) = self.entities.get_mut(&entity.id()) {
            state.signature.set(id);
        }
        Ok(storage.insert(entity.id(), component))
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity.id())
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity.id())
    }

    /// Detach and return the component, clearing its signature bit.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = self.component_id::<T>()?;
        if let Some(state) = self.entities.get_mut(&entity.id()) {
            state.signature.clear(id);
        }
        self.storage_mut::<T>()?.take(entity.id())
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match (self.component_id::<T>(), self.entities.get(&entity.id())) {
            (Some(id), Some(state)) => state.signature.test(id),
            _ => false,
        }
    }

    /// Inspector views of every component on `entity`, in component-id order.
    pub fn components(&self, entity: Entity) -> Vec<ComponentView> {
        let Some(state) = self.entities.get(&entity.id()) else {
            return Vec::new();
        };
        state
            .signature
            .ids()
            .filter_map(|id| self.storages.get(id as usize)?.view(entity.id(), id))
            .collect()
    }

    pub fn number_of_components(&self, entity: Entity) -> usize {
        self.entities
            .get(&entity.id())
            .map_or(0, |state| state.signature.count())
    }

    pub fn signature(&self, entity: Entity) -> Option<Signature> {
        self.entities.get(&entity.id()).map(|state| state.signature)
    }

    /// Registry-local id of `T`, if it has been added at least once.
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.component_ids.get(&TypeId::of::<T>()).copied()
    }

    /// Component types in registration order.
    pub fn component_types(&self) -> &[ComponentMeta] {
        &self.metas
    }

    fn component_id_or_register<T: Component>(&mut self) -> Result<ComponentId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(id) = self.component_ids.get(&type_id) {
            return Ok(*id);
        }
        if self.metas.len() >= MAX_COMPONENTS {
            return Err(RegistryError::TooManyComponentTypes {
                name: T::NAME,
                max: MAX_COMPONENTS,
            });
        }

        let id = self.metas.len() as ComponentId;
        self.component_ids.insert(type_id, id);
        self.metas.push(ComponentMeta {
            id,
            name: T::NAME,
            type_id,
        });
        self.storages.push(Box::new(SparseStorage::<T>::new()));
        debug!(component = T::NAME, id, "component type registered");
        Ok(id)
    }

    fn storage<T: Component>(&self) -> Option<&SparseStorage<T>> {
        let id = self.component_id::<T>()?;
        self.storages
            .get(id as usize)?
            .as_any()
            .downcast_ref::<SparseStorage<T>>()
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut SparseStorage<T>> {
        let id = self.component_id::<T>()?;
        self.storages
            .get_mut(id as usize)?
            .as_any_mut()
            .downcast_mut::<SparseStorage<T>>()
    }

    // ------------------------------------------------------------------
    // Enabled flag
    // ------------------------------------------------------------------

    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> Result<(), RegistryError> {
        let state = self
            .entities
            .get_mut(&entity.id())
            .ok_or(RegistryError::NoSuchEntity(entity.id()))?;
        state.enabled = enabled;
        Ok(())
    }

    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.entities
            .get(&entity.id())
            .is_some_and(|state| state.enabled)
    }

    // ------------------------------------------------------------------
    // Queries and systems
    // ------------------------------------------------------------------

    /// Snapshot of enabled entities whose signature is a superset of
    /// `required`. Entities queued for killing are skipped.
    pub fn query(&self, required: &Signature) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|(id, state)| {
                state.enabled
                    && state.signature.contains(required)
                    && !self.pending_kills.contains(id)
            })
            .map(|(id, _)| Entity::new(*id))
            .collect()
    }

    /// Enabled entities carrying `T`.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        match self.signature_for(&[ComponentKey::of::<T>()]) {
            Some(signature) => self.query(&signature),
            None => Vec::new(),
        }
    }

    /// Resolve component keys to a signature. `None` when a type was never
    /// added, in which case nothing can match.
    pub fn signature_for(&self, keys: &[ComponentKey]) -> Option<Signature> {
        let mut signature = Signature::empty();
        for key in keys {
            signature.set(*self.component_ids.get(&key.type_id)?);
        }
        Some(signature)
    }

    pub fn register_system(
        &mut self,
        descriptor: SystemDescriptor,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let handle = self.systems.register(descriptor)?;
        debug!(system = %handle, "system registered");
        Ok(handle)
    }

    pub fn system(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems.descriptor(handle)
    }

    pub fn system_by_name(&self, name: &str) -> Option<SystemHandle> {
        self.systems.handle_of(name)
    }

    pub fn systems(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor)> {
        self.systems.iter()
    }

    /// Entities the system should visit this frame.
    pub fn system_entities(&self, handle: SystemHandle) -> Vec<Entity> {
        self.systems
            .descriptor(handle)
            .and_then(|descriptor| self.signature_for(&descriptor.all_components()))
            .map(|signature| self.query(&signature))
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Invariant checks
    // ------------------------------------------------------------------

    /// Check every paired index and signature against storage.
    pub fn audit(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for (&entity, state) in &self.entities {
            for (index, storage) in self.storages.iter().enumerate() {
                let component = index as ComponentId;
                let bit_set = state.signature.test(component);
                if bit_set != storage.contains(entity) {
                    violations.push(InvariantViolation::SignatureMismatch {
                        entity,
                        component,
                        bit_set,
                    });
                }
            }
            for component in state.signature.ids() {
                if component as usize >= self.storages.len() {
                    violations.push(InvariantViolation::SignatureMismatch {
                        entity,
                        component,
                        bit_set: true,
                    });
                }
            }
        }

        for (index, storage) in self.storages.iter().enumerate() {
            for entity in storage.entity_ids() {
                if !self.entities.contains_key(&entity) {
                    violations.push(InvariantViolation::ComponentOnDeadEntity {
                        entity,
                        component: index as ComponentId,
                    });
                }
            }
        }

        for (&child, &parent) in &self.parents {
            let listed = self
                .children
                .get(&parent)
                .is_some_and(|children| children.contains(&child));
            if !listed || !self.entities.contains_key(&parent) {
                violations.push(InvariantViolation::OrphanParentLink { child, parent });
            }
        }
        for (&parent, children) in &self.children {
            for &child in children {
                if self.parents.get(&child) != Some(&parent) {
                    violations.push(InvariantViolation::OrphanChildLink { child, parent });
                }
            }
        }

        for (&entity, tags) in &self.tags {
            for tag in tags {
                let indexed = self
                    .tag_index
                    .get(tag)
                    .is_some_and(|ids| ids.contains(&entity));
                if !indexed || !self.entities.contains_key(&entity) {
                    violations.push(InvariantViolation::TagMismatch {
                        entity,
                        tag: tag.clone(),
                    });
                }
            }
        }
        for (tag, ids) in &self.tag_index {
            for &entity in ids {
                if !self.tags.get(&entity).is_some_and(|tags| tags.contains(tag)) {
                    violations.push(InvariantViolation::TagMismatch {
                        entity,
                        tag: tag.clone(),
                    });
                }
            }
        }

        for (&entity, name) in &self.names {
            if self.name_index.get(name) != Some(&entity) || !self.entities.contains_key(&entity) {
                violations.push(InvariantViolation::NameMismatch {
                    entity,
                    name: name.clone(),
                });
            }
        }
        for (name, &entity) in &self.name_index {
            if self.names.get(&entity) != Some(name) {
                violations.push(InvariantViolation::NameMismatch {
                    entity,
                    name: name.clone(),
                });
            }
        }

        violations
    }

    /// Log and fix every violation [`audit`](Self::audit) reports.
    ///
    /// Storage is trusted over signatures and the child's parent pointer
    /// over the parent's child list. Links touching dead entities are
    /// dropped.
    pub fn repair(&mut self) -> Vec<InvariantViolation> {
        let violations = self.audit();
        for violation in &violations {
            error!(%violation, "registry invariant violated, repairing");
            match violation {
                InvariantViolation::SignatureMismatch {
                    entity, component, ..
                } => {
                    let present = self
                        .storages
                        .get(*component as usize)
                        .is_some_and(|storage| storage.contains(*entity));
                    if let Some(state) = self.entities.get_mut(entity) {
                        if present {
                            state.signature.set(*component);
                        } else {
                            state.signature.clear(*component);
                        }
                    }
                }
                InvariantViolation::ComponentOnDeadEntity { entity, component } => {
                    if let Some(storage) = self.storages.get_mut(*component as usize) {
                        storage.remove_entity(*entity);
                    }
                }
                InvariantViolation::OrphanParentLink { child, parent } => {
                    let both_alive =
                        self.entities.contains_key(child) && self.entities.contains_key(parent);
                    if both_alive {
                        let siblings = self.children.entry(*parent).or_default();
                        if !siblings.contains(child) {
                            siblings.push(*child);
                        }
                    } else {
                        self.parents.remove(child);
                    }
                }
                InvariantViolation::OrphanChildLink { child, parent } => {
                    if let Some(siblings) = self.children.get_mut(parent) {
                        siblings.retain(|id| id != child);
                        if siblings.is_empty() {
                            self.children.remove(parent);
                        }
                    }
                }
                InvariantViolation::TagMismatch { entity, tag } => {
                    let keep = self.entities.contains_key(entity)
                        && self.tags.get(entity).is_some_and(|tags| tags.contains(tag));
                    if keep {
                        self.tag_index.entry(tag.clone()).or_default().insert(*entity);
                    } else {
                        if let Some(tags) = self.tags.get_mut(entity) {
                            tags.remove(tag);
                            if tags.is_empty() {
                                self.tags.remove(entity);
                            }
                        }
                        self.unindex_tag(tag, *entity);
                    }
                }
                InvariantViolation::NameMismatch { entity, name } => {
                    let keep = self.entities.contains_key(entity)
                        && self.names.get(entity) == Some(name)
                        && !self.name_index.get(name).is_some_and(|holder| holder != entity);
                    if keep {
                        self.name_index.insert(name.clone(), *entity);
                    } else {
                        if self.names.get(entity) == Some(name) {
                            self.names.remove(entity);
                        }
                        if self.name_index.get(name) == Some(entity) {
                            self.name_index.remove(name);
                        }
                    }
                }
            }
        }
        violations
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
