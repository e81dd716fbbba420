use crate::ecs::{ComponentId, EntityId};
use thiserror::Error;

/// Errors returned by registry mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity {0} does not exist")]
    NoSuchEntity(EntityId),

    #[error("name '{name}' is already held by entity {holder}")]
    NameTaken { name: String, holder: EntityId },

    #[error("entity {child} cannot become a child of {parent}: the link would form a cycle")]
    ParentCycle { child: EntityId, parent: EntityId },

    #[error("cannot register component '{name}': the registry already indexes {max} component types")]
    TooManyComponentTypes { name: &'static str, max: usize },

    #[error("component storage for '{name}' holds a different type")]
    StorageMismatch { name: &'static str },

    #[error("prefab failed to initialise entity {entity}: {reason}")]
    Prefab { entity: EntityId, reason: String },
}

/// Broken registry invariant found by [`Registry::audit`](crate::ecs::Registry::audit).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("entity {entity}: signature bit {component} is {bit_set} but storage disagrees")]
    SignatureMismatch {
        entity: EntityId,
        component: ComponentId,
        bit_set: bool,
    },

    #[error("component storage {component} holds dead entity {entity}")]
    ComponentOnDeadEntity {
        entity: EntityId,
        component: ComponentId,
    },

    #[error("entity {child} points at parent {parent} which does not list it")]
    OrphanParentLink { child: EntityId, parent: EntityId },

    #[error("entity {parent} lists child {child} which does not point back")]
    OrphanChildLink { child: EntityId, parent: EntityId },

    #[error("tag '{tag}' index and entity {entity} disagree")]
    TagMismatch { entity: EntityId, tag: String },

    #[error("name '{name}' index and entity {entity} disagree")]
    NameMismatch { entity: EntityId, name: String },
}
