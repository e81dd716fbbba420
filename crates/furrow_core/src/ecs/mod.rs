//! Entity Component System.
//!
//! A [`Registry`] owns entity ids, sparse per-type component storage and
//! the name, tag and parent/child indices. Systems are declared with a
//! [`SystemDescriptor`] and receive a snapshot of matching entities, so
//! kills and component changes made while visiting them never invalidate
//! the traversal.

mod component;
mod entity;
mod entity_ref;
mod error;
mod registry;
mod signature;
mod storage;
mod system;

pub use component::{
    Component, ComponentId, ComponentMeta, ComponentView, FieldDescriptor, FieldKind, FieldValue,
};
pub use entity::{Entity, EntityId};
pub use entity_ref::{EntityMut, EntityRef};
pub use error::{InvariantViolation, RegistryError};
pub use registry::{Prefab, Registry};
pub use signature::{Signature, MAX_COMPONENTS};
pub use system::{ComponentKey, SystemDescriptor, SystemHandle, SystemRegistrationError};
