//! System declarations
//!
//! A system names the components it reads and writes. The registry turns
//! that set into a signature whenever the system asks for its entities, so
//! component types first seen after registration are still matched.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

use crate::ecs::Component;

/// A component type named by a system before the registry has given it an
/// id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
}

impl ComponentKey {
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    reads: BTreeSet<ComponentKey>,
    writes: BTreeSet<ComponentKey>,
}

impl SystemDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reads: BTreeSet::new(),
            writes: BTreeSet::new(),
        }
    }

    pub fn reads<T: Component>(mut self) -> Self {
        self.reads.insert(ComponentKey::of::<T>());
        self
    }

    pub fn writes<T: Component>(mut self) -> Self {
        self.writes.insert(ComponentKey::of::<T>());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_components(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.reads.iter().copied()
    }

    pub fn write_components(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.writes.iter().copied()
    }

    /// Every component the system touches; an entity must carry all of
    /// them to be visited.
    pub fn all_components(&self) -> Vec<ComponentKey> {
        self.reads.union(&self.writes).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }
}

/// Index of a registered system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{name}' does not access any components")]
    EmptyAccess { name: String },
}

#[derive(Default)]
pub(crate) struct SystemRegistry {
    descriptors: Vec<SystemDescriptor>,
    by_name: HashMap<String, SystemHandle>,
}

impl SystemRegistry {
    pub fn register(
        &mut self,
        descriptor: SystemDescriptor,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let name = descriptor.name().to_string();
        if descriptor.is_empty() {
            return Err(SystemRegistrationError::EmptyAccess { name });
        }
        if self.by_name.contains_key(&name) {
            return Err(SystemRegistrationError::DuplicateName { name });
        }
        let handle = SystemHandle(self.descriptors.len() as u32);
        self.by_name.insert(name, handle);
        self.descriptors.push(descriptor);
        Ok(handle)
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.descriptors.get(handle.0 as usize)
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (SystemHandle(index as u32), descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    struct Position;
    define_component!(Position, "Position");
    struct Velocity;
    define_component!(Velocity, "Velocity");

    #[test]
    fn reads_and_writes_merge_into_one_set() {
        let movement = SystemDescriptor::new("movement")
            .reads::<Velocity>()
            .writes::<Position>()
            .reads::<Velocity>();
        assert_eq!(movement.read_components().count(), 1);
        assert_eq!(movement.write_components().count(), 1);

        let names: BTreeSet<_> = movement.all_components().iter().map(|k| k.name()).collect();
        assert_eq!(names, BTreeSet::from(["Position", "Velocity"]));

        let both = SystemDescriptor::new("both").reads::<Position>().writes::<Position>();
        assert_eq!(both.all_components().len(), 1);
    }

    #[test]
    fn handles_follow_registration_order() {
        let mut systems = SystemRegistry::default();
        let first = systems
            .register(SystemDescriptor::new("a").reads::<Position>())
            .unwrap();
        let second = systems
            .register(SystemDescriptor::new("b").writes::<Velocity>())
            .unwrap();
        assert_eq!((first.index(), second.index()), (0, 1));
        assert_eq!(second.to_string(), "system#1");
        assert_eq!(systems.handle_of("b"), Some(second));
        assert_eq!(systems.descriptor(first).map(|d| d.name()), Some("a"));
        assert_eq!(systems.iter().count(), 2);
    }
}
