//! Entity identity
//!
//! An entity is only an id. State lives in components owned by the
//! [`Registry`](crate::ecs::Registry); ids of killed entities go back on a
//! free list and are handed out again.

use std::fmt;

pub type EntityId = u32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: EntityId,
}

impl Entity {
    pub(crate) const fn new(id: EntityId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id)
    }
}
