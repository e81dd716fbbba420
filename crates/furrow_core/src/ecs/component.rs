// component.rs - Component trait and inspector descriptors
//
// Component ids are handed out per registry in order of first use, so the
// trait itself only carries a name and an optional field table.

use glam::Vec2;
use std::any::TypeId;

pub type ComponentId = u32;

/// Metadata the registry keeps for each component type it has seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub type_id: TypeId,
}

/// Kind of a field exposed to the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Vec2,
    Text,
    Color,
}

/// A field value read through a [`FieldDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Vec2(Vec2),
    Text(String),
    Color([f32; 4]),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Vec2(_) => FieldKind::Vec2,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Color(_) => FieldKind::Color,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value)
    }
}

impl From<Vec2> for FieldValue {
    fn from(value: Vec2) -> Self {
        FieldValue::Vec2(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<[f32; 4]> for FieldValue {
    fn from(value: [f32; 4]) -> Self {
        FieldValue::Color(value)
    }
}

/// One row of a component's descriptor table: field name, kind, accessor.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub get: fn(&T) -> FieldValue,
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            get: self.get,
        }
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Snapshot of one component on one entity, produced from its descriptor
/// table. Used by debug tooling instead of runtime reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentView {
    pub id: ComponentId,
    pub name: &'static str,
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl ComponentView {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }
}

/// Trait for component types stored in a [`Registry`](crate::ecs::Registry).
pub trait Component: 'static + Sized + Send + Sync {
    /// Human-readable name for debugging.
    const NAME: &'static str;

    /// Inspector table. Components without one show up with no fields.
    fn fields() -> Vec<FieldDescriptor<Self>> {
        Vec::new()
    }

    fn view(&self, id: ComponentId) -> ComponentView {
        ComponentView {
            id,
            name: Self::NAME,
            fields: Self::fields()
                .into_iter()
                .map(|field| (field.name, (field.get)(self)))
                .collect(),
        }
    }
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, "Position");
/// define_component!(Health, "Health", { current: Int, max: Int });
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
    ($ty:ty, $name:expr, { $($field:ident : $kind:ident),* $(,)? }) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;

            fn fields() -> Vec<$crate::ecs::FieldDescriptor<Self>> {
                vec![$(
                    $crate::ecs::FieldDescriptor {
                        name: stringify!($field),
                        kind: $crate::ecs::FieldKind::$kind,
                        get: |component: &$ty| {
                            $crate::ecs::FieldValue::from(component.$field.clone())
                        },
                    }
                ),*]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    #[derive(Clone, Debug)]
    struct Health {
        current: i32,
        label: String,
    }
    define_component!(Health, "Health", { current: Int, label: Text });

    struct Marker;
    define_component!(Marker, "Marker");

    #[test]
    fn descriptor_table_reads_fields() {
        let health = Health {
            current: 12,
            label: "hp".into(),
        };
        let view = health.view(3);
        assert_eq!(view.name, "Health");
        assert_eq!(view.id, 3);
        assert_eq!(view.field("current"), Some(&FieldValue::Int(12)));
        assert_eq!(view.field("label"), Some(&FieldValue::Text("hp".into())));

        for field in Health::fields() {
            assert_eq!((field.get)(&health).kind(), field.kind);
        }
    }

    #[test]
    fn components_without_table_have_no_fields() {
        assert!(Marker::fields().is_empty());
        assert!(Marker.view(0).fields.is_empty());
    }
}
