//! Components of the gameplay scenes

use furrow_core::define_component;
use furrow_render::{Color, Sprite};
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    /// Degrees.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

define_component!(Transform, "Transform", {
    position: Vec2,
    rotation: Float,
    scale: Vec2,
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteRenderer {
    pub sprite: Sprite,
    pub z_index: i32,
    pub tint: Color,
}

impl SpriteRenderer {
    pub fn new(sprite: Sprite, z_index: i32) -> Self {
        Self {
            sprite,
            z_index,
            tint: Color::WHITE,
        }
    }
}

define_component!(SpriteRenderer, "SpriteRenderer", { z_index: Int, tint: Color });

/// Map coordinates of a tile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

define_component!(GridPosition, "GridPosition", { x: Int, y: Int });

#[cfg(test)]
mod tests {
    use super::*;
    use furrow_core::ecs::{FieldValue, Registry};
    use furrow_render::{Rect, Texture, TextureHandle};

    #[test]
    fn inspector_lists_tile_fields() {
        let mut registry = Registry::new();
        let tile = registry.create_entity();
        registry
            .add_component(tile, Transform::at(Vec2::new(5.0, 29.0)))
            .unwrap();
        registry.add_component(tile, GridPosition { x: 0, y: 1 }).unwrap();
        let texture = Texture::new(TextureHandle(3), 120, 120);
        registry
            .add_component(
                tile,
                SpriteRenderer::new(Sprite::new(texture, Rect::new(0.0, 24.0, 24.0, 24.0)), 0),
            )
            .unwrap();

        let views = registry.components(tile);
        assert_eq!(views.len(), 3);
        let grid = views.iter().find(|v| v.name == "GridPosition").unwrap();
        assert_eq!(grid.field("y"), Some(&FieldValue::Int(1)));
        let transform = views.iter().find(|v| v.name == "Transform").unwrap();
        assert_eq!(
            transform.field("position"),
            Some(&FieldValue::Vec2(Vec2::new(5.0, 29.0)))
        );
        let renderer = views.iter().find(|v| v.name == "SpriteRenderer").unwrap();
        assert_eq!(renderer.field("tint"), Some(&FieldValue::Color([1.0; 4])));
    }
}
