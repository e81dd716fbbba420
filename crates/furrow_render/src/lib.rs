//! Furrow Render System
//!
//! 2D primitives, a sprite batcher that coalesces a frame's draw requests
//! into as few indexed draws as possible, and a wgpu backend.

pub mod backend;
pub mod batch;
pub mod camera;
pub mod color;
pub mod font;
pub mod gpu;
pub mod sprite;
pub mod texture;
pub mod vertex;
pub mod window;

pub use backend::{BackendError, DrawCall, RecordingBackend, RenderBackend};
pub use batch::{
    BatchError, DrawParams, Element, ElementType, FrameStats, Geometry, GlyphQuad, SpriteBatch,
    DEFAULT_CAPACITY,
};
pub use camera::Camera2D;
pub use color::Color;
pub use font::{Font, FontProvider, GlyphInfo};
pub use gpu::WgpuBackend;
pub use sprite::{NineSlicedSprite, Sprite};
pub use texture::{Rect, Texture, TextureHandle};
pub use vertex::Vertex;
pub use window::WindowConfig;

pub use wgpu;
pub use winit;
