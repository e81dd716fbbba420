//! Rendering backend abstraction
//!
//! The batcher talks to the GPU only through [`RenderBackend`]. The wgpu
//! implementation lives in [`crate::gpu`]; [`RecordingBackend`] captures
//! the same calls in memory for headless runs and tests.

use glam::Mat4;
use thiserror::Error;

use crate::texture::{Texture, TextureHandle};
use crate::vertex::{Vertex, INDICES_PER_QUAD};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("texture {width}x{height} expects {expected} bytes of RGBA, got {actual}")]
    TextureSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("unknown texture {0}")]
    UnknownTexture(TextureHandle),

    #[error("vertex upload of {0} vertices exceeds the buffer")]
    VertexOverflow(usize),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("no suitable graphics adapter")]
    NoAdapter,

    #[error("device request failed: {0}")]
    Device(String),
}

/// One batched submission: a run of quads sharing texture and element type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: TextureHandle,
    /// Shader type code; `-1` for unknown elements.
    pub element_type: i32,
    pub first_quad: u32,
    pub quad_count: u32,
    pub base_vertex: i32,
}

impl DrawCall {
    pub fn index_range(&self) -> std::ops::Range<u32> {
        let start = self.first_quad * INDICES_PER_QUAD as u32;
        start..start + self.quad_count * INDICES_PER_QUAD as u32
    }

    /// Byte offset into a `u32` index buffer.
    pub fn index_byte_offset(&self) -> u64 {
        self.first_quad as u64 * INDICES_PER_QUAD as u64 * 4
    }
}

pub fn check_rgba_len(width: u32, height: u32, rgba: &[u8]) -> Result<(), BackendError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(BackendError::TextureSize {
            width,
            height,
            expected,
            actual: rgba.len(),
        });
    }
    Ok(())
}

pub trait RenderBackend {
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8])
        -> Result<Texture, BackendError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Static index buffer, uploaded once per batcher.
    fn upload_indices(&mut self, indices: &[u32]) -> Result<(), BackendError>;

    fn set_projection(&mut self, projection: Mat4);

    fn set_alpha(&mut self, alpha: f32);

    /// Upload this frame's vertices; returns the base vertex for draws.
    fn upload_vertices(&mut self, vertices: &[Vertex]) -> Result<i32, BackendError>;

    fn draw(&mut self, call: DrawCall) -> Result<(), BackendError>;
}

/// In-memory backend that keeps every call it receives.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_texture: u32,
    pub textures: Vec<Texture>,
    pub destroyed: Vec<TextureHandle>,
    pub indices: Vec<u32>,
    pub vertices: Vec<Vertex>,
    pub projection_uploads: Vec<Mat4>,
    pub alpha_uploads: Vec<f32>,
    pub draws: Vec<DrawCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget per-frame records, keeping textures and indices.
    pub fn reset_frame(&mut self) {
        self.vertices.clear();
        self.projection_uploads.clear();
        self.alpha_uploads.clear();
        self.draws.clear();
    }

    pub fn is_live(&self, texture: TextureHandle) -> bool {
        self.textures.iter().any(|t| t.handle() == texture) && !self.destroyed.contains(&texture)
    }
}

impl RenderBackend for RecordingBackend {
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Texture, BackendError> {
        check_rgba_len(width, height, rgba)?;
        let texture = Texture::new(TextureHandle(self.next_texture), width, height);
        self.next_texture += 1;
        self.textures.push(texture);
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.destroyed.push(texture);
    }

    fn upload_indices(&mut self, indices: &[u32]) -> Result<(), BackendError> {
        self.indices = indices.to_vec();
        Ok(())
    }

    fn set_projection(&mut self, projection: Mat4) {
        self.projection_uploads.push(projection);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha_uploads.push(alpha);
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) -> Result<i32, BackendError> {
        self.vertices = vertices.to_vec();
        Ok(0)
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), BackendError> {
        if !self.is_live(call.texture) {
            return Err(BackendError::UnknownTexture(call.texture));
        }
        self.draws.push(call);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_call_offsets_are_in_bytes() {
        let call = DrawCall {
            texture: TextureHandle(0),
            element_type: 0,
            first_quad: 3,
            quad_count: 2,
            base_vertex: 0,
        };
        assert_eq!(call.index_range(), 18..30);
        assert_eq!(call.index_byte_offset(), 72);
    }

    #[test]
    fn texture_size_is_checked() {
        let mut backend = RecordingBackend::new();
        assert!(backend.create_texture(2, 2, &[0; 16]).is_ok());
        let err = backend.create_texture(2, 2, &[0; 3]).unwrap_err();
        assert!(matches!(err, BackendError::TextureSize { expected: 16, .. }));
    }

    #[test]
    fn drawing_a_destroyed_texture_fails() {
        let mut backend = RecordingBackend::new();
        let texture = backend.create_texture(1, 1, &[255; 4]).unwrap();
        backend.destroy_texture(texture.handle());
        let call = DrawCall {
            texture: texture.handle(),
            element_type: 0,
            first_quad: 0,
            quad_count: 1,
            base_vertex: 0,
        };
        assert!(backend.draw(call).is_err());
    }
}
