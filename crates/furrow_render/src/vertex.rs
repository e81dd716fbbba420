//! Vertex layout shared by the batcher and the GPU pipeline.
//!
//! Per vertex: position (x, y), texture coordinates (u, v) and tint
//! (r, g, b, a), eight floats in total. Each quad is four vertices and six
//! indices `[0, 1, 2, 2, 3, 1]`:
//!
//! ```text
//! 0---1
//! | / |
//! 2---3
//! ```

/// Floats per vertex.
pub const FLOATS_PER_VERTEX: usize = 8;
pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;
/// Floats the vertex buffer holds per quad.
pub const FLOATS_PER_QUAD: usize = FLOATS_PER_VERTEX * VERTICES_PER_QUAD;

const QUAD_INDICES: [u32; INDICES_PER_QUAD] = [0, 1, 2, 2, 3, 1];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Index list for `max_quads` quads, generated once per batcher.
pub fn quad_indices(max_quads: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(max_quads * INDICES_PER_QUAD);
    for quad in 0..max_quads as u32 {
        let base = quad * VERTICES_PER_QUAD as u32;
        indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
    indices
}

/// Size of the vertex buffer, in floats, for `max_quads` quads.
pub fn vertex_buffer_floats(max_quads: usize) -> usize {
    max_quads * FLOATS_PER_QUAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_eight_floats() {
        assert_eq!(
            std::mem::size_of::<Vertex>(),
            FLOATS_PER_VERTEX * std::mem::size_of::<f32>()
        );
        assert_eq!(vertex_buffer_floats(4096), 4096 * 32);
    }

    #[test]
    fn indices_follow_quad_pattern() {
        let indices = quad_indices(2);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 1, 4, 5, 6, 6, 7, 5]);
    }
}
