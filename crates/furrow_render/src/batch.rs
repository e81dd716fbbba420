//! Sprite batcher
//!
//! Draw requests are collected between [`SpriteBatch::begin`] and
//! [`SpriteBatch::end`]. At the end of the frame elements are stable-sorted
//! by z, written into one vertex upload, and submitted as one draw per run
//! of consecutive elements sharing texture and element type.
//!
//! Every shape (lines, rectangles, circles, points) is a textured quad over
//! a 1x1 white texture owned by the batcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glam::{Mat4, Vec2};
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::{debug, trace, warn};

use furrow_core::math::rotate_around;

use crate::backend::{BackendError, DrawCall, RenderBackend};
use crate::camera::Camera2D;
use crate::color::Color;
use crate::font::{Font, FontProvider, TAB_WIDTH_IN_SPACES};
use crate::sprite::{NineSlicedSprite, Sprite};
use crate::texture::{Rect, Texture};
use crate::vertex::{quad_indices, Vertex, VERTICES_PER_QUAD};

/// Default element capacity of a batch.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Shader type code for elements the shader does not know.
pub const UNKNOWN_ELEMENT_TYPE: i32 = -1;

const DEBUG_TEXT_COLOR: Color = Color::new(1.0, 0.0, 0.0, 0.3);

static CIRCLE_CACHE: Lazy<Mutex<HashMap<String, Arc<Vec<Vec2>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("sprite batch used after destroy")]
    Destroyed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// RGBA sample times tint.
    Sprite,
    /// Coverage sample, tint color.
    TrueTypeFont,
}

impl ElementType {
    pub fn code(self) -> i32 {
        match self {
            ElementType::Sprite => 0,
            ElementType::TrueTypeFont => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ElementType::Sprite),
            1 => Some(ElementType::TrueTypeFont),
            _ => None,
        }
    }
}

/// Absolute corners of a glyph quad.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphQuad {
    pub start: Vec2,
    pub end: Vec2,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Geometry {
    Quad {
        position: Vec2,
        dimensions: Vec2,
        origin: Vec2,
        scale: Vec2,
        /// Degrees, about `position`.
        rotation: f32,
    },
    Glyph(GlyphQuad),
}

/// One queued quad.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Element {
    pub texture: Texture,
    pub geometry: Geometry,
    /// Normalized `[u0, v0, u1, v1]`.
    pub uv: [f32; 4],
    pub tint: Color,
    pub z: i32,
}

impl Element {
    pub fn element_type(&self) -> ElementType {
        match self.geometry {
            Geometry::Quad { .. } => ElementType::Sprite,
            Geometry::Glyph(_) => ElementType::TrueTypeFont,
        }
    }

    /// Corners in vertex order: top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [Vec2; 4] {
        match self.geometry {
            Geometry::Quad {
                position,
                dimensions,
                origin,
                scale,
                rotation,
            } => {
                let pivot_offset = origin * scale;
                let top_left = position - pivot_offset;
                let size = dimensions * scale;
                let mut corners = [
                    top_left,
                    top_left + Vec2::new(size.x, 0.0),
                    top_left + Vec2::new(0.0, size.y),
                    top_left + size,
                ];
                if rotation != 0.0 {
                    let pivot = top_left + pivot_offset;
                    for corner in &mut corners {
                        *corner = rotate_around(*corner, pivot, rotation);
                    }
                }
                corners
            }
            Geometry::Glyph(GlyphQuad { start, end }) => [
                start,
                Vec2::new(end.x, start.y),
                Vec2::new(start.x, end.y),
                end,
            ],
        }
    }

    fn write_vertices(&self, out: &mut Vec<Vertex>) {
        let [u0, v0, u1, v1] = self.uv;
        let uvs = [[u0, v0], [u1, v0], [u0, v1], [u1, v1]];
        let color = self.tint.to_array();
        for (corner, uv) in self.corners().into_iter().zip(uvs) {
            out.push(Vertex {
                position: corner.to_array(),
                uv,
                color,
            });
        }
    }
}

/// Placement shared by every draw operation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    pub z: i32,
    pub tint: Color,
    /// Degrees.
    pub rotation: f32,
    pub scale: Vec2,
    /// Pivot for rotation and scale, in unscaled local pixels.
    pub origin: Vec2,
}

impl DrawParams {
    pub fn at_z(z: i32) -> Self {
        Self {
            z,
            ..Self::default()
        }
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            z: 0,
            tint: Color::WHITE,
            rotation: 0.0,
            scale: Vec2::ONE,
            origin: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub elements: usize,
    pub draw_calls: usize,
    pub dropped: usize,
}

pub struct SpriteBatch {
    capacity: usize,
    elements: Vec<Element>,
    vertices: Vec<Vertex>,
    projection: Mat4,
    projection_dirty: bool,
    alpha: f32,
    alpha_dirty: bool,
    white: Texture,
    dropped: usize,
    destroyed: bool,
    /// Outline every text block with a translucent red rectangle.
    pub debug_texts: bool,
}

impl SpriteBatch {
    /// Create a batch holding at most `capacity` elements per frame. The
    /// index buffer and the white texture are created here.
    pub fn new(backend: &mut dyn RenderBackend, capacity: usize) -> Result<Self, BatchError> {
        backend.upload_indices(&quad_indices(capacity))?;
        let white = backend.create_texture(1, 1, &[255; 4])?;
        debug!(capacity, "sprite batch created");

        Ok(Self {
            capacity,
            elements: Vec::with_capacity(capacity),
            vertices: Vec::with_capacity(capacity * VERTICES_PER_QUAD),
            projection: Mat4::IDENTITY,
            projection_dirty: true,
            alpha: 1.0,
            alpha_dirty: true,
            white,
            dropped: 0,
            destroyed: false,
            debug_texts: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn white_texture(&self) -> Texture {
        self.white
    }

    /// Elements of the current frame; sorted once `end` ran.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Start a frame. The projection is re-uploaded only when the camera's
    /// view-projection differs from the last one uploaded.
    pub fn begin(&mut self, camera: Option<&Camera2D>) {
        self.elements.clear();
        self.vertices.clear();
        self.dropped = 0;

        if let Some(camera) = camera {
            let view_projection = camera.view_projection();
            if view_projection != self.projection {
                self.projection = view_projection;
                self.projection_dirty = true;
            }
        }
        self.set_alpha(1.0);
    }

    /// Global alpha multiplied into every fragment.
    pub fn set_alpha(&mut self, alpha: f32) {
        if alpha != self.alpha {
            self.alpha = alpha;
            self.alpha_dirty = true;
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    fn push(&mut self, element: Element) -> bool {
        if self.elements.len() >= self.capacity {
            self.dropped += 1;
            if self.dropped == 1 {
                warn!(capacity = self.capacity, "sprite batch full, dropping elements");
            }
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Draw `region` (texture pixels) of `texture` at `position`.
    pub fn texture(&mut self, texture: &Texture, position: Vec2, region: Rect, params: DrawParams) {
        self.push(Element {
            texture: *texture,
            geometry: Geometry::Quad {
                position,
                dimensions: Vec2::new(region.width, region.height),
                origin: params.origin,
                scale: params.scale,
                rotation: params.rotation,
            },
            uv: texture.normalize(region),
            tint: params.tint,
            z: params.z,
        });
    }

    pub fn whole_texture(&mut self, texture: &Texture, position: Vec2, params: DrawParams) {
        self.texture(texture, position, texture.full_region(), params);
    }

    pub fn sprite(&mut self, sprite: &Sprite, position: Vec2, params: DrawParams) {
        self.texture(&sprite.texture, position, sprite.region, params);
    }

    /// Fill `size` with a nine-sliced sprite. The edge and middle slices
    /// are stretched by whole multiples of the middle slice. Rotation is
    /// applied to each slice about its own top-left, not to the composite.
    pub fn nine_sliced_sprite(
        &mut self,
        sprite: &NineSlicedSprite,
        position: Vec2,
        size: Vec2,
        params: DrawParams,
    ) {
        let scale = params.scale;
        let start = position - scale * params.origin;
        let size = Vec2::new(
            if size.x == 0.0 { 1.0 } else { size.x },
            if size.y == 0.0 { 1.0 } else { size.y },
        );
        let middle = sprite.middle.region;
        let columns = if middle.width > 0.0 {
            (size.x / middle.width).floor()
        } else {
            0.0
        };
        let rows = if middle.height > 0.0 {
            (size.y / middle.height).floor()
        } else {
            0.0
        };

        let x1 = start.x + sprite.top_left.region.width * scale.x;
        let x2 = x1 + columns * sprite.top_middle.region.width * scale.x;
        let y1 = start.y + sprite.top_left.region.height * scale.y;
        let y2 = y1 + rows * sprite.middle_left.region.height * scale.y;

        let slices = [
            (&sprite.top_left, Vec2::new(start.x, start.y), Vec2::ONE),
            (&sprite.top_middle, Vec2::new(x1, start.y), Vec2::new(columns, 1.0)),
            (&sprite.top_right, Vec2::new(x2, start.y), Vec2::ONE),
            (&sprite.middle_left, Vec2::new(start.x, y1), Vec2::new(1.0, rows)),
            (&sprite.middle, Vec2::new(x1, y1), Vec2::new(columns, rows)),
            (&sprite.middle_right, Vec2::new(x2, y1), Vec2::new(1.0, rows)),
            (&sprite.bottom_left, Vec2::new(start.x, y2), Vec2::ONE),
            (&sprite.bottom_middle, Vec2::new(x1, y2), Vec2::new(columns, 1.0)),
            (&sprite.bottom_right, Vec2::new(x2, y2), Vec2::ONE),
        ];
        for (slice, slice_position, stretch) in slices {
            let slice_params = DrawParams {
                scale: stretch * scale,
                origin: Vec2::ZERO,
                ..params
            };
            self.sprite(slice, slice_position, slice_params);
        }
    }

    pub fn filled_rectangle(&mut self, position: Vec2, size: Vec2, params: DrawParams) {
        let white = self.white;
        self.texture(&white, position, Rect::new(0.0, 0.0, size.x, size.y), params);
    }

    /// Rectangle outline made of four lines.
    pub fn rectangle(&mut self, position: Vec2, size: Vec2, thickness: f32, params: DrawParams) {
        let top_left = position - params.scale * params.origin;
        let size = size * params.scale;
        let mut corners = [
            top_left,
            top_left + Vec2::new(size.x, 0.0),
            top_left + size,
            top_left + Vec2::new(0.0, size.y),
        ];
        if params.rotation != 0.0 {
            for corner in &mut corners {
                *corner = rotate_around(*corner, position, params.rotation);
            }
        }
        for i in 0..corners.len() {
            let next = corners[(i + 1) % corners.len()];
            self.line(corners[i], next, params.z, params.tint, thickness);
        }
    }

    pub fn line(&mut self, from: Vec2, to: Vec2, z: i32, color: Color, thickness: f32) {
        let delta = to - from;
        let rotation = delta.y.atan2(delta.x).to_degrees();
        self.line_from(from, delta.length(), rotation, z, color, thickness);
    }

    /// Line of `length` leaving `position` at `rotation` degrees.
    pub fn line_from(
        &mut self,
        position: Vec2,
        length: f32,
        rotation: f32,
        z: i32,
        color: Color,
        thickness: f32,
    ) {
        let white = self.white;
        let params = DrawParams::at_z(z).with_tint(color).with_rotation(rotation);
        self.texture(&white, position, Rect::new(0.0, 0.0, length, thickness), params);
    }

    pub fn point(&mut self, position: Vec2, z: i32, color: Color) {
        let white = self.white;
        let params = DrawParams::at_z(z).with_tint(color);
        self.texture(&white, position, Rect::new(0.0, 0.0, 1.0, 1.0), params);
    }

    /// Polyline through `points`, each offset by `position`.
    pub fn points(&mut self, position: Vec2, points: &[Vec2], z: i32, color: Color, thickness: f32) {
        for pair in points.windows(2) {
            self.line(position + pair[0], position + pair[1], z, color, thickness);
        }
    }

    pub fn circle(
        &mut self,
        center: Vec2,
        radius: f32,
        sides: u32,
        z: i32,
        color: Color,
        thickness: f32,
    ) {
        let ring = circle_points(radius, sides);
        self.points(center, &ring, z, color, thickness);
    }

    /// Draw `text` with `font` as given.
    pub fn text(&mut self, text: &str, font: &Font, position: Vec2, params: DrawParams) {
        self.layout_text(text, font, position, params);
    }

    /// Draw `text`, asking `fonts` for a copy rasterized at the scaled size
    /// when the scale is uniform.
    pub fn text_with(
        &mut self,
        fonts: &mut dyn FontProvider,
        text: &str,
        font: &Font,
        position: Vec2,
        params: DrawParams,
    ) {
        let mut scaled = None;
        if params.scale.x == params.scale.y {
            let size = (font.size as f32 * params.scale.x) as u32;
            if size != font.size && size > 0 {
                scaled = fonts.font_at_size(font, size);
            }
        }
        let font = scaled.as_deref().unwrap_or(font);
        self.layout_text(text, font, position, params);
    }

    fn layout_text(&mut self, text: &str, font: &Font, position: Vec2, params: DrawParams) {
        let block_start = position - params.scale * params.origin;
        let mut cursor = block_start + Vec2::new(0.0, font.average_text_height);
        let space = font.space_width();
        let mut previous = None;

        for c in text.chars() {
            match c {
                ' ' => cursor.x += space,
                '\t' => cursor.x += space * TAB_WIDTH_IN_SPACES,
                '\n' => {
                    cursor = Vec2::new(block_start.x, cursor.y + font.size as f32);
                    previous = None;
                    continue;
                }
                _ => {
                    let Some(glyph) = font.glyph(c) else {
                        trace!(character = %c, font = %font.path, "missing glyph");
                        continue;
                    };
                    if let Some(p) = previous {
                        cursor.x += font.kerning(p, c);
                    }
                    if let Some(texture) = font.texture {
                        let [x0, y0, x1, y1] = glyph.quad;
                        self.push(Element {
                            texture,
                            geometry: Geometry::Glyph(GlyphQuad {
                                start: cursor + Vec2::new(x0, y0),
                                end: cursor + Vec2::new(x1, y1),
                            }),
                            uv: glyph.uv,
                            tint: params.tint,
                            z: params.z,
                        });
                    }
                    cursor.x += glyph.advance;
                }
            }
            previous = Some(c);
        }

        if self.debug_texts {
            let size = Vec2::new(font.text_width(text), font.text_height(text));
            self.filled_rectangle(
                block_start,
                size,
                DrawParams::at_z(params.z).with_tint(DEBUG_TEXT_COLOR),
            );
        }
    }

    /// Flush the frame to `backend`. Does nothing when no element was drawn.
    pub fn end(&mut self, backend: &mut dyn RenderBackend) -> Result<FrameStats, BatchError> {
        if self.destroyed {
            return Err(BatchError::Destroyed);
        }
        let mut stats = FrameStats {
            elements: self.elements.len(),
            draw_calls: 0,
            dropped: self.dropped,
        };
        if self.elements.is_empty() {
            return Ok(stats);
        }
        if self.dropped > 0 {
            warn!(dropped = self.dropped, "sprite batch overflowed this frame");
        }

        if self.projection_dirty {
            backend.set_projection(self.projection);
            self.projection_dirty = false;
        }
        if self.alpha_dirty {
            backend.set_alpha(self.alpha);
            self.alpha_dirty = false;
        }

        // stable: equal z keeps insertion order
        self.elements.sort_by_key(|element| element.z);

        self.vertices.clear();
        for element in &self.elements {
            element.write_vertices(&mut self.vertices);
        }
        let base_vertex = backend.upload_vertices(&self.vertices)?;

        let mut offset = 0;
        let mut last_texture = self.elements[0].texture.handle();
        let mut last_type = self.elements[0].element_type();
        for (i, element) in self.elements.iter().enumerate().skip(1) {
            let texture = element.texture.handle();
            let element_type = element.element_type();
            if texture != last_texture || element_type != last_type {
                backend.draw(DrawCall {
                    texture: last_texture,
                    element_type: last_type.code(),
                    first_quad: offset as u32,
                    quad_count: (i - offset) as u32,
                    base_vertex,
                })?;
                stats.draw_calls += 1;
                offset = i;
                last_texture = texture;
                last_type = element_type;
            }
        }
        backend.draw(DrawCall {
            texture: last_texture,
            element_type: last_type.code(),
            first_quad: offset as u32,
            quad_count: (self.elements.len() - offset) as u32,
            base_vertex,
        })?;
        stats.draw_calls += 1;

        trace!(
            elements = stats.elements,
            draw_calls = stats.draw_calls,
            "sprite batch flushed"
        );
        Ok(stats)
    }

    /// Release the white texture. Later frames fail with `Destroyed`.
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend) {
        if !self.destroyed {
            backend.destroy_texture(self.white.handle());
            self.elements.clear();
            self.destroyed = true;
            debug!("sprite batch destroyed");
        }
    }
}

/// Ring of `sides` points plus the first point repeated, cached per
/// radius and side count.
pub fn circle_points(radius: f32, sides: u32) -> Arc<Vec<Vec2>> {
    let key = format!("{radius:?}x{sides}");
    let mut cache = CIRCLE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(ring) = cache.get(&key) {
        return ring.clone();
    }

    let sides = sides.max(1);
    let step = std::f64::consts::TAU / sides as f64;
    let radius64 = radius as f64;
    let mut ring: Vec<Vec2> = (0..sides)
        .map(|i| {
            let theta = step * i as f64;
            Vec2::new((radius64 * theta.cos()) as f32, (radius64 * theta.sin()) as f32)
        })
        .collect();
    ring.push(Vec2::new(radius, 0.0));

    let ring = Arc::new(ring);
    cache.insert(key, ring.clone());
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::font::GlyphInfo;
    use crate::texture::TextureHandle;

    fn setup() -> (RecordingBackend, SpriteBatch) {
        let mut backend = RecordingBackend::new();
        let batch = SpriteBatch::new(&mut backend, DEFAULT_CAPACITY).unwrap();
        (backend, batch)
    }

    fn make_texture(backend: &mut RecordingBackend, size: u32) -> Texture {
        backend
            .create_texture(size, size, &vec![255; (size * size * 4) as usize])
            .unwrap()
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn construction_uploads_indices_and_white_texture() {
        let (backend, batch) = setup();
        assert_eq!(backend.indices.len(), DEFAULT_CAPACITY * 6);
        assert_eq!(&backend.indices[6..12], &[4, 5, 6, 6, 7, 5]);
        assert_eq!(batch.white_texture().width(), 1);
        assert!(backend.is_live(batch.white_texture().handle()));
    }

    #[test]
    fn empty_frame_is_a_no_op() {
        let (mut backend, mut batch) = setup();
        batch.begin(Some(&Camera2D::default()));
        let stats = batch.end(&mut backend).unwrap();
        assert_eq!(stats, FrameStats::default());
        assert!(backend.draws.is_empty());
        assert!(backend.projection_uploads.is_empty());
    }

    #[test]
    fn sort_by_z_is_stable() {
        let (mut backend, mut batch) = setup();
        let texture = make_texture(&mut backend, 4);
        batch.begin(None);
        let zs = [3, -1, 3, 0, -1, 7, 0];
        for (i, z) in zs.iter().enumerate() {
            batch.texture(
                &texture,
                Vec2::new(i as f32, 0.0),
                Rect::new(0.0, 0.0, 1.0, 1.0),
                DrawParams::at_z(*z),
            );
        }
        batch.end(&mut backend).unwrap();

        let order: Vec<(i32, f32)> = batch
            .elements()
            .iter()
            .map(|e| (e.z, e.corners()[0].x))
            .collect();
        assert_eq!(
            order,
            vec![(-1, 1.0), (-1, 4.0), (0, 3.0), (0, 6.0), (3, 0.0), (3, 2.0), (7, 5.0)]
        );
    }

    #[test]
    fn same_texture_runs_merge_after_sort() {
        let (mut backend, mut batch) = setup();
        let a = make_texture(&mut backend, 8);
        let b = make_texture(&mut backend, 8);
        batch.begin(None);
        batch.whole_texture(&a, Vec2::ZERO, DrawParams::at_z(5));
        batch.whole_texture(&b, Vec2::ZERO, DrawParams::at_z(1));
        batch.whole_texture(&a, Vec2::ZERO, DrawParams::at_z(5));
        let stats = batch.end(&mut backend).unwrap();

        let textures: Vec<TextureHandle> =
            batch.elements().iter().map(|e| e.texture.handle()).collect();
        assert_eq!(textures, vec![b.handle(), a.handle(), a.handle()]);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(backend.draws[0].texture, b.handle());
        assert_eq!((backend.draws[0].first_quad, backend.draws[0].quad_count), (0, 1));
        assert_eq!(backend.draws[1].texture, a.handle());
        assert_eq!((backend.draws[1].first_quad, backend.draws[1].quad_count), (1, 2));
        assert_eq!(backend.draws[1].index_byte_offset(), 24);
    }

    #[test]
    fn draw_count_is_one_plus_texture_changes() {
        let (mut backend, mut batch) = setup();
        let textures: Vec<Texture> = (0..3).map(|_| make_texture(&mut backend, 2)).collect();
        let mut rng = furrow_core::math::DeterministicRng::new(11);

        batch.begin(None);
        for _ in 0..200 {
            let texture = textures[rng.generate_in_range(0, 2) as usize];
            let z = rng.generate_in_range(0, 4);
            batch.whole_texture(&texture, Vec2::ZERO, DrawParams::at_z(z));
        }
        let stats = batch.end(&mut backend).unwrap();

        let changes = batch
            .elements()
            .windows(2)
            .filter(|pair| pair[0].texture != pair[1].texture)
            .count();
        assert_eq!(stats.draw_calls, 1 + changes);
        assert_eq!(backend.draws.len(), stats.draw_calls);
        let covered: u32 = backend.draws.iter().map(|d| d.quad_count).sum();
        assert_eq!(covered, 200);
    }

    #[test]
    fn overflow_drops_extra_elements() {
        let (mut backend, mut batch) = setup();
        let texture = make_texture(&mut backend, 1);
        batch.begin(None);
        for _ in 0..DEFAULT_CAPACITY + 1 {
            batch.whole_texture(&texture, Vec2::ZERO, DrawParams::default());
        }
        let stats = batch.end(&mut backend).unwrap();

        assert_eq!(stats.elements, DEFAULT_CAPACITY);
        assert_eq!(stats.dropped, 1);
        assert_eq!(backend.vertices.len(), DEFAULT_CAPACITY * 4);
        assert_eq!(backend.draws.len(), 1);
        assert_eq!(backend.draws[0].quad_count as usize, DEFAULT_CAPACITY);

        batch.begin(None);
        batch.whole_texture(&texture, Vec2::ZERO, DrawParams::default());
        assert_eq!(batch.end(&mut backend).unwrap().dropped, 0);
    }

    #[test]
    fn line_corners_follow_its_angle() {
        let (mut backend, mut batch) = setup();
        let from = Vec2::new(10.0, 10.0);
        let to = Vec2::new(13.0, 14.0);
        batch.begin(None);
        batch.line(from, to, 0, Color::WHITE, 2.0);
        batch.end(&mut backend).unwrap();

        assert_eq!(batch.elements().len(), 1);
        let angle = (to.y - from.y).atan2(to.x - from.x);
        let along = Vec2::new(angle.cos(), angle.sin());
        let across = Vec2::new(-angle.sin(), angle.cos()) * 2.0;
        let expected = [from, to, from + across, to + across];

        let corners: Vec<Vec2> = backend
            .vertices
            .iter()
            .map(|v| Vec2::from_array(v.position))
            .collect();
        for (corner, want) in corners.iter().zip(expected) {
            assert!(close(*corner, want), "{corner} != {want}");
        }
        assert!(close(from + along * 5.0, to));
    }

    #[test]
    fn origin_shifts_then_rotates_about_position() {
        let (mut backend, mut batch) = setup();
        let texture = make_texture(&mut backend, 4);
        let params = DrawParams::default()
            .with_origin(Vec2::new(2.0, 2.0))
            .with_scale(Vec2::splat(2.0))
            .with_rotation(90.0);
        batch.begin(None);
        batch.whole_texture(&texture, Vec2::new(100.0, 100.0), params);

        let corners = batch.elements()[0].corners();
        // unrotated top-left is (96, 96); a quarter turn about (100, 100)
        assert!(close(corners[0], Vec2::new(104.0, 96.0)));
        assert!(close(corners[3], Vec2::new(96.0, 104.0)));
    }

    #[test]
    fn uvs_are_normalized_per_corner() {
        let (mut backend, mut batch) = setup();
        let texture = make_texture(&mut backend, 8);
        batch.begin(None);
        batch.texture(&texture, Vec2::ZERO, Rect::new(2.0, 4.0, 2.0, 4.0), DrawParams::default());
        batch.end(&mut backend).unwrap();

        let uvs: Vec<[f32; 2]> = backend.vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, vec![[0.25, 0.5], [0.5, 0.5], [0.25, 1.0], [0.5, 1.0]]);
    }

    #[test]
    fn uniforms_upload_only_on_change() {
        let (mut backend, mut batch) = setup();
        let texture = make_texture(&mut backend, 1);
        let mut camera = Camera2D::default();

        let frame = |batch: &mut SpriteBatch,
                     backend: &mut RecordingBackend,
                     camera: &Camera2D,
                     alpha: Option<f32>| {
            backend.reset_frame();
            batch.begin(Some(camera));
            if let Some(alpha) = alpha {
                batch.set_alpha(alpha);
            }
            batch.whole_texture(&texture, Vec2::ZERO, DrawParams::default());
            batch.end(backend).unwrap();
            (backend.projection_uploads.len(), backend.alpha_uploads.len())
        };

        assert_eq!(frame(&mut batch, &mut backend, &camera, None), (1, 1));
        assert_eq!(frame(&mut batch, &mut backend, &camera, None), (0, 0));
        camera.move_by(Vec2::new(5.0, 0.0));
        assert_eq!(frame(&mut batch, &mut backend, &camera, None), (1, 0));
        assert_eq!(frame(&mut batch, &mut backend, &camera, Some(0.5)), (0, 1));
        assert_eq!(backend.alpha_uploads, vec![0.5]);
        // begin resets alpha to 1
        assert_eq!(frame(&mut batch, &mut backend, &camera, None), (0, 1));
    }

    #[test]
    fn nine_slice_emits_nine_stretched_elements() {
        let (mut backend, mut batch) = setup();
        let texture = make_texture(&mut backend, 24);
        let nine = NineSlicedSprite::from_borders(
            texture,
            Rect::new(0.0, 0.0, 24.0, 24.0),
            8.0,
            8.0,
            8.0,
            8.0,
        );
        batch.begin(None);
        batch.nine_sliced_sprite(&nine, Vec2::new(10.0, 10.0), Vec2::new(20.0, 35.0), DrawParams::at_z(2));

        let elements = batch.elements();
        assert_eq!(elements.len(), 9);
        assert!(elements.iter().all(|e| e.z == 2));
        match elements[4].geometry {
            Geometry::Quad { position, scale, .. } => {
                assert_eq!(position, Vec2::new(18.0, 18.0));
                assert_eq!(scale, Vec2::new(2.0, 4.0));
            }
            Geometry::Glyph(_) => panic!("middle slice is a sprite"),
        }
        assert_eq!(elements[8].corners()[0], Vec2::new(34.0, 50.0));
    }

    #[test]
    fn circle_ring_is_closed_and_cached() {
        let ring = circle_points(3.0, 6);
        assert_eq!(ring.len(), 7);
        assert_eq!(ring[0], ring[6]);
        assert!(Arc::ptr_eq(&ring, &circle_points(3.0, 6)));

        let (mut backend, mut batch) = setup();
        batch.begin(None);
        batch.circle(Vec2::new(50.0, 50.0), 3.0, 6, 0, Color::RED, 1.0);
        assert_eq!(batch.elements().len(), 6);
        batch.end(&mut backend).unwrap();
        assert_eq!(backend.draws.len(), 1);
    }

    fn test_font(texture: Texture, size: u32) -> Font {
        let mut font = Font::empty("test.ttf", size);
        font.texture = Some(texture);
        font.average_text_height = 10.0;
        for c in ['a', 'b', ' '] {
            font.glyphs.insert(
                c,
                GlyphInfo {
                    quad: [1.0, -8.0, 7.0, 0.0],
                    uv: [0.0, 0.0, 0.5, 0.5],
                    advance: 8.0,
                },
            );
        }
        font.kerning.insert(('a', 'b'), -2.0);
        font
    }

    #[test]
    fn text_emits_one_glyph_per_visible_char() {
        let (mut backend, mut batch) = setup();
        let atlas = make_texture(&mut backend, 16);
        let font = test_font(atlas, 16);
        batch.begin(None);
        batch.text("ab a\nb", &font, Vec2::new(100.0, 50.0), DrawParams::default());

        let elements = batch.elements();
        assert_eq!(elements.len(), 4);
        assert!(elements.iter().all(|e| e.element_type() == ElementType::TrueTypeFont));
        let starts: Vec<Vec2> = elements
            .iter()
            .map(|e| match e.geometry {
                Geometry::Glyph(quad) => quad.start,
                Geometry::Quad { .. } => panic!("glyph expected"),
            })
            .collect();
        // pen starts one average height below the block, kerning pulls 'b' in
        assert_eq!(starts[0], Vec2::new(101.0, 52.0));
        assert_eq!(starts[1], Vec2::new(107.0, 52.0));
        assert_eq!(starts[2], Vec2::new(123.0, 52.0));
        assert_eq!(starts[3], Vec2::new(101.0, 68.0));

        let stats = batch.end(&mut backend).unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(backend.draws[0].element_type, 1);
    }

    #[test]
    fn glyphs_and_sprites_on_one_texture_split_by_type() {
        let (mut backend, mut batch) = setup();
        let atlas = make_texture(&mut backend, 16);
        let font = test_font(atlas, 16);
        batch.begin(None);
        batch.text("a", &font, Vec2::ZERO, DrawParams::default());
        batch.whole_texture(&atlas, Vec2::ZERO, DrawParams::default());
        let stats = batch.end(&mut backend).unwrap();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(backend.draws[1].element_type, 0);
    }

    struct Rescaler {
        atlas: Texture,
        requested: Vec<u32>,
    }

    impl FontProvider for Rescaler {
        fn font_at_size(&mut self, font: &Font, size: u32) -> Option<Arc<Font>> {
            self.requested.push(size);
            let mut scaled = test_font(self.atlas, size);
            scaled.path = font.path.clone();
            Some(Arc::new(scaled))
        }
    }

    #[test]
    fn uniform_scale_requests_a_rasterized_font() {
        let (mut backend, mut batch) = setup();
        let small = make_texture(&mut backend, 16);
        let large = make_texture(&mut backend, 32);
        let font = test_font(small, 16);
        let mut provider = Rescaler {
            atlas: large,
            requested: Vec::new(),
        };

        batch.begin(None);
        let scaled = DrawParams::default().with_scale(Vec2::splat(2.0));
        batch.text_with(&mut provider, "a", &font, Vec2::ZERO, scaled);
        let stretched = DrawParams::default().with_scale(Vec2::new(2.0, 1.0));
        batch.text_with(&mut provider, "a", &font, Vec2::ZERO, stretched);

        assert_eq!(provider.requested, vec![32]);
        assert_eq!(batch.elements()[0].texture, large);
        assert_eq!(batch.elements()[1].texture, small);
    }

    #[test]
    fn debug_texts_adds_translucent_rect() {
        let (mut backend, mut batch) = setup();
        let atlas = make_texture(&mut backend, 16);
        let font = test_font(atlas, 16);
        batch.debug_texts = true;
        batch.begin(None);
        batch.text("ab", &font, Vec2::ZERO, DrawParams::at_z(3));

        let rect = batch.elements().last().copied().unwrap();
        assert_eq!(rect.texture, batch.white_texture());
        assert_eq!(rect.tint, Color::new(1.0, 0.0, 0.0, 0.3));
        assert_eq!(rect.corners()[3], Vec2::new(14.0, 16.0));
    }

    #[test]
    fn destroy_releases_white_texture_once() {
        let (mut backend, mut batch) = setup();
        let white = batch.white_texture().handle();
        batch.destroy(&mut backend);
        batch.destroy(&mut backend);
        assert_eq!(backend.destroyed, vec![white]);
        batch.begin(None);
        assert!(matches!(batch.end(&mut backend), Err(BatchError::Destroyed)));
    }
}
