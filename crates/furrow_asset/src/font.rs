//! TrueType fonts rasterized with fontdue
//!
//! Each (path, pixel size) pair is rasterized once into a white RGBA atlas
//! whose alpha channel carries glyph coverage.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use furrow_render::{Font, FontProvider, GlyphInfo, RenderBackend};
use tracing::{debug, warn};

use crate::cache::ResourceCache;
use crate::error::AssetError;

/// Characters rasterized into every atlas.
pub const ATLAS_CHARS: std::ops::Range<u8> = 32..127;

const ATLAS_WIDTH: u32 = 512;
const ATLAS_PADDING: u32 = 1;

/// One rasterized glyph before packing.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    pub character: char,
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
    /// Offset of the bitmap from the pen, y down.
    pub offset: (f32, f32),
    pub advance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub glyphs: HashMap<char, GlyphInfo>,
}

/// Shelf-pack glyph bitmaps into one atlas.
pub fn pack_glyphs(glyphs: &[RasterGlyph]) -> Atlas {
    let mut placements = Vec::with_capacity(glyphs.len());
    let (mut x, mut y, mut shelf) = (ATLAS_PADDING, ATLAS_PADDING, 0);
    for glyph in glyphs {
        if x + glyph.width + ATLAS_PADDING > ATLAS_WIDTH {
            x = ATLAS_PADDING;
            y += shelf + ATLAS_PADDING;
            shelf = 0;
        }
        placements.push((x, y));
        x += glyph.width + ATLAS_PADDING;
        shelf = shelf.max(glyph.height);
    }
    let height = (y + shelf + ATLAS_PADDING).max(1);

    let mut rgba = vec![0u8; (ATLAS_WIDTH * height * 4) as usize];
    for pixel in rgba.chunks_exact_mut(4) {
        pixel[..3].fill(255);
    }

    let (w, h) = (ATLAS_WIDTH as f32, height as f32);
    let mut infos = HashMap::with_capacity(glyphs.len());
    for (glyph, &(gx, gy)) in glyphs.iter().zip(&placements) {
        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let src = (row * glyph.width + col) as usize;
                let dst = (((gy + row) * ATLAS_WIDTH + gx + col) * 4 + 3) as usize;
                rgba[dst] = glyph.coverage[src];
            }
        }
        let (ox, oy) = glyph.offset;
        infos.insert(
            glyph.character,
            GlyphInfo {
                quad: [ox, oy, ox + glyph.width as f32, oy + glyph.height as f32],
                uv: [
                    gx as f32 / w,
                    gy as f32 / h,
                    (gx + glyph.width) as f32 / w,
                    (gy + glyph.height) as f32 / h,
                ],
                advance: glyph.advance,
            },
        );
    }

    Atlas {
        width: ATLAS_WIDTH,
        height,
        rgba,
        glyphs: infos,
    }
}

fn rasterize(face: &fontdue::Font, size: u32) -> (Vec<RasterGlyph>, HashMap<(char, char), f32>) {
    let px = size as f32;
    let chars: Vec<char> = ATLAS_CHARS.map(char::from).collect();
    let glyphs = chars
        .iter()
        .map(|&c| {
            let (metrics, coverage) = face.rasterize(c, px);
            RasterGlyph {
                character: c,
                width: metrics.width as u32,
                height: metrics.height as u32,
                coverage,
                offset: (
                    metrics.xmin as f32,
                    -(metrics.ymin as f32 + metrics.height as f32),
                ),
                advance: metrics.advance_width,
            }
        })
        .collect();

    let mut kerning = HashMap::new();
    for &left in &chars {
        for &right in &chars {
            if let Some(k) = face.horizontal_kern(left, right, px) {
                if k != 0.0 {
                    kerning.insert((left, right), k);
                }
            }
        }
    }
    (glyphs, kerning)
}

fn average_height(glyphs: &[RasterGlyph]) -> f32 {
    let visible: Vec<f32> = glyphs
        .iter()
        .filter(|g| g.height > 0)
        .map(|g| g.height as f32)
        .collect();
    if visible.is_empty() {
        0.0
    } else {
        visible.iter().sum::<f32>() / visible.len() as f32
    }
}

pub struct FontCache {
    root: PathBuf,
    faces: HashMap<String, Arc<fontdue::Font>>,
    fonts: ResourceCache<Font>,
}

impl FontCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            faces: HashMap::new(),
            fonts: ResourceCache::new(),
        }
    }

    fn key(path: &str, size: u32) -> String {
        format!("{path}@{size}")
    }

    fn face(&mut self, path: &str) -> Result<Arc<fontdue::Font>, AssetError> {
        if let Some(face) = self.faces.get(path) {
            return Ok(face.clone());
        }
        let full = self.root.join(path);
        if !full.exists() {
            return Err(AssetError::NotFound(full));
        }
        let bytes = std::fs::read(&full).map_err(|source| AssetError::Io {
            path: full.clone(),
            source,
        })?;
        let face = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|reason| AssetError::Font {
                path: full,
                reason: reason.to_string(),
            })?;
        let face = Arc::new(face);
        self.faces.insert(path.to_string(), face.clone());
        Ok(face)
    }

    pub fn try_load(
        &mut self,
        backend: &mut dyn RenderBackend,
        path: &str,
        size: u32,
    ) -> Result<Arc<Font>, AssetError> {
        let key = Self::key(path, size);
        if self.fonts.get(&key).is_none() {
            self.face(path)?;
        }
        let face = self.faces.get(path).cloned();
        self.fonts.acquire(&key, || {
            let Some(face) = face else {
                return Err(AssetError::NotFound(PathBuf::from(path)));
            };
            let (glyphs, kerning) = rasterize(&face, size);
            let atlas = pack_glyphs(&glyphs);
            let texture = backend.create_texture(atlas.width, atlas.height, &atlas.rgba)?;
            debug!(path, size, glyphs = glyphs.len(), "font rasterized");
            Ok(Font {
                path: path.to_string(),
                size,
                texture: Some(texture),
                glyphs: atlas.glyphs,
                kerning,
                average_text_height: average_height(&glyphs),
            })
        })
    }

    /// Load a font, falling back to an empty one when it cannot be read.
    pub fn load(&mut self, backend: &mut dyn RenderBackend, path: &str, size: u32) -> Arc<Font> {
        match self.try_load(backend, path, size) {
            Ok(font) => font,
            Err(err) => {
                warn!(path, size, %err, "font unavailable, using empty font");
                Arc::new(Font::empty(path, size))
            }
        }
    }

    pub fn refs(&self, path: &str, size: u32) -> usize {
        self.fonts.refs(&Self::key(path, size))
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend, path: &str, size: u32) {
        if let Some(font) = self.fonts.release(&Self::key(path, size)) {
            if let Some(texture) = font.texture {
                backend.destroy_texture(texture.handle());
            }
        }
    }

    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for font in self.fonts.drain() {
            if let Some(texture) = font.texture {
                backend.destroy_texture(texture.handle());
            }
        }
        self.faces.clear();
    }
}

/// [`FontProvider`] over a font cache and the backend that owns its atlases.
pub struct FontLoader<'a> {
    fonts: &'a mut FontCache,
    backend: &'a mut dyn RenderBackend,
}

impl<'a> FontLoader<'a> {
    pub fn new(fonts: &'a mut FontCache, backend: &'a mut dyn RenderBackend) -> Self {
        Self { fonts, backend }
    }
}

impl FontProvider for FontLoader<'_> {
    fn font_at_size(&mut self, font: &Font, size: u32) -> Option<Arc<Font>> {
        self.fonts.try_load(self.backend, &font.path, size).ok()
    }
}
