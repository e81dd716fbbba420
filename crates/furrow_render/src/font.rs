//! Rasterized fonts
//!
//! A [`Font`] is one atlas texture plus a glyph table at a fixed pixel
//! size. Glyph quads are already positioned relative to the pen (baseline
//! origin) and glyph uvs are already normalized, so the batcher only
//! offsets them by the cursor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::texture::Texture;

/// Tab stops are this many space widths.
pub const TAB_WIDTH_IN_SPACES: f32 = 4.0;

/// Placement of one glyph relative to the pen position.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GlyphInfo {
    /// `[x0, y0, x1, y1]` relative to the pen, y down.
    pub quad: [f32; 4],
    /// `[u0, v0, u1, v1]` in the atlas.
    pub uv: [f32; 4],
    pub advance: f32,
}

#[derive(Debug, Clone)]
pub struct Font {
    pub path: String,
    pub size: u32,
    pub texture: Option<Texture>,
    pub glyphs: HashMap<char, GlyphInfo>,
    pub kerning: HashMap<(char, char), f32>,
    /// Mean glyph height, used to move the first line below the pen.
    pub average_text_height: f32,
}

impl Font {
    /// Font with no glyphs. Text drawn with it only advances whitespace.
    pub fn empty(path: impl Into<String>, size: u32) -> Self {
        Self {
            path: path.into(),
            size,
            texture: None,
            glyphs: HashMap::new(),
            kerning: HashMap::new(),
            average_text_height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    pub fn kerning(&self, left: char, right: char) -> f32 {
        self.kerning.get(&(left, right)).copied().unwrap_or(0.0)
    }

    pub fn space_width(&self) -> f32 {
        match self.glyphs.get(&' ') {
            Some(space) if space.advance > 0.0 => space.advance,
            _ => self.size as f32 * 0.25,
        }
    }

    /// Widest line of `text`, in pixels.
    pub fn text_width(&self, text: &str) -> f32 {
        let mut widest: f32 = 0.0;
        let mut x = 0.0;
        let mut previous = None;
        for c in text.chars() {
            match c {
                '\n' => {
                    widest = widest.max(x);
                    x = 0.0;
                    previous = None;
                    continue;
                }
                ' ' => x += self.space_width(),
                '\t' => x += self.space_width() * TAB_WIDTH_IN_SPACES,
                _ => {
                    if let Some(glyph) = self.glyph(c) {
                        if let Some(p) = previous {
                            x += self.kerning(p, c);
                        }
                        x += glyph.advance;
                    }
                }
            }
            previous = Some(c);
        }
        widest.max(x)
    }

    /// Height of `text` assuming one font size per line.
    pub fn text_height(&self, text: &str) -> f32 {
        let lines = text.split('\n').count();
        lines as f32 * self.size as f32
    }
}

/// Source of fonts re-rasterized at another pixel size.
pub trait FontProvider {
    fn font_at_size(&mut self, font: &Font, size: u32) -> Option<Arc<Font>>;
}
