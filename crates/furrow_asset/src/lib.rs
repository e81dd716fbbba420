//! Furrow Asset Pipeline
//!
//! Reference-counted caches for textures and fonts keyed by resource path.
//! Missing resources never stop rendering: textures fall back to a
//! checkerboard and fonts to an empty glyph table.

pub mod cache;
pub mod error;
pub mod font;
pub mod texture;

pub use cache::ResourceCache;
pub use error::AssetError;
pub use font::{FontCache, FontLoader};
pub use texture::TextureCache;

use std::path::{Path, PathBuf};

use furrow_render::RenderBackend;

/// Every resource cache of the application, owned by its context.
pub struct Resources {
    root: PathBuf,
    pub textures: TextureCache,
    pub fonts: FontCache,
}

impl Resources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            textures: TextureCache::new(root.join("textures")),
            fonts: FontCache::new(root.join("fonts")),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Font provider borrowing the font cache and the backend.
    pub fn font_loader<'a>(&'a mut self, backend: &'a mut dyn RenderBackend) -> FontLoader<'a> {
        FontLoader::new(&mut self.fonts, backend)
    }

    /// Drop every cached resource, releasing GPU textures.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        self.textures.clear(backend);
        self.fonts.clear(backend);
    }
}
