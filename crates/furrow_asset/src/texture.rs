//! Texture loading
//!
//! Images are decoded with `image` into RGBA8 and uploaded through the
//! render backend. A path that cannot be loaded resolves to a shared
//! checkerboard texture.

use std::path::{Path, PathBuf};

use furrow_render::{RenderBackend, Texture};
use image::GenericImageView;
use tracing::{debug, warn};

use crate::cache::ResourceCache;
use crate::error::AssetError;

const CHECKER_SIZE: u32 = 16;
const CHECKER_CELL: u32 = 4;
const CHECKER_ON: [u8; 4] = [255, 0, 255, 255];
const CHECKER_OFF: [u8; 4] = [0, 0, 0, 255];

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_file(path: &Path) -> Result<ImageData, AssetError> {
    if !path.exists() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = img.dimensions();
    Ok(ImageData {
        width,
        height,
        rgba: img.to_rgba8().into_raw(),
    })
}

/// Magenta and black squares of `cell` pixels.
pub fn checkerboard(size: u32, cell: u32) -> ImageData {
    let cell = cell.max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            rgba.extend_from_slice(if on { &CHECKER_ON } else { &CHECKER_OFF });
        }
    }
    ImageData {
        width: size,
        height: size,
        rgba,
    }
}

pub struct TextureCache {
    root: PathBuf,
    cache: ResourceCache<Texture>,
    sentinel: Option<Texture>,
}

impl TextureCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: ResourceCache::new(),
            sentinel: None,
        }
    }

    /// Load `path` (relative to the texture root), or fail.
    pub fn try_load(
        &mut self,
        backend: &mut dyn RenderBackend,
        path: &str,
    ) -> Result<Texture, AssetError> {
        let full = self.root.join(path);
        let texture = self.cache.acquire(path, || {
            let image = decode_file(&full)?;
            let texture = backend.create_texture(image.width, image.height, &image.rgba)?;
            debug!(path, width = image.width, height = image.height, "texture loaded");
            Ok::<_, AssetError>(texture)
        })?;
        Ok(*texture)
    }

    /// Load `path`, substituting the checkerboard when it is missing or
    /// unreadable. Only a failure to create the checkerboard is an error.
    pub fn load(
        &mut self,
        backend: &mut dyn RenderBackend,
        path: &str,
    ) -> Result<Texture, AssetError> {
        match self.try_load(backend, path) {
            Ok(texture) => Ok(texture),
            Err(AssetError::Backend(err)) => Err(err.into()),
            Err(err) => {
                warn!(path, %err, "texture unavailable, using checkerboard");
                self.sentinel(backend)
            }
        }
    }

    pub fn sentinel(&mut self, backend: &mut dyn RenderBackend) -> Result<Texture, AssetError> {
        if let Some(texture) = self.sentinel {
            return Ok(texture);
        }
        let image = checkerboard(CHECKER_SIZE, CHECKER_CELL);
        let texture = backend.create_texture(image.width, image.height, &image.rgba)?;
        self.sentinel = Some(texture);
        Ok(texture)
    }

    pub fn refs(&self, path: &str) -> usize {
        self.cache.refs(path)
    }

    /// Drop one reference; the GPU texture goes with the last one.
    pub fn release(&mut self, backend: &mut dyn RenderBackend, path: &str) {
        if let Some(texture) = self.cache.release(path) {
            backend.destroy_texture(texture.handle());
            debug!(path, "texture released");
        }
    }

    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for texture in self.cache.drain() {
            backend.destroy_texture(texture.handle());
        }
        if let Some(texture) = self.sentinel.take() {
            backend.destroy_texture(texture.handle());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furrow_render::RecordingBackend;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn loads_png_once_per_path() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "tiles.png", 3, 2);
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new(dir.path());

        let a = cache.load(&mut backend, "tiles.png").unwrap();
        let b = cache.load(&mut backend, "tiles.png").unwrap();
        assert_eq!(a, b);
        assert_eq!((a.width(), a.height()), (3, 2));
        assert_eq!(backend.textures.len(), 1);
        assert_eq!(cache.refs("tiles.png"), 2);

        cache.release(&mut backend, "tiles.png");
        assert!(backend.destroyed.is_empty());
        cache.release(&mut backend, "tiles.png");
        assert_eq!(backend.destroyed, vec![a.handle()]);
    }

    #[test]
    fn missing_texture_resolves_to_checkerboard() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new(dir.path());

        let first = cache.load(&mut backend, "nope.png").unwrap();
        let second = cache.load(&mut backend, "other.png").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.width(), CHECKER_SIZE);
        assert_eq!(backend.textures.len(), 1);
        assert!(matches!(
            cache.try_load(&mut backend, "nope.png"),
            Err(AssetError::NotFound(_))
        ));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"not a png").unwrap();
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new(dir.path());
        assert!(matches!(
            cache.try_load(&mut backend, "bad.png"),
            Err(AssetError::Image { .. })
        ));
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let image = checkerboard(8, 4);
        let pixel = |x: u32, y: u32| {
            let i = ((y * 8 + x) * 4) as usize;
            [image.rgba[i], image.rgba[i + 1], image.rgba[i + 2], image.rgba[i + 3]]
        };
        assert_eq!(pixel(0, 0), CHECKER_ON);
        assert_eq!(pixel(4, 0), CHECKER_OFF);
        assert_eq!(pixel(4, 4), CHECKER_ON);
    }

    #[test]
    fn clear_destroys_sentinel_too() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 1, 1);
        let mut backend = RecordingBackend::new();
        let mut cache = TextureCache::new(dir.path());
        cache.load(&mut backend, "a.png").unwrap();
        cache.load(&mut backend, "missing.png").unwrap();
        cache.clear(&mut backend);
        assert_eq!(backend.destroyed.len(), 2);
    }
}
