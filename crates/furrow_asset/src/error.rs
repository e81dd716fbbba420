use std::path::PathBuf;

use furrow_render::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("resource not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
