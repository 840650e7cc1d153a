//! Error types for scene construction and asset loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building scene content.
///
/// Policy conditions (non-positive frame counts, unrecognized map colours,
/// touching sprites) are never reported through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// No texture is registered under this name
    #[error("texture `{0}` is not registered")]
    TextureNotFound(String),

    /// A texture file could not be read or decoded
    #[error("could not load texture `{name}`: {source}")]
    TextureLoad {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The map file could not be opened
    #[error("could not open map {}: {source}", path.display())]
    MapIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The map file is not a valid PNG
    #[error("could not decode map {}: {source}", path.display())]
    MapDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
