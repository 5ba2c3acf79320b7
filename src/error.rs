use std::path::PathBuf;

use thiserror::Error;

use crate::tile::TileId;

/// Errors surfaced by the tile stores, the vector pipeline and theme loading.
#[derive(Debug, Error)]
pub enum Error {
    #[error("tile {0} is not available")]
    TileUnavailable(TileId),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image tile {id}: {source}")]
    Image {
        id: TileId,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to decode vector tile {id} as {format}: {source}")]
    Decode {
        id: TileId,
        format: String,
        #[source]
        source: simd_json::Error,
    },

    #[error("unsupported vector tile format `{0}`")]
    UnsupportedFormat(String),

    #[error("invalid map theme: {0}")]
    Theme(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
