use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use geojson::GeoJson;

use crate::error::{Error, Result};
use crate::tile::TileId;

/// Raw bytes of one vector tile and the format they are encoded in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorTileData {
    pub format: String,
    pub bytes: Vec<u8>,
}

impl VectorTileData {
    pub fn new(format: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            bytes,
        }
    }
}

/// Supplies encoded vector tiles. Shared by every job on the worker pool.
pub trait VectorTileSource: Send + Sync {
    fn load_vector_tile(&self, id: TileId) -> Result<VectorTileData>;
}

/// Decode a vector tile into a GeoJSON document
pub fn decode_document(id: TileId, data: VectorTileData) -> Result<GeoJson> {
    let VectorTileData { format, mut bytes } = data;
    if !matches!(format.as_str(), "geojson" | "json") {
        return Err(Error::UnsupportedFormat(format));
    }
    simd_json::serde::from_slice::<GeoJson>(&mut bytes).map_err(|source| Error::Decode { id, format, source })
}

/// Vector tiles stored as `<root>/<level>/<x>/<y>.<format>`
pub struct DirVectorSource {
    root: PathBuf,
    format: String,
}

impl DirVectorSource {
    pub fn new(root: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            format: format.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tile_path(&self, id: TileId) -> PathBuf {
        self.root
            .join(id.level.to_string())
            .join(id.x.to_string())
            .join(format!("{}.{}", id.y, self.format))
    }
}

impl VectorTileSource for DirVectorSource {
    fn load_vector_tile(&self, id: TileId) -> Result<VectorTileData> {
        let path = self.tile_path(id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(VectorTileData::new(self.format.clone(), bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::TileUnavailable(id)),
            Err(source) => Err(Error::Io { path, source }),
        }
    }
}
