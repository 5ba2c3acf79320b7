use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::loader::{TextureTile, TileLoader};
use super::{TileId, TileLayout};
use crate::error::{Error, Result};

/// Relative path of a raster tile: `level/row/row_col.suffix`,
/// rows and columns zero padded to six digits.
pub fn relative_tile_file_name(id: TileId, suffix: &str) -> PathBuf {
    let row = format!("{:06}", id.y);
    PathBuf::from(id.level.to_string())
        .join(&row)
        .join(format!("{row}_{:06}.{suffix}", id.x))
}

/// Raster tiles read from a directory tree and decoded with `image`.
///
/// Decoded tiles are kept in a volatile in-memory cache. Concurrent
/// misses for the same tile both decode it and the later insert wins.
pub struct DirTileStore {
    root: PathBuf,
    suffix: String,
    layout: TileLayout,
    cache: RwLock<HashMap<TileId, Arc<TextureTile>>>,
    cache_limit: usize,
}

impl DirTileStore {
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>, layout: TileLayout) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
            layout,
            cache: RwLock::new(HashMap::new()),
            cache_limit: 512,
        }
    }

    /// Maximum number of decoded tiles kept before the cache is flushed
    pub fn with_cache_limit(mut self, tiles: usize) -> Self {
        self.cache_limit = tiles.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tile_path(&self, id: TileId) -> PathBuf {
        self.root.join(relative_tile_file_name(id, &self.suffix))
    }

    /// Drop every decoded tile
    pub fn flush(&self) {
        self.cache.write().clear();
    }

    pub fn cached_tiles(&self) -> usize {
        self.cache.read().len()
    }

    /// Read and decode a tile from disk, bypassing the cache
    pub fn read_tile(&self, id: TileId) -> Result<TextureTile> {
        let path = self.tile_path(id);
        let bytes = std::fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => Error::TileUnavailable(id),
            _ => Error::Io { path: path.clone(), source },
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|source| Error::Image { id, source })?
            .into_rgba8();
        Ok(TextureTile::new(id, image))
    }
}

impl TileLoader for DirTileStore {
    fn layout(&self) -> TileLayout {
        self.layout
    }

    fn load_tile(&self, id: TileId) -> Option<Arc<TextureTile>> {
        if let Some(tile) = self.cache.read().get(&id) {
            return Some(Arc::clone(tile));
        }

        let tile = match self.read_tile(id) {
            Ok(tile) => Arc::new(tile),
            Err(Error::TileUnavailable(_)) => {
                debug!(tile = %id, "tile missing on disk");
                return None;
            }
            Err(e) => {
                warn!(tile = %id, error = %e, "failed to load tile");
                return None;
            }
        };

        let mut cache = self.cache.write();
        if cache.len() >= self.cache_limit {
            debug!(tiles = cache.len(), "volatile tile cache full, flushing");
            cache.clear();
        }
        cache.insert(id, Arc::clone(&tile));
        Some(tile)
    }

    fn has_level(&self, level: u32) -> bool {
        self.root.join(level.to_string()).is_dir()
    }

    fn clear_cache(&self) {
        self.flush();
    }
}
