use std::collections::HashMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::RwLock;

use super::{TileId, TileLayout};

/// A decoded image tile
#[derive(Debug)]
pub struct TextureTile {
    id: TileId,
    image: RgbaImage,
}

impl TextureTile {
    pub fn new(id: TileId, image: RgbaImage) -> Self {
        Self { id, image }
    }

    /// A tile filled with a single color
    pub fn solid(id: TileId, width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self::new(id, RgbaImage::from_pixel(width, height, color))
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Pixel at an in-tile offset, clamped to the tile's edge
    #[inline(always)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let x = x.min(self.image.width().saturating_sub(1));
        let y = y.min(self.image.height().saturating_sub(1));
        *self.image.get_pixel(x, y)
    }
}

/// Source of decoded raster tiles.
///
/// Implementations are shared between the texture mapper and any
/// background consumers, so reads of cached tiles must be safe from
/// several threads at once.
pub trait TileLoader: Send + Sync {
    fn layout(&self) -> TileLayout;

    /// The tile at `id`, or `None` when the store has no such tile
    fn load_tile(&self, id: TileId) -> Option<Arc<TextureTile>>;

    /// Whether any tile of `level` is available
    fn has_level(&self, level: u32) -> bool;

    /// Drop decoded tiles held in a volatile cache
    fn clear_cache(&self) {}
}

/// Tile store held entirely in memory
pub struct MemoryTileStore {
    layout: TileLayout,
    tiles: RwLock<HashMap<TileId, Arc<TextureTile>>>,
}

impl MemoryTileStore {
    pub fn new(layout: TileLayout) -> Self {
        Self {
            layout,
            tiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, tile: TextureTile) {
        self.tiles.write().insert(tile.id(), Arc::new(tile));
    }

    pub fn len(&self) -> usize {
        self.tiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.read().is_empty()
    }
}

impl TileLoader for MemoryTileStore {
    fn layout(&self) -> TileLayout {
        self.layout
    }

    fn load_tile(&self, id: TileId) -> Option<Arc<TextureTile>> {
        self.tiles.read().get(&id).cloned()
    }

    fn has_level(&self, level: u32) -> bool {
        self.tiles.read().keys().any(|id| id.level == level)
    }
}
