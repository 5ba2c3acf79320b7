//! Tile pyramid addressing.
//!
//! Level `L` of a pyramid is a global canvas of
//! `tile_width * level_zero_columns * 2^L` by
//! `tile_height * level_zero_rows * 2^L` pixels, cut into equally sized
//! tiles. Global pixel coordinates have their origin in the upper left
//! corner of that canvas.

pub mod loader;
pub mod store;

use std::fmt;

use serde::Deserialize;

pub use loader::{MemoryTileStore, TextureTile, TileLoader};
pub use store::DirTileStore;

/// Address of one tile in the pyramid
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub const fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// The tile one level up covering this one
    pub fn parent(&self) -> Option<TileId> {
        if self.level == 0 {
            return None;
        }
        Some(TileId::new(self.level - 1, self.x / 2, self.y / 2))
    }

    /// The four tiles one level down, row by row
    pub fn children(&self) -> [TileId; 4] {
        let (x, y, level) = (self.x * 2, self.y * 2, self.level + 1);
        [
            TileId::new(level, x, y),
            TileId::new(level, x + 1, y),
            TileId::new(level, x, y + 1),
            TileId::new(level, x + 1, y + 1),
        ]
    }

    /// Global pixel extent `(x0, y0, x1, y1)`, half-open, at this tile's level
    pub fn pixel_extent(&self, layout: &TileLayout) -> (i64, i64, i64, i64) {
        let x0 = self.x as i64 * layout.tile_width as i64;
        let y0 = self.y as i64 * layout.tile_height as i64;
        (x0, y0, x0 + layout.tile_width as i64, y0 + layout.tile_height as i64)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Tile dimensions and the shape of level zero
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct TileLayout {
    pub tile_width: u32,
    pub tile_height: u32,
    pub level_zero_columns: u32,
    pub level_zero_rows: u32,
}

impl TileLayout {
    pub const fn new(tile_width: u32, tile_height: u32, level_zero_columns: u32, level_zero_rows: u32) -> Self {
        Self {
            tile_width,
            tile_height,
            level_zero_columns,
            level_zero_rows,
        }
    }

    /// Square slippy-map layout: one 256px tile at level zero
    pub const fn slippy() -> Self {
        Self::new(256, 256, 1, 1)
    }

    #[inline]
    pub fn columns(&self, level: u32) -> u32 {
        self.level_zero_columns << level
    }

    #[inline]
    pub fn rows(&self, level: u32) -> u32 {
        self.level_zero_rows << level
    }

    #[inline]
    pub fn global_width(&self, level: u32) -> i64 {
        self.tile_width as i64 * self.columns(level) as i64
    }

    #[inline]
    pub fn global_height(&self, level: u32) -> i64 {
        self.tile_height as i64 * self.rows(level) as i64
    }

    /// Resolve a global pixel to its tile and in-tile offset.
    /// X wraps around the antimeridian seam, Y is clamped to the canvas.
    pub fn global_to_tile(&self, gx: i64, gy: i64, level: u32) -> TilePixel {
        let gx = gx.rem_euclid(self.global_width(level));
        let gy = gy.clamp(0, self.global_height(level) - 1);
        let tw = self.tile_width as i64;
        let th = self.tile_height as i64;
        TilePixel {
            id: TileId::new(level, (gx / tw) as u32, (gy / th) as u32),
            x: (gx % tw) as u32,
            y: (gy % th) as u32,
        }
    }

    pub fn contains(&self, id: &TileId) -> bool {
        id.x < self.columns(id.level) && id.y < self.rows(id.level)
    }
}

/// A tile address plus the pixel offset inside that tile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePixel {
    pub id: TileId,
    pub x: u32,
    pub y: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: TileLayout = TileLayout::new(256, 128, 2, 1);

    #[test]
    fn test_global_size_doubles_per_level() {
        assert_eq!(LAYOUT.global_width(0), 512);
        assert_eq!(LAYOUT.global_height(0), 128);
        assert_eq!(LAYOUT.global_width(3), 4096);
        assert_eq!(LAYOUT.global_height(3), 1024);
    }

    #[test]
    fn test_global_to_tile() {
        let p = LAYOUT.global_to_tile(700, 130, 1);
        assert_eq!(p.id, TileId::new(1, 2, 1));
        assert_eq!((p.x, p.y), (188, 2));
    }

    #[test]
    fn test_global_to_tile_wraps_seam() {
        let width = LAYOUT.global_width(1);
        let p = LAYOUT.global_to_tile(-1, 0, 1);
        assert_eq!(p.id, TileId::new(1, 3, 0));
        assert_eq!(p.x, 255);
        assert_eq!(LAYOUT.global_to_tile(width + 5, 0, 1).id, TileId::new(1, 0, 0));
    }

    #[test]
    fn test_global_to_tile_clamps_poles() {
        let p = LAYOUT.global_to_tile(0, 10_000, 1);
        assert_eq!(p.id.y, 1);
        assert_eq!(p.y, 127);
        assert_eq!(LAYOUT.global_to_tile(0, -3, 1).id.y, 0);
    }

    #[test]
    fn test_children_partition_parent() {
        for id in [TileId::new(0, 1, 0), TileId::new(2, 3, 1), TileId::new(5, 17, 9)] {
            let (px0, py0, px1, py1) = id.pixel_extent(&LAYOUT);
            // parent extent expressed in next-level global pixels
            let (px0, py0, px1, py1) = (px0 * 2, py0 * 2, px1 * 2, py1 * 2);

            let children = id.children();
            let mut area = 0;
            for c in &children {
                let (x0, y0, x1, y1) = c.pixel_extent(&LAYOUT);
                assert!(x0 >= px0 && x1 <= px1 && y0 >= py0 && y1 <= py1);
                area += (x1 - x0) * (y1 - y0);
                assert_eq!(c.parent(), Some(id));
            }
            assert_eq!(area, (px1 - px0) * (py1 - py0));

            // pairwise disjoint
            for (i, a) in children.iter().enumerate() {
                for b in &children[i + 1..] {
                    let (ax0, ay0, ax1, ay1) = a.pixel_extent(&LAYOUT);
                    let (bx0, by0, bx1, by1) = b.pixel_extent(&LAYOUT);
                    let overlap_x = ax0.max(bx0) < ax1.min(bx1);
                    let overlap_y = ay0.max(by0) < ay1.min(by1);
                    assert!(!(overlap_x && overlap_y), "{a} overlaps {b}");
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TileId::new(3, 4, 5).to_string(), "3/4/5");
    }
}
