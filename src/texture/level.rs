use tracing::debug;

use crate::tile::{TileLayout, TileLoader};

/// Deepest level probed when discovering the extent of a pyramid
pub const MAX_PROBED_LEVEL: u32 = 24;

/// Level whose global canvas is at least as wide as the flat world on
/// screen (`4 * radius` pixels), i.e. texture density of 1:1 or better.
pub fn tile_level_for_radius(layout: &TileLayout, radius: f64) -> u32 {
    let level_zero_width = (layout.tile_width * layout.level_zero_columns) as f64;
    let linear = 4.0 * radius / level_zero_width;
    if linear.is_nan() || linear <= 1.0 {
        return 0;
    }
    // tolerance keeps exact powers of two on the lower level
    (linear.log2() - 1e-9).ceil().max(0.0) as u32
}

/// Chooses the pyramid level for a viewport radius, capped at the deepest
/// level the tile store provides.
#[derive(Clone, Debug)]
pub struct TileLevelSelector {
    layout: TileLayout,
    max_level: Option<u32>,
}

impl TileLevelSelector {
    pub fn new(layout: TileLayout) -> Self {
        Self { layout, max_level: None }
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    pub fn max_level(&self) -> Option<u32> {
        self.max_level
    }

    pub fn set_max_level(&mut self, level: u32) {
        self.max_level = Some(level.min(MAX_PROBED_LEVEL));
    }

    /// Probe the store level by level from zero until one is missing.
    /// Returns the deepest available level, `None` for an empty store.
    pub fn detect_max_level(&mut self, loader: &dyn TileLoader) -> Option<u32> {
        let mut max = None;
        for level in 0..=MAX_PROBED_LEVEL {
            if !loader.has_level(level) {
                break;
            }
            max = Some(level);
        }
        debug!(max_level = ?max, "detected maximum tile level");
        self.max_level = max;
        max
    }

    pub fn tile_level_for(&self, radius: f64) -> u32 {
        let level = tile_level_for_radius(&self.layout, radius);
        level.min(self.max_level.unwrap_or(0))
    }
}
