use std::f64::consts::PI;

use crate::geo::LatLonBox;
use crate::tile::{TileId, TileLayout};

/// Latitude (degrees) of the edge of the square Mercator tile grid
pub const MAX_TILE_LAT: f64 = 85.051_128_779_806_59;

/// Tolerance absorbing float error for edges lying on a tile boundary
const EDGE_EPSILON: f64 = 1e-9;

/// Inclusive rectangle of tile indices at one level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRange {
    pub level: u32,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileRange {
    pub fn len(&self) -> usize {
        (self.x1 - self.x0 + 1) as usize * (self.y1 - self.y0 + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TileId) -> bool {
        id.level == self.level && (self.x0..=self.x1).contains(&id.x) && (self.y0..=self.y1).contains(&id.y)
    }

    /// Tiles row by row
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        (self.y0..=self.y1).flat_map(move |y| (self.x0..=self.x1).map(move |x| TileId::new(self.level, x, y)))
    }
}

/// Fractional tile column of a longitude (degrees) on a grid `n` tiles wide
#[inline]
pub fn lon2tile(lon: f64, n: u32) -> f64 {
    (lon + 180.0) / 360.0 * n as f64
}

/// Fractional tile row of a latitude (degrees) on a grid `n` tiles tall
#[inline]
pub fn lat2tile(lat: f64, n: u32) -> f64 {
    let phi = lat.to_radians();
    (1.0 - phi.tan().asinh() / PI) / 2.0 * n as f64
}

/// Longitude (degrees) of the west edge of column `x`
pub fn tile2lon(x: f64, n: u32) -> f64 {
    x / n as f64 * 360.0 - 180.0
}

/// Latitude (degrees) of the north edge of row `y`
pub fn tile2lat(y: f64, n: u32) -> f64 {
    (PI * (1.0 - 2.0 * y / n as f64)).sinh().atan().to_degrees()
}

/// Tile ranges covering `bbox` at `level`.
///
/// West and north edges round down, east and south edges round up minus
/// one, so an edge on a tile boundary does not pull in the next tile. A
/// box crossing the antimeridian yields two ranges; a degenerate box or
/// one outside the Mercator latitude band yields none.
pub fn tile_ranges(bbox: &LatLonBox, level: u32, layout: &TileLayout) -> Vec<TileRange> {
    let finite = [bbox.north, bbox.south, bbox.east, bbox.west].iter().all(|v| v.is_finite());
    if !finite || bbox.is_empty() {
        return Vec::new();
    }

    let north = bbox.north.min(MAX_TILE_LAT);
    let south = bbox.south.max(-MAX_TILE_LAT);
    if north <= south {
        return Vec::new();
    }

    let columns = layout.columns(level);
    let rows = layout.rows(level);
    let y0 = edge_floor(lat2tile(north, rows), rows);
    let y1 = edge_ceil(lat2tile(south, rows), rows);
    let (Some(y0), Some(y1)) = (y0, y1) else {
        return Vec::new();
    };

    let spans: &[(f64, f64)] = if bbox.crosses_date_line() {
        &[(bbox.west, 180.0), (-180.0, bbox.east)]
    } else {
        &[(bbox.west, bbox.east)]
    };

    spans
        .iter()
        .filter_map(|&(west, east)| {
            let west = west.clamp(-180.0, 180.0);
            let east = east.clamp(-180.0, 180.0);
            if east <= west {
                return None;
            }
            let x0 = edge_floor(lon2tile(west, columns), columns)?;
            let x1 = edge_ceil(lon2tile(east, columns), columns)?;
            (x0 <= x1 && y0 <= y1).then_some(TileRange { level, x0, y0, x1, y1 })
        })
        .collect()
}

/// Index of the tile starting at or before `t`
fn edge_floor(t: f64, n: u32) -> Option<u32> {
    let i = (t + EDGE_EPSILON).floor();
    (i < n as f64).then(|| i.max(0.0) as u32)
}

/// Index of the tile ending at or after `t`
fn edge_ceil(t: f64, n: u32) -> Option<u32> {
    let i = (t - EDGE_EPSILON).ceil() - 1.0;
    (i >= 0.0).then(|| (i as u32).min(n - 1))
}
