use image::imageops::{self, FilterType};
use image::Rgba;

use crate::raster::TRANSPARENT;
use crate::tile::{TextureTile, TileId, TileLayout};

/// Bilinear blend of a 2×2 neighbourhood ordered top-left, top-right,
/// bottom-left, bottom-right. Colors are weighted by alpha so transparent
/// texels do not darken their neighbours.
#[inline]
pub fn bilinear(samples: [Rgba<u8>; 4], fx: f64, fy: f64) -> Rgba<u8> {
    let weights = [(1.0 - fx) * (1.0 - fy), fx * (1.0 - fy), (1.0 - fx) * fy, fx * fy];

    let mut acc = [0.0f64; 4];
    for (p, w) in samples.iter().zip(weights) {
        let a = p[3] as f64 / 255.0 * w;
        acc[0] += p[0] as f64 * a;
        acc[1] += p[1] as f64 * a;
        acc[2] += p[2] as f64 * a;
        acc[3] += a;
    }

    if acc[3] <= f64::EPSILON {
        return TRANSPARENT;
    }
    Rgba([
        (acc[0] / acc[3]).round() as u8,
        (acc[1] / acc[3]).round() as u8,
        (acc[2] / acc[3]).round() as u8,
        (acc[3] * 255.0).round() as u8,
    ])
}

/// Stand-in for a missing tile: the matching part of an ancestor tile,
/// scaled up to full tile size.
pub fn upscale_from_ancestor(ancestor: &TextureTile, id: TileId, layout: &TileLayout) -> TextureTile {
    let parent = ancestor.id();
    let scale = 1u32 << (id.level - parent.level);
    let w = (ancestor.width() / scale).max(1);
    let h = (ancestor.height() / scale).max(1);
    let x = (id.x - parent.x * scale) * ancestor.width() / scale;
    let y = (id.y - parent.y * scale) * ancestor.height() / scale;

    let part = imageops::crop_imm(ancestor.image(), x, y, w, h).to_image();
    let image = imageops::resize(&part, layout.tile_width, layout.tile_height, FilterType::Triangle);
    TextureTile::new(id, image)
}
