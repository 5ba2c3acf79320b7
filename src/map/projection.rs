use std::f64::consts::PI;

use serde::Deserialize;

use crate::tile::TileLayout;

/// Latitude (radians) at which Mercator texture sampling saturates
pub const MERCATOR_CLAMP_LAT: f64 = 1.4835;

/// Projection in which a tile pyramid is stored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileProjection {
    #[default]
    Equirectangular,
    Mercator,
}

/// Maps geographic coordinates onto the global canvas of one pyramid level.
///
/// Offsets are measured in pixels from the center of the global canvas;
/// positions are measured from its upper left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionSampler {
    projection: TileProjection,
    global_width: i64,
    global_height: i64,
    norm_width: f64,
    norm_height: f64,
}

impl ProjectionSampler {
    pub fn new(projection: TileProjection, layout: &TileLayout, level: u32) -> Self {
        let global_width = layout.global_width(level);
        let global_height = layout.global_height(level);
        Self {
            projection,
            global_width,
            global_height,
            norm_width: global_width as f64 / (2.0 * PI),
            norm_height: global_height as f64 / PI,
        }
    }

    pub fn projection(&self) -> TileProjection {
        self.projection
    }

    pub fn global_width(&self) -> i64 {
        self.global_width
    }

    pub fn global_height(&self) -> i64 {
        self.global_height
    }

    /// Horizontal pixel offset of a longitude
    #[inline(always)]
    pub fn rad_to_pixel_x(&self, lon: f64) -> f64 {
        lon * self.norm_width
    }

    /// Vertical pixel offset of a latitude
    #[inline(always)]
    pub fn rad_to_pixel_y(&self, lat: f64) -> f64 {
        match self.projection {
            TileProjection::Equirectangular => -lat * self.norm_height,
            TileProjection::Mercator => {
                let lat = lat.clamp(-MERCATOR_CLAMP_LAT, MERCATOR_CLAMP_LAT);
                -lat.tan().asinh() * 0.5 * self.norm_height
            }
        }
    }

    #[inline(always)]
    pub fn offset(&self, lon: f64, lat: f64) -> (f64, f64) {
        (self.rad_to_pixel_x(lon), self.rad_to_pixel_y(lat))
    }

    /// Global pixel position, X wrapped into `[0, width)`, Y clamped into `[0, height)`
    #[inline(always)]
    pub fn global_position(&self, lon: f64, lat: f64) -> (f64, f64) {
        let gw = self.global_width as f64;
        let gh = self.global_height as f64;

        let mut x = (gw * 0.5 + self.rad_to_pixel_x(lon)).rem_euclid(gw);
        if x >= gw {
            x = 0.0;
        }

        let mut y = gh * 0.5 + self.rad_to_pixel_y(lat);
        if y >= gh {
            y = gh - 0.5;
        } else if y < 0.0 {
            y = 0.0;
        }

        (x, y)
    }

    /// Recover longitude/latitude from a pixel offset
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = x / self.norm_width;
        let lat = match self.projection {
            TileProjection::Equirectangular => -y / self.norm_height,
            TileProjection::Mercator => (-y / (0.5 * self.norm_height)).sinh().atan(),
        };
        (lon, lat)
    }

    /// Longitude/latitude at a global pixel position (upper left origin)
    pub fn position_to_lon_lat(&self, gx: f64, gy: f64) -> (f64, f64) {
        self.inverse(gx - self.global_width as f64 * 0.5, gy - self.global_height as f64 * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sampler(projection: TileProjection) -> ProjectionSampler {
        ProjectionSampler::new(projection, &TileLayout::new(256, 256, 2, 1), 3)
    }

    #[test]
    fn test_mercator_saturates_beyond_cutoff() {
        let s = sampler(TileProjection::Mercator);
        let north = s.rad_to_pixel_y(MERCATOR_CLAMP_LAT);
        let south = s.rad_to_pixel_y(-MERCATOR_CLAMP_LAT);
        assert!(north < 0.0 && south > 0.0);

        for lat in [1.4835, 1.49, 1.5, PI / 2.0, 2.0, 10.0] {
            assert_eq!(s.rad_to_pixel_y(lat), north);
            assert_eq!(s.rad_to_pixel_y(-lat), south);
        }
        assert!(s.rad_to_pixel_y(1.48) > north);
    }

    #[test]
    fn test_outside_domain_is_finite() {
        for projection in [TileProjection::Equirectangular, TileProjection::Mercator] {
            let s = sampler(projection);
            for lat in [-100.0, -PI / 2.0, PI / 2.0, 4.0] {
                let (x, y) = s.global_position(7.0, lat);
                assert!(x.is_finite() && y.is_finite());
                assert!(x >= 0.0 && x < s.global_width() as f64);
                assert!(y >= 0.0 && y < s.global_height() as f64);
            }
        }
    }

    #[test]
    fn test_equirect_x_linear_and_monotonic() {
        let s = sampler(TileProjection::Equirectangular);
        let step = s.rad_to_pixel_x(0.1) - s.rad_to_pixel_x(0.0);
        let mut prev = s.rad_to_pixel_x(-PI);
        for i in 1..=200 {
            let lon = -PI + i as f64 * (2.0 * PI / 200.0);
            let x = s.rad_to_pixel_x(lon);
            assert!(x > prev);
            assert_relative_eq!(x, lon / 0.1 * step, max_relative = 1e-9);
            prev = x;
        }
        assert_abs_diff_eq!(s.rad_to_pixel_x(PI), s.global_width() as f64 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip() {
        for projection in [TileProjection::Equirectangular, TileProjection::Mercator] {
            let s = sampler(projection);
            for i in 0..=40 {
                let lon = -PI + i as f64 * (2.0 * PI / 40.0);
                let lat = -1.4 + i as f64 * (2.8 / 40.0);
                let (x, y) = s.offset(lon, lat);
                let (lon2, lat2) = s.inverse(x, y);
                assert_abs_diff_eq!(lon, lon2, epsilon = 1e-12);
                assert_abs_diff_eq!(lat, lat2, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_global_position_wraps_longitude() {
        let s = sampler(TileProjection::Equirectangular);
        let gw = s.global_width() as f64;
        let (x0, _) = s.global_position(-PI, 0.0);
        assert_abs_diff_eq!(x0, 0.0, epsilon = 1e-9);
        let (x1, _) = s.global_position(PI + 0.5, 0.0);
        let (x2, _) = s.global_position(-PI + 0.5, 0.0);
        assert_abs_diff_eq!(x1, x2, epsilon = 1e-9);
        assert!(x1 < gw);
    }

    #[test]
    fn test_mercator_full_square_at_limit() {
        // atan(sinh(π)) maps to the top edge of a square Mercator canvas
        let s = ProjectionSampler::new(TileProjection::Mercator, &TileLayout::new(256, 256, 1, 1), 0);
        let (lon, lat) = s.position_to_lon_lat(0.0, 0.0);
        assert_abs_diff_eq!(lon, -PI, epsilon = 1e-12);
        assert_abs_diff_eq!(lat, PI.sinh().atan(), epsilon = 1e-12);
    }
}
