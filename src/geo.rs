use std::f64::consts::{PI, TAU};

/// Wrap a longitude in radians into [-π, π)
#[inline(always)]
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + PI).rem_euclid(TAU) - PI
}

/// Geographic bounding box in degrees.
///
/// `west > east` describes a box crossing the antimeridian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLonBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl LatLonBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self { north, south, east, west }
    }

    /// The whole planet
    pub fn world() -> Self {
        Self::new(90.0, -90.0, 180.0, -180.0)
    }

    pub fn crosses_date_line(&self) -> bool {
        self.west > self.east
    }

    /// Longitudinal span in degrees, accounting for antimeridian crossing
    pub fn width(&self) -> f64 {
        if self.crosses_date_line() {
            360.0 - (self.west - self.east)
        } else {
            self.east - self.west
        }
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}
