use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::geo::{wrap_lon, LatLonBox};
use crate::map::globe::Globe;

/// Latitude (radians) of the edge of a square Mercator world, atan(sinh(π))
pub const MERCATOR_LIMIT_LAT: f64 = 1.484_422_229_745_332_4;

const MIN_RADIUS: f64 = 4.0;
const MAX_RADIUS: f64 = (1u64 << 26) as f64;

/// Projection the viewport is drawn in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    #[default]
    Spherical,
    Equirectangular,
    Mercator,
}

impl Projection {
    /// Cycle to the next projection
    pub fn next(self) -> Self {
        match self {
            Projection::Spherical => Projection::Equirectangular,
            Projection::Equirectangular => Projection::Mercator,
            Projection::Mercator => Projection::Spherical,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Projection::Spherical => "spherical",
            Projection::Equirectangular => "equirectangular",
            Projection::Mercator => "mercator",
        }
    }

    /// Largest latitude the projection can display, radians
    pub fn max_lat(&self) -> f64 {
        match self {
            Projection::Mercator => MERCATOR_LIMIT_LAT,
            _ => PI / 2.0,
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Projection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spherical" | "globe" => Ok(Projection::Spherical),
            "equirectangular" | "equirect" | "flat" => Ok(Projection::Equirectangular),
            "mercator" => Ok(Projection::Mercator),
            other => Err(format!("unknown projection `{other}`")),
        }
    }
}

/// Viewport parameters for one paint: projection, center, scale and size.
///
/// Screen positions are continuous pixel coordinates with the origin in the
/// upper left corner; a pixel `(x, y)` is sampled at `(x + 0.5, y + 0.5)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewParams {
    pub projection: Projection,
    /// Center longitude, radians
    pub center_lon: f64,
    /// Center latitude, radians
    pub center_lat: f64,
    /// Planet radius on screen in pixels (controls zoom)
    pub radius: f64,
    /// Output pixel width
    pub width: usize,
    /// Output pixel height
    pub height: usize,
    /// Bilinear smoothing of texture samples
    pub smooth: bool,
}

impl ViewParams {
    pub fn new(projection: Projection, center_lon: f64, center_lat: f64, radius: f64, width: usize, height: usize) -> Self {
        let mut view = Self {
            projection,
            center_lon: wrap_lon(center_lon),
            center_lat,
            radius: radius.clamp(MIN_RADIUS, MAX_RADIUS),
            width,
            height,
            smooth: true,
        };
        view.clamp_center();
        view
    }

    /// Whole-planet view fitting the output size
    pub fn world(projection: Projection, width: usize, height: usize) -> Self {
        let radius = match projection {
            Projection::Spherical => width.min(height) as f64 * 0.45,
            _ => (width as f64 / 4.0).min(height as f64 / 2.0),
        };
        Self::new(projection, 0.0, 0.0, radius, width, height)
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.clamp_center();
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Pixels per radian in the flat projections
    #[inline(always)]
    pub fn flat_scale(&self) -> f64 {
        2.0 * self.radius / PI
    }

    /// Pixels per radian at the view center
    pub fn pixels_per_radian(&self) -> f64 {
        match self.projection {
            Projection::Spherical => self.radius,
            _ => self.flat_scale(),
        }
    }

    fn clamp_center(&mut self) {
        let max = self.projection.max_lat();
        self.center_lat = self.center_lat.clamp(-max, max);
    }

    /// Pan the view by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.pixels_per_radian();
        self.center_lon = wrap_lon(self.center_lon + dx as f64 / scale);
        match self.projection {
            Projection::Mercator => {
                let y = mercator_y(self.center_lat) - dy as f64 / scale;
                self.center_lat = y.sinh().atan();
            }
            _ => self.center_lat -= dy as f64 / scale,
        }
        self.clamp_center();
    }

    pub fn zoom_in(&mut self) {
        self.radius = (self.radius * 1.5).min(MAX_RADIUS);
    }

    pub fn zoom_out(&mut self) {
        self.radius = (self.radius / 1.5).max(MIN_RADIUS);
    }

    /// Zoom by factor keeping the geographic point under the pixel fixed
    pub fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let target = self.unproject(px as f64 + 0.5, py as f64 + 0.5);
        self.radius = (self.radius * factor).clamp(MIN_RADIUS, MAX_RADIUS);

        if let Some((lon, lat)) = target {
            if let Some((nx, ny)) = self.project(lon, lat) {
                self.pan((nx - px as f64 - 0.5) as i32, (ny - py as f64 - 0.5) as i32);
            }
        }
    }

    /// Latitude of a screen row in the flat projections.
    /// `None` above or below the projection's latitude range.
    #[inline(always)]
    pub fn row_latitude(&self, py: f64) -> Option<f64> {
        let dy = (py - self.height as f64 * 0.5) / self.flat_scale();
        match self.projection {
            Projection::Mercator => {
                let y = mercator_y(self.center_lat) - dy;
                (y.abs() <= PI).then(|| y.sinh().atan())
            }
            _ => {
                let lat = self.center_lat - dy;
                (lat.abs() <= PI / 2.0).then_some(lat)
            }
        }
    }

    /// Longitude of a screen column in the flat projections
    #[inline(always)]
    pub fn column_longitude(&self, px: f64) -> f64 {
        wrap_lon(self.center_lon + (px - self.width as f64 * 0.5) / self.flat_scale())
    }

    /// Globe oriented at the view center
    pub fn globe(&self) -> Globe {
        Globe::new(self.center_lon, self.center_lat)
    }

    /// Unproject a screen position to lon/lat in radians.
    /// `None` off the planet.
    pub fn unproject(&self, px: f64, py: f64) -> Option<(f64, f64)> {
        match self.projection {
            Projection::Spherical => {
                let sx = (px - self.width as f64 * 0.5) / self.radius;
                let sy = -(py - self.height as f64 * 0.5) / self.radius;
                self.globe().unproject(sx, sy)
            }
            _ => self.row_latitude(py).map(|lat| (self.column_longitude(px), lat)),
        }
    }

    /// Project lon/lat (radians) to a screen position.
    /// `None` for points on the far side of the globe.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let cx = self.width as f64 * 0.5;
        let cy = self.height as f64 * 0.5;
        match self.projection {
            Projection::Spherical => self
                .globe()
                .project(lon, lat)
                .map(|(sx, sy)| (cx + sx * self.radius, cy - sy * self.radius)),
            Projection::Equirectangular => {
                let s = self.flat_scale();
                Some((cx + wrap_lon(lon - self.center_lon) * s, cy - (lat - self.center_lat) * s))
            }
            Projection::Mercator => {
                let s = self.flat_scale();
                let lat = lat.clamp(-MERCATOR_LIMIT_LAT, MERCATOR_LIMIT_LAT);
                Some((
                    cx + wrap_lon(lon - self.center_lon) * s,
                    cy - (mercator_y(lat) - mercator_y(self.center_lat)) * s,
                ))
            }
        }
    }

    /// Conservative geographic bounds (degrees) of what is on screen
    pub fn visible_bounds(&self) -> LatLonBox {
        if self.projection == Projection::Spherical {
            let half_width = self.width as f64 * 0.5 / self.radius;
            let half_height = self.height as f64 * 0.5 / self.radius;
            return self.globe().visible_bounds(half_width, half_height);
        }

        let max = self.projection.max_lat();
        let north = self.row_latitude(0.0).unwrap_or(max);
        let south = self.row_latitude(self.height as f64).unwrap_or(-max);

        let span = self.width as f64 / self.flat_scale();
        let (west, east) = if span >= 2.0 * PI - 1e-9 {
            (-180.0, 180.0)
        } else {
            (
                self.column_longitude(0.0).to_degrees(),
                self.column_longitude(self.width as f64).to_degrees(),
            )
        };

        LatLonBox::new(north.to_degrees(), south.to_degrees(), east, west)
    }

    /// Check if a projected point is within the viewport (with a small margin)
    pub fn is_visible(&self, px: f64, py: f64) -> bool {
        px >= -10.0 && px < self.width as f64 + 10.0 && py >= -10.0 && py < self.height as f64 + 10.0
    }
}

/// Mercator ordinate of a latitude, asinh(tan φ)
#[inline(always)]
pub fn mercator_y(lat: f64) -> f64 {
    lat.tan().asinh()
}
