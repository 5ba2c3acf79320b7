use glam::DVec3;
use std::f64::consts::PI;

use crate::geo::{wrap_lon, LatLonBox};

/// Orthographic view of the unit sphere looking at a center point.
/// Orientation stored as an orthonormal basis so per-pixel unprojection
/// is three multiply-adds and one square root.
#[derive(Clone, Copy, Debug)]
pub struct Globe {
    /// Direction from the planet center towards the viewer
    forward: DVec3,
    /// Screen right, pointing east at the center
    right: DVec3,
    /// Screen up, pointing north at the center
    up: DVec3,
}

impl Globe {
    /// Build a globe centered on (lon, lat) in radians.
    pub fn new(center_lon: f64, center_lat: f64) -> Self {
        let forward = lonlat_to_vec3(center_lon, center_lat);

        // Derivative of forward w.r.t. latitude (points north on sphere)
        let raw_up = DVec3::new(
            -center_lat.sin() * center_lon.cos(),
            -center_lat.sin() * center_lon.sin(),
            center_lat.cos(),
        );

        let right = raw_up.cross(forward).normalize();
        let up = forward.cross(right).normalize();

        Self { forward, right, up }
    }

    /// Center lon/lat the globe is looking at, in radians.
    pub fn center(&self) -> (f64, f64) {
        vec3_to_lonlat(self.forward)
    }

    /// Unproject unit-disk coordinates (x right, y up) to lon/lat in radians.
    /// Returns `None` outside the disk.
    #[inline(always)]
    pub fn unproject(&self, sx: f64, sy: f64) -> Option<(f64, f64)> {
        let r2 = sx * sx + sy * sy;
        if r2 > 1.0 {
            return None;
        }

        let sz = (1.0 - r2).sqrt();
        let p = self.right * sx + self.up * sy + self.forward * sz;
        Some(vec3_to_lonlat(p))
    }

    /// Project lon/lat (radians) to unit-disk coordinates.
    /// Returns `None` for points on the far hemisphere.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let p = lonlat_to_vec3(lon, lat);
        if p.dot(self.forward) < 0.0 {
            return None;
        }
        Some((p.dot(self.right), p.dot(self.up)))
    }

    /// Conservative bounding box (degrees) of the part of the globe inside
    /// a screen rectangle. `half_width` and `half_height` are the
    /// rectangle's half extents in unit-disk units, i.e. pixels divided by
    /// the globe radius.
    ///
    /// Away from the poles latitude and longitude take their extremes on the
    /// region's boundary, so sampling the rectangle edges clipped to the
    /// disk rim is enough. A pole on screen opens the box to every meridian.
    pub fn visible_bounds(&self, half_width: f64, half_height: f64) -> LatLonBox {
        const EDGE_SAMPLES: usize = 32;

        // beyond 1.5 the rectangle already contains the disk on that axis
        let hw = half_width.min(1.5);
        let hh = half_height.min(1.5);
        let (clon, clat) = self.center();

        let mut min_dlon = 0.0f64;
        let mut max_dlon = 0.0f64;
        let mut min_lat = clat;
        let mut max_lat = clat;

        let mut visit = |sx: f64, sy: f64| {
            let (lon, lat) = vec3_to_lonlat(self.disk_point(sx, sy));
            let dlon = wrap_lon(lon - clon);
            min_dlon = min_dlon.min(dlon);
            max_dlon = max_dlon.max(dlon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        };
        for i in 0..=EDGE_SAMPLES {
            let t = 2.0 * i as f64 / EDGE_SAMPLES as f64 - 1.0;
            visit(t * hw, hh);
            visit(t * hw, -hh);
            visit(hw, t * hh);
            visit(-hw, t * hh);
        }

        // a pole on the horizon shows no meridians beyond the rim
        let on_screen = |lat: f64| {
            let facing = lat.signum() * self.forward.z > 0.0;
            facing
                && self
                    .project(0.0, lat)
                    .is_some_and(|(sx, sy)| sx.abs() <= hw && sy.abs() <= hh)
        };
        let north_pole = on_screen(PI / 2.0);
        let south_pole = on_screen(-PI / 2.0);
        if north_pole {
            max_lat = PI / 2.0;
        }
        if south_pole {
            min_lat = -PI / 2.0;
        }

        let (west, east) = if north_pole || south_pole || max_dlon - min_dlon > PI + 1e-9 {
            (-180.0, 180.0)
        } else {
            let west = wrap_lon(clon + min_dlon).to_degrees();
            // east stays in (-180, 180] so a box ending on the antimeridian
            // does not read as crossing it
            let east = 180.0 - (180.0 - (clon + max_dlon).to_degrees()).rem_euclid(360.0);
            (west, east)
        };

        LatLonBox::new(
            max_lat.to_degrees().min(90.0),
            min_lat.to_degrees().max(-90.0),
            east,
            west,
        )
    }

    /// Sphere point under unit-disk coordinates, moved onto the rim when
    /// outside the disk
    #[inline]
    fn disk_point(&self, sx: f64, sy: f64) -> DVec3 {
        let r2 = sx * sx + sy * sy;
        if r2 > 1.0 {
            let r = r2.sqrt();
            return self.right * (sx / r) + self.up * (sy / r);
        }
        self.right * sx + self.up * sy + self.forward * (1.0 - r2).sqrt()
    }
}

/// Convert lon/lat (radians) to a unit sphere vector.
#[inline(always)]
fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    DVec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

#[inline(always)]
fn vec3_to_lonlat(p: DVec3) -> (f64, f64) {
    (p.y.atan2(p.x), p.z.clamp(-1.0, 1.0).asin())
}

/// Interpolate along a great circle arc (radians) and call a visitor for
/// each subdivision point. ~2° segments, no allocation.
#[inline]
pub fn walk_great_circle(lon0: f64, lat0: f64, lon1: f64, lat1: f64, mut visitor: impl FnMut(f64, f64)) {
    let a = lonlat_to_vec3(lon0, lat0);
    let b = lonlat_to_vec3(lon1, lat1);

    let angle = a.dot(b).clamp(-1.0, 1.0).acos();
    let steps = ((angle.to_degrees() / 2.0).ceil() as usize).max(1);

    let sin_angle = angle.sin();
    if steps == 1 || sin_angle.abs() < 1e-10 {
        visitor(lon1, lat1);
        return;
    }

    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let sa = ((1.0 - t) * angle).sin() / sin_angle;
        let sb = (t * angle).sin() / sin_angle;
        let (lon, lat) = vec3_to_lonlat(a * sa + b * sb);
        visitor(lon, lat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_center_unprojects_to_center() {
        let globe = Globe::new(0.4, -0.2);
        let (lon, lat) = globe.unproject(0.0, 0.0).unwrap();
        assert_abs_diff_eq!(lon, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(lat, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_right_is_east_and_up_is_north() {
        let globe = Globe::new(0.0, 0.0);
        let (lon, lat) = globe.unproject(0.5, 0.0).unwrap();
        assert!(lon > 0.0);
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-12);
        let (_, lat) = globe.unproject(0.0, 0.5).unwrap();
        assert!(lat > 0.0);
    }

    #[test]
    fn test_outside_disk() {
        let globe = Globe::new(0.0, 0.0);
        assert!(globe.unproject(0.8, 0.8).is_none());
    }

    #[test]
    fn test_project_round_trip() {
        let globe = Globe::new(1.0, 0.5);
        let (sx, sy) = globe.project(1.2, 0.3).unwrap();
        let (lon, lat) = globe.unproject(sx, sy).unwrap();
        assert_abs_diff_eq!(lon, 1.2, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 0.3, epsilon = 1e-9);
        assert!(globe.project(1.0 + PI, -0.5).is_none());
    }

    #[test]
    fn test_visible_bounds_includes_pole() {
        let bounds = Globe::new(0.0, 1.2).visible_bounds(1.5, 1.5);
        assert_eq!(bounds.north, 90.0);
        assert_eq!((bounds.west, bounds.east), (-180.0, 180.0));

        // whole disk at the equator: one hemisphere of longitude
        let bounds = Globe::new(0.0, 0.0).visible_bounds(1.5, 1.5);
        assert_abs_diff_eq!(bounds.width(), 180.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bounds.north, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bounds.south, -90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_visible_bounds_follow_screen() {
        // 200×100 pixels at radius 5000
        let globe = Globe::new(0.2, 0.3);
        let bounds = globe.visible_bounds(0.02, 0.01);
        let span = 2.0 * 0.02f64.asin().to_degrees();
        assert!(bounds.width() >= span * 0.95 && bounds.width() < span * 1.5, "{bounds:?}");
        assert!(bounds.north - bounds.south < 1.5);
        assert!(bounds.west < 0.2f64.to_degrees() && bounds.east > 0.2f64.to_degrees());
        assert!(bounds.south < 0.3f64.to_degrees() && bounds.north > 0.3f64.to_degrees());
    }

    #[test]
    fn test_visible_bounds_pole_off_screen() {
        let bounds = Globe::new(0.0, 1.2).visible_bounds(0.05, 0.05);
        assert!(bounds.north < 90.0);
        assert!(bounds.width() < 30.0);
    }

    #[test]
    fn test_visible_bounds_across_date_line() {
        let bounds = Globe::new(PI - 0.01, 0.0).visible_bounds(0.05, 0.05);
        assert!(bounds.crosses_date_line());
        assert!(bounds.width() < 10.0, "{bounds:?}");
    }

    #[test]
    fn test_great_circle_ends_at_target() {
        let mut last = (0.0, 0.0);
        let mut count = 0;
        walk_great_circle(0.0, 0.0, 0.5, 0.2, |lon, lat| {
            last = (lon, lat);
            count += 1;
        });
        assert!(count > 1);
        assert_abs_diff_eq!(last.0, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(last.1, 0.2, epsilon = 1e-9);
    }
}
