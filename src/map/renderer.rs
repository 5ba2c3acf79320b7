use std::collections::HashMap;

use geojson::{GeoJson, Geometry, Value};
use image::Rgba;

use crate::map::geometry::{draw_line, draw_marker, line_might_be_visible};
use crate::map::globe::walk_great_circle;
use crate::map::view::{Projection, ViewParams};
use crate::raster::Canvas;
use crate::tile::TileId;
use crate::vector::TileCompleted;

/// A geographic line (sequence of lon/lat coordinates, degrees)
pub type LineString = Vec<(f64, f64)>;

/// A point feature with an optional `name` property
#[derive(Clone, Debug, PartialEq)]
pub struct PointFeature {
    pub lon: f64,
    pub lat: f64,
    pub name: Option<String>,
}

/// Text to place next to a point, in canvas pixels
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

/// Display settings for the overlay
#[derive(Clone, Debug)]
pub struct OverlaySettings {
    pub show_lines: bool,
    pub show_points: bool,
    pub show_labels: bool,
    pub line_color: Rgba<u8>,
    pub point_color: Rgba<u8>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            show_lines: true,
            show_points: true,
            show_labels: true,
            line_color: Rgba([240, 240, 200, 255]),
            point_color: Rgba([255, 80, 80, 255]),
        }
    }
}

#[derive(Default)]
struct TileFeatures {
    lines: Vec<LineString>,
    points: Vec<PointFeature>,
}

/// Decoded vector tiles drawn on top of the texture
#[derive(Default)]
pub struct VectorOverlay {
    tiles: HashMap<TileId, TileFeatures>,
    pub settings: OverlaySettings,
}

impl VectorOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a completed tile, replacing earlier features of
    /// the same tile
    pub fn insert(&mut self, event: TileCompleted) {
        self.insert_document(event.id, &event.document);
    }

    pub fn insert_document(&mut self, id: TileId, document: &GeoJson) {
        let mut features = TileFeatures::default();
        extract_features(document, |line| features.lines.push(line), |point| features.points.push(point));
        self.tiles.insert(id, features);
    }

    /// Keep only the tiles matching `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(TileId) -> bool) {
        self.tiles.retain(|id, _| keep(*id));
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn line_count(&self) -> usize {
        self.tiles.values().map(|t| t.lines.len()).sum()
    }

    pub fn toggle_lines(&mut self) {
        self.settings.show_lines = !self.settings.show_lines;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Draw every tile's features; returns labels for named points
    pub fn render(&self, canvas: &mut Canvas, view: &ViewParams) -> Vec<Label> {
        let mut labels = Vec::new();

        for features in self.tiles.values() {
            if self.settings.show_lines {
                for line in &features.lines {
                    self.draw_linestring(canvas, line, view);
                }
            }

            if self.settings.show_points {
                for point in &features.points {
                    let Some((px, py)) = view.project(point.lon.to_radians(), point.lat.to_radians()) else {
                        continue;
                    };
                    if !view.is_visible(px, py) {
                        continue;
                    }
                    let (x, y) = (px as i32, py as i32);
                    draw_marker(canvas, x, y, 1, self.settings.point_color);

                    if let (true, Some(name)) = (self.settings.show_labels, &point.name) {
                        labels.push(Label {
                            x: x + 2,
                            y,
                            text: name.clone(),
                        });
                    }
                }
            }
        }

        labels
    }

    /// Draw a linestring, following great circles on the globe
    fn draw_linestring(&self, canvas: &mut Canvas, line: &LineString, view: &ViewParams) {
        if line.len() < 2 {
            return;
        }

        let color = self.settings.line_color;
        let max_jump = view.width.max(view.height) as i32;
        let mut prev_px: Option<(i32, i32)> = None;
        let mut segment = |canvas: &mut Canvas, next: Option<(f64, f64)>| {
            let next = next.map(|(x, y)| (x.round() as i32, y.round() as i32));
            if let (Some(a), Some(b)) = (prev_px, next) {
                // flat projections: a jump across the seam is not a segment
                let jump = (a.0 - b.0).abs() + (a.1 - b.1).abs();
                if jump < max_jump && line_might_be_visible(canvas, a, b) {
                    draw_line(canvas, a.0, a.1, b.0, b.1, color);
                }
            }
            prev_px = next;
        };

        let mut prev: Option<(f64, f64)> = None;
        for &(lon, lat) in line {
            let (lon, lat) = (lon.to_radians(), lat.to_radians());
            match (view.projection, prev) {
                (Projection::Spherical, Some((plon, plat))) => {
                    walk_great_circle(plon, plat, lon, lat, |l, p| segment(canvas, view.project(l, p)));
                }
                _ => segment(canvas, view.project(lon, lat)),
            }
            prev = Some((lon, lat));
        }
    }
}

/// Walk a GeoJSON document, handing out line strings (polygon exteriors
/// included) and points
pub fn extract_features<L, P>(geojson: &GeoJson, mut add_line: L, mut add_point: P)
where
    L: FnMut(LineString),
    P: FnMut(PointFeature),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    let name = feature_name(feature.properties.as_ref());
                    process_geometry(geometry, name.as_deref(), &mut add_line, &mut add_point);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                let name = feature_name(f.properties.as_ref());
                process_geometry(geometry, name.as_deref(), &mut add_line, &mut add_point);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry(geometry, None, &mut add_line, &mut add_point);
        }
    }
}

fn feature_name(props: Option<&geojson::JsonObject>) -> Option<String> {
    props.and_then(|p| p.get("name")).and_then(|v| v.as_str()).map(str::to_string)
}

fn process_geometry<L, P>(geometry: &Geometry, name: Option<&str>, add_line: &mut L, add_point: &mut P)
where
    L: FnMut(LineString),
    P: FnMut(PointFeature),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString { coords.iter().map(|c| (c[0], c[1])).collect() };
    let point = |c: &Vec<f64>| PointFeature {
        lon: c[0],
        lat: c[1],
        name: name.map(str::to_string),
    };

    match &geometry.value {
        Value::Point(c) if c.len() >= 2 => add_point(point(c)),
        Value::MultiPoint(points) => {
            for c in points.iter().filter(|c| c.len() >= 2) {
                add_point(point(c));
            }
        }
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry(g, name, add_line, add_point);
            }
        }
        _ => {}
    }
}
