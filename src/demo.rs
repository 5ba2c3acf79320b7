//! Procedural planet used when no theme is given: raster tiles are
//! painted on demand from coarse continent outlines, vector tiles carry a
//! graticule, coastlines and a handful of cities.

use std::collections::HashMap;
use std::sync::Arc;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use image::{Rgba, RgbaImage};
use parking_lot::RwLock;

use crate::error::Result;
use crate::map::projection::{ProjectionSampler, TileProjection};
use crate::scene::{MapTheme, ThemeHead};
use crate::tile::{TextureTile, TileId, TileLayout, TileLoader};
use crate::vector::{tile2lat, tile2lon, VectorTileData, VectorTileSource};

/// Simplified continent outlines (lon, lat in degrees)
const CONTINENTS: &[&[(f64, f64)]] = &[
    // North America
    &[
        (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
        (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
        (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
        (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
        (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
        (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
        (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
        (-168.0, 65.0),
    ],
    // South America
    &[
        (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
        (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
        (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
        (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
        (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
        (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
    ],
    // Europe
    &[
        (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
        (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
        (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
        (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
        (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
        (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
    ],
    // Africa
    &[
        (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
        (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
        (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
        (40.0, -5.0), (40.0, -15.0), (35.0, -25.0), (30.0, -30.0),
        (20.0, -35.0), (18.0, -35.0), (15.0, -30.0), (12.0, -15.0),
        (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0), (-10.0, 5.0),
        (-15.0, 10.0), (-17.0, 15.0),
    ],
    // Asia
    &[
        (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
        (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
        (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
        (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
        (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
        (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
        (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
        (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
        (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        (35.0, 42.0),
    ],
    // Australia
    &[
        (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
        (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
        (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
        (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
    ],
];

const CITIES: &[(f64, f64, &str)] = &[
    (-74.0, 40.7, "New York"),
    (-0.1, 51.5, "London"),
    (2.3, 48.9, "Paris"),
    (139.7, 35.7, "Tokyo"),
    (151.2, -33.9, "Sydney"),
    (-43.2, -22.9, "Rio"),
    (37.6, 55.8, "Moscow"),
    (116.4, 39.9, "Beijing"),
    (77.2, 28.6, "Delhi"),
    (-118.2, 34.0, "Los Angeles"),
    (-99.1, 19.4, "Mexico City"),
    (-58.4, -34.6, "Buenos Aires"),
];

/// Theme of the procedural planet
pub fn demo_theme() -> MapTheme {
    MapTheme {
        head: ThemeHead {
            name: "Procedural Earth".to_string(),
            target: "earth".to_string(),
            theme: "procedural".to_string(),
            background_color: "#000000".to_string(),
        },
        texture: None,
        vector: None,
    }
}

/// Even-odd point in polygon test
fn point_in_ring(lon: f64, lat: f64, ring: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn is_land(lon: f64, lat: f64) -> bool {
    CONTINENTS.iter().any(|ring| point_in_ring(lon, lat, ring))
}

/// Surface color at (lon, lat) in degrees
pub fn terrain_color(lon: f64, lat: f64) -> Rgba<u8> {
    if !(-70.0..=78.0).contains(&lat) {
        return Rgba([232, 238, 245, 255]);
    }

    // low amplitude ripple so magnified tiles show structure
    let ripple = ((lon * 0.7).to_radians().sin() * (lat * 1.3).to_radians().cos() * 40.0).sin() * 6.0;
    let shade = |base: f64| (base + ripple).clamp(0.0, 255.0) as u8;

    if is_land(lon, lat) {
        let t = (lat.abs() / 60.0).min(1.0);
        Rgba([shade(70.0 + 90.0 * t), shade(120.0 - 10.0 * t), shade(50.0 + 40.0 * t), 255])
    } else {
        let warm = lat.to_radians().cos();
        Rgba([shade(10.0), shade(40.0 + 40.0 * warm), shade(90.0 + 50.0 * warm), 255])
    }
}

/// Equirectangular raster tiles painted on first use and kept in memory
pub struct ProceduralTileStore {
    layout: TileLayout,
    max_level: u32,
    cache: RwLock<HashMap<TileId, Arc<TextureTile>>>,
}

impl ProceduralTileStore {
    pub fn new(layout: TileLayout, max_level: u32) -> Self {
        Self {
            layout,
            max_level,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn paint(&self, id: TileId) -> TextureTile {
        let sampler = ProjectionSampler::new(TileProjection::Equirectangular, &self.layout, id.level);
        let (x0, y0, _, _) = id.pixel_extent(&self.layout);
        let image = RgbaImage::from_fn(self.layout.tile_width, self.layout.tile_height, |px, py| {
            let gx = (x0 + px as i64) as f64 + 0.5;
            let gy = (y0 + py as i64) as f64 + 0.5;
            let (lon, lat) = sampler.position_to_lon_lat(gx, gy);
            terrain_color(lon.to_degrees(), lat.to_degrees())
        });
        TextureTile::new(id, image)
    }
}

impl TileLoader for ProceduralTileStore {
    fn layout(&self) -> TileLayout {
        self.layout
    }

    fn load_tile(&self, id: TileId) -> Option<Arc<TextureTile>> {
        if id.level > self.max_level || !self.layout.contains(&id) {
            return None;
        }
        if let Some(tile) = self.cache.read().get(&id) {
            return Some(Arc::clone(tile));
        }
        let tile = Arc::new(self.paint(id));
        self.cache.write().insert(id, Arc::clone(&tile));
        Some(tile)
    }

    fn has_level(&self, level: u32) -> bool {
        level <= self.max_level
    }

    fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

/// GeoJSON tiles on the slippy grid
pub struct DemoVectorSource;

/// Graticule spacing in degrees for a zoom level
fn graticule_spacing(level: u32) -> f64 {
    match level {
        0..=1 => 30.0,
        2..=3 => 10.0,
        4..=5 => 5.0,
        _ => 1.0,
    }
}

/// Multiples of `step` in `[from, to)`
fn multiples(from: f64, to: f64, step: f64) -> impl Iterator<Item = f64> {
    let first = (from / step).ceil() as i64;
    let last = ((to / step).ceil() as i64) - 1;
    (first..=last).map(move |i| i as f64 * step)
}

fn line_feature(coords: Vec<(f64, f64)>, kind: &str) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("kind".to_string(), JsonValue::from(kind));
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(
            coords.into_iter().map(|(lon, lat)| vec![lon, lat]).collect(),
        ))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn point_feature(lon: f64, lat: f64, name: &str) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), JsonValue::from(name));
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![lon, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

impl DemoVectorSource {
    /// Features of one tile
    pub fn features(&self, id: TileId) -> Vec<Feature> {
        let n = 1u32 << id.level;
        let west = tile2lon(id.x as f64, n);
        let east = tile2lon(id.x as f64 + 1.0, n);
        let north = tile2lat(id.y as f64, n);
        let south = tile2lat(id.y as f64 + 1.0, n);
        let inside = |(lon, lat): (f64, f64)| lon >= west && lon <= east && lat >= south && lat <= north;

        let mut features = Vec::new();
        let spacing = graticule_spacing(id.level);

        for lon in multiples(west, east, spacing) {
            features.push(line_feature(vec![(lon, south), (lon, north)], "meridian"));
        }
        for lat in multiples(south, north, spacing) {
            let steps = ((east - west) / 2.0).ceil().max(1.0) as usize;
            let coords = (0..=steps)
                .map(|i| (west + (east - west) * i as f64 / steps as f64, lat))
                .collect();
            features.push(line_feature(coords, "parallel"));
        }

        // coastline runs with at least one vertex inside the tile
        for ring in CONTINENTS {
            let mut run: Vec<(f64, f64)> = Vec::new();
            for pair in ring.windows(2) {
                if inside(pair[0]) || inside(pair[1]) {
                    if run.is_empty() {
                        run.push(pair[0]);
                    }
                    run.push(pair[1]);
                } else if run.len() >= 2 {
                    features.push(line_feature(std::mem::take(&mut run), "coastline"));
                } else {
                    run.clear();
                }
            }
            if run.len() >= 2 {
                features.push(line_feature(run, "coastline"));
            }
        }

        for &(lon, lat, name) in CITIES {
            if inside((lon, lat)) {
                features.push(point_feature(lon, lat, name));
            }
        }

        features
    }
}

impl VectorTileSource for DemoVectorSource {
    fn load_vector_tile(&self, id: TileId) -> Result<VectorTileData> {
        let collection = FeatureCollection {
            bbox: None,
            features: self.features(id),
            foreign_members: None,
        };
        Ok(VectorTileData::new("geojson", GeoJson::from(collection).to_string().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::decode_document;

    #[test]
    fn test_land_and_sea() {
        assert!(is_land(20.0, 0.0));
        assert!(is_land(-100.0, 45.0));
        assert!(!is_land(-30.0, 0.0));
        assert!(!is_land(-150.0, 0.0));
        assert_ne!(terrain_color(20.0, 0.0), terrain_color(-30.0, 0.0));
        assert_eq!(terrain_color(0.0, -80.0), Rgba([232, 238, 245, 255]));
    }

    #[test]
    fn test_procedural_store() {
        let store = ProceduralTileStore::new(TileLayout::new(16, 16, 2, 1), 3);
        assert!(store.has_level(3));
        assert!(!store.has_level(4));
        assert!(store.load_tile(TileId::new(4, 0, 0)).is_none());
        assert!(store.load_tile(TileId::new(0, 2, 0)).is_none());

        let tile = store.load_tile(TileId::new(1, 1, 1)).unwrap();
        assert_eq!(tile.width(), 16);
        assert!(Arc::ptr_eq(&tile, &store.load_tile(TileId::new(1, 1, 1)).unwrap()));
        store.clear_cache();
        assert!(!Arc::ptr_eq(&tile, &store.load_tile(TileId::new(1, 1, 1)).unwrap()));
    }

    #[test]
    fn test_vector_tile_decodes() {
        let id = TileId::new(1, 1, 0);
        let data = DemoVectorSource.load_vector_tile(id).unwrap();
        let doc = decode_document(id, data).unwrap();
        let GeoJson::FeatureCollection(fc) = doc else {
            panic!("expected a feature collection");
        };
        // north-east quadrant: Beijing, Tokyo, Moscow, Delhi, Paris
        let names: Vec<_> = fc
            .features
            .iter()
            .filter_map(|f| f.properties.as_ref()?.get("name")?.as_str().map(str::to_string))
            .collect();
        assert!(names.contains(&"Tokyo".to_string()));
        assert!(!names.contains(&"Sydney".to_string()));
        assert!(fc.features.len() > names.len());
    }

    #[test]
    fn test_multiples() {
        let v: Vec<f64> = multiples(-45.0, 30.0, 30.0).collect();
        assert_eq!(v, vec![-30.0, 0.0]);
    }
}
