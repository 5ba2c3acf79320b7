//! Scanline texture mapping.
//!
//! The mapper fills a [`Canvas`] row by row. Every output pixel is
//! inverse-projected to longitude/latitude, placed on the global canvas of
//! the current pyramid level and sampled from the tile covering it. The
//! tile under the last sample stays resident, so consecutive samples
//! inside one tile cost a bounds check and an image read.

pub mod level;
mod smooth;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::Rgba;
use tracing::{debug, trace};

use crate::map::projection::{ProjectionSampler, TileProjection};
use crate::map::view::{Projection, ViewParams};
use crate::raster::{Canvas, TRANSPARENT};
use crate::tile::{TextureTile, TileId, TileLayout, TileLoader};

pub use level::{tile_level_for_radius, TileLevelSelector};
pub use smooth::bilinear;

/// Where the mapper is in its tile resolution cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapperState {
    /// No tile resident; the next sample resolves one
    Idle,
    /// A tile has just been loaded for the current sample
    TileResolved,
    /// Samples are being read from the resident tile
    Sampling,
}

/// Emitted once per completed `map_texture` pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapChanged {
    pub level: u32,
    pub tiles: usize,
}

/// A tile together with its origin on the global canvas
struct ResidentTile {
    id: TileId,
    tile: Option<Arc<TextureTile>>,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl ResidentTile {
    #[inline(always)]
    fn contains(&self, gx: i64, gy: i64) -> bool {
        gx >= self.x0 && gx < self.x1 && gy >= self.y0 && gy < self.y1
    }

    #[inline(always)]
    fn pixel(&self, gx: i64, gy: i64) -> Rgba<u8> {
        match &self.tile {
            Some(tile) => tile.pixel((gx - self.x0) as u32, (gy - self.y0) as u32),
            None => TRANSPARENT,
        }
    }
}

/// Fills an output raster from a tile pyramid under the view projection.
pub struct ScanlineTextureMapper {
    loader: Arc<dyn TileLoader>,
    layout: TileLayout,
    selector: TileLevelSelector,
    max_level_probed: bool,
    level: u32,
    sampler: ProjectionSampler,
    state: MapperState,
    resident: Option<ResidentTile>,
    neighbor: Option<ResidentTile>,
    last_valid: Option<Arc<TextureTile>>,
    /// What was drawn for tiles the store lacks, keyed by the missing id
    stand_ins: HashMap<TileId, Option<Arc<TextureTile>>>,
    last_sample: Option<(f64, f64)>,
    image_size: (usize, usize),
    interlaced: bool,
    resolutions: u64,
    on_display: BTreeSet<TileId>,
    subscribers: Vec<Sender<MapChanged>>,
}

impl ScanlineTextureMapper {
    pub fn new(loader: Arc<dyn TileLoader>, projection: TileProjection) -> Self {
        let layout = loader.layout();
        Self {
            loader,
            layout,
            selector: TileLevelSelector::new(layout),
            max_level_probed: false,
            level: 0,
            sampler: ProjectionSampler::new(projection, &layout, 0),
            state: MapperState::Idle,
            resident: None,
            neighbor: None,
            last_valid: None,
            stand_ins: HashMap::new(),
            last_sample: None,
            image_size: (0, 0),
            interlaced: false,
            resolutions: 0,
            on_display: BTreeSet::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> MapperState {
        self.state
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    pub fn tile_projection(&self) -> TileProjection {
        self.sampler.projection()
    }

    pub fn tile_level(&self) -> u32 {
        self.level
    }

    pub fn max_tile_level(&self) -> Option<u32> {
        self.selector.max_level()
    }

    pub fn interlaced(&self) -> bool {
        self.interlaced
    }

    pub fn set_interlaced(&mut self, interlaced: bool) {
        self.interlaced = interlaced;
    }

    /// Number of times a tile was resolved for the resident slot
    pub fn tile_resolutions(&self) -> u64 {
        self.resolutions
    }

    /// Last longitude/latitude passed to [`pixel_value`](Self::pixel_value)
    pub fn last_sample(&self) -> Option<(f64, f64)> {
        self.last_sample
    }

    /// Id of the tile currently resident, if any
    pub fn resident_tile(&self) -> Option<TileId> {
        self.resident.as_ref().map(|r| r.id)
    }

    /// Tiles read during the last pass, in id order
    pub fn tiles_on_display(&self) -> Vec<TileId> {
        self.on_display.iter().copied().collect()
    }

    pub fn subscribe_map_changed(&mut self) -> Receiver<MapChanged> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Output size changed
    pub fn resize_map(&mut self, width: usize, height: usize) {
        self.image_size = (width, height);
        self.reset();
    }

    /// Swap the tile pyramid. The maximum level is probed again on the
    /// next pass.
    pub fn set_texture_layer(&mut self, loader: Arc<dyn TileLoader>, projection: TileProjection) {
        self.layout = loader.layout();
        self.loader = loader;
        self.selector = TileLevelSelector::new(self.layout);
        self.max_level_probed = false;
        self.last_valid = None;
        self.sampler = ProjectionSampler::new(projection, &self.layout, self.level);
        self.reset();
    }

    pub fn set_tile_projection(&mut self, projection: TileProjection) {
        if projection != self.sampler.projection() {
            self.sampler = ProjectionSampler::new(projection, &self.layout, self.level);
            self.reset();
        }
    }

    pub fn set_max_tile_level(&mut self, level: u32) {
        self.selector.set_max_level(level);
        self.max_level_probed = true;
    }

    /// Choose the level for a view radius and switch to it if it differs
    pub fn select_tile_level(&mut self, radius: f64) -> u32 {
        if !self.max_level_probed {
            self.selector.detect_max_level(self.loader.as_ref());
            self.max_level_probed = true;
        }
        let level = self.selector.tile_level_for(radius);
        if level != self.level {
            self.tile_level_init(level);
        }
        level
    }

    /// Recompute the normalization constants for `level`
    pub fn tile_level_init(&mut self, level: u32) {
        debug!(from = self.level, to = level, "switching tile level");
        self.level = level;
        self.sampler = ProjectionSampler::new(self.sampler.projection(), &self.layout, level);
        self.reset();
    }

    fn reset(&mut self) {
        self.state = MapperState::Idle;
        self.resident = None;
        self.neighbor = None;
        self.last_sample = None;
        self.stand_ins.clear();
    }

    /// Forget the stand-ins built for missing tiles
    pub fn clear_cache(&mut self) {
        self.stand_ins.clear();
    }

    /// Fractional tile column and row under the view center at `level`
    pub fn center_tiles(&self, view: &ViewParams, level: u32) -> (f64, f64) {
        let sampler = ProjectionSampler::new(self.sampler.projection(), &self.layout, level);
        let (gx, gy) = sampler.global_position(view.center_lon, view.center_lat);
        (gx / self.layout.tile_width as f64, gy / self.layout.tile_height as f64)
    }

    /// Color of the texture at (lon, lat) in radians
    #[inline]
    pub fn pixel_value(&mut self, lon: f64, lat: f64, smooth: bool) -> Rgba<u8> {
        let (gx, gy) = self.sampler.global_position(lon, lat);
        self.last_sample = Some((lon, lat));

        let (ix, iy) = (gx as i64, gy as i64);
        if !self.resident.as_ref().is_some_and(|r| r.contains(ix, iy)) {
            self.next_tile(ix, iy);
        }
        self.state = MapperState::Sampling;

        if smooth {
            self.bilinear_smooth(gx, gy)
        } else {
            self.resident.as_ref().map_or(TRANSPARENT, |r| r.pixel(ix, iy))
        }
    }

    /// Load the tile covering a global pixel into the resident slot
    fn next_tile(&mut self, gx: i64, gy: i64) {
        let id = self.layout.global_to_tile(gx, gy, self.level).id;
        let resident = self.resolve(id);
        self.resident = Some(resident);
        self.resolutions += 1;
        self.state = MapperState::TileResolved;
    }

    fn resolve(&mut self, id: TileId) -> ResidentTile {
        let (x0, y0, x1, y1) = id.pixel_extent(&self.layout);
        self.on_display.insert(id);

        if let Some(tile) = self.stand_ins.get(&id) {
            return ResidentTile { id, tile: tile.clone(), x0, y0, x1, y1 };
        }

        let tile = match self.loader.load_tile(id) {
            Some(tile) => {
                self.last_valid = Some(Arc::clone(&tile));
                Some(tile)
            }
            None => {
                trace!(tile = %id, "tile missing");
                let stand_in = self.fallback_tile(id);
                self.stand_ins.insert(id, stand_in.clone());
                stand_in
            }
        };
        ResidentTile { id, tile, x0, y0, x1, y1 }
    }

    fn fallback_tile(&self, id: TileId) -> Option<Arc<TextureTile>> {
        let mut ancestor = id.parent();
        while let Some(parent) = ancestor {
            if let Some(tile) = self.loader.load_tile(parent) {
                return Some(Arc::new(smooth::upscale_from_ancestor(&tile, id, &self.layout)));
            }
            ancestor = parent.parent();
        }
        self.last_valid.clone()
    }

    /// 2×2 interpolation centered on the sample point. Neighbours outside
    /// the resident tile come from the adjacent tile.
    fn bilinear_smooth(&mut self, gx: f64, gy: f64) -> Rgba<u8> {
        let sx = gx - 0.5;
        let sy = gy - 0.5;
        let fx0 = sx.floor();
        let fy0 = sy.floor();
        let (fx, fy) = (sx - fx0, sy - fy0);

        let gw = self.sampler.global_width();
        let gh = self.sampler.global_height();
        let xa = (fx0 as i64).rem_euclid(gw);
        let xb = (fx0 as i64 + 1).rem_euclid(gw);
        let ya = (fy0 as i64).clamp(0, gh - 1);
        let yb = (fy0 as i64 + 1).clamp(0, gh - 1);

        let samples = [
            self.global_pixel(xa, ya),
            self.global_pixel(xb, ya),
            self.global_pixel(xa, yb),
            self.global_pixel(xb, yb),
        ];
        bilinear(samples, fx, fy)
    }

    #[inline]
    fn global_pixel(&mut self, gx: i64, gy: i64) -> Rgba<u8> {
        if let Some(r) = self.resident.as_ref().filter(|r| r.contains(gx, gy)) {
            return r.pixel(gx, gy);
        }
        if let Some(n) = self.neighbor.as_ref().filter(|n| n.contains(gx, gy)) {
            return n.pixel(gx, gy);
        }
        let id = self.layout.global_to_tile(gx, gy, self.level).id;
        let neighbor = self.resolve(id);
        let color = neighbor.pixel(gx, gy);
        self.neighbor = Some(neighbor);
        color
    }

    /// Paint the whole canvas for `view`, then notify subscribers once.
    pub fn map_texture(&mut self, view: &ViewParams, canvas: &mut Canvas) {
        if canvas.width() != view.width || canvas.height() != view.height {
            canvas.resize(view.width, view.height);
        }
        if self.image_size != (view.width, view.height) {
            self.resize_map(view.width, view.height);
        }
        self.select_tile_level(view.radius);
        self.on_display.clear();

        let step = if self.interlaced { 2 } else { 1 };
        let globe = view.globe();
        let cx = view.width as f64 * 0.5;
        let cy = view.height as f64 * 0.5;

        for y in (0..view.height).step_by(step) {
            let row = canvas.scanline_mut(y);
            let py = y as f64 + 0.5;

            match view.projection {
                Projection::Spherical => {
                    let sy = -(py - cy) / view.radius;
                    if sy.abs() > 1.0 {
                        row.fill(TRANSPARENT);
                    } else {
                        for (x, px) in row.iter_mut().enumerate() {
                            let sx = (x as f64 + 0.5 - cx) / view.radius;
                            *px = match globe.unproject(sx, sy) {
                                Some((lon, lat)) => self.pixel_value(lon, lat, view.smooth),
                                None => TRANSPARENT,
                            };
                        }
                    }
                }
                Projection::Equirectangular | Projection::Mercator => match view.row_latitude(py) {
                    Some(lat) => {
                        for (x, px) in row.iter_mut().enumerate() {
                            let lon = view.column_longitude(x as f64 + 0.5);
                            *px = self.pixel_value(lon, lat, view.smooth);
                        }
                    }
                    None => row.fill(TRANSPARENT),
                },
            }

            if self.interlaced {
                canvas.copy_scanline(y, y + 1);
            }
        }

        self.notify_map_changed();
    }

    fn notify_map_changed(&mut self) {
        let event = MapChanged {
            level: self.level,
            tiles: self.on_display.len(),
        };
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::MemoryTileStore;
    use std::f64::consts::PI;

    fn tile_color(id: TileId) -> Rgba<u8> {
        Rgba([(id.x * 60) as u8, (id.y * 60) as u8, 100, 255])
    }

    /// Pyramid of solid tiles colored by their column and row
    fn solid_store(layout: TileLayout, max_level: u32) -> Arc<MemoryTileStore> {
        let store = MemoryTileStore::new(layout);
        for level in 0..=max_level {
            for y in 0..layout.rows(level) {
                for x in 0..layout.columns(level) {
                    let id = TileId::new(level, x, y);
                    store.insert(TextureTile::solid(id, layout.tile_width, layout.tile_height, tile_color(id)));
                }
            }
        }
        Arc::new(store)
    }

    #[test]
    fn test_resident_tile_reused_until_boundary() {
        let layout = TileLayout::new(16, 16, 2, 1);
        let mut mapper = ScanlineTextureMapper::new(solid_store(layout, 2), TileProjection::Equirectangular);
        mapper.set_max_tile_level(2);
        mapper.tile_level_init(2);
        assert_eq!(mapper.state(), MapperState::Idle);

        // eastward sweep along the equator from just past the seam
        let steps = 1000;
        let mut columns = BTreeSet::new();
        for i in 0..steps {
            let lon = -PI + 1e-6 + i as f64 * (2.0 * PI - 2e-6) / steps as f64;
            mapper.pixel_value(lon, 0.01, false);
            let (gx, _) = mapper.sampler.global_position(lon, 0.01);
            columns.insert(gx as i64 / 16);
        }
        assert_eq!(columns.len(), 8);
        assert_eq!(mapper.tile_resolutions(), columns.len() as u64);
        assert_eq!(mapper.state(), MapperState::Sampling);
    }

    #[test]
    fn test_partial_sweep_counts_boundaries() {
        let layout = TileLayout::new(16, 16, 1, 1);
        let mut mapper = ScanlineTextureMapper::new(solid_store(layout, 3), TileProjection::Equirectangular);
        mapper.set_max_tile_level(3);
        mapper.tile_level_init(3);

        // 8 columns of 45° each; -30°..100° crosses 0°, 45° and 90°
        let (start, end) = ((-30f64).to_radians(), 100f64.to_radians());
        for i in 0..=500 {
            mapper.pixel_value(start + (end - start) * i as f64 / 500.0, 0.2, false);
        }
        assert_eq!(mapper.tile_resolutions(), 4);
        assert_eq!(mapper.resident_tile(), Some(TileId::new(3, 6, 3)));
    }

    #[test]
    fn test_mercator_level_two_end_to_end() {
        let layout = TileLayout::new(16, 16, 1, 1);
        let store = solid_store(layout, 2);
        let mut mapper = ScanlineTextureMapper::new(store, TileProjection::Mercator);

        let mut view = ViewParams::new(Projection::Mercator, 0.0, 0.0, 16.0, 64, 64);
        view.smooth = false;
        let mut canvas = Canvas::new(64, 64);
        mapper.map_texture(&view, &mut canvas);
        assert_eq!(mapper.tile_level(), 2);

        let sampler = ProjectionSampler::new(TileProjection::Mercator, &layout, 2);
        for y in 0..64 {
            for x in 0..64 {
                let expected = match view.unproject(x as f64 + 0.5, y as f64 + 0.5) {
                    Some((lon, lat)) => {
                        let (gx, gy) = sampler.global_position(lon, lat);
                        tile_color(layout.global_to_tile(gx as i64, gy as i64, 2).id)
                    }
                    None => TRANSPARENT,
                };
                assert_eq!(canvas.pixel(x, y), expected, "pixel {x},{y}");
            }
        }

        // with smoothing, pixels away from tile seams keep the tile color
        view.smooth = true;
        mapper.map_texture(&view, &mut canvas);
        let mut checked = 0;
        for y in 0..64 {
            for x in 0..64 {
                let Some((lon, lat)) = view.unproject(x as f64 + 0.5, y as f64 + 0.5) else {
                    continue;
                };
                let (gx, gy) = sampler.global_position(lon, lat);
                let (tx, ty) = (gx.rem_euclid(16.0), gy.rem_euclid(16.0));
                if !(1.0..15.0).contains(&tx) || !(1.0..15.0).contains(&ty) {
                    continue;
                }
                let expected = tile_color(layout.global_to_tile(gx as i64, gy as i64, 2).id);
                let got = canvas.pixel(x, y);
                for c in 0..4 {
                    assert!((got[c] as i32 - expected[c] as i32).abs() <= 1, "pixel {x},{y}");
                }
                checked += 1;
            }
        }
        assert!(checked > 100);
    }

    #[test]
    fn test_smoothing_stitches_across_tiles() {
        let layout = TileLayout::new(4, 4, 2, 1);
        let store = MemoryTileStore::new(layout);
        store.insert(TextureTile::solid(TileId::new(0, 0, 0), 4, 4, Rgba([200, 0, 0, 255])));
        store.insert(TextureTile::solid(TileId::new(0, 1, 0), 4, 4, Rgba([0, 0, 200, 255])));
        let mut mapper = ScanlineTextureMapper::new(Arc::new(store), TileProjection::Equirectangular);
        mapper.set_max_tile_level(0);

        // global x = 4.0 is the seam between the two tiles
        let sampler = ProjectionSampler::new(TileProjection::Equirectangular, &layout, 0);
        let (lon, lat) = sampler.position_to_lon_lat(4.0, 2.0);
        let color = mapper.pixel_value(lon, lat, true);
        assert_eq!(color, Rgba([100, 0, 100, 255]));
        assert_eq!(mapper.tiles_on_display().len(), 2);
    }

    #[test]
    fn test_missing_tiles_fall_back() {
        let layout = TileLayout::new(8, 8, 1, 1);
        let store = MemoryTileStore::new(layout);
        store.insert(TextureTile::solid(TileId::new(0, 0, 0), 8, 8, Rgba([10, 20, 30, 255])));
        store.insert(TextureTile::solid(TileId::new(1, 0, 0), 8, 8, Rgba([1, 1, 1, 255])));
        let mut mapper = ScanlineTextureMapper::new(Arc::new(store), TileProjection::Equirectangular);
        mapper.set_max_tile_level(1);
        mapper.tile_level_init(1);

        // tile 1/1/1 is missing; its ancestor 0/0/0 stands in
        assert_eq!(mapper.pixel_value(1.0, -0.5, false), Rgba([10, 20, 30, 255]));
    }

    /// Counts `load_tile` calls on the wrapped store
    struct CountingLoader {
        inner: MemoryTileStore,
        loads: std::sync::atomic::AtomicUsize,
    }

    impl TileLoader for CountingLoader {
        fn layout(&self) -> TileLayout {
            self.inner.layout()
        }

        fn load_tile(&self, id: TileId) -> Option<Arc<TextureTile>> {
            self.loads.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.inner.load_tile(id)
        }

        fn has_level(&self, level: u32) -> bool {
            self.inner.has_level(level)
        }
    }

    #[test]
    fn test_stand_ins_built_once_per_missing_tile() {
        use std::sync::atomic::Ordering;

        let layout = TileLayout::new(16, 16, 2, 1);
        let inner = MemoryTileStore::new(layout);
        for x in 0..2 {
            let id = TileId::new(0, x, 0);
            inner.insert(TextureTile::solid(id, 16, 16, tile_color(id)));
        }
        let loader = Arc::new(CountingLoader {
            inner,
            loads: Default::default(),
        });
        let mut mapper = ScanlineTextureMapper::new(loader.clone(), TileProjection::Equirectangular);
        mapper.set_max_tile_level(1);

        let view = ViewParams::new(Projection::Equirectangular, 0.0, 0.0, 64.0, 400, 200);
        let mut canvas = Canvas::new(400, 200);
        mapper.map_texture(&view, &mut canvas);
        assert_eq!(mapper.tile_level(), 1);
        assert!(mapper.tile_resolutions() > 100);

        // level 1 is 4×2 tiles, each costing one miss and one ancestor load
        let first_pass = loader.loads.load(Ordering::Relaxed);
        assert!(first_pass <= 16, "{first_pass} loads");
        // lon wraps to ~150°E, inside missing 1/3/0 whose parent is 0/1/0
        assert_eq!(canvas.pixel(50, 50), tile_color(TileId::new(0, 1, 0)));

        mapper.map_texture(&view, &mut canvas);
        assert_eq!(loader.loads.load(Ordering::Relaxed), first_pass);

        mapper.clear_cache();
        mapper.map_texture(&view, &mut canvas);
        assert!(loader.loads.load(Ordering::Relaxed) > first_pass);
    }

    #[test]
    fn test_empty_store_samples_transparent() {
        let layout = TileLayout::new(8, 8, 1, 1);
        let mut mapper =
            ScanlineTextureMapper::new(Arc::new(MemoryTileStore::new(layout)), TileProjection::Mercator);
        let view = ViewParams::world(Projection::Mercator, 40, 20);
        let mut canvas = Canvas::new(1, 1);
        mapper.map_texture(&view, &mut canvas);
        assert_eq!((canvas.width(), canvas.height()), (40, 20));
        assert!(canvas.rows().flatten().all(|p| *p == TRANSPARENT));
        assert_eq!(mapper.max_tile_level(), None);
    }

    #[test]
    fn test_last_valid_tile_reused() {
        let layout = TileLayout::new(8, 8, 2, 1);
        let store = MemoryTileStore::new(layout);
        store.insert(TextureTile::solid(TileId::new(0, 0, 0), 8, 8, Rgba([5, 6, 7, 255])));
        let mut mapper = ScanlineTextureMapper::new(Arc::new(store), TileProjection::Equirectangular);
        mapper.set_max_tile_level(0);

        assert_eq!(mapper.pixel_value(-1.0, 0.0, false), Rgba([5, 6, 7, 255]));
        // 0/1/0 has no tile and no ancestor
        assert_eq!(mapper.pixel_value(1.0, 0.0, false), Rgba([5, 6, 7, 255]));
    }

    #[test]
    fn test_interlaced_rows_duplicate() {
        let layout = TileLayout::new(16, 16, 1, 1);
        let mut mapper = ScanlineTextureMapper::new(solid_store(layout, 3), TileProjection::Equirectangular);
        mapper.set_interlaced(true);
        let mut view = ViewParams::new(Projection::Equirectangular, 0.3, 0.2, 30.0, 50, 41);
        view.smooth = false;
        let mut canvas = Canvas::new(50, 41);
        mapper.map_texture(&view, &mut canvas);

        for y in (0..40).step_by(2) {
            assert_eq!(canvas.scanline(y), canvas.scanline(y + 1));
        }
    }

    #[test]
    fn test_spherical_center_and_outside() {
        let layout = TileLayout::new(16, 16, 1, 1);
        let mut mapper = ScanlineTextureMapper::new(solid_store(layout, 0), TileProjection::Equirectangular);
        let store_color = tile_color(TileId::new(0, 0, 0));

        let mut view = ViewParams::new(Projection::Spherical, 0.0, 0.0, 20.0, 60, 60);
        view.smooth = false;
        let mut canvas = Canvas::new(60, 60);
        mapper.map_texture(&view, &mut canvas);
        assert_eq!(canvas.pixel(30, 30), store_color);
        assert_eq!(canvas.pixel(0, 0), TRANSPARENT);
        assert_eq!(canvas.pixel(59, 30), TRANSPARENT);
    }

    #[test]
    fn test_resize_returns_to_idle() {
        let layout = TileLayout::new(16, 16, 1, 1);
        let mut mapper = ScanlineTextureMapper::new(solid_store(layout, 1), TileProjection::Equirectangular);
        mapper.pixel_value(0.0, 0.0, false);
        assert_eq!(mapper.state(), MapperState::Sampling);
        assert!(mapper.last_sample().is_some());

        mapper.resize_map(10, 10);
        assert_eq!(mapper.state(), MapperState::Idle);
        assert!(mapper.last_sample().is_none());

        mapper.pixel_value(0.0, 0.0, false);
        mapper.set_tile_projection(TileProjection::Mercator);
        assert_eq!(mapper.tile_projection(), TileProjection::Mercator);
        assert_eq!(mapper.state(), MapperState::Idle);
    }

    #[test]
    fn test_map_changed_once_per_pass() {
        let layout = TileLayout::new(16, 16, 1, 1);
        let mut mapper = ScanlineTextureMapper::new(solid_store(layout, 2), TileProjection::Equirectangular);
        let rx = mapper.subscribe_map_changed();
        let dropped = mapper.subscribe_map_changed();
        drop(dropped);

        let view = ViewParams::world(Projection::Equirectangular, 64, 32);
        let mut canvas = Canvas::new(64, 32);
        mapper.map_texture(&view, &mut canvas);
        mapper.map_texture(&view, &mut canvas);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, mapper.tile_level());
        assert!(events[0].tiles > 0);
        assert_eq!(mapper.subscribers.len(), 1);
    }

    #[test]
    fn test_center_tiles() {
        let layout = TileLayout::new(16, 16, 2, 1);
        let mapper = ScanlineTextureMapper::new(solid_store(layout, 0), TileProjection::Equirectangular);
        let view = ViewParams::new(Projection::Equirectangular, 0.0, 0.0, 50.0, 10, 10);
        let (cx, cy) = mapper.center_tiles(&view, 1);
        assert!((cx - 2.0).abs() < 1e-9);
        assert!((cy - 1.0).abs() < 1e-9);
    }
}
