use std::sync::Arc;

use crossbeam_channel::Receiver;
use image::Rgba;
use tracing::{debug, info};

use crate::error::Result;
use crate::map::projection::TileProjection;
use crate::map::view::ViewParams;
use crate::raster::Canvas;
use crate::scene::MapTheme;
use crate::texture::{MapChanged, ScanlineTextureMapper};
use crate::tile::{DirTileStore, TileLayout, TileLoader};
use crate::vector::{DirVectorSource, TileCompleted, VectorTileModel, VectorTileSource};

/// A map theme with its raster and vector layers attached
pub struct MapModel {
    theme: MapTheme,
    loader: Option<Arc<dyn TileLoader>>,
    mapper: Option<ScanlineTextureMapper>,
    vector: Option<VectorTileModel>,
}

impl MapModel {
    /// Open the tile directories named by `theme`
    pub fn new(theme: MapTheme) -> Result<Self> {
        let mut model = Self::empty(theme.clone());

        if let Some(texture) = &theme.texture {
            let store = DirTileStore::new(&texture.source_dir, &texture.file_suffix, texture.layout());
            model.set_texture_layer(Arc::new(store), texture.projection, texture.max_level);
        }
        if let Some(vector) = &theme.vector {
            let source = DirVectorSource::new(&vector.source_dir, &vector.format);
            model.set_vector_layer(Arc::new(source), vector.layout(), vector.worker_threads, vector.max_level)?;
        }

        info!(
            name = %theme.head.name,
            texture = theme.has_texture_layer(),
            vector = theme.has_vector_layer(),
            "map model ready"
        );
        Ok(model)
    }

    /// A model with no layers attached
    pub fn empty(theme: MapTheme) -> Self {
        Self {
            theme,
            loader: None,
            mapper: None,
            vector: None,
        }
    }

    pub fn theme(&self) -> &MapTheme {
        &self.theme
    }

    pub fn set_texture_layer(&mut self, loader: Arc<dyn TileLoader>, projection: TileProjection, max_level: Option<u32>) {
        match &mut self.mapper {
            Some(mapper) => mapper.set_texture_layer(Arc::clone(&loader), projection),
            None => self.mapper = Some(ScanlineTextureMapper::new(Arc::clone(&loader), projection)),
        }
        if let (Some(mapper), Some(level)) = (&mut self.mapper, max_level) {
            mapper.set_max_tile_level(level);
        }
        self.loader = Some(loader);
    }

    pub fn set_vector_layer(
        &mut self,
        source: Arc<dyn VectorTileSource>,
        layout: TileLayout,
        threads: usize,
        max_level: Option<u32>,
    ) -> Result<()> {
        let mut model = VectorTileModel::new(source, layout, threads)?;
        if let Some(level) = max_level {
            model = model.with_max_level(level);
        }
        self.vector = Some(model);
        Ok(())
    }

    pub fn texture_mapper(&self) -> Option<&ScanlineTextureMapper> {
        self.mapper.as_ref()
    }

    pub fn texture_mapper_mut(&mut self) -> Option<&mut ScanlineTextureMapper> {
        self.mapper.as_mut()
    }

    pub fn vector_model(&self) -> Option<&VectorTileModel> {
        self.vector.as_ref()
    }

    /// Paint the texture layer for `view` over the theme background
    pub fn paint_globe(&mut self, view: &ViewParams, canvas: &mut Canvas) {
        let background = self.theme.background();
        match &mut self.mapper {
            Some(mapper) => {
                mapper.map_texture(view, canvas);
                composite_over(canvas, background);
            }
            None => {
                canvas.resize(view.width, view.height);
                canvas.fill(background);
            }
        }
    }

    /// Pyramid level used by the last paint
    pub fn tile_zoom_level(&self) -> Option<u32> {
        self.mapper.as_ref().map(|m| m.tile_level())
    }

    /// Request the vector tiles visible in `view`; returns the number of
    /// jobs submitted
    pub fn update_vector_tiles(&mut self, view: &ViewParams) -> usize {
        let Some(vector) = &mut self.vector else {
            return 0;
        };
        let level = vector.tile_level_for(view.radius);
        let bbox = view.visible_bounds();
        vector.set_viewport(&bbox, level)
    }

    pub fn drain_vector_tiles(&self) -> Vec<TileCompleted> {
        self.vector.as_ref().map(|v| v.drain_completed()).unwrap_or_default()
    }

    pub fn clear_volatile_tile_cache(&mut self) {
        debug!("clearing volatile tile cache");
        if let Some(loader) = &self.loader {
            loader.clear_cache();
        }
        if let Some(mapper) = &mut self.mapper {
            mapper.clear_cache();
        }
    }

    pub fn subscribe_map_changed(&mut self) -> Option<Receiver<MapChanged>> {
        self.mapper.as_mut().map(|m| m.subscribe_map_changed())
    }
}

/// Blend every pixel over an opaque or translucent background color
fn composite_over(canvas: &mut Canvas, background: Rgba<u8>) {
    for px in canvas.pixels_mut() {
        let a = px[3] as u32;
        if a == 255 {
            continue;
        }
        let inv = 255 - a;
        let blend = |s: u8, b: u8| ((s as u32 * a + b as u32 * inv + 127) / 255) as u8;
        *px = Rgba([
            blend(px[0], background[0]),
            blend(px[1], background[1]),
            blend(px[2], background[2]),
            (a + (background[3] as u32 * inv + 127) / 255) as u8,
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{demo_theme, DemoVectorSource, ProceduralTileStore};
    use crate::map::view::Projection;
    use crate::raster::TRANSPARENT;
    use crate::scene::parse_color;
    use crate::tile::store::relative_tile_file_name;
    use crate::tile::TileId;
    use image::RgbaImage;
    use std::time::Duration;

    fn demo_model() -> MapModel {
        let mut model = MapModel::empty(demo_theme());
        let store = ProceduralTileStore::new(TileLayout::new(32, 32, 2, 1), 3);
        model.set_texture_layer(Arc::new(store), TileProjection::Equirectangular, None);
        model
            .set_vector_layer(Arc::new(DemoVectorSource), TileLayout::slippy(), 2, Some(6))
            .unwrap();
        model
    }

    #[test]
    fn test_paint_globe_composites_background() {
        let mut model = demo_model();
        let view = ViewParams::world(Projection::Spherical, 60, 40);
        let mut canvas = Canvas::new(60, 40);
        model.paint_globe(&view, &mut canvas);

        assert!(canvas.pixels().iter().all(|p| p[3] == 255));
        assert_eq!(canvas.pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_ne!(canvas.pixel(30, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(model.tile_zoom_level(), Some(1));
    }

    #[test]
    fn test_without_texture_layer() {
        let mut model = MapModel::empty(demo_theme());
        let view = ViewParams::world(Projection::Mercator, 20, 10);
        let mut canvas = Canvas::new(1, 1);
        model.paint_globe(&view, &mut canvas);
        assert_eq!((canvas.width(), canvas.height()), (20, 10));
        assert!(canvas.pixels().iter().all(|p| *p == Rgba([0, 0, 0, 255])));
        assert_eq!(model.tile_zoom_level(), None);
        assert_eq!(model.update_vector_tiles(&view), 0);
        assert!(model.subscribe_map_changed().is_none());
    }

    #[test]
    fn test_vector_tiles_follow_view() {
        let mut model = demo_model();
        let view = ViewParams::world(Projection::Equirectangular, 128, 64);
        let submitted = model.update_vector_tiles(&view);
        assert!(submitted > 0);
        assert_eq!(model.update_vector_tiles(&view), 0);

        let vector = model.vector_model().unwrap();
        assert!(vector.wait_idle(Duration::from_secs(10)));
        assert_eq!(model.drain_vector_tiles().len(), submitted);
    }

    #[test]
    fn test_map_changed_through_model() {
        let mut model = demo_model();
        let rx = model.subscribe_map_changed().unwrap();
        let view = ViewParams::world(Projection::Mercator, 32, 32);
        let mut canvas = Canvas::new(32, 32);
        model.paint_globe(&view, &mut canvas);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_composite() {
        let mut canvas = Canvas::new(3, 1);
        canvas.set_pixel(1, 0, Rgba([200, 100, 0, 255]));
        canvas.set_pixel(2, 0, Rgba([200, 0, 0, 128]));
        composite_over(&mut canvas, Rgba([0, 0, 200, 255]));
        assert_eq!(canvas.pixel(0, 0), Rgba([0, 0, 200, 255]));
        assert_eq!(canvas.pixel(1, 0), Rgba([200, 100, 0, 255]));
        assert_eq!(canvas.pixel(2, 0), Rgba([100, 0, 100, 255]));
        assert_ne!(canvas.pixel(2, 0), TRANSPARENT);
    }

    #[test]
    fn test_model_from_theme_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for x in 0..2 {
            let path = dir.path().join("raster").join(relative_tile_file_name(TileId::new(0, x, 0), "png"));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            RgbaImage::from_pixel(8, 8, Rgba([0, 200, 0, 255])).save(&path).unwrap();
        }
        let toml = r##"
[head]
name = "disk"
background_color = "#202020"

[texture]
source_dir = "raster"
projection = "equirectangular"
tile_width = 8
tile_height = 8
file_suffix = "png"

[vector]
source_dir = "vector"
worker_threads = 1
"##;
        let theme = MapTheme::from_toml(toml, dir.path()).unwrap();
        let mut model = MapModel::new(theme).unwrap();
        assert_eq!(model.vector_model().unwrap().threads(), 1);

        let view = ViewParams::world(Projection::Equirectangular, 16, 8);
        let mut canvas = Canvas::new(16, 8);
        model.paint_globe(&view, &mut canvas);
        assert_eq!(canvas.pixel(8, 4), Rgba([0, 200, 0, 255]));
        assert_eq!(model.tile_zoom_level(), Some(0));
        assert_eq!(model.theme().background(), parse_color("#202020").unwrap());

        // vector directory is empty: jobs run but emit nothing
        assert!(model.update_vector_tiles(&view) > 0);
        assert!(model.vector_model().unwrap().wait_idle(Duration::from_secs(10)));
        assert!(model.drain_vector_tiles().is_empty());

        model.clear_volatile_tile_cache();
    }
}
