use tracing::debug;

use crate::map::renderer::Label;
use crate::map::{Projection, VectorOverlay, ViewParams};
use crate::model::MapModel;
use crate::raster::Canvas;

/// Map pixels for a terminal size. Half-block cells give one pixel per
/// column and two per row; the border takes two columns, border and
/// status bar take three rows.
pub fn pixel_size(cols: usize, rows: usize) -> (usize, usize) {
    (cols.saturating_sub(2).max(1), (rows.saturating_sub(3) * 2).max(2))
}

/// Application state
pub struct App {
    pub view: ViewParams,
    pub model: MapModel,
    pub overlay: VectorOverlay,
    pub canvas: Canvas,
    pub labels: Vec<Label>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    initial_projection: Projection,
    dirty: bool,
}

impl App {
    pub fn new(model: MapModel, projection: Projection, cols: usize, rows: usize) -> Self {
        let (width, height) = pixel_size(cols, rows);
        Self {
            view: ViewParams::world(projection, width, height),
            model,
            overlay: VectorOverlay::new(),
            canvas: Canvas::new(width, height),
            labels: Vec::new(),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            initial_projection: projection,
            dirty: true,
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let (width, height) = pixel_size(cols, rows);
        self.view.set_size(width, height);
        self.dirty = true;
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.view.pan(dx, dy);
        self.dirty = true;
    }

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
        self.dirty = true;
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
        self.dirty = true;
    }

    /// Zoom in towards a terminal cell
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.view.zoom_at(px, py, 1.5);
        self.dirty = true;
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.view.zoom_at(px, py, 1.0 / 1.5);
        self.dirty = true;
    }

    pub fn cycle_projection(&mut self) {
        self.view.set_projection(self.view.projection.next());
        self.overlay.clear();
        self.dirty = true;
    }

    pub fn toggle_interlace(&mut self) {
        if let Some(mapper) = self.model.texture_mapper_mut() {
            let interlaced = !mapper.interlaced();
            mapper.set_interlaced(interlaced);
            self.dirty = true;
        }
    }

    pub fn toggle_smooth(&mut self) {
        self.view.smooth = !self.view.smooth;
        self.dirty = true;
    }

    pub fn toggle_vector(&mut self) {
        self.overlay.toggle_lines();
        self.dirty = true;
    }

    pub fn toggle_labels(&mut self) {
        self.overlay.toggle_labels();
        self.dirty = true;
    }

    /// Back to the whole-planet view
    pub fn reset(&mut self) {
        self.view = ViewParams::world(self.initial_projection, self.view.width, self.view.height);
        self.model.clear_volatile_tile_cache();
        self.overlay.clear();
        self.dirty = true;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    /// Pull finished vector tiles into the overlay; returns how many
    /// were taken
    pub fn update(&mut self) -> usize {
        let Some(vector) = self.model.vector_model() else {
            return 0;
        };
        let mut taken = 0;
        for event in self.model.drain_vector_tiles() {
            if vector.is_current(&event) {
                self.overlay.insert(event);
                taken += 1;
            }
        }
        if taken > 0 {
            self.dirty = true;
        }
        taken
    }

    /// Repaint the texture, request vector tiles for the view and draw the
    /// overlay
    pub fn redraw(&mut self) {
        self.model.paint_globe(&self.view, &mut self.canvas);

        let submitted = self.model.update_vector_tiles(&self.view);
        if let Some(vector) = self.model.vector_model() {
            self.overlay.retain(|id| vector.is_requested(id));
        }
        self.labels = self.overlay.render(&mut self.canvas, &self.view);

        debug!(
            projection = %self.view.projection,
            radius = self.view.radius,
            submitted,
            overlay_tiles = self.overlay.tile_count(),
            "redraw"
        );
        self.dirty = false;
    }

    /// Projection, tile level, center tile and vector tile count for the
    /// status bar
    pub fn status_summary(&self) -> String {
        let tile = self.model.texture_mapper().map(|mapper| {
            let level = mapper.tile_level();
            let (tx, ty) = mapper.center_tiles(&self.view, level);
            format!("L{level} {}/{}", tx.floor(), ty.floor())
        });
        format!(
            "{} {} {}t",
            self.view.projection,
            tile.as_deref().unwrap_or("L-"),
            self.overlay.tile_count()
        )
    }

    /// Current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let lat = self.view.center_lat.to_degrees();
        let lon = self.view.center_lon.to_degrees();
        format!(
            "{:.1}°{}, {:.1}°{}",
            lat.abs(),
            if lat >= 0.0 { "N" } else { "S" },
            lon.abs(),
            if lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Coordinates under the mouse, if it is over the planet
    pub fn cursor_coords(&self) -> Option<String> {
        let (px, py) = self.mouse_pixel_pos()?;
        let (lon, lat) = self.view.unproject(px as f64 + 0.5, py as f64 + 0.5)?;
        Some(format!("{:.2}, {:.2}", lat.to_degrees(), lon.to_degrees()))
    }

    /// Pan by the drag distance since the last mouse event
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = (last_y as i32 - y as i32) * 2;
            if dx != 0 || dy != 0 {
                self.pan(dx, dy);
            }
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in map pixels
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }
}

/// Terminal cell to map pixel, accounting for the one-cell border
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    (col.saturating_sub(1) as i32, row.saturating_sub(1) as i32 * 2)
}
