use image::Rgba;

use crate::raster::Canvas;

/// Integer points of a segment, both endpoints included
pub struct Bresenham {
    x: i32,
    y: i32,
    end: (i32, i32),
    dx: i32,
    dy: i32,
    step: (i32, i32),
    err: i32,
    done: bool,
}

impl Bresenham {
    pub fn new((x0, y0): (i32, i32), (x1, y1): (i32, i32)) -> Self {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        Self {
            x: x0,
            y: y0,
            end: (x1, y1),
            dx,
            dy,
            step: ((x1 - x0).signum(), (y1 - y0).signum()),
            err: dx + dy,
            done: false,
        }
    }
}

impl Iterator for Bresenham {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        if self.done {
            return None;
        }
        let point = (self.x, self.y);
        if point == self.end {
            self.done = true;
            return Some(point);
        }

        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x += self.step.0;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y += self.step.1;
        }
        Some(point)
    }
}

pub fn draw_line(canvas: &mut Canvas, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    for (x, y) in Bresenham::new((x0, y0), (x1, y1)) {
        canvas.set_pixel_signed(x, y, color);
    }
}

/// Draw a point marker (small cross)
pub fn draw_marker(canvas: &mut Canvas, x: i32, y: i32, size: i32, color: Rgba<u8>) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y, color);
        canvas.set_pixel_signed(x, y + i, color);
    }
}

/// Cheap reject for segments entirely on one side of the canvas
pub fn line_might_be_visible(canvas: &Canvas, (x0, y0): (i32, i32), (x1, y1): (i32, i32)) -> bool {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    !((x0 < 0 && x1 < 0) || (y0 < 0 && y1 < 0) || (x0 >= w && x1 >= w) || (y0 >= h && y1 >= h))
}
