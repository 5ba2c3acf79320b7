use image::{Rgba, RgbaImage};

/// Fully transparent pixel, written where no texture is sampled
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// RGBA output raster filled by the texture mapper one scanline at a time.
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgba<u8>>,
}

impl Canvas {
    /// Create a transparent canvas with the given pixel dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resize, discarding contents
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, TRANSPARENT);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        self.pixels.fill(color);
    }

    #[inline(always)]
    pub fn pixel(&self, x: usize, y: usize) -> Rgba<u8> {
        self.pixels[y * self.width + x]
    }

    /// Set a pixel, ignoring coordinates outside the canvas
    #[inline(always)]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgba<u8>) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// One row of pixels
    pub fn scanline(&self, y: usize) -> &[Rgba<u8>] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn scanline_mut(&mut self, y: usize) -> &mut [Rgba<u8>] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Copy row `src` over row `dst`
    pub fn copy_scanline(&mut self, src: usize, dst: usize) {
        if src == dst || src >= self.height || dst >= self.height {
            return;
        }
        let w = self.width;
        self.pixels.copy_within(src * w..(src + 1) * w, dst * w);
    }

    pub fn pixels(&self) -> &[Rgba<u8>] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba<u8>] {
        &mut self.pixels
    }

    /// All rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Rgba<u8>]> + '_ {
        self.pixels.chunks(self.width.max(1)).take(self.height)
    }

    /// Copy into an `image` buffer, e.g. for saving as PNG
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| self.pixel(x as usize, y as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let canvas = Canvas::new(3, 2);
        assert!(canvas.rows().flatten().all(|p| *p == TRANSPARENT));
        assert_eq!(canvas.rows().count(), 2);
    }

    #[test]
    fn test_set_pixel_ignores_out_of_bounds() {
        let mut canvas = Canvas::new(2, 2);
        canvas.set_pixel(5, 0, Rgba([1, 1, 1, 255]));
        canvas.set_pixel_signed(-1, 0, Rgba([1, 1, 1, 255]));
        canvas.set_pixel(1, 1, Rgba([2, 2, 2, 255]));
        assert_eq!(canvas.pixel(1, 1), Rgba([2, 2, 2, 255]));
        assert_eq!(canvas.rows().flatten().filter(|p| **p != TRANSPARENT).count(), 1);
    }

    #[test]
    fn test_copy_scanline() {
        let mut canvas = Canvas::new(2, 3);
        canvas.scanline_mut(0).fill(Rgba([7, 7, 7, 255]));
        canvas.copy_scanline(0, 2);
        assert_eq!(canvas.scanline(2), canvas.scanline(0));
        assert_eq!(canvas.pixel(0, 1), TRANSPARENT);
    }

    #[test]
    fn test_to_image() {
        let mut canvas = Canvas::new(2, 1);
        canvas.set_pixel(1, 0, Rgba([9, 8, 7, 6]));
        let image = canvas.to_image();
        assert_eq!(*image.get_pixel(1, 0), Rgba([9, 8, 7, 6]));
    }
}
