//! Logical pixel buffer the renderer paints into

use crate::display::PixelView;
use crate::font::Glyph;
use crate::theme::Rgb;

use super::Rect;

/// A `width x height` buffer of logical pixels. In strip mode it is one text
/// row tall; in full mode it covers the whole canvas.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    buffer: Vec<Rgb>,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: vec![Rgb::BLACK; (width * height) as usize],
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn clear(&mut self, color: Rgb) {
        self.buffer.fill(color);
    }

    /// Fill a rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let x_end = (rect.x + rect.width).min(self.width);
        let y_end = (rect.y + rect.height).min(self.height);
        for y in rect.y..y_end {
            let start = (y * self.width) as usize;
            if rect.x < x_end {
                self.buffer[start + rect.x as usize..start + x_end as usize].fill(color);
            }
        }
    }

    /// Draw the set pixels of a glyph with its top-left corner at (x, y).
    /// Unset pixels keep whatever is underneath.
    pub fn draw_glyph(&mut self, glyph: &Glyph, x: u32, y: u32, color: Rgb) {
        for gy in 0..glyph.height() {
            let py = y + gy;
            if py >= self.height {
                break;
            }
            for gx in 0..glyph.width() {
                let px = x + gx;
                if px >= self.width {
                    break;
                }
                if glyph.pixel(gx, gy) {
                    self.buffer[(py * self.width + px) as usize] = color;
                }
            }
        }
    }

    /// One-pixel horizontal line
    pub fn hline(&mut self, x: u32, y: u32, width: u32, color: Rgb) {
        self.fill_rect(Rect::new(x, y, width, 1), color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.buffer[(y * self.width + x) as usize]
    }

    /// Full-width band of `height` rows starting at row `y`
    pub fn band(&self, y: u32, height: u32) -> PixelView<'_> {
        let y = y.min(self.height);
        let height = height.min(self.height - y);
        let start = (y * self.width) as usize;
        let end = start + (height * self.width) as usize;
        PixelView::new(self.width, height, &self.buffer[start..end])
    }
}
