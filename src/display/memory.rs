//! In-memory display sink
//!
//! Keeps a copy of the panel contents and, when asked to, a log of every
//! blit. Used for headless runs and tests.

use crate::renderer::{Rect, Rotation};
use crate::theme::Rgb;

use super::{check_bounds, DisplaySink, PixelView, SinkError};

/// One blit as the sink received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBlit {
    /// Panel rectangle that was written
    pub dest: Rect,
    pub rotation: Rotation,
}

/// A panel simulated in memory
#[derive(Debug, Clone)]
pub struct MemorySink {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
    blits: Vec<RecordedBlit>,
    log_blits: bool,
    /// Number of upcoming blits that fail
    failures: u32,
}

impl MemorySink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; (width * height) as usize],
            blits: Vec::new(),
            log_blits: false,
            failures: 0,
        }
    }

    /// Record every successful blit in [`blits`](Self::blits)
    pub fn with_log(mut self) -> Self {
        self.log_blits = true;
        self
    }

    /// Make the next `count` blits fail with an IO error
    pub fn fail_next(&mut self, count: u32) {
        self.failures = count;
    }

    /// Panel pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Blits recorded since the last [`take_blits`](Self::take_blits);
    /// always empty unless the sink was built [`with_log`](Self::with_log)
    pub fn blits(&self) -> &[RecordedBlit] {
        &self.blits
    }

    /// Forget the blit log, keeping the panel contents
    pub fn take_blits(&mut self) -> Vec<RecordedBlit> {
        std::mem::take(&mut self.blits)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl DisplaySink for MemorySink {
    fn blit(&mut self, view: PixelView<'_>, dest_x: u32, dest_y: u32, rotation: Rotation) -> Result<(), SinkError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated transfer failure",
            )));
        }
        let (width, height) = check_bounds(&view, dest_x, dest_y, rotation, self.width, self.height)?;

        for v in 0..height {
            for u in 0..width {
                let (x, y) = rotation.source_pixel(u, v, view.width(), view.height());
                let index = ((dest_y + v) * self.width + dest_x + u) as usize;
                self.pixels[index] = view.pixel(x, y);
            }
        }

        if self.log_blits {
            self.blits.push(RecordedBlit {
                dest: Rect::new(dest_x, dest_y, width, height),
                rotation,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(0xff, 0, 0);

    #[test]
    fn test_blit_without_rotation() {
        let mut sink = MemorySink::new(4, 4).with_log();
        let pixels = [RED, Rgb::WHITE];
        sink.blit(PixelView::new(2, 1, &pixels), 1, 2, Rotation::Deg0).unwrap();

        assert_eq!(sink.pixel(1, 2), RED);
        assert_eq!(sink.pixel(2, 2), Rgb::WHITE);
        assert_eq!(sink.pixel(0, 0), Rgb::BLACK);
        assert_eq!(sink.blits()[0].dest, Rect::new(1, 2, 2, 1));
    }

    #[test]
    fn test_blit_rotated_90() {
        // Logical 2x1 strip [RED, WHITE] turned clockwise becomes a column:
        // RED on top, WHITE below
        let mut sink = MemorySink::new(4, 4).with_log();
        let pixels = [RED, Rgb::WHITE];
        sink.blit(PixelView::new(2, 1, &pixels), 3, 0, Rotation::Deg90).unwrap();

        assert_eq!(sink.pixel(3, 0), RED);
        assert_eq!(sink.pixel(3, 1), Rgb::WHITE);
        assert_eq!(sink.blits()[0].dest, Rect::new(3, 0, 1, 2));
    }

    #[test]
    fn test_blit_rotated_180() {
        let mut sink = MemorySink::new(2, 1);
        let pixels = [RED, Rgb::WHITE];
        sink.blit(PixelView::new(2, 1, &pixels), 0, 0, Rotation::Deg180).unwrap();
        assert_eq!(sink.pixel(0, 0), Rgb::WHITE);
        assert_eq!(sink.pixel(1, 0), RED);
    }

    #[test]
    fn test_out_of_bounds_blit_is_rejected() {
        let mut sink = MemorySink::new(2, 2).with_log();
        let pixels = [RED; 3];
        let result = sink.blit(PixelView::new(3, 1, &pixels), 0, 0, Rotation::Deg0);
        assert!(matches!(result, Err(SinkError::OutOfBounds { .. })));
        assert!(sink.blits().is_empty());
    }

    #[test]
    fn test_simulated_failures() {
        let mut sink = MemorySink::new(1, 1);
        sink.fail_next(1);
        let pixels = [RED];
        assert!(sink.blit(PixelView::new(1, 1, &pixels), 0, 0, Rotation::Deg0).is_err());
        assert!(sink.blit(PixelView::new(1, 1, &pixels), 0, 0, Rotation::Deg0).is_ok());
        assert_eq!(sink.pixel(0, 0), RED);
    }

    #[test]
    fn test_unlogged_sink_keeps_no_history() {
        let mut sink = MemorySink::new(4, 1);
        let pixels = [RED; 4];
        for _ in 0..100_000 {
            sink.blit(PixelView::new(4, 1, &pixels), 0, 0, Rotation::Deg0).unwrap();
        }
        assert!(sink.blits().is_empty());
        assert_eq!(sink.pixel(3, 0), RED);
    }

    #[test]
    fn test_take_blits_drains_the_log() {
        let mut sink = MemorySink::new(1, 1).with_log();
        let pixels = [RED];
        sink.blit(PixelView::new(1, 1, &pixels), 0, 0, Rotation::Deg0).unwrap();
        assert_eq!(sink.take_blits().len(), 1);
        assert!(sink.blits().is_empty());
    }
}
