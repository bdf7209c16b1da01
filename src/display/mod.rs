//! Display sinks
//!
//! A sink takes a block of logical pixels, a destination on the panel and the
//! active rotation, and gets the pixels onto the glass. The renderer never
//! overlaps blits: each call completes before the next one starts.

mod framebuffer;
mod memory;

use crate::renderer::Rotation;
use crate::theme::Rgb;

pub use framebuffer::FramebufferSink;
pub use memory::{MemorySink, RecordedBlit};

/// Errors raised while transferring pixels
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Display IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blit of {width}x{height} at ({x}, {y}) falls outside the {panel_width}x{panel_height} panel")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        panel_width: u32,
        panel_height: u32,
    },
}

/// A borrowed block of logical pixels in row-major order
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    width: u32,
    height: u32,
    pixels: &'a [Rgb],
}

impl<'a> PixelView<'a> {
    /// `pixels` must hold exactly `width * height` entries
    pub fn new(width: u32, height: u32, pixels: &'a [Rgb]) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &'a [Rgb] {
        self.pixels
    }
}

/// Something that can put pixels on a panel
pub trait DisplaySink {
    /// Transfer `view` so that it covers the panel rectangle whose top-left
    /// corner is (`dest_x`, `dest_y`), rotating it by `rotation`
    fn blit(&mut self, view: PixelView<'_>, dest_x: u32, dest_y: u32, rotation: Rotation) -> Result<(), SinkError>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn blit(&mut self, view: PixelView<'_>, dest_x: u32, dest_y: u32, rotation: Rotation) -> Result<(), SinkError> {
        (**self).blit(view, dest_x, dest_y, rotation)
    }
}

/// Check that a rotated view placed at (x, y) stays on a panel
pub(crate) fn check_bounds(
    view: &PixelView<'_>,
    x: u32,
    y: u32,
    rotation: Rotation,
    panel_width: u32,
    panel_height: u32,
) -> Result<(u32, u32), SinkError> {
    let (width, height) = rotation.rotated_size(view.width(), view.height());
    if x + width > panel_width || y + height > panel_height {
        return Err(SinkError::OutOfBounds {
            x,
            y,
            width,
            height,
            panel_width,
            panel_height,
        });
    }
    Ok((width, height))
}
