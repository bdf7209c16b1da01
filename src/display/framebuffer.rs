//! Linux framebuffer sink
//!
//! Writes RGB565 pixels straight into a framebuffer device such as the
//! `/dev/fb1` exposed by fbtft for ST7789 and ILI9341 panels.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::renderer::Rotation;

use super::{check_bounds, DisplaySink, PixelView, SinkError};

const BYTES_PER_PIXEL: u32 = 2;

/// A 16 bpp framebuffer with rows packed back to back
pub struct FramebufferSink {
    file: File,
    path: PathBuf,
    width: u32,
    height: u32,
    /// One destination row of encoded pixels
    scratch: Vec<u8>,
}

impl FramebufferSink {
    /// Open the device (or any file standing in for it) for writing
    pub fn open(path: &Path, width: u32, height: u32) -> Result<Self, SinkError> {
        let file = OpenOptions::new().write(true).open(path)?;
        tracing::info!("Opened framebuffer {} ({}x{} RGB565)", path.display(), width, height);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            width,
            height,
            scratch: Vec::with_capacity((width * BYTES_PER_PIXEL) as usize),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DisplaySink for FramebufferSink {
    fn blit(&mut self, view: PixelView<'_>, dest_x: u32, dest_y: u32, rotation: Rotation) -> Result<(), SinkError> {
        let (width, height) = check_bounds(&view, dest_x, dest_y, rotation, self.width, self.height)?;

        for v in 0..height {
            self.scratch.clear();
            for u in 0..width {
                let (x, y) = rotation.source_pixel(u, v, view.width(), view.height());
                self.scratch
                    .extend_from_slice(&view.pixel(x, y).to_rgb565().to_le_bytes());
            }
            let offset = u64::from(((dest_y + v) * self.width + dest_x) * BYTES_PER_PIXEL);
            self.file.write_all_at(&self.scratch, offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Rgb;

    #[test]
    fn test_writes_rgb565_little_endian() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(4 * 2 * 2).unwrap();
        let mut sink = FramebufferSink::open(file.path(), 4, 2).unwrap();

        let pixels = [Rgb::new(0xff, 0, 0), Rgb::WHITE];
        sink.blit(PixelView::new(2, 1, &pixels), 1, 1, Rotation::Deg0).unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        // Row 1 starts at byte 8; pixel 1 at byte 10
        assert_eq!(&bytes[10..14], &[0x00, 0xf8, 0xff, 0xff]);
        assert!(bytes[..10].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rotated_blit() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(2 * 2 * 2).unwrap();
        let mut sink = FramebufferSink::open(file.path(), 2, 2).unwrap();

        // A 2x1 strip turned clockwise fills the right column top to bottom
        let pixels = [Rgb::WHITE, Rgb::new(0, 0, 0xff)];
        sink.blit(PixelView::new(2, 1, &pixels), 1, 0, Rotation::Deg90).unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(&bytes[2..4], &[0xff, 0xff]);
        assert_eq!(&bytes[6..8], &[0x1f, 0x00]);
    }

    #[test]
    fn test_missing_device() {
        let result = FramebufferSink::open(Path::new("/nonexistent/fb9"), 240, 240);
        assert!(matches!(result, Err(SinkError::Io(_))));
    }
}
