//! Glyph cache
//!
//! Pre-rasterized monochrome glyphs, one per code point, all exactly one text
//! cell in size. Built once from a BDF font at startup and read-only after
//! that, so lookups can be shared freely between threads.

mod bdf;

use std::collections::HashMap;
use std::path::Path;

use crate::core::Cell;

pub use bdf::{BdfFont, BdfGlyph, BoundingBox};

/// Code point drawn for characters the font does not have (`?`)
pub const PLACEHOLDER: u32 = 63;

const SPACE: u32 = 32;

/// Widest cell a glyph row bitmask can hold
pub const MAX_CELL_WIDTH: u32 = 32;

/// Font-related errors
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Font IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Font parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Font has no placeholder glyph (code point {PLACEHOLDER})")]
    MissingPlaceholder,
    #[error("Invalid glyph cell size {0}x{1}")]
    InvalidCellSize(u32, u32),
}

/// A cell-sized monochrome bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    width: u32,
    height: u32,
    /// Bit `x` of `rows[y]` is the pixel at (x, y)
    rows: Vec<u32>,
}

impl Glyph {
    /// An empty glyph of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rows: vec![0; height as usize],
        }
    }

    /// Build from row bitmasks; missing rows are blank, extra rows and
    /// columns are dropped
    pub fn from_rows(width: u32, height: u32, rows: &[u32]) -> Self {
        let mask = if width >= 32 { u32::MAX } else { (1 << width) - 1 };
        let mut glyph = Self::blank(width, height);
        for (dst, src) in glyph.rows.iter_mut().zip(rows) {
            *dst = src & mask;
        }
        glyph
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel at (x, y) is set; false outside the glyph
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        x < self.width
            && self
                .rows
                .get(y as usize)
                .is_some_and(|row| row & (1 << x) != 0)
    }

    /// Place a BDF glyph in a cell whose baseline sits `ascent` pixels below
    /// the top, clipping anything that falls outside the cell
    fn from_bdf(glyph: &BdfGlyph, font: &BdfFont, width: u32, height: u32) -> Self {
        let top = font.ascent - (glyph.bbx.y_offset + glyph.bbx.height as i32);
        let left = glyph.bbx.x_offset - font.bounding_box.x_offset;

        let mut cell = Self::blank(width, height);
        for (src_y, bits) in glyph.rows.iter().enumerate() {
            let y = top + src_y as i32;
            if y < 0 || y >= height as i32 {
                continue;
            }
            for src_x in 0..glyph.bbx.width {
                let x = left + src_x as i32;
                if bits & (1 << src_x) != 0 && x >= 0 && x < width as i32 {
                    cell.rows[y as usize] |= 1 << x;
                }
            }
        }
        cell
    }
}

/// Code point to glyph lookup with a placeholder fallback
#[derive(Debug, Clone)]
pub struct GlyphCache {
    glyphs: HashMap<u32, Glyph>,
    placeholder: Glyph,
    blank: Glyph,
    cell_width: u32,
    cell_height: u32,
}

impl GlyphCache {
    /// Load a BDF font file and rasterize every glyph into cells of the
    /// given size
    pub fn load(path: &Path, cell_width: u32, cell_height: u32) -> Result<Self, FontError> {
        let source = std::fs::read(path)?;
        // BDF is ASCII; tolerate stray Latin-1 in comments and properties
        let source = String::from_utf8_lossy(&source);
        let font = BdfFont::parse(&source)?;
        let cache = Self::from_bdf(&font, cell_width, cell_height)?;
        tracing::info!(
            "Loaded {} glyphs from {} ({}x{} cells)",
            cache.len(),
            path.display(),
            cell_width,
            cell_height
        );
        Ok(cache)
    }

    pub fn from_bdf(font: &BdfFont, cell_width: u32, cell_height: u32) -> Result<Self, FontError> {
        let fbb = font.bounding_box;
        if fbb.width > cell_width || fbb.height > cell_height {
            tracing::warn!(
                "Font bounding box {}x{} exceeds the {}x{} cell, glyphs will be clipped",
                fbb.width,
                fbb.height,
                cell_width,
                cell_height
            );
        }

        let glyphs = font
            .glyphs
            .iter()
            .map(|g| (g.encoding, Glyph::from_bdf(g, font, cell_width, cell_height)))
            .collect();
        Self::from_glyphs(glyphs, cell_width, cell_height)
    }

    /// Build from already rasterized glyphs. Every glyph must be cell sized.
    pub fn from_glyphs(
        glyphs: HashMap<u32, Glyph>,
        cell_width: u32,
        cell_height: u32,
    ) -> Result<Self, FontError> {
        if cell_width == 0 || cell_height == 0 || cell_width > MAX_CELL_WIDTH {
            return Err(FontError::InvalidCellSize(cell_width, cell_height));
        }
        let placeholder = glyphs
            .get(&PLACEHOLDER)
            .cloned()
            .ok_or(FontError::MissingPlaceholder)?;
        let blank = glyphs
            .get(&SPACE)
            .cloned()
            .unwrap_or_else(|| Glyph::blank(cell_width, cell_height));

        Ok(Self {
            glyphs,
            placeholder,
            blank,
            cell_width,
            cell_height,
        })
    }

    /// The glyph for `codepoint`, or the placeholder when the font lacks it
    pub fn lookup(&self, codepoint: u32) -> &Glyph {
        self.glyphs.get(&codepoint).unwrap_or(&self.placeholder)
    }

    /// The glyph to draw for a cell. Erased cells draw as a space; the right
    /// half of a wide character and cells holding more than one code point
    /// draw the placeholder.
    pub fn lookup_cell(&self, cell: &Cell) -> &Glyph {
        if cell.continuation {
            return &self.placeholder;
        }
        if cell.is_empty() {
            return &self.blank;
        }
        match cell.codepoint() {
            Some(cp) => self.lookup(cp),
            None => &self.placeholder,
        }
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.glyphs.contains_key(&codepoint)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }
}
