//! Display geometry and rotation
//!
//! The panel has a native (physical) orientation. Text is laid out on a
//! logical canvas that is the panel rotated clockwise by 0, 90, 180 or 270
//! degrees, so for 90 and 270 the logical canvas is the panel transposed.
//!
//! A logical pixel (x, y) on a `LW x LH` canvas lands on the panel at:
//!
//! | rotation | physical pixel          |
//! |----------|-------------------------|
//! | 0        | (x, y)                  |
//! | 90       | (LH - 1 - y, x)         |
//! | 180      | (LW - 1 - x, LH - 1 - y)|
//! | 270      | (y, LW - 1 - x)         |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Geometry errors, all fatal at startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("Unsupported rotation {0}, expected 0, 90, 180 or 270")]
    InvalidRotation(u16),
    #[error("A {panel_width}x{panel_height} panel fits no {cell_width}x{cell_height} cells")]
    Empty {
        panel_width: u32,
        panel_height: u32,
        cell_width: u32,
        cell_height: u32,
    },
}

/// Clockwise rotation from the logical canvas to the panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether the logical axes are swapped relative to the panel
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Map a logical rectangle on a `canvas_width x canvas_height` canvas to
    /// the panel rectangle it covers
    pub fn map_rect(self, rect: Rect, canvas_width: u32, canvas_height: u32) -> Rect {
        let Rect { x, y, width, height } = rect;
        match self {
            Rotation::Deg0 => rect,
            Rotation::Deg90 => Rect::new(canvas_height - y - height, x, height, width),
            Rotation::Deg180 => Rect::new(canvas_width - x - width, canvas_height - y - height, width, height),
            Rotation::Deg270 => Rect::new(y, canvas_width - x - width, height, width),
        }
    }

    /// For a `width x height` logical view blitted with this rotation, the
    /// view pixel that lands on destination-local pixel (u, v)
    pub fn source_pixel(self, u: u32, v: u32, width: u32, height: u32) -> (u32, u32) {
        match self {
            Rotation::Deg0 => (u, v),
            Rotation::Deg90 => (v, height - 1 - u),
            Rotation::Deg180 => (width - 1 - u, height - 1 - v),
            Rotation::Deg270 => (width - 1 - v, u),
        }
    }

    /// Size on the panel of a `width x height` logical region
    pub fn rotated_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.is_transposed() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = GeometryError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(GeometryError::InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A pixel rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether this rectangle lies entirely inside a `width x height` area
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x + self.width <= width && self.y + self.height <= height
    }
}

/// Panel, cell and grid dimensions, fixed for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    panel_width: u32,
    panel_height: u32,
    cell_width: u32,
    cell_height: u32,
    rotation: Rotation,
    columns: usize,
    rows: usize,
}

impl Geometry {
    pub fn new(
        panel_width: u32,
        panel_height: u32,
        cell_width: u32,
        cell_height: u32,
        rotation: Rotation,
    ) -> Result<Self, GeometryError> {
        let (logical_width, logical_height) = rotation.rotated_size(panel_width, panel_height);
        let columns = logical_width.checked_div(cell_width).unwrap_or(0) as usize;
        let rows = logical_height.checked_div(cell_height).unwrap_or(0) as usize;
        if columns == 0 || rows == 0 {
            return Err(GeometryError::Empty {
                panel_width,
                panel_height,
                cell_width,
                cell_height,
            });
        }

        Ok(Self {
            panel_width,
            panel_height,
            cell_width,
            cell_height,
            rotation,
            columns,
            rows,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Native panel size
    pub fn panel_size(&self) -> (u32, u32) {
        (self.panel_width, self.panel_height)
    }

    /// Size of the canvas text is laid out on
    pub fn logical_size(&self) -> (u32, u32) {
        self.rotation.rotated_size(self.panel_width, self.panel_height)
    }

    /// Logical rectangle of one cell
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(
            col as u32 * self.cell_width,
            row as u32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    /// Logical rectangle of a whole text row, spanning the canvas width
    pub fn row_rect(&self, row: usize) -> Rect {
        let (width, _) = self.logical_size();
        Rect::new(0, row as u32 * self.cell_height, width, self.cell_height)
    }

    /// Where a logical rectangle ends up on the panel
    pub fn to_physical(&self, rect: Rect) -> Rect {
        let (width, height) = self.logical_size();
        self.rotation.map_rect(rect, width, height)
    }
}
