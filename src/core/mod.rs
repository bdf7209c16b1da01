//! Terminal Core Module
//!
//! Platform-independent terminal state shared between the session feed and
//! the renderer:
//! - Cell representation with color tokens and attributes
//! - Fixed-size grid of cells
//! - Cursor state and its attribute fingerprint

mod cell;
mod cursor;
mod grid;

pub use cell::{Cell, ColorToken, Style};
pub use cursor::{Cursor, CursorState, Pen};
pub use grid::{Grid, Row};
