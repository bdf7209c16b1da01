//! Cursor state
//!
//! The feed keeps a full cursor (position plus the pen new characters are
//! written with); the renderer only sees the compact [`CursorState`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{ColorToken, Style};

/// Attributes applied to newly printed characters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pen {
    pub fg: ColorToken,
    pub bg: ColorToken,
    pub style: Style,
}

impl Pen {
    /// Stable hash of the pen, used as the cursor attribute fingerprint
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Cursor position and pen as tracked by the session feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column position (0-indexed)
    pub col: usize,
    /// Row position (0-indexed)
    pub row: usize,
    /// Current text attributes
    pub pen: Pen,
    /// The next printed character wraps to the next line first
    pub pending_wrap: bool,
}

impl Cursor {
    pub fn state(&self) -> CursorState {
        CursorState {
            col: self.col,
            row: self.row,
            fingerprint: self.pen.fingerprint(),
        }
    }
}

/// What the renderer needs to know about the cursor each cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorState {
    pub col: usize,
    pub row: usize,
    /// Changes whenever the pen changes, even if the position does not
    pub fingerprint: u64,
}

impl CursorState {
    pub fn new(col: usize, row: usize) -> Self {
        Self {
            col,
            row,
            fingerprint: Pen::default().fingerprint(),
        }
    }
}
