//! Terminal Grid
//!
//! A fixed 2D grid of cells representing the visible terminal area.
//! The dimensions are chosen once from the display geometry and never change.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, ColorToken};

/// A row of cells in the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// The cells in this row
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
        }
    }

    pub fn erase(&mut self, bg: &ColorToken) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
    }

    /// Get the length of content (excluding trailing empty cells)
    pub fn content_len(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| !c.is_empty())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// The row's text with blanks as spaces, trailing blanks trimmed
    pub fn text(&self) -> String {
        self.cells[..self.content_len()]
            .iter()
            .filter(|c| !c.continuation)
            .map(|c| if c.is_empty() { " " } else { c.content.as_str() })
            .collect()
    }
}

/// The terminal grid - a 2D array of cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Row>,
    cols: usize,
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols)).collect(),
            cols,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Get a reference to a cell
    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    /// Get a mutable reference to a cell
    pub fn cell_mut(&mut self, col: usize, row: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Get a reference to a row
    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    /// Get a mutable reference to a row
    pub fn row_mut(&mut self, row: usize) -> Option<&mut Row> {
        self.rows.get_mut(row)
    }

    /// Erase the entire grid with a background color
    pub fn erase(&mut self, bg: &ColorToken) {
        for row in &mut self.rows {
            row.erase(bg);
        }
    }

    /// Scroll the whole grid up by n lines, blanking the rows that appear
    /// at the bottom. The row count is preserved.
    pub fn scroll_up(&mut self, n: usize, bg: &ColorToken) {
        let n = n.min(self.rows.len());
        self.rows.rotate_left(n);
        let len = self.rows.len();
        for row in &mut self.rows[len - n..] {
            row.erase(bg);
        }
    }
}
