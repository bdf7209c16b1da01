//! Shared screen state
//!
//! The grid, the dirty row set and the cursor live behind a single mutex.
//! The feed thread mutates them through [`ScreenWriter`]; the renderer reads
//! them through the [`SessionFeed`] implementation. Draining the dirty set is
//! a `mem::take` inside the critical section, so a row marked by the feed is
//! either part of the drained set or still present for the next drain.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::core::{Cell, ColorToken, Cursor, CursorState, Grid, Pen, Row};

use super::SessionFeed;

const TAB_WIDTH: usize = 8;

struct ScreenState {
    grid: Grid,
    dirty: BTreeSet<usize>,
    cursor: Cursor,
}

/// Grid, dirty rows and cursor shared by the feed and the renderer
pub struct SharedScreen {
    state: Mutex<ScreenState>,
    changed: Condvar,
    alive: AtomicBool,
}

impl SharedScreen {
    /// Create a blank screen. Every row starts dirty so the first render
    /// cycle paints the whole panel.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            state: Mutex::new(ScreenState {
                grid: Grid::new(cols, rows),
                dirty: (0..rows).collect(),
                cursor: Cursor::default(),
            }),
            changed: Condvar::new(),
            alive: AtomicBool::new(true),
        }
    }

    pub fn cols(&self) -> usize {
        self.state.lock().grid.cols()
    }

    pub fn rows(&self) -> usize {
        self.state.lock().grid.rows()
    }

    /// Apply a batch of edits under one lock, then wake the renderer
    pub fn write<R>(&self, f: impl FnOnce(&mut ScreenWriter<'_>) -> R) -> R {
        let result = {
            let mut writer = ScreenWriter {
                state: self.state.lock(),
            };
            f(&mut writer)
        };
        self.changed.notify_all();
        result
    }

    /// Mark the feed as finished. The renderer drains what is left and stops.
    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
        self.changed.notify_all();
    }

    /// Plain-text dump of the grid, mostly for diagnostics and tests
    pub fn text(&self) -> Vec<String> {
        let state = self.state.lock();
        (0..state.grid.rows())
            .filter_map(|r| state.grid.row(r).map(Row::text))
            .collect()
    }
}

impl SessionFeed for SharedScreen {
    fn snapshot_dirty_and_clear(&self) -> BTreeSet<usize> {
        std::mem::take(&mut self.state.lock().dirty)
    }

    fn cursor(&self) -> CursorState {
        self.state.lock().cursor.state()
    }

    fn cell_at(&self, row: usize, col: usize) -> Cell {
        self.state
            .lock()
            .grid
            .cell(col, row)
            .cloned()
            .unwrap_or_default()
    }

    fn row(&self, row: usize) -> Row {
        let state = self.state.lock();
        state
            .grid
            .row(row)
            .cloned()
            .unwrap_or_else(|| Row::new(state.grid.cols()))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn wait_for_change(&self, timeout: Duration) {
        let mut state = self.state.lock();
        if state.dirty.is_empty() && self.is_alive() {
            self.changed.wait_for(&mut state, timeout);
        }
    }
}

/// Write access to the screen while the lock is held
pub struct ScreenWriter<'a> {
    state: MutexGuard<'a, ScreenState>,
}

impl ScreenWriter<'_> {
    pub fn cursor(&self) -> &Cursor {
        &self.state.cursor
    }

    pub fn pen_mut(&mut self) -> &mut Pen {
        &mut self.state.cursor.pen
    }

    pub fn mark_dirty(&mut self, row: usize) {
        if row < self.state.grid.rows() {
            self.state.dirty.insert(row);
        }
    }

    pub fn mark_all_dirty(&mut self) {
        let rows = self.state.grid.rows();
        self.state.dirty.extend(0..rows);
    }

    /// Write a character at the cursor with the current pen and advance
    pub fn print(&mut self, c: char) {
        self.put(c, 1);
    }

    /// Write a double-width character: the cell to its right becomes a
    /// continuation cell and the cursor advances two columns. Wraps first
    /// when only the last column is left.
    pub fn print_wide(&mut self, c: char) {
        if self.state.grid.cols() < 2 {
            self.put(c, 1);
            return;
        }
        if !self.state.cursor.pending_wrap && self.state.cursor.col + 2 > self.state.grid.cols() {
            self.state.cursor.pending_wrap = true;
        }
        self.put(c, 2);
    }

    fn put(&mut self, c: char, width: usize) {
        if self.state.cursor.pending_wrap {
            self.state.cursor.col = 0;
            self.line_feed();
        }

        let state = &mut *self.state;
        let (col, row) = (state.cursor.col, state.cursor.row);
        let pen = &state.cursor.pen;
        if let Some(cell) = state.grid.cell_mut(col, row) {
            *cell = Cell::with_style(c.to_string(), pen.fg.clone(), pen.bg.clone(), pen.style);
        }
        if width == 2 {
            if let Some(cell) = state.grid.cell_mut(col + 1, row) {
                *cell = Cell::continuation(pen.fg.clone(), pen.bg.clone(), pen.style);
            }
        }
        self.mark_dirty(row);

        let last = self.state.grid.cols().saturating_sub(1);
        if col + width > last {
            self.state.cursor.col = last;
            self.state.cursor.pending_wrap = true;
        } else {
            self.state.cursor.col += width;
        }
    }

    /// Attach a zero-width character to the most recently printed cell
    pub fn combine(&mut self, c: char) {
        let cursor = &self.state.cursor;
        let col = if cursor.pending_wrap {
            cursor.col
        } else if cursor.col > 0 {
            cursor.col - 1
        } else {
            return;
        };
        let row = cursor.row;
        // Marks after a wide character belong to its left half
        let col = match self.state.grid.cell_mut(col, row) {
            Some(cell) if cell.continuation && col > 0 => col - 1,
            _ => col,
        };
        if let Some(cell) = self.state.grid.cell_mut(col, row) {
            cell.content.push(c);
        }
        self.mark_dirty(row);
    }

    pub fn carriage_return(&mut self) {
        self.state.cursor.col = 0;
        self.state.cursor.pending_wrap = false;
    }

    /// Move down one row, scrolling the grid at the bottom
    pub fn line_feed(&mut self) {
        self.state.cursor.pending_wrap = false;
        let rows = self.state.grid.rows();
        if self.state.cursor.row + 1 >= rows {
            self.state.grid.scroll_up(1, &ColorToken::default_color());
            self.mark_all_dirty();
        } else {
            self.state.cursor.row += 1;
        }
    }

    pub fn backspace(&mut self) {
        self.state.cursor.col = self.state.cursor.col.saturating_sub(1);
        self.state.cursor.pending_wrap = false;
    }

    pub fn tab(&mut self) {
        let last = self.state.grid.cols().saturating_sub(1);
        let next = (self.state.cursor.col / TAB_WIDTH + 1) * TAB_WIDTH;
        self.state.cursor.col = next.min(last);
    }

    /// Move the cursor to (col, row), clamped to the grid
    pub fn move_to(&mut self, col: usize, row: usize) {
        let state = &mut *self.state;
        state.cursor.col = col.min(state.grid.cols().saturating_sub(1));
        state.cursor.row = row.min(state.grid.rows().saturating_sub(1));
        state.cursor.pending_wrap = false;
    }

    /// Erase within the cursor row: 0 from the cursor to the end, 1 from
    /// the start through the cursor, anything else the whole row
    pub fn erase_in_line(&mut self, mode: u16) {
        let state = &mut *self.state;
        let (col, row) = (state.cursor.col, state.cursor.row);
        let cols = state.grid.cols();
        let range = match mode {
            0 => col..cols,
            1 => 0..(col + 1).min(cols),
            _ => 0..cols,
        };
        let bg = state.cursor.pen.bg.clone();
        if let Some(line) = state.grid.row_mut(row) {
            for cell in &mut line.cells[range] {
                cell.erase(&bg);
            }
        }
        self.mark_dirty(row);
    }

    /// Erase within the screen: 0 from the cursor down, 1 from the top
    /// through the cursor, anything else everything
    pub fn erase_in_display(&mut self, mode: u16) {
        let (row, rows) = (self.state.cursor.row, self.state.grid.rows());
        let others = match mode {
            0 => row + 1..rows,
            1 => 0..row,
            _ => 0..rows,
        };
        if mode <= 1 {
            self.erase_in_line(mode);
        }
        let bg = self.state.cursor.pen.bg.clone();
        for r in others {
            if let Some(line) = self.state.grid.row_mut(r) {
                line.erase(&bg);
            }
            self.mark_dirty(r);
        }
    }

    /// Blank the whole grid and home the cursor
    pub fn clear(&mut self) {
        let bg = self.state.cursor.pen.bg.clone();
        self.state.grid.erase(&bg);
        self.state.cursor.col = 0;
        self.state.cursor.row = 0;
        self.state.cursor.pending_wrap = false;
        self.mark_all_dirty();
    }
}
