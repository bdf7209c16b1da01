//! Incremental renderer
//!
//! Each cycle drains the rows the session feed marked dirty, repaints them
//! (plus the rows the cursor left and entered) into a logical pixel buffer
//! and hands the result to a display sink, rotated for the panel.
//!
//! A cycle moves through `Collecting -> Rasterizing -> CompositingCursor ->
//! Blitting` and ends `Idle`. A cycle with nothing to do issues no blits.

mod geometry;
mod target;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::CursorState;
use crate::display::{DisplaySink, SinkError};
use crate::feed::SessionFeed;
use crate::font::GlyphCache;
use crate::theme::Theme;

pub use geometry::{Geometry, GeometryError, Rect, Rotation};
pub use target::RenderTarget;

/// Renderer errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Display sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Giving up after {failures} consecutive display failures")]
    TooManySinkFailures {
        failures: u32,
        #[source]
        last: SinkError,
    },
    #[error("Font cells are {font_width}x{font_height} but the layout uses {cell_width}x{cell_height}")]
    CellSizeMismatch {
        font_width: u32,
        font_height: u32,
        cell_width: u32,
        cell_height: u32,
    },
}

/// How much of the canvas the render buffer covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// One text row; each painted row is its own blit
    #[default]
    Strip,
    /// The whole canvas; one blit per cycle covering the painted rows
    Full,
}

/// Where the renderer is within a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderState {
    #[default]
    Idle,
    Collecting,
    Rasterizing,
    CompositingCursor,
    Blitting,
}

/// Outcome of one render cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Rows repainted, in ascending order
    pub rows: Vec<usize>,
    /// Number of sink transfers issued
    pub blits: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.blits == 0
    }
}

/// Totals over a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub cycles: u64,
    pub idle_cycles: u64,
    pub blits: u64,
    pub rows_painted: u64,
    pub sink_failures: u64,
}

/// Run loop settings
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Longest wait between cycles when nothing changed
    pub idle_interval: Duration,
    /// Consecutive failed cycles before the run gives up
    pub max_sink_failures: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(50),
            max_sink_failures: 10,
        }
    }
}

/// Turns session feed changes into sink transfers
pub struct Renderer<S> {
    geometry: Geometry,
    glyphs: GlyphCache,
    theme: Theme,
    sink: S,
    target: RenderTarget,
    mode: TargetMode,
    state: RenderState,
    previous_cursor: Option<CursorState>,
    /// Rows whose last transfer failed
    pending: BTreeSet<usize>,
}

impl<S: DisplaySink> Renderer<S> {
    pub fn new(
        geometry: Geometry,
        glyphs: GlyphCache,
        theme: Theme,
        sink: S,
        mode: TargetMode,
    ) -> Result<Self, RenderError> {
        if glyphs.cell_width() != geometry.cell_width() || glyphs.cell_height() != geometry.cell_height() {
            return Err(RenderError::CellSizeMismatch {
                font_width: glyphs.cell_width(),
                font_height: glyphs.cell_height(),
                cell_width: geometry.cell_width(),
                cell_height: geometry.cell_height(),
            });
        }

        let (width, height) = geometry.logical_size();
        let target = match mode {
            TargetMode::Strip => RenderTarget::new(width, geometry.cell_height()),
            TargetMode::Full => RenderTarget::new(width, height),
        };

        Ok(Self {
            geometry,
            glyphs,
            theme,
            sink,
            target,
            mode,
            state: RenderState::Idle,
            previous_cursor: None,
            pending: BTreeSet::new(),
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn mode(&self) -> TargetMode {
        self.mode
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Rows waiting to be repainted after a failed transfer
    pub fn pending_rows(&self) -> &BTreeSet<usize> {
        &self.pending
    }

    /// Paint the theme background over the whole panel. Every row is
    /// repainted by the next cycle.
    pub fn clear(&mut self) -> Result<(), RenderError> {
        let background = self.theme.background();
        let (width, height) = self.geometry.logical_size();
        let rotation = self.geometry.rotation();
        self.target.clear(background);

        let (_, target_height) = self.target.dimensions();
        let mut y = 0;
        while y < height {
            let band = target_height.min(height - y);
            let dest = self.geometry.to_physical(Rect::new(0, y, width, band));
            self.sink.blit(self.target.band(0, band), dest.x, dest.y, rotation)?;
            y += band;
        }

        self.pending.extend(0..self.geometry.rows());
        self.previous_cursor = None;
        Ok(())
    }

    /// Run one cycle against `feed`
    pub fn render_cycle<F: SessionFeed + ?Sized>(&mut self, feed: &F) -> Result<CycleReport, RenderError> {
        self.enter(RenderState::Collecting);
        let cursor = self.clamp(feed.cursor());
        let cursor_changed = self.previous_cursor != Some(cursor);
        let dirty = feed.snapshot_dirty_and_clear();

        if dirty.is_empty() && self.pending.is_empty() && !cursor_changed {
            self.enter(RenderState::Idle);
            return Ok(CycleReport::default());
        }

        let mut rows = dirty;
        rows.append(&mut self.pending);
        rows.insert(cursor.row);
        if let Some(previous) = self.previous_cursor {
            rows.insert(previous.row);
        }
        let limit = self.geometry.rows();
        rows.retain(|&row| row < limit);

        let result = match self.mode {
            TargetMode::Strip => self.draw_strips(feed, &rows, cursor),
            TargetMode::Full => self.draw_frame(feed, &rows, cursor),
        };
        self.enter(RenderState::Idle);

        match result {
            Ok(blits) => {
                self.previous_cursor = Some(cursor);
                tracing::debug!("Repainted {} rows with {} blits", rows.len(), blits);
                Ok(CycleReport {
                    rows: rows.into_iter().collect(),
                    blits,
                })
            },
            Err(e) => {
                self.pending = rows;
                Err(e)
            },
        }
    }

    /// Render until the feed dies or `shutdown` is set
    pub fn run<F: SessionFeed + ?Sized>(
        &mut self,
        feed: &F,
        shutdown: &AtomicBool,
        options: &RunOptions,
    ) -> Result<RenderStats, RenderError> {
        let mut stats = RenderStats::default();
        let mut failures = 0u32;

        while !shutdown.load(Ordering::Acquire) {
            stats.cycles += 1;
            match self.render_cycle(feed) {
                Ok(report) if report.is_idle() => {
                    stats.idle_cycles += 1;
                    if !feed.is_alive() {
                        tracing::info!("Session feed closed");
                        break;
                    }
                    feed.wait_for_change(options.idle_interval);
                },
                Ok(report) => {
                    failures = 0;
                    stats.blits += report.blits as u64;
                    stats.rows_painted += report.rows.len() as u64;
                },
                Err(RenderError::Sink(e)) => {
                    failures += 1;
                    stats.sink_failures += 1;
                    tracing::warn!(
                        "Display transfer failed ({}/{}): {}",
                        failures,
                        options.max_sink_failures,
                        e
                    );
                    if failures >= options.max_sink_failures.max(1) {
                        return Err(RenderError::TooManySinkFailures { failures, last: e });
                    }
                    std::thread::sleep(options.idle_interval);
                },
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Renderer stopped after {} cycles ({} idle), {} rows in {} blits",
            stats.cycles,
            stats.idle_cycles,
            stats.rows_painted,
            stats.blits
        );
        Ok(stats)
    }

    /// Strip mode: paint and transfer one row at a time
    fn draw_strips<F: SessionFeed + ?Sized>(
        &mut self,
        feed: &F,
        rows: &BTreeSet<usize>,
        cursor: CursorState,
    ) -> Result<usize, RenderError> {
        let rotation = self.geometry.rotation();
        let cell_height = self.geometry.cell_height();
        let mut blits = 0;

        for &row in rows {
            self.enter(RenderState::Rasterizing);
            self.paint_row(feed, row, 0);
            if row == cursor.row {
                self.enter(RenderState::CompositingCursor);
                self.paint_cursor(cursor, 0);
            }

            self.enter(RenderState::Blitting);
            let dest = self.geometry.to_physical(self.geometry.row_rect(row));
            self.sink.blit(self.target.band(0, cell_height), dest.x, dest.y, rotation)?;
            blits += 1;
        }
        Ok(blits)
    }

    /// Full mode: paint every row, then transfer the band they span
    fn draw_frame<F: SessionFeed + ?Sized>(
        &mut self,
        feed: &F,
        rows: &BTreeSet<usize>,
        cursor: CursorState,
    ) -> Result<usize, RenderError> {
        let (Some(&first), Some(&last)) = (rows.first(), rows.last()) else {
            return Ok(0);
        };
        let cell_height = self.geometry.cell_height();

        self.enter(RenderState::Rasterizing);
        for &row in rows {
            self.paint_row(feed, row, row as u32 * cell_height);
        }
        if rows.contains(&cursor.row) {
            self.enter(RenderState::CompositingCursor);
            self.paint_cursor(cursor, cursor.row as u32 * cell_height);
        }

        self.enter(RenderState::Blitting);
        let (width, _) = self.geometry.logical_size();
        let y = first as u32 * cell_height;
        let height = (last - first + 1) as u32 * cell_height;
        let dest = self.geometry.to_physical(Rect::new(0, y, width, height));
        self.sink
            .blit(self.target.band(y, height), dest.x, dest.y, self.geometry.rotation())?;
        Ok(1)
    }

    /// Paint one text row with its top edge at `y` in the target
    fn paint_row<F: SessionFeed + ?Sized>(&mut self, feed: &F, row: usize, y: u32) {
        let cell_width = self.geometry.cell_width();
        let cell_height = self.geometry.cell_height();
        let (width, _) = self.geometry.logical_size();

        // Covers the slack right of the last column
        self.target
            .fill_rect(Rect::new(0, y, width, cell_height), self.theme.background());

        let snapshot = feed.row(row);
        for (col, cell) in snapshot.cells.iter().take(self.geometry.columns()).enumerate() {
            let (fg, bg) = self.theme.resolve(cell);
            let x = col as u32 * cell_width;
            self.target.fill_rect(Rect::new(x, y, cell_width, cell_height), bg);
            self.target.draw_glyph(self.glyphs.lookup_cell(cell), x, y, fg);
            if cell.style.underline {
                self.target.hline(x, y + cell_height - 1, cell_width, fg);
            }
        }
    }

    /// Underline the cursor cell in the highlight color
    fn paint_cursor(&mut self, cursor: CursorState, y: u32) {
        let rect = self.geometry.cell_rect(cursor.row, cursor.col);
        self.target
            .hline(rect.x, y + rect.height - 1, rect.width, self.theme.cursor());
    }

    fn clamp(&self, mut cursor: CursorState) -> CursorState {
        cursor.row = cursor.row.min(self.geometry.rows() - 1);
        cursor.col = cursor.col.min(self.geometry.columns() - 1);
        cursor
    }

    fn enter(&mut self, state: RenderState) {
        if self.state != state {
            tracing::trace!("Renderer {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Cell;
    use crate::display::MemorySink;
    use crate::feed::SharedScreen;
    use crate::font::Glyph;
    use crate::theme::Rgb;

    const FG: Rgb = Rgb::new(0xee, 0xee, 0xee);
    const BG: Rgb = Rgb::new(0x11, 0x11, 0x11);
    const CURSOR: Rgb = Rgb::new(0, 0xff, 0);

    fn glyphs() -> GlyphCache {
        // '?' is a full block so painted cells are easy to spot
        let block = Glyph::from_rows(2, 4, &[0b11; 4]);
        let glyphs = [(63, block), (32, Glyph::blank(2, 4))].into_iter().collect();
        GlyphCache::from_glyphs(glyphs, 2, 4).unwrap()
    }

    fn renderer(mode: TargetMode, rotation: Rotation) -> Renderer<MemorySink> {
        let geometry = Geometry::new(8, 12, 2, 4, rotation).unwrap();
        let (width, height) = geometry.panel_size();
        let theme = Theme::new(FG, BG).with_cursor(CURSOR);
        Renderer::new(geometry, glyphs(), theme, MemorySink::new(width, height).with_log(), mode).unwrap()
    }

    #[test]
    fn test_first_cycle_paints_every_row() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        let report = renderer.render_cycle(&screen).unwrap();
        assert_eq!(report.rows, vec![0, 1, 2]);
        assert_eq!(report.blits, 3);
        assert_eq!(renderer.state(), RenderState::Idle);
    }

    #[test]
    fn test_second_cycle_is_idle() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        renderer.render_cycle(&screen).unwrap();
        let report = renderer.render_cycle(&screen).unwrap();
        assert!(report.is_idle());
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_cursor_move_repaints_old_and_new_rows() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        renderer.render_cycle(&screen).unwrap();

        screen.write(|w| {
            w.line_feed();
            w.line_feed();
        });
        // Cursor motion alone marks nothing dirty
        let report = renderer.render_cycle(&screen).unwrap();
        assert_eq!(report.rows, vec![0, 2]);
    }

    #[test]
    fn test_cursor_is_drawn_on_bottom_line() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        renderer.render_cycle(&screen).unwrap();

        let sink = renderer.sink();
        assert_eq!(sink.pixel(0, 3), CURSOR);
        assert_eq!(sink.pixel(1, 3), CURSOR);
        assert_eq!(sink.pixel(2, 3), BG);
        assert_eq!(sink.pixel(0, 2), BG);
    }

    #[test]
    fn test_glyph_and_underline() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        screen.write(|w| {
            w.line_feed();
            w.pen_mut().style.underline = true;
            w.print(' ');
            w.pen_mut().style.underline = false;
            w.print('x');
        });
        renderer.render_cycle(&screen).unwrap();

        let sink = renderer.sink();
        // Underlined space
        assert_eq!(sink.pixel(0, 7), FG);
        assert_eq!(sink.pixel(0, 6), BG);
        // Missing glyph draws the placeholder block
        assert_eq!(sink.pixel(2, 4), FG);
        assert_eq!(sink.pixel(3, 6), FG);
        // Cursor now sits on the third cell
        assert_eq!(sink.pixel(4, 7), CURSOR);
        assert_eq!(sink.pixel(6, 7), BG);
    }

    #[test]
    fn test_sink_failure_keeps_rows_pending() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        renderer.sink_mut().fail_next(1);

        assert!(matches!(renderer.render_cycle(&screen), Err(RenderError::Sink(_))));
        assert_eq!(renderer.pending_rows().len(), 3);

        let report = renderer.render_cycle(&screen).unwrap();
        assert_eq!(report.rows, vec![0, 1, 2]);
        assert!(renderer.pending_rows().is_empty());
    }

    #[test]
    fn test_full_mode_blits_one_band() {
        let mut renderer = renderer(TargetMode::Full, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        renderer.render_cycle(&screen).unwrap();
        renderer.sink_mut().take_blits();

        screen.write(|w| {
            w.mark_dirty(1);
            w.mark_dirty(2);
        });
        let report = renderer.render_cycle(&screen).unwrap();
        assert_eq!(report.blits, 1);
        // Rows 0 (cursor) through 2
        assert_eq!(renderer.sink().blits()[0].dest, Rect::new(0, 0, 8, 12));
    }

    #[test]
    fn test_rotated_180_paints_row_zero_at_bottom() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg180);
        let screen = SharedScreen::new(4, 3);
        renderer.render_cycle(&screen).unwrap();

        // The cursor line sits on the bottom of logical row 0, which is the
        // top line of the bottom strip after a half turn
        let sink = renderer.sink();
        assert_eq!(sink.pixel(7, 8), CURSOR);
        assert_eq!(sink.pixel(6, 8), CURSOR);
        assert_eq!(sink.pixel(0, 8), BG);
    }

    #[test]
    fn test_clear_paints_background_and_schedules_every_row() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg90);
        renderer.clear().unwrap();
        let (width, height) = renderer.sink().size();
        for y in 0..height {
            for x in 0..width {
                assert_eq!(renderer.sink().pixel(x, y), BG);
            }
        }
        assert_eq!(renderer.pending_rows().len(), renderer.geometry().rows());
    }

    #[test]
    fn test_cell_size_mismatch_is_rejected() {
        let geometry = Geometry::new(8, 12, 4, 4, Rotation::Deg0).unwrap();
        let result = Renderer::new(geometry, glyphs(), Theme::default(), MemorySink::new(8, 12), TargetMode::Strip);
        assert!(matches!(result, Err(RenderError::CellSizeMismatch { .. })));
    }

    #[test]
    fn test_run_exits_when_feed_closes() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        screen.close();
        let shutdown = AtomicBool::new(false);
        let stats = renderer.run(&screen, &shutdown, &RunOptions::default()).unwrap();
        assert_eq!(stats.rows_painted, 3);
        assert_eq!(stats.idle_cycles, 1);
    }

    #[test]
    fn test_run_gives_up_after_repeated_failures() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        renderer.sink_mut().fail_next(u32::MAX);
        let options = RunOptions {
            idle_interval: Duration::from_millis(1),
            max_sink_failures: 3,
        };
        let shutdown = AtomicBool::new(false);
        let result = renderer.run(&screen, &shutdown, &options);
        assert!(matches!(result, Err(RenderError::TooManySinkFailures { failures: 3, .. })));
    }

    #[test]
    fn test_blank_cells_use_theme_background() {
        let mut renderer = renderer(TargetMode::Strip, Rotation::Deg0);
        let screen = SharedScreen::new(4, 3);
        assert!(Cell::default().is_empty());
        renderer.render_cycle(&screen).unwrap();
        assert_eq!(renderer.sink().pixel(5, 5), BG);
    }
}
