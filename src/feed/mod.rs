//! Session feed
//!
//! The producer side of the pipeline: bytes from the multiplexer's PTY are
//! decoded into the shared screen on a background thread, and the renderer
//! consumes the result through the [`SessionFeed`] trait.

mod decoder;
mod pty_feed;
mod screen;

use std::collections::BTreeSet;
use std::time::Duration;

use crate::core::{Cell, CursorState, Row};

pub use decoder::Decoder;
pub use pty_feed::{spawn_pty_feed, FeedHandle, SessionCommand};
pub use screen::{ScreenWriter, SharedScreen};

/// Read-only view of the session state used by the renderer
pub trait SessionFeed: Send + Sync {
    /// Take the set of rows changed since the last call, leaving it empty.
    /// Rows marked concurrently are either returned or kept for the next call.
    fn snapshot_dirty_and_clear(&self) -> BTreeSet<usize>;

    fn cursor(&self) -> CursorState;

    /// The cell at (row, col); blank outside the grid
    fn cell_at(&self, row: usize, col: usize) -> Cell;

    /// `false` once the producer has stopped for good
    fn is_alive(&self) -> bool;

    /// A consistent copy of one row
    fn row(&self, row: usize) -> Row;

    /// Block until something changes or `timeout` elapses
    fn wait_for_change(&self, timeout: Duration) {
        std::thread::sleep(timeout);
    }
}
