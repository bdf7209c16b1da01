//! tftmux
//!
//! Mirrors a tmux session onto a small TFT panel using a bitmap font,
//! repainting only the rows that changed.
//!
//! - `feed`: PTY-backed session feed and the shared screen state
//! - `font`: BDF fonts rasterized into a glyph cache
//! - `theme`: color tokens to display colors
//! - `renderer`: geometry, rotation and the incremental render loop
//! - `display`: sinks that put pixels on a panel
//! - `control`: buttons and window switching
//! - `app`: configuration and wiring

pub mod app;
pub mod control;
pub mod core;
pub mod display;
pub mod feed;
pub mod font;
pub mod pty;
pub mod renderer;
pub mod theme;

pub use app::{App, AppError, Config};
pub use display::{DisplaySink, PixelView};
pub use feed::{SessionFeed, SharedScreen};
pub use renderer::{Geometry, Renderer, Rotation, TargetMode};
