//! Application glue
//!
//! Builds every component once from the configuration and wires the
//! threads together: the PTY feed, the control dispatcher, the signal
//! buttons and the renderer, which runs on the calling thread.

mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::control::{self, ControlError, ProcessRunner, SignalButtons};
use crate::display::{DisplaySink, FramebufferSink, MemorySink, SinkError};
use crate::feed::{spawn_pty_feed, Decoder, SessionFeed, SharedScreen};
use crate::font::{FontError, GlyphCache};
use crate::pty::PtyError;
use crate::renderer::{Geometry, GeometryError, RenderError, RenderStats, Renderer};
use crate::theme::{Theme, ThemeError};

pub use config::{
    default_path, Config, ConfigError, DisplayConfig, FontConfig, RenderConfig, SessionConfig, SinkKind,
};

/// Anything that stops the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Everything fixed at startup
pub struct App {
    config: Config,
    geometry: Geometry,
    glyphs: GlyphCache,
    theme: Theme,
    shutdown: Arc<AtomicBool>,
}

impl App {
    /// Load the font and theme and compute the layout. Any failure here is a
    /// configuration error.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let display = &config.display;
        let geometry = Geometry::new(
            display.width,
            display.height,
            config.font.cell_width,
            config.font.cell_height,
            display.rotation,
        )?;
        let glyphs = GlyphCache::load(&config.font.path, config.font.cell_width, config.font.cell_height)?;
        let theme = match &config.theme {
            Some(path) => Theme::load(path)?,
            None => Theme::default(),
        };
        Self::from_parts(config, geometry, glyphs, theme)
    }

    /// Assemble from already loaded parts, validating the theme against
    /// every color token the decoder can produce
    pub fn from_parts(config: Config, geometry: Geometry, glyphs: GlyphCache, theme: Theme) -> Result<Self, AppError> {
        theme.validate(&Decoder::emitted_tokens())?;
        tracing::info!(
            "Layout {}x{} cells on a {}x{} panel rotated {}",
            geometry.columns(),
            geometry.rows(),
            geometry.panel_size().0,
            geometry.panel_size().1,
            geometry.rotation()
        );

        Ok(Self {
            config,
            geometry,
            glyphs,
            theme,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Raising this flag stops every thread
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Attach to the session and mirror it until it ends or a shutdown
    /// signal arrives
    pub fn run(self) -> Result<RenderStats, AppError> {
        control::register_shutdown(&self.shutdown)?;
        let sink = self.open_sink()?;

        let (commands, dispatcher) = control::spawn_dispatcher(self.config.session.name.clone(), ProcessRunner)?;
        let buttons = SignalButtons::spawn(commands)?;

        let screen = Arc::new(SharedScreen::new(self.geometry.columns(), self.geometry.rows()));
        let feed = match spawn_pty_feed(
            &self.config.session.command(),
            Arc::clone(&screen),
            Arc::clone(&self.shutdown),
        ) {
            Ok(feed) => feed,
            Err(e) => {
                buttons.stop();
                return Err(e.into());
            },
        };

        let result = self.render(&*screen, sink);

        self.shutdown.store(true, Ordering::Release);
        feed.join();
        buttons.stop();
        if dispatcher.join().is_err() {
            tracing::error!("Control thread panicked");
        }
        result
    }

    /// Run the renderer against `feed` until it closes or shutdown is raised
    pub fn render<F, S>(&self, feed: &F, sink: S) -> Result<RenderStats, AppError>
    where
        F: SessionFeed + ?Sized,
        S: DisplaySink,
    {
        let mut renderer = Renderer::new(
            self.geometry,
            self.glyphs.clone(),
            self.theme.clone(),
            sink,
            self.config.display.target,
        )?;
        renderer.clear()?;
        let stats = renderer.run(feed, &self.shutdown, &self.config.render.run_options())?;
        Ok(stats)
    }

    fn open_sink(&self) -> Result<Box<dyn DisplaySink>, AppError> {
        let (width, height) = self.geometry.panel_size();
        let sink: Box<dyn DisplaySink> = match self.config.display.sink {
            SinkKind::Framebuffer => Box::new(FramebufferSink::open(&self.config.display.framebuffer, width, height)?),
            SinkKind::Null => {
                tracing::info!("Rendering to memory only");
                Box::new(MemorySink::new(width, height))
            },
        };
        Ok(sink)
    }
}
