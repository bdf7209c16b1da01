//! tftmux - mirror a tmux session onto a TFT panel

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tftmux::app::{self, SinkKind};
use tftmux::feed::SessionCommand;
use tftmux::{App, AppError, Config, Rotation, TargetMode};

/// CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "tftmux")]
#[command(version)]
#[command(about = "Mirror a tmux session onto a small TFT panel", long_about = None)]
struct CliArgs {
    /// Path to the config file (default: ~/.config/tftmux/config.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// BDF font file
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Theme file
    #[arg(short, long, value_name = "FILE")]
    theme: Option<PathBuf>,

    /// Clockwise panel rotation (0, 90, 180 or 270)
    #[arg(short, long, value_name = "DEGREES", value_parser = parse_rotation)]
    rotation: Option<Rotation>,

    /// Framebuffer device
    #[arg(long, value_name = "DEVICE")]
    framebuffer: Option<PathBuf>,

    /// Render into memory instead of a device
    #[arg(long)]
    null: bool,

    /// Keep a full-frame buffer and blit once per cycle
    #[arg(long)]
    full_frame: bool,

    /// tmux session name
    #[arg(short, long, value_name = "NAME")]
    session: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Command to run instead of attaching to the tmux session
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    let degrees: u16 = value.parse().map_err(|e| format!("{}", e))?;
    Rotation::try_from(degrees).map_err(|e| e.to_string())
}

impl CliArgs {
    fn config(&self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(),
        };

        if let Some(font) = &self.font {
            config.font.path = font.clone();
        }
        if let Some(theme) = &self.theme {
            config.theme = Some(theme.clone());
        }
        if let Some(rotation) = self.rotation {
            config.display.rotation = rotation;
        }
        if let Some(framebuffer) = &self.framebuffer {
            config.display.framebuffer = framebuffer.clone();
        }
        if self.null {
            config.display.sink = SinkKind::Null;
        }
        if self.full_frame {
            config.display.target = TargetMode::Full;
        }
        if let Some(session) = &self.session {
            config.session.name = session.clone();
        }
        if !self.command.is_empty() {
            config.session.command = Some(SessionCommand::new(self.command.clone()));
        }
        Ok(config)
    }
}

fn run(args: CliArgs) -> Result<(), AppError> {
    let config = args.config()?;
    if args.print_config {
        let json = serde_json::to_string_pretty(&config).map_err(app::ConfigError::from)?;
        println!("{}", json);
        return Ok(());
    }

    let stats = App::new(config)?.run()?;
    tracing::debug!("{:?}", stats);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    tracing::info!("tftmux {} starting", env!("CARGO_PKG_VERSION"));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        },
    }
}
