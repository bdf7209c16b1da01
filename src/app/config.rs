//! Configuration for the panel mirror

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::feed::SessionCommand;
use crate::renderer::{Rotation, RunOptions, TargetMode};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub font: FontConfig,
    /// Theme file; the built-in white on black theme when absent
    pub theme: Option<PathBuf>,
    pub session: SessionConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            font: FontConfig::default(),
            theme: Some(PathBuf::from("theme.json")),
            session: SessionConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Where pixels go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// A Linux framebuffer device
    #[default]
    Framebuffer,
    /// Render into memory only
    Null,
}

/// Panel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Native panel width in pixels
    pub width: u32,
    /// Native panel height in pixels
    pub height: u32,
    /// Clockwise rotation: 0, 90, 180 or 270
    pub rotation: Rotation,
    pub target: TargetMode,
    pub sink: SinkKind,
    pub framebuffer: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
            rotation: Rotation::Deg180,
            target: TargetMode::Strip,
            sink: SinkKind::Framebuffer,
            framebuffer: PathBuf::from("/dev/fb1"),
        }
    }
}

/// Bitmap font settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// BDF font file
    pub path: PathBuf,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("miniwi.bdf"),
            cell_width: 4,
            cell_height: 8,
        }
    }
}

/// Multiplexer session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// tmux session to attach to (created if missing)
    pub name: String,
    /// Command to run instead of attaching to `name`
    pub command: Option<SessionCommand>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "tty".to_string(),
            command: None,
        }
    }
}

impl SessionConfig {
    pub fn command(&self) -> SessionCommand {
        self.command
            .clone()
            .unwrap_or_else(|| SessionCommand::tmux(&self.name))
    }
}

/// Render loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Longest wait between cycles when nothing changed
    pub idle_interval_ms: u64,
    /// Consecutive display failures before giving up
    pub max_sink_failures: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: 50,
            max_sink_failures: 10,
        }
    }
}

impl RenderConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            idle_interval: Duration::from_millis(self.idle_interval_ms),
            max_sink_failures: self.max_sink_failures,
        }
    }
}

impl Config {
    /// Load configuration from a file. Relative font and theme paths are
    /// taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default location, falling back to the defaults
    pub fn load_or_default() -> Self {
        if let Some(path) = default_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Anchor relative font and theme paths at `dir`
    pub fn resolve_paths(&mut self, dir: &Path) {
        if self.font.path.is_relative() {
            self.font.path = dir.join(&self.font.path);
        }
        if let Some(theme) = self.theme.as_mut().filter(|t| t.is_relative()) {
            *theme = dir.join(&*theme);
        }
    }
}

/// `~/.config/tftmux/config.json`
pub fn default_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("tftmux")
            .join("config.json")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!((config.display.width, config.display.height), (240, 240));
        assert_eq!(config.display.rotation, Rotation::Deg180);
        assert_eq!((config.font.cell_width, config.font.cell_height), (4, 8));
        assert_eq!(config.render.run_options().idle_interval, Duration::from_millis(50));
        assert_eq!(config.render.max_sink_failures, 10);
    }

    #[test]
    fn test_session_command() {
        let mut session = SessionConfig::default();
        assert_eq!(session.command(), SessionCommand::tmux("tty"));

        session.command = Some(SessionCommand::new(vec!["htop".to_string()]));
        assert_eq!(session.command().argv, vec!["htop"]);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"display": {"rotation": 90, "target": "full", "sink": "null"}, "session": {"command": ["sh"]}}"#,
        )
        .unwrap();
        assert_eq!(config.display.rotation, Rotation::Deg90);
        assert_eq!(config.display.target, TargetMode::Full);
        assert_eq!(config.display.sink, SinkKind::Null);
        assert_eq!(config.display.width, 240);
        assert_eq!(config.session.command().argv, vec!["sh"]);
    }

    #[test]
    fn test_invalid_rotation_is_rejected() {
        let result = serde_json::from_str::<Config>(r#"{"display": {"rotation": 45}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"font": {"path": "font.bdf"}, "theme": "/etc/theme.json"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.font.path, dir.path().join("font.bdf"));
        assert_eq!(config.theme, Some(PathBuf::from("/etc/theme.json")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.display.target = TargetMode::Full;
        config.font.path = PathBuf::from("/usr/share/fonts/miniwi.bdf");
        config.theme = None;
        config.save(&path).unwrap();

        let restored = Config::load(&path).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_bundled_demo_config() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
        let config = Config::load(&demos.join("config.json")).unwrap();
        assert_eq!(config.display.rotation, Rotation::Deg180);
        assert_eq!(config.theme, Some(demos.join("theme.json")));

        let theme = crate::theme::Theme::load(&demos.join("theme.json")).unwrap();
        theme
            .validate(&crate::feed::Decoder::emitted_tokens())
            .unwrap();
    }
}
