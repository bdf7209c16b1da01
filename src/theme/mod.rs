//! Color theme
//!
//! Maps the color tokens carried by cells to display colors. A theme file is
//! a flat JSON object from token to color string with two required keys,
//! `foreground` and `background`:
//!
//! ```json
//! { "foreground": "#c5c8c6", "background": "#1d1f21", "red": "#cc6666" }
//! ```
//!
//! Tokens missing from the theme are interpreted as color literals. The
//! reverse attribute swaps the two resolved colors after resolution.

mod color;

use std::collections::HashMap;
use std::path::Path;

use crate::core::{Cell, ColorToken};

pub use color::Rgb;

const FOREGROUND: &str = "foreground";
const BACKGROUND: &str = "background";
const CURSOR: &str = "cursor";

/// Theme loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Theme IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Theme JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Theme is missing required key {0:?}")]
    MissingKey(&'static str),
    #[error("Theme entry {key:?} has an invalid color {value:?}")]
    InvalidColor { key: String, value: String },
    #[error("Color token {0:?} is not in the theme and is not a color literal")]
    Unresolvable(String),
}

/// Immutable token to color mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    foreground: Rgb,
    background: Rgb,
    cursor: Rgb,
    colors: HashMap<String, Rgb>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(Rgb::WHITE, Rgb::BLACK)
    }
}

impl Theme {
    pub fn new(foreground: Rgb, background: Rgb) -> Self {
        Self {
            foreground,
            background,
            cursor: Rgb::WHITE,
            colors: HashMap::new(),
        }
    }

    /// Load a theme file
    pub fn load(path: &Path) -> Result<Self, ThemeError> {
        let content = std::fs::read_to_string(path)?;
        let theme = Self::from_json(&content)?;
        tracing::info!("Loaded theme {} ({} colors)", path.display(), theme.colors.len());
        Ok(theme)
    }

    pub fn from_json(json: &str) -> Result<Self, ThemeError> {
        let entries: HashMap<String, String> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut colors = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let rgb = Rgb::parse(&value).ok_or_else(|| ThemeError::InvalidColor {
                key: key.clone(),
                value: value.clone(),
            })?;
            colors.insert(key, rgb);
        }

        let foreground = *colors.get(FOREGROUND).ok_or(ThemeError::MissingKey(FOREGROUND))?;
        let background = *colors.get(BACKGROUND).ok_or(ThemeError::MissingKey(BACKGROUND))?;
        let cursor = colors.get(CURSOR).copied().unwrap_or(Rgb::WHITE);

        Ok(Self {
            foreground,
            background,
            cursor,
            colors,
        })
    }

    /// Add or replace a token mapping
    pub fn with_color(mut self, token: impl Into<String>, rgb: Rgb) -> Self {
        self.colors.insert(token.into(), rgb);
        self
    }

    pub fn with_cursor(mut self, rgb: Rgb) -> Self {
        self.cursor = rgb;
        self
    }

    pub fn foreground(&self) -> Rgb {
        self.foreground
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Color of the cursor underline
    pub fn cursor(&self) -> Rgb {
        self.cursor
    }

    /// Resolve one token; `fallback` is used for `"default"`
    pub fn resolve_token(&self, token: &ColorToken, fallback: Rgb) -> Result<Rgb, ThemeError> {
        if token.is_default() {
            return Ok(fallback);
        }
        self.colors
            .get(token.as_str())
            .copied()
            .or_else(|| Rgb::parse(token.as_str()))
            .ok_or_else(|| ThemeError::Unresolvable(token.to_string()))
    }

    /// Check at startup that every token the feed may emit resolves
    pub fn validate<'a>(&self, tokens: impl IntoIterator<Item = &'a ColorToken>) -> Result<(), ThemeError> {
        for token in tokens {
            self.resolve_token(token, self.foreground)?;
        }
        Ok(())
    }

    /// Foreground of a cell before the reverse swap
    pub fn resolve_foreground(&self, cell: &Cell) -> Rgb {
        self.resolve_or_report(&cell.fg, self.foreground)
    }

    /// Background of a cell before the reverse swap
    pub fn resolve_background(&self, cell: &Cell) -> Rgb {
        self.resolve_or_report(&cell.bg, self.background)
    }

    /// The (foreground, background) pair a cell is drawn with. Bold does
    /// not change the color.
    pub fn resolve(&self, cell: &Cell) -> (Rgb, Rgb) {
        let fg = self.resolve_foreground(cell);
        let bg = self.resolve_background(cell);
        if cell.style.reverse {
            (bg, fg)
        } else {
            (fg, bg)
        }
    }

    fn resolve_or_report(&self, token: &ColorToken, fallback: Rgb) -> Rgb {
        self.resolve_token(token, fallback).unwrap_or_else(|e| {
            // Startup validation should have caught this
            tracing::error!("{}; drawing with the default color", e);
            fallback
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Style;

    fn theme() -> Theme {
        Theme::from_json(r##"{"foreground": "#c0c0c0", "background": "#101010", "red": "#aa0000"}"##).unwrap()
    }

    fn cell(fg: &str, bg: &str, reverse: bool) -> Cell {
        Cell::with_style(
            "x",
            ColorToken::new(fg),
            ColorToken::new(bg),
            Style {
                reverse,
                ..Style::default()
            },
        )
    }

    #[test]
    fn test_default_tokens_use_theme_defaults() {
        let theme = theme();
        let (fg, bg) = theme.resolve(&cell("default", "default", false));
        assert_eq!(fg, Rgb::new(0xc0, 0xc0, 0xc0));
        assert_eq!(bg, Rgb::new(0x10, 0x10, 0x10));
    }

    #[test]
    fn test_theme_entry_wins_over_literal() {
        let theme = theme();
        assert_eq!(theme.resolve_foreground(&cell("red", "default", false)), Rgb::new(0xaa, 0, 0));
    }

    #[test]
    fn test_missing_name_falls_back_to_literal() {
        let theme = theme();
        assert_eq!(
            theme.resolve_foreground(&cell("magenta", "default", false)),
            Rgb::new(0xff, 0x00, 0xff)
        );
        assert_eq!(
            theme.resolve_background(&cell("default", "336699", false)),
            Rgb::new(0x33, 0x66, 0x99)
        );
    }

    #[test]
    fn test_reverse_swaps_after_resolution() {
        let theme = theme();
        let plain = theme.resolve(&cell("red", "default", false));
        let reversed = theme.resolve(&cell("red", "default", true));
        assert_eq!(reversed, (plain.1, plain.0));
    }

    #[test]
    fn test_bold_does_not_change_color() {
        let theme = theme();
        let mut bold = cell("red", "default", false);
        bold.style.bold = true;
        assert_eq!(theme.resolve(&bold), theme.resolve(&cell("red", "default", false)));
    }

    #[test]
    fn test_unresolvable_token_degrades_to_default() {
        let theme = theme();
        assert_eq!(theme.resolve_foreground(&cell("nonsense", "default", false)), theme.foreground());
    }

    #[test]
    fn test_validate() {
        let theme = theme();
        let good = [ColorToken::new("default"), ColorToken::new("red"), ColorToken::new("brightcyan")];
        assert!(theme.validate(&good).is_ok());

        let bad = [ColorToken::new("nonsense")];
        assert!(matches!(theme.validate(&bad), Err(ThemeError::Unresolvable(t)) if t == "nonsense"));
    }

    #[test]
    fn test_required_keys() {
        assert!(matches!(
            Theme::from_json(r##"{"background": "#000000"}"##),
            Err(ThemeError::MissingKey("foreground"))
        ));
        assert!(matches!(
            Theme::from_json(r##"{"foreground": "#ffffff"}"##),
            Err(ThemeError::MissingKey("background"))
        ));
    }

    #[test]
    fn test_invalid_entry_is_rejected() {
        let result = Theme::from_json(r##"{"foreground": "#fff", "background": "#000", "red": "#12"}"##);
        assert!(matches!(result, Err(ThemeError::InvalidColor { key, .. }) if key == "red"));
    }

    #[test]
    fn test_cursor_entry() {
        let theme = Theme::from_json(r##"{"foreground": "#fff", "background": "#000", "cursor": "#00ff00"}"##).unwrap();
        assert_eq!(theme.cursor(), Rgb::new(0, 0xff, 0));
        assert_eq!(Theme::default().cursor(), Rgb::WHITE);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.json");
        std::fs::write(&path, r##"{"foreground": "white", "background": "black"}"##).unwrap();

        let theme = Theme::load(&path).unwrap();
        assert_eq!(theme.foreground(), Rgb::WHITE);
        assert_eq!(theme.background(), Rgb::BLACK);
    }
}
