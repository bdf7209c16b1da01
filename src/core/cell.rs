//! Terminal Cell
//!
//! Represents a single cell in the terminal grid, containing a character
//! and the color tokens and attributes it is drawn with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A color as the session feed names it.
///
/// Either the literal `"default"`, a name the theme may map (`"red"`,
/// `"brightblue"`), or a hex literal (`"ff8700"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(String);

impl ColorToken {
    /// Token naming the theme's default foreground or background
    pub const DEFAULT: &'static str = "default";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn default_color() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ColorToken {
    fn default() -> Self {
        Self::default_color()
    }
}

impl From<&str> for ColorToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character(s) in this cell. Empty for blank cells; more than one
    /// code point when combining marks were attached.
    pub content: String,
    /// Foreground color token
    pub fg: ColorToken,
    /// Background color token
    pub bg: ColorToken,
    /// Text style attributes
    pub style: Style,
    /// Right half of a double-width character; `content` is empty
    #[serde(default)]
    pub continuation: bool,
}

impl Cell {
    /// Create a new cell with a single character
    pub fn new(c: char) -> Self {
        Self {
            content: c.to_string(),
            ..Default::default()
        }
    }

    /// Create a new cell with content, colors and style
    pub fn with_style(content: impl Into<String>, fg: ColorToken, bg: ColorToken, style: Style) -> Self {
        Self {
            content: content.into(),
            fg,
            bg,
            style,
            continuation: false,
        }
    }

    /// The right half of a double-width character drawn with `fg`/`bg`
    pub fn continuation(fg: ColorToken, bg: ColorToken, style: Style) -> Self {
        Self {
            continuation: true,
            ..Self::with_style(String::new(), fg, bg, style)
        }
    }

    /// Check if this cell is empty (no content)
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The code point to draw, if the cell holds exactly one
    pub fn codepoint(&self) -> Option<u32> {
        let mut chars = self.content.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c as u32),
            _ => None,
        }
    }

    /// Clear the cell but keep the given background (erase semantics)
    pub fn erase(&mut self, bg: &ColorToken) {
        self.content.clear();
        self.fg = ColorToken::default_color();
        self.bg = bg.clone();
        self.style = Style::default();
        self.continuation = false;
    }
}

/// Text style attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl Style {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default() {
        let cell = Cell::default();
        assert!(cell.is_empty());
        assert!(cell.fg.is_default());
        assert!(cell.bg.is_default());
        assert_eq!(cell.codepoint(), None);
    }

    #[test]
    fn test_cell_new() {
        let cell = Cell::new('A');
        assert_eq!(cell.content, "A");
        assert_eq!(cell.codepoint(), Some(65));
    }

    #[test]
    fn test_combining_sequence_has_no_single_codepoint() {
        let cell = Cell::with_style(
            "e\u{301}",
            ColorToken::default(),
            ColorToken::default(),
            Style::default(),
        );
        assert_eq!(cell.codepoint(), None);
    }

    #[test]
    fn test_cell_erase_keeps_background() {
        let mut cell = Cell::new('A');
        cell.fg = ColorToken::new("red");
        cell.style.underline = true;
        cell.erase(&ColorToken::new("blue"));
        assert!(cell.is_empty());
        assert!(cell.fg.is_default());
        assert_eq!(cell.bg.as_str(), "blue");
        assert!(!cell.style.underline);
    }

    #[test]
    fn test_erase_clears_continuation() {
        let mut cell = Cell::continuation(ColorToken::default(), ColorToken::new("red"), Style::default());
        assert!(cell.is_empty());
        assert!(cell.continuation);
        cell.erase(&ColorToken::default());
        assert!(!cell.continuation);
    }

    #[test]
    fn test_color_token_serializes_as_string() {
        let json = serde_json::to_string(&ColorToken::new("magenta")).unwrap();
        assert_eq!(json, "\"magenta\"");
    }
}
