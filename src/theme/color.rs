//! Display colors and literal color parsing

use std::fmt;

/// A 24-bit color. Panels usually want RGB565, see [`Rgb::to_rgb565`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Color names understood without a theme entry
const NAMED: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0x00, 0x00, 0x00)),
    ("red", Rgb::new(0xff, 0x00, 0x00)),
    ("green", Rgb::new(0x00, 0x80, 0x00)),
    ("brown", Rgb::new(0xa5, 0x2a, 0x2a)),
    ("yellow", Rgb::new(0xff, 0xff, 0x00)),
    ("blue", Rgb::new(0x00, 0x00, 0xff)),
    ("magenta", Rgb::new(0xff, 0x00, 0xff)),
    ("cyan", Rgb::new(0x00, 0xff, 0xff)),
    ("white", Rgb::new(0xff, 0xff, 0xff)),
    ("gray", Rgb::new(0x80, 0x80, 0x80)),
    ("grey", Rgb::new(0x80, 0x80, 0x80)),
    // Bright variants follow the xterm palette (8-15)
    ("brightblack", Rgb::new(0x7f, 0x7f, 0x7f)),
    ("brightred", Rgb::new(0xff, 0x00, 0x00)),
    ("brightgreen", Rgb::new(0x00, 0xff, 0x00)),
    ("brightbrown", Rgb::new(0xff, 0xff, 0x00)),
    ("brightblue", Rgb::new(0x5c, 0x5c, 0xff)),
    ("brightmagenta", Rgb::new(0xff, 0x00, 0xff)),
    ("brightcyan", Rgb::new(0x00, 0xff, 0xff)),
    ("brightwhite", Rgb::new(0xff, 0xff, 0xff)),
];

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Interpret a color literal: `#rrggbb`, `rrggbb`, `#rgb`, or a
    /// built-in color name (case-insensitive)
    pub fn parse(literal: &str) -> Option<Self> {
        let literal = literal.trim();
        let hex = literal.strip_prefix('#').unwrap_or(literal);
        if let Some(rgb) = Self::from_hex(hex) {
            return Some(rgb);
        }
        NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(literal))
            .map(|(_, rgb)| *rgb)
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize, len: usize| u8::from_str_radix(&hex[i..i + len], 16).ok();
        match hex.len() {
            6 => Some(Self::new(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
            3 => {
                let expand = |v: u8| v << 4 | v;
                Some(Self::new(
                    expand(channel(0, 1)?),
                    expand(channel(1, 1)?),
                    expand(channel(2, 1)?),
                ))
            },
            _ => None,
        }
    }

    /// Pack into the 16-bit 5-6-5 format used by ST7789/ILI9341 panels
    pub fn to_rgb565(self) -> u16 {
        (u16::from(self.r) & 0xf8) << 8 | (u16::from(self.g) & 0xfc) << 3 | u16::from(self.b) >> 3
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
