//! Byte stream decoder
//!
//! A deliberately small decoder that turns multiplexer output into screen
//! writes. It understands UTF-8 text, the C0 controls, cursor positioning
//! (`CUP`, `CUU`/`CUD`/`CUF`/`CUB`, `CHA`, `VPA`), line and display erase,
//! full reset, and SGR colors and attributes. Every other escape sequence is
//! consumed and dropped; a full VT engine can replace this type behind the
//! same [`ScreenWriter`] calls.

use unicode_width::UnicodeWidthChar;

use crate::core::{ColorToken, Pen};

use super::screen::{ScreenWriter, SharedScreen};

/// Names emitted for SGR 30-37 / 40-47, in color index order
const NAMED_COLORS: [&str; 8] = [
    "black", "red", "green", "brown", "blue", "magenta", "cyan", "white",
];

/// Names emitted for SGR 90-97 / 100-107
const BRIGHT_COLORS: [&str; 8] = [
    "brightblack",
    "brightred",
    "brightgreen",
    "brightbrown",
    "brightblue",
    "brightmagenta",
    "brightcyan",
    "brightwhite",
];

const MAX_PARAMS_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    /// ESC followed by an intermediate byte; one more byte ends it
    EscapeIntermediate,
    Csi,
    /// OSC, DCS, APC and friends: skip until BEL or ST
    String,
    StringEscape,
}

/// Incremental decoder; keeps partial sequences across reads
#[derive(Debug)]
pub struct Decoder {
    state: State,
    params: String,
    utf8: Vec<u8>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: String::new(),
            utf8: Vec::with_capacity(4),
        }
    }

    /// Every named color token this decoder can produce, for theme validation
    pub fn emitted_tokens() -> Vec<ColorToken> {
        std::iter::once(ColorToken::DEFAULT)
            .chain(NAMED_COLORS)
            .chain(BRIGHT_COLORS)
            .map(ColorToken::from)
            .collect()
    }

    /// Decode a chunk and apply it to the screen under a single lock
    pub fn feed(&mut self, bytes: &[u8], screen: &SharedScreen) {
        screen.write(|writer| self.apply(bytes, writer));
    }

    pub fn apply(&mut self, bytes: &[u8], writer: &mut ScreenWriter<'_>) {
        for &byte in bytes {
            self.advance(byte, writer);
        }
    }

    fn advance(&mut self, byte: u8, writer: &mut ScreenWriter<'_>) {
        match self.state {
            State::Ground => self.ground(byte, writer),
            State::Escape => match byte {
                b'[' => {
                    self.params.clear();
                    self.state = State::Csi;
                },
                b']' | b'P' | b'_' | b'^' | b'X' => self.state = State::String,
                b'c' => {
                    *writer.pen_mut() = Pen::default();
                    writer.clear();
                    self.state = State::Ground;
                },
                0x20..=0x2f => self.state = State::EscapeIntermediate,
                _ => self.state = State::Ground,
            },
            State::EscapeIntermediate => self.state = State::Ground,
            State::Csi => match byte {
                0x40..=0x7e => {
                    self.dispatch_csi(byte, writer);
                    self.state = State::Ground;
                },
                0x1b => self.state = State::Escape,
                _ => {
                    if self.params.len() < MAX_PARAMS_LEN {
                        self.params.push(byte as char);
                    }
                },
            },
            State::String => match byte {
                0x07 => self.state = State::Ground,
                0x1b => self.state = State::StringEscape,
                _ => {}
            },
            State::StringEscape => {
                self.state = if byte == b'\\' {
                    State::Ground
                } else {
                    State::String
                };
            },
        }
    }

    fn ground(&mut self, byte: u8, writer: &mut ScreenWriter<'_>) {
        if byte >= 0x80 {
            self.utf8_byte(byte, writer);
            return;
        }
        if !self.utf8.is_empty() {
            // Truncated multi-byte sequence
            self.utf8.clear();
            writer.print(char::REPLACEMENT_CHARACTER);
        }

        match byte {
            0x1b => self.state = State::Escape,
            b'\r' => writer.carriage_return(),
            b'\n' | 0x0b | 0x0c => writer.line_feed(),
            0x08 => writer.backspace(),
            b'\t' => writer.tab(),
            0x20..=0x7e => writer.print(byte as char),
            _ => {}
        }
    }

    fn utf8_byte(&mut self, byte: u8, writer: &mut ScreenWriter<'_>) {
        self.utf8.push(byte);
        let expected = match self.utf8[0] {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 1,
        };
        if self.utf8.len() < expected {
            return;
        }

        let c = std::str::from_utf8(&self.utf8)
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        self.utf8.clear();
        self.put_char(c, writer);
    }

    fn put_char(&mut self, c: char, writer: &mut ScreenWriter<'_>) {
        match c.width() {
            Some(0) => writer.combine(c),
            Some(2) => writer.print_wide(c),
            Some(_) => writer.print(c),
            None => {}
        }
    }

    fn dispatch_csi(&self, action: u8, writer: &mut ScreenWriter<'_>) {
        // Private and intermediate forms (DEC modes and the like) are skipped
        let plain = self
            .params
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b';' || b == b':');
        if !plain {
            return;
        }
        let params: Vec<u16> = self
            .params
            .split([';', ':'])
            .map(|p| p.parse().unwrap_or(0))
            .collect();
        // Missing or zero counts and positions mean 1
        let arg = |i: usize| params.get(i).copied().filter(|&n| n > 0).unwrap_or(1) as usize;
        let (col, row) = (writer.cursor().col, writer.cursor().row);

        match action {
            b'm' => select_graphic_rendition(&params, writer),
            b'H' | b'f' => writer.move_to(arg(1) - 1, arg(0) - 1),
            b'A' => writer.move_to(col, row.saturating_sub(arg(0))),
            b'B' | b'e' => writer.move_to(col, row + arg(0)),
            b'C' | b'a' => writer.move_to(col + arg(0), row),
            b'D' => writer.move_to(col.saturating_sub(arg(0)), row),
            b'E' => writer.move_to(0, row + arg(0)),
            b'F' => writer.move_to(0, row.saturating_sub(arg(0))),
            b'G' | b'`' => writer.move_to(arg(0) - 1, row),
            b'd' => writer.move_to(col, arg(0) - 1),
            b'J' => writer.erase_in_display(params.first().copied().unwrap_or(0)),
            b'K' => writer.erase_in_line(params.first().copied().unwrap_or(0)),
            _ => {}
        }
    }
}

fn select_graphic_rendition(params: &[u16], writer: &mut ScreenWriter<'_>) {
    let pen = writer.pen_mut();

    let mut i = 0;
    while i < params.len() {
        match params[i] {
            0 => *pen = Pen::default(),
            1 => pen.style.bold = true,
            4 => pen.style.underline = true,
            7 => pen.style.reverse = true,
            22 => pen.style.bold = false,
            24 => pen.style.underline = false,
            27 => pen.style.reverse = false,
            n @ 30..=37 => pen.fg = ColorToken::new(NAMED_COLORS[(n - 30) as usize]),
            39 => pen.fg = ColorToken::default_color(),
            n @ 40..=47 => pen.bg = ColorToken::new(NAMED_COLORS[(n - 40) as usize]),
            49 => pen.bg = ColorToken::default_color(),
            n @ 90..=97 => pen.fg = ColorToken::new(BRIGHT_COLORS[(n - 90) as usize]),
            n @ 100..=107 => pen.bg = ColorToken::new(BRIGHT_COLORS[(n - 100) as usize]),
            38 | 48 => {
                let (token, consumed) = extended_color(&params[i + 1..]);
                if let Some(token) = token {
                    if params[i] == 38 {
                        pen.fg = token;
                    } else {
                        pen.bg = token;
                    }
                }
                i += consumed;
            },
            _ => {}
        }
        i += 1;
    }
}

/// Parse the tail of `38;5;n` or `38;2;r;g;b`. Returns the token and how many
/// parameters it used.
fn extended_color(params: &[u16]) -> (Option<ColorToken>, usize) {
    match params {
        [5, index, ..] => (Some(indexed_token(*index as u8)), 2),
        [2, r, g, b, ..] => (Some(hex_token(*r as u8, *g as u8, *b as u8)), 4),
        [] => (None, 0),
        _ => (None, params.len()),
    }
}

fn indexed_token(index: u8) -> ColorToken {
    match index {
        0..=7 => ColorToken::new(NAMED_COLORS[index as usize]),
        8..=15 => ColorToken::new(BRIGHT_COLORS[(index - 8) as usize]),
        // 216 color cube (16-231)
        16..=231 => {
            let n = index - 16;
            let to_rgb = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            hex_token(to_rgb(n / 36), to_rgb((n % 36) / 6), to_rgb(n % 6))
        },
        // Grayscale (232-255)
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            hex_token(gray, gray, gray)
        },
    }
}

fn hex_token(r: u8, g: u8, b: u8) -> ColorToken {
    ColorToken::new(format!("{:02x}{:02x}{:02x}", r, g, b))
}
