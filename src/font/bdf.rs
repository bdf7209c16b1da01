//! BDF font parsing
//!
//! Reads the subset of the Glyph Bitmap Distribution Format needed for
//! fixed-cell terminal fonts: the font bounding box, the ascent, and each
//! character's encoding, bounding box and bitmap.

use super::FontError;

/// Bounding box as given by `FONTBOUNDINGBOX` / `BBX`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// One character from the font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdfGlyph {
    pub encoding: u32,
    pub bbx: BoundingBox,
    /// One entry per bitmap row; bit `x` set means pixel `x` (from the left) is on
    pub rows: Vec<u32>,
}

/// A parsed BDF font
#[derive(Debug, Clone, Default)]
pub struct BdfFont {
    pub bounding_box: BoundingBox,
    /// Pixels above the baseline
    pub ascent: i32,
    pub glyphs: Vec<BdfGlyph>,
}

impl BdfFont {
    pub fn parse(source: &str) -> Result<Self, FontError> {
        let mut font = BdfFont::default();
        let mut ascent = None;
        let mut current: Option<BdfGlyph> = None;
        let mut in_bitmap = false;

        for (index, raw) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let mut words = line.split_whitespace();
            let keyword = words.next().unwrap_or_default();

            if in_bitmap {
                if keyword == "ENDCHAR" {
                    in_bitmap = false;
                    if let Some(glyph) = current.take() {
                        if glyph.encoding != u32::MAX {
                            font.glyphs.push(glyph);
                        }
                    }
                } else if let Some(glyph) = current.as_mut() {
                    glyph.rows.push(parse_bitmap_row(keyword, glyph.bbx.width, line_no)?);
                }
                continue;
            }

            match keyword {
                "FONTBOUNDINGBOX" => font.bounding_box = parse_bbx(words, line_no)?,
                "FONT_ASCENT" => ascent = Some(parse_int(words.next(), line_no)?),
                "STARTCHAR" => current = Some(BdfGlyph {
                    encoding: u32::MAX,
                    bbx: font.bounding_box,
                    rows: Vec::new(),
                }),
                "ENCODING" => {
                    let encoding: i64 = parse_int(words.next(), line_no)?;
                    let glyph = current.as_mut().ok_or_else(|| parse_error(line_no, "ENCODING outside STARTCHAR"))?;
                    // Negative encodings are unmapped glyphs
                    glyph.encoding = u32::try_from(encoding).unwrap_or(u32::MAX);
                },
                "BBX" => {
                    let bbx = parse_bbx(words, line_no)?;
                    let glyph = current.as_mut().ok_or_else(|| parse_error(line_no, "BBX outside STARTCHAR"))?;
                    glyph.bbx = bbx;
                },
                "BITMAP" => {
                    if current.is_none() {
                        return Err(parse_error(line_no, "BITMAP outside STARTCHAR"));
                    }
                    in_bitmap = true;
                },
                _ => {}
            }
        }

        if current.is_some() {
            return Err(parse_error(source.lines().count(), "missing ENDCHAR"));
        }

        let fbb = font.bounding_box;
        font.ascent = ascent.unwrap_or(fbb.height as i32 + fbb.y_offset);
        Ok(font)
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> FontError {
    FontError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_int<T: std::str::FromStr>(word: Option<&str>, line: usize) -> Result<T, FontError> {
    word.and_then(|w| w.parse().ok())
        .ok_or_else(|| parse_error(line, "expected an integer"))
}

fn parse_bbx<'a>(mut words: impl Iterator<Item = &'a str>, line: usize) -> Result<BoundingBox, FontError> {
    Ok(BoundingBox {
        width: parse_int(words.next(), line)?,
        height: parse_int(words.next(), line)?,
        x_offset: parse_int(words.next(), line)?,
        y_offset: parse_int(words.next(), line)?,
    })
}

/// Rows are hex, padded to whole bytes, most significant bit leftmost
fn parse_bitmap_row(hex: &str, width: u32, line: usize) -> Result<u32, FontError> {
    if hex.len() > 8 || width > 32 {
        return Err(parse_error(line, "glyphs wider than 32 pixels are not supported"));
    }
    let value = u32::from_str_radix(hex, 16).map_err(|_| parse_error(line, "invalid bitmap row"))?;
    let bits = hex.len() as u32 * 4;

    let mut row = 0;
    for x in 0..width.min(bits) {
        if value & (1 << (bits - 1 - x)) != 0 {
            row |= 1 << x;
        }
    }
    Ok(row)
}
