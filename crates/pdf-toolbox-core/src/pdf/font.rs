//! Standard Helvetica font support for overlay text.
//!
//! Helvetica is one of the 14 standard fonts every viewer provides, so it is
//! referenced rather than embedded. Text is encoded with `WinAnsiEncoding`,
//! which matches Latin-1 for the printable range. Characters outside it are
//! replaced with `?`.

use lopdf::{Dictionary, Object};

/// Resource name used for the font inside overlay XObjects.
pub const FONT_RESOURCE: &str = "Helv";

/// Advance widths (1/1000 em) of Helvetica for codes 32..=126.
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' to '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // ':' to '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A' to 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' to 'Z'
    278, 278, 278, 469, 556, 333, // '[' to '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a' to 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n' to 'z'
    334, 260, 334, 584, // '{' to '~'
];

/// Width used for characters outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

/// Font dictionary for the standard Helvetica font.
pub fn helvetica() -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// Encode text as single-byte WinAnsi codes.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).unwrap_or(b'?'),
            _ => b'?',
        })
        .collect()
}

fn code_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => ASCII_WIDTHS[usize::from(code - 0x20)],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = encode(text).into_iter().map(|c| u32::from(code_width(c))).sum();
    #[allow(clippy::cast_precision_loss)]
    let units = units as f32;
    units * font_size / 1000.0
}
