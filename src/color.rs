//! Theme color parsing
//!
//! Theme colors arrive as CSS strings (usually read from custom properties).
//! Hex colors take a fast path; everything else (`rgb()`, `hsl()`, named
//! colors, ...) goes through lightningcss.

use image::Rgba;
use lightningcss::traits::Parse;
use lightningcss::values::color::{CssColor, FloatColor};
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// CSS parsing error from lightningcss
    #[error("CSS parse error: {0}")]
    CssParse(String),
}

/// Parse a CSS color string into an RGBA color.
///
/// ```
/// use fryfall::color::parse_color;
///
/// assert_eq!(parse_color("#f8b400").unwrap(), image::Rgba([248, 180, 0, 255]));
/// assert_eq!(parse_color("#FFF8").unwrap(), image::Rgba([255, 255, 255, 136]));
/// assert_eq!(parse_color("rgb(217, 43, 43)").unwrap(), image::Rgba([217, 43, 43, 255]));
/// assert_eq!(parse_color("white").unwrap(), image::Rgba([255, 255, 255, 255]));
/// ```
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    match s.strip_prefix('#') {
        Some(hex) => parse_hex(hex),
        None => parse_css(s),
    }
}

fn parse_hex(hex: &str) -> Result<Rgba<u8>, ColorError> {
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(bad));
    }

    let digits: Vec<u8> = hex.bytes().map(hex_value).collect();
    let rgba = match digits.as_slice() {
        [r, g, b] => [r * 17, g * 17, b * 17, 255],
        [r, g, b, a] => [r * 17, g * 17, b * 17, a * 17],
        [r1, r0, g1, g0, b1, b0] => [r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, 255],
        [r1, r0, g1, g0, b1, b0, a1, a0] => {
            [r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, a1 * 16 + a0]
        }
        other => return Err(ColorError::InvalidLength(other.len())),
    };
    Ok(Rgba(rgba))
}

/// Caller guarantees `b` is an ASCII hex digit.
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

fn parse_css(s: &str) -> Result<Rgba<u8>, ColorError> {
    let color = CssColor::parse_string(s).map_err(|e| ColorError::CssParse(e.to_string()))?;
    let rgb = color
        .to_rgb()
        .map_err(|_| ColorError::CssParse(format!("cannot convert '{}' to RGB", s)))?;

    match rgb {
        CssColor::RGBA(c) => Ok(Rgba([c.red, c.green, c.blue, c.alpha])),
        CssColor::Float(float) => match float.as_ref() {
            FloatColor::RGB(c) => Ok(Rgba([
                unit_to_byte(c.r),
                unit_to_byte(c.g),
                unit_to_byte(c.b),
                unit_to_byte(c.alpha),
            ])),
            _ => Err(ColorError::CssParse("unexpected float color format".to_string())),
        },
        _ => Err(ColorError::CssParse("color conversion did not produce RGB".to_string())),
    }
}

fn unit_to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Replace the alpha channel of a color.
pub fn with_alpha(color: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    let [r, g, b, _] = color.0;
    Rgba([r, g, b, alpha])
}

/// Format a color as a CSS `rgba()` string, as canvas fill styles expect.
pub fn to_css(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    format!("rgba({},{},{},{})", r, g, b, a as f64 / 255.0)
}
