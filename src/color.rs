use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MapError;

/// An 8-bit RGBA color as written by Tiled.
///
/// Parsed from `#RRGGBB` or `#AARRGGBB` (the `#` is optional, hex digits are
/// case-insensitive). Always written back as `#aarrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel, 255 is opaque.
    pub alpha: u8,
}

impl Color {
    /// Opaque black, the default color of text objects.
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Builds a color from its four channels.
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

fn hex_byte(s: &str) -> Option<u8> {
    u8::from_str_radix(s, 16).ok()
}

impl FromStr for Color {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || MapError::InvalidColor(s.to_owned());

        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let (alpha, rgb) = match hex.len() {
            6 => (255, hex),
            8 => (hex_byte(&hex[0..2]).ok_or_else(invalid)?, &hex[2..]),
            _ => return Err(invalid()),
        };

        Ok(Color {
            red: hex_byte(&rgb[0..2]).ok_or_else(invalid)?,
            green: hex_byte(&rgb[2..4]).ok_or_else(invalid)?,
            blue: hex_byte(&rgb[4..6]).ok_or_else(invalid)?,
            alpha,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.alpha, self.red, self.green, self.blue
        )
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Color> for macroquad::color::Color {
    fn from(c: Color) -> Self {
        macroquad::color::Color::from_rgba(c.red, c.green, c.blue, c.alpha)
    }
}
