// src/color.rs

//! Defines the opaque color value painted by stimulus elements.
//!
//! Colors are treated as device-ready RGBA quadruples. No color-space
//! conversion happens anywhere in the engine: whatever the experiment supplies
//! is what lands in the framebuffer.

use serde::{Deserialize, Serialize};

/// Named colors commonly used in experiment scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedColor {
    Black,
    White,
    Gray,
    Red,
    Green,
    Blue,
    Yellow,
}

impl NamedColor {
    /// Returns the RGBA value of this named color.
    pub fn to_color(self) -> Color {
        match self {
            NamedColor::Black => Color::rgb(0, 0, 0),
            NamedColor::White => Color::rgb(255, 255, 255),
            NamedColor::Gray => Color::rgb(128, 128, 128),
            NamedColor::Red => Color::rgb(255, 0, 0),
            NamedColor::Green => Color::rgb(0, 255, 0),
            NamedColor::Blue => Color::rgb(0, 0, 255),
            NamedColor::Yellow => Color::rgb(255, 255, 0),
        }
    }

    /// Parses a case-insensitive color name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "black" => Some(NamedColor::Black),
            "white" => Some(NamedColor::White),
            "gray" | "grey" => Some(NamedColor::Gray),
            "red" => Some(NamedColor::Red),
            "green" => Some(NamedColor::Green),
            "blue" => Some(NamedColor::Blue),
            "yellow" => Some(NamedColor::Yellow),
            _ => None,
        }
    }
}

/// An RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Parses `#rrggbb`, `#rrggbbaa` or a named color.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
                8 => Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
                _ => None,
            };
        }
        NamedColor::from_name(text).map(NamedColor::to_color)
    }

    /// Pixel bytes in framebuffer order.
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Blends `self` over `dst` using straight alpha.
    pub fn over(self, dst: [u8; 4]) -> [u8; 4] {
        match self.a {
            255 => self.to_bytes(),
            0 => dst,
            a => {
                let a = a as u32;
                let inv = 255 - a;
                let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * inv + 127) / 255) as u8;
                [
                    mix(self.r, dst[0]),
                    mix(self.g, dst[1]),
                    mix(self.b, dst[2]),
                    255,
                ]
            }
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        named.to_color()
    }
}
