//! Theme palette
//!
//! The primary colour doubles as the wave colour.

use serde::{Deserialize, Serialize};
use tiny_skia::Color;

// Straight RGB
pub const LIGHT_PRIMARY: [u8; 3] = [0x07, 0x30, 0x42];
pub const DARK_PRIMARY: [u8; 3] = [0x9b, 0xbe, 0xd3];

pub const LIGHT_BACKGROUND: [u8; 3] = [0xff, 0xff, 0xff];
pub const DARK_BACKGROUND: [u8; 3] = [0x12, 0x12, 0x12];

pub fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::from_rgba8(r, g, b, 255)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn primary(&self) -> Color {
        match self {
            Theme::Light => rgb(LIGHT_PRIMARY),
            Theme::Dark => rgb(DARK_PRIMARY),
        }
    }

    pub fn background(&self) -> Color {
        match self {
            Theme::Light => rgb(LIGHT_BACKGROUND),
            Theme::Dark => rgb(DARK_BACKGROUND),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Invalid theme: {}", other)),
        }
    }
}

/// Parse `#rrggbb` (the leading `#` is optional)
pub fn parse_hex_color(s: &str) -> Result<Color, String> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Invalid colour {:?}, expected #rrggbb", s));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
    Ok(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255))
}

/// Format a colour as `#rrggbb`, dropping alpha
pub fn to_hex(color: Color) -> String {
    let c = color.to_color_u8();
    format!("#{:02x}{:02x}{:02x}", c.red(), c.green(), c.blue())
}
