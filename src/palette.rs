// Named color palettes and cyclic color assignment

use log::debug;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub colors: &'static [Color],
}

pub const DEFAULT_PALETTE: &str = "default";

static PALETTES: [Palette; 4] = [
    Palette {
        name: "default",
        colors: &[
            Color::rgb(0x6F, 0xC1, 0xA3),
            Color::rgb(0x5F, 0xB3, 0x96),
            Color::rgb(0x4D, 0xA0, 0x85),
            Color::rgb(0x3D, 0x86, 0x74),
            Color::rgb(0x2D, 0x6D, 0x63),
        ],
    },
    Palette {
        name: "blue",
        colors: &[
            Color::rgb(0x3B, 0x82, 0xF6),
            Color::rgb(0x25, 0x63, 0xEB),
            Color::rgb(0x1D, 0x4E, 0xD8),
            Color::rgb(0x1E, 0x40, 0xAF),
            Color::rgb(0x1E, 0x3A, 0x8A),
        ],
    },
    Palette {
        name: "purple",
        colors: &[
            Color::rgb(0x8B, 0x5C, 0xF6),
            Color::rgb(0x7C, 0x3A, 0xED),
            Color::rgb(0x6D, 0x28, 0xD9),
            Color::rgb(0x5B, 0x21, 0xB6),
            Color::rgb(0x4C, 0x1D, 0x95),
        ],
    },
    Palette {
        name: "rainbow",
        colors: &[
            Color::rgb(0xEF, 0x44, 0x44),
            Color::rgb(0xF9, 0x73, 0x16),
            Color::rgb(0xEA, 0xB3, 0x08),
            Color::rgb(0x22, 0xC5, 0x5E),
            Color::rgb(0x3B, 0x82, 0xF6),
            Color::rgb(0x8B, 0x5C, 0xF6),
        ],
    },
];

impl Palette {
    /// Look up a palette by name, falling back to the default palette
    pub fn resolve(name: &str) -> &'static Palette {
        match PALETTES.iter().find(|p| p.name == name) {
            Some(palette) => palette,
            None => {
                debug!("unknown palette '{}', using '{}'", name, DEFAULT_PALETTE);
                &PALETTES[0]
            }
        }
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        PALETTES.iter().map(|p| p.name)
    }

    /// Color at `index`, wrapping around the palette
    pub fn color(&self, index: usize) -> Color {
        self.colors[index % self.colors.len()]
    }

    pub fn cycle(&self, count: usize) -> Vec<Color> {
        (0..count).map(|i| self.color(i)).collect()
    }
}

/// `count` colors from the named palette, cycling when `count` exceeds its length
pub fn colors_for(count: usize, palette_name: &str) -> Vec<Color> {
    Palette::resolve(palette_name).cycle(count)
}
