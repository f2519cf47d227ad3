//! Colours for allele nodes, ribbons and track chrome.

use crate::types::AlleleKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Straight-alpha RGBA colour, serialised as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let alpha = if digits.len() == 8 { byte(6)? } else { 255 };
        Some(Self {
            r: byte(0)? as f32 / 255.0,
            g: byte(2)? as f32 / 255.0,
            b: byte(4)? as f32 / 255.0,
            a: alpha as f32 / 255.0,
        })
    }

    pub fn to_hex(&self) -> String {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", channel(self.r), channel(self.g), channel(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                channel(self.r),
                channel(self.g),
                channel(self.b),
                channel(self.a)
            )
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Premultiplied RGBA as consumed by the blend stage.
    pub fn premultiplied(&self) -> [f32; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [self.r * a, self.g * a, self.b * a, a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid colour '{}'", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Color,
    pub reference: Color,
    pub no_call: Color,
    /// Cycled for `alt1`, `alt2`, …
    pub alternates: Vec<Color>,
    pub fallback: Color,
    pub gap_band: Color,
    pub outline: Color,
    pub selection: Color,
    pub text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::rgb(0xff, 0xff, 0xff),
            reference: Color::rgb(0x9e, 0x9e, 0x9e),
            no_call: Color::rgb(0xd6, 0xd6, 0xd6),
            alternates: vec![
                Color::rgb(0x1f, 0x77, 0xb4),
                Color::rgb(0xd6, 0x27, 0x28),
                Color::rgb(0x2c, 0xa0, 0x2c),
                Color::rgb(0x94, 0x67, 0xbd),
                Color::rgb(0xff, 0x7f, 0x0e),
                Color::rgb(0x17, 0xbe, 0xcf),
            ],
            fallback: Color::rgb(0xb0, 0xb0, 0xb0),
            gap_band: Color::rgb(0xff, 0xf3, 0xc4),
            outline: Color::rgb(0x33, 0x33, 0x33),
            selection: Color::rgb(0xff, 0xa5, 0x00),
            text: Color::rgb(0x22, 0x22, 0x22),
        }
    }
}

impl Palette {
    pub fn allele_color(&self, allele: AlleleKey) -> Color {
        match allele {
            AlleleKey::Reference => self.reference,
            AlleleKey::NoCall => self.no_call,
            AlleleKey::Alt(i) => {
                if self.alternates.is_empty() {
                    self.reference
                } else {
                    self.alternates[i as usize % self.alternates.len()]
                }
            }
        }
    }
}
