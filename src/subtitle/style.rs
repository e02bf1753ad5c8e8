//! Global style configuration, font-family resolution and ASS color encoding.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Global rendering parameters applied to every cue unless overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Primary text color (`#RRGGBB` or `rgba(...)`).
    pub color: String,
    /// Outline / box color.
    pub background_color: String,
    pub font_size: f64,
    pub font_family: String,
    pub letter_spacing: f64,
    /// Distance of the text baseline from the bottom edge, in pixels.
    pub bottom: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            background_color: "rgba(0, 0, 0, 0.6)".to_string(),
            font_size: 30.0,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            letter_spacing: 0.0,
            bottom: 50.0,
        }
    }
}

/// The two bundled font families every family string resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Sans,
    Serif,
}

const SERIF_MARKERS: &[&str] = &["serif", "KaiTi", "SongTi", "Times", "Georgia"];

impl FontFamily {
    /// Map a CSS-style family list onto a bundled family.
    ///
    /// `sans-serif` is checked first so its `serif` substring cannot select
    /// the serif family. Anything unrecognised is sans.
    pub fn resolve(family: &str) -> Self {
        if family.contains("sans-serif") {
            return FontFamily::Sans;
        }
        if SERIF_MARKERS.iter().any(|marker| family.contains(marker)) {
            FontFamily::Serif
        } else {
            FontFamily::Sans
        }
    }

    pub fn font_name(&self) -> &'static str {
        match self {
            FontFamily::Sans => "Noto Sans CJK SC",
            FontFamily::Serif => "Noto Serif CJK SC",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            FontFamily::Sans => "NotoSansCJKsc-Regular.otf",
            FontFamily::Serif => "NotoSerifCJKsc-Regular.otf",
        }
    }
}

static RGBA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([0-9]*\.?[0-9]+)\s*)?\)$",
    )
    .expect("Invalid regex")
});

/// A color in ASS channel order.
///
/// `alpha` follows the ASS convention: `0x00` is opaque, `0xFF` fully
/// transparent, the inverse of CSS opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
}

impl AssColor {
    pub const WHITE: AssColor = AssColor::opaque(0xFF, 0xFF, 0xFF);
    pub const BLACK: AssColor = AssColor::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 0 }
    }

    /// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgb(...)` or `rgba(...)`.
    pub fn parse_css(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Some(hex) = input.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        let caps = RGBA_RE.captures(input)?;
        let channel = |i: usize| -> Option<u8> {
            let value: u32 = caps.get(i)?.as_str().parse().ok()?;
            Some(value.min(255) as u8)
        };
        let opacity = match caps.get(4) {
            Some(m) => m.as_str().parse::<f64>().ok()?.clamp(0.0, 1.0),
            None => 1.0,
        };

        Some(Self {
            r: channel(1)?,
            g: channel(2)?,
            b: channel(3)?,
            alpha: ((1.0 - opacity) * 255.0).round() as u8,
        })
    }

    /// Parse a CSS color, falling back to opaque white.
    pub fn from_css(input: &str) -> Self {
        Self::parse_css(input).unwrap_or(Self::WHITE)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut channels = hex.chars().map(|c| byte(&format!("{c}{c}")));
                Some(Self::opaque(channels.next()??, channels.next()??, channels.next()??))
            }
            6 | 8 => {
                let opacity = if hex.len() == 8 { byte(&hex[6..8])? } else { 0xFF };
                Some(Self {
                    r: byte(&hex[0..2])?,
                    g: byte(&hex[2..4])?,
                    b: byte(&hex[4..6])?,
                    alpha: 0xFF - opacity,
                })
            }
            _ => None,
        }
    }

    /// Style-line form: `&HAABBGGRR`.
    pub fn to_style_value(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}{:02X}", self.alpha, self.b, self.g, self.r)
    }

    /// Inline override form: `\c&HBBGGRR&`, plus `\1a&HAA&` when not opaque.
    pub fn to_override_tags(&self) -> String {
        let mut tags = format!("\\c&H{:02X}{:02X}{:02X}&", self.b, self.g, self.r);
        if self.alpha != 0 {
            tags.push_str(&format!("\\1a&H{:02X}&", self.alpha));
        }
        tags
    }

    /// Parse `&HAABBGGRR`, `&HBBGGRR` or `&HBBGGRR&`.
    pub fn parse_ass(input: &str) -> Option<Self> {
        let body = input.trim().trim_end_matches('&');
        let hex = body
            .strip_prefix("&H")
            .or_else(|| body.strip_prefix("&h"))?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            1..=6 => Some(Self::opaque(
                (value & 0xFF) as u8,
                ((value >> 8) & 0xFF) as u8,
                ((value >> 16) & 0xFF) as u8,
            )),
            7 | 8 => Some(Self {
                r: (value & 0xFF) as u8,
                g: ((value >> 8) & 0xFF) as u8,
                b: ((value >> 16) & 0xFF) as u8,
                alpha: ((value >> 24) & 0xFF) as u8,
            }),
            _ => None,
        }
    }

    /// CSS opacity in `[0, 1]`.
    pub fn opacity(&self) -> f64 {
        1.0 - self.alpha as f64 / 255.0
    }
}
