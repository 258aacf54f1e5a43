//! Visual attributes carried by graph nodes and edges, and graph-level layout hints.
//!
//! The layout engine and renderer live outside this crate. Everything here is
//! plain data that a renderer reads back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ARGB color.
///
/// Serializes as `#RRGGBB` when opaque and `#AARRGGBB` otherwise. Parsing also
/// accepts a few CSS color names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Alpha channel.
    pub a: u8,
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    /// Opaque red.
    pub const RED: Self = Self::rgb(0xFF, 0x00, 0x00);
    /// Opaque yellow.
    pub const YELLOW: Self = Self::rgb(0xFF, 0xFF, 0x00);

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { a: 0xFF, r, g, b }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::RED,
            "yellow" => Self::YELLOW,
            "green" => Self::rgb(0x00, 0x80, 0x00),
            "blue" => Self::rgb(0x00, 0x00, 0xFF),
            "gray" | "grey" => Self::rgb(0x80, 0x80, 0x80),
            "lightgray" | "lightgrey" => Self::rgb(0xD3, 0xD3, 0xD3),
            "orange" => Self::rgb(0xFF, 0xA5, 0x00),
            "lightblue" => Self::rgb(0xAD, 0xD8, 0xE6),
            "lightgreen" => Self::rgb(0x90, 0xEE, 0x90),
            "transparent" => Self {
                a: 0,
                r: 0xFF,
                g: 0xFF,
                b: 0xFF,
            },
            _ => return None,
        };
        Some(color)
    }
}

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}'", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some(hex) = trimmed.strip_prefix('#') else {
            return Self::named(trimmed).ok_or_else(|| ParseColorError(s.to_string()));
        };

        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ParseColorError(s.to_string()))
        };

        match hex.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self {
                a: channel(0)?,
                r: channel(2)?,
                g: channel(4)?,
                b: channel(6)?,
            }),
            _ => Err(ParseColorError(s.to_string())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xFF {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.a, self.r, self.g, self.b
            )
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Node outline shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeShape {
    /// Renderer default.
    #[default]
    Ellipse,
    /// Rectangle; used for every node assigned to a layer.
    Box,
}

/// Style attributes of a node. `None` means "renderer default".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    /// Border color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Color>,
    /// Label color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Color>,
    /// Outline shape.
    #[serde(default)]
    pub shape: NodeShape,
    /// Space between label and border.
    #[serde(default)]
    pub label_margin: u32,
}

/// Style attributes of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeStyle {
    /// Stroke color; `None` means renderer default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// Direction layers are laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerDirection {
    /// Top to bottom.
    #[default]
    TopToBottom,
    /// Left to right.
    LeftToRight,
}

/// Edge routing mode requested from the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeRouting {
    /// Straight segments.
    #[default]
    Straight,
    /// Splines fitted to the layered layout.
    Splines,
}

/// How disconnected components are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackingMethod {
    /// Compact packing.
    #[default]
    Compact,
    /// One column per component.
    Columns,
}

/// Graph-level hints for the external layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutHints {
    /// Layer direction.
    pub direction: LayerDirection,
    /// Minimum distance between sibling nodes.
    pub node_separation: f64,
    /// Margin around clusters.
    pub cluster_margin: f64,
    /// Edge routing mode.
    pub routing: EdgeRouting,
    /// Cone angle (degrees) used by spline routing.
    pub cone_angle: f64,
    /// Component packing.
    pub packing: PackingMethod,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#FF0000", Color::RED)]
    #[case("#ff0000", Color::RED)]
    #[case("red", Color::RED)]
    #[case(" Yellow ", Color::YELLOW)]
    #[case("#80FFFFFF", Color { a: 0x80, r: 0xFF, g: 0xFF, b: 0xFF })]
    fn parses_colors(#[case] input: &str, #[case] expected: Color) {
        assert_eq!(input.parse::<Color>().unwrap(), expected);
    }

    #[rstest]
    #[case("#FFF")]
    #[case("#GG0000")]
    #[case("chartreuse-ish")]
    fn rejects_bad_colors(#[case] input: &str) {
        assert!(input.parse::<Color>().is_err());
    }

    #[test]
    fn display_omits_opaque_alpha() {
        assert_eq!(Color::YELLOW.to_string(), "#FFFF00");
        assert_eq!(
            Color { a: 0x10, r: 1, g: 2, b: 3 }.to_string(),
            "#10010203"
        );
    }

    #[test]
    fn serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::RED).unwrap();
        assert_eq!(json, "\"#FF0000\"");

        let back: Color = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(back, Color::BLACK);
    }
}
