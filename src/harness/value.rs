//! Comparable values captured from the framework under test.
//!
//! Scalars compare exactly (booleans, integers, text) or within a float
//! tolerance. Structural values (`Color`, `Point`, `Size`, `Rect`) compare
//! component-wise against their own tolerance.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::config::VerifyConfig;

// ──────────────────── color ────────────────────

/// ARGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("Transparent", Color::from_argb(0x00, 0xFF, 0xFF, 0xFF)),
    ("Black", Color::from_rgb(0x00, 0x00, 0x00)),
    ("White", Color::from_rgb(0xFF, 0xFF, 0xFF)),
    ("Red", Color::from_rgb(0xFF, 0x00, 0x00)),
    ("Lime", Color::from_rgb(0x00, 0xFF, 0x00)),
    ("Green", Color::from_rgb(0x00, 0x80, 0x00)),
    ("Blue", Color::from_rgb(0x00, 0x00, 0xFF)),
    ("Yellow", Color::from_rgb(0xFF, 0xFF, 0x00)),
    ("Cyan", Color::from_rgb(0x00, 0xFF, 0xFF)),
    ("Magenta", Color::from_rgb(0xFF, 0x00, 0xFF)),
    ("Orange", Color::from_rgb(0xFF, 0xA5, 0x00)),
    ("Purple", Color::from_rgb(0x80, 0x00, 0x80)),
    ("Gray", Color::from_rgb(0x80, 0x80, 0x80)),
];

impl Color {
    pub const RED: Self = Self::from_rgb(0xFF, 0x00, 0x00);
    pub const GREEN: Self = Self::from_rgb(0x00, 0x80, 0x00);
    pub const BLUE: Self = Self::from_rgb(0x00, 0x00, 0xFF);
    pub const BLACK: Self = Self::from_rgb(0x00, 0x00, 0x00);
    pub const WHITE: Self = Self::from_rgb(0xFF, 0xFF, 0xFF);

    #[must_use]
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_argb(0xFF, r, g, b)
    }

    /// Well-known name for this exact color, if any.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        NAMED_COLORS
            .iter()
            .find(|(_, color)| color == self)
            .map(|(name, _)| *name)
    }

    /// Every channel within `tolerance` of `other`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: u8) -> bool {
        [
            (self.a, other.a),
            (self.r, other.r),
            (self.g, other.g),
            (self.b, other.b),
        ]
        .iter()
        .all(|(x, y)| x.abs_diff(*y) <= tolerance)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.a, self.r, self.g, self.b
            ),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    /// Accepts a known color name (case-insensitive), `#RRGGBB`, or `#AARRGGBB`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(format!("invalid color {raw:?}: non-hex characters"));
            }
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|e| format!("invalid color {raw:?}: {e}"))
            };
            return match hex.len() {
                6 => Ok(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?)),
                8 => Ok(Self::from_argb(
                    channel(0)?,
                    channel(2)?,
                    channel(4)?,
                    channel(6)?,
                )),
                _ => Err(format!("invalid color {raw:?}: expected #RRGGBB or #AARRGGBB")),
            };
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(raw))
            .map(|(_, color)| *color)
            .ok_or_else(|| format!("unknown color name {raw:?}"))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ──────────────────── geometry ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    // Identical infinities compare equal even though their difference is NaN.
    a == b || (a - b).abs() <= tolerance
}

// ──────────────────── value ────────────────────

/// A value read from a property source or declared as an expectation.
///
/// Deserializes untagged: TOML/JSON scalars map to `Bool`/`Int`/`Float`/`Text`;
/// tables with a `color`, `point`, `size` or `rect` key map to the structural
/// variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Color { color: Color },
    Point { point: Point },
    Size { size: Size },
    Rect { rect: Rect },
}

/// Tolerances for one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub float: f64,
    pub color: u8,
    pub geometry: f64,
}

impl Tolerance {
    /// Exact comparison for every kind of value.
    pub const EXACT: Self = Self {
        float: 0.0,
        color: 0,
        geometry: 0.0,
    };

    /// Same tolerance applied to floats and geometry.
    #[must_use]
    pub fn uniform(tolerance: f64) -> Self {
        Self {
            float: tolerance,
            color: 0,
            geometry: tolerance,
        }
    }
}

impl From<&VerifyConfig> for Tolerance {
    fn from(cfg: &VerifyConfig) -> Self {
        Self {
            float: cfg.float_tolerance,
            color: cfg.color_tolerance,
            geometry: cfg.geometry_tolerance,
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::from(&VerifyConfig::default())
    }
}

impl Value {
    /// Short kind label used in mismatch diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Color { .. } => "color",
            Self::Point { .. } => "point",
            Self::Size { .. } => "size",
            Self::Rect { .. } => "rect",
        }
    }

    /// Type-appropriate equality: exact for discrete values, tolerance-based
    /// for floating point, colors and geometry.
    ///
    /// An `Int` compared with a `Float` is promoted so `1` matches `1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn matches(&self, expected: &Self, tol: Tolerance) -> bool {
        match (self, expected) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => close(*a, *b, tol.float),
            (Self::Int(a), Self::Float(b)) => close(*a as f64, *b, tol.float),
            (Self::Float(a), Self::Int(b)) => close(*a, *b as f64, tol.float),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Color { color: a }, Self::Color { color: b }) => a.approx_eq(b, tol.color),
            (Self::Point { point: a }, Self::Point { point: b }) => {
                close(a.x, b.x, tol.geometry) && close(a.y, b.y, tol.geometry)
            }
            (Self::Size { size: a }, Self::Size { size: b }) => {
                close(a.width, b.width, tol.geometry) && close(a.height, b.height, tol.geometry)
            }
            (Self::Rect { rect: a }, Self::Rect { rect: b }) => {
                close(a.x, b.x, tol.geometry)
                    && close(a.y, b.y, tol.geometry)
                    && close(a.width, b.width, tol.geometry)
                    && close(a.height, b.height, tol.geometry)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Color { color } => write!(f, "{color}"),
            Self::Point { point } => write!(f, "{point}"),
            Self::Size { size } => write!(f, "{size}"),
            Self::Rect { rect } => write!(f, "{rect}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Color> for Value {
    fn from(color: Color) -> Self {
        Self::Color { color }
    }
}

impl From<Point> for Value {
    fn from(point: Point) -> Self {
        Self::Point { point }
    }
}

impl From<Size> for Value {
    fn from(size: Size) -> Self {
        Self::Size { size }
    }
}

impl From<Rect> for Value {
    fn from(rect: Rect) -> Self {
        Self::Rect { rect }
    }
}
