// ============================================================================
// COLOR MODEL - storage colors, rendering colors and light/dark triples
// ============================================================================

use serde::Serialize;
use std::str::FromStr;

/// Limit an integer channel value to the 0..=255 range.
#[inline]
pub fn limit_0_255(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Storage-space color: three 8-bit channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rgb8(pub [u8; 3]);

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn to_rgba(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self.0[0], self.0[1], self.0[2], alpha])
    }
}

/// Parses `"r,g,b"`.
impl FromStr for Rgb8 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return Err(format!("expected 'r,g,b', got '{}'", s));
        }
        let mut out = [0u8; 3];
        for (slot, part) in out.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<u8>()
                .map_err(|e| format!("bad color channel '{}': {}", part.trim(), e))?;
        }
        Ok(Rgb8(out))
    }
}

impl std::fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.0[0], self.0[1], self.0[2])
    }
}

/// Rendering-space color: three channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct Color(pub [f32; 3]);

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b])
    }

    /// Clamp every channel into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self(self.0.map(|c| c.clamp(0.0, 1.0)))
    }

    /// Add `amount` to every channel, clamping the result.
    pub fn offset(self, amount: f32) -> Self {
        Self(self.0.map(|c| c + amount)).clamped()
    }

    /// Linear interpolation between two colors, `t` in `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let mut out = [0.0f32; 3];
        for i in 0..3 {
            out[i] = self.0[i] + (other.0[i] - self.0[i]) * t;
        }
        Self(out)
    }

    /// Back to storage space. Rounds, so `Rgb8 -> Color -> Rgb8` is exact.
    pub fn to_rgb8(self) -> Rgb8 {
        Rgb8(self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
    }
}

impl From<Rgb8> for Color {
    fn from(c: Rgb8) -> Self {
        Color(c.0.map(|v| v as f32 / 255.0))
    }
}

/// A base color with its light and dark gradient variants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColorTriple {
    pub base: Color,
    pub light: Color,
    pub dark: Color,
}

/// Derive the light/dark variants of `base` spread by `degree`.
///
/// `light = min(base + degree, 1)` and `dark = max(base - degree, 0)` per
/// channel. Both are also held inside `[0, 1]` for negative degrees, which
/// swap the roles of light and dark.
pub fn derive_triple(base: Color, degree: f32) -> ColorTriple {
    ColorTriple {
        base,
        light: base.offset(degree),
        dark: base.offset(-degree),
    }
}
