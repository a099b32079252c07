//! RGBA colors used for tiles and the pen.

use serde::{Deserialize, Serialize};

/// A linear RGBA color with channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Opacity.
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color::from_rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Color = Color::from_rgb(0.0, 0.0, 0.0);
    /// Opaque red.
    pub const RED: Color = Color::from_rgb(1.0, 0.0, 0.0);
    /// Opaque green.
    pub const GREEN: Color = Color::from_rgb(0.0, 1.0, 0.0);
    /// Opaque blue.
    pub const BLUE: Color = Color::from_rgb(0.0, 0.0, 1.0);
    /// Opaque magenta.
    pub const MAGENTA: Color = Color::from_rgb(1.0, 0.0, 1.0);
    /// Opaque yellow.
    pub const YELLOW: Color = Color::from_rgb(1.0, 1.0, 0.0);

    /// An opaque color.
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Builds an opaque color from hue, saturation and value, each in `0.0..=1.0`.
    ///
    /// Hue wraps, so `1.25` is the same hue as `0.25`.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let saturation = saturation.clamp(0.0, 1.0);
        let value = value.clamp(0.0, 1.0);
        let h = hue.rem_euclid(1.0) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = value * (1.0 - saturation);
        let q = value * (1.0 - saturation * f);
        let t = value * (1.0 - saturation * (1.0 - f));

        let (r, g, b) = match sector as u8 {
            0 => (value, t, p),
            1 => (q, value, p),
            2 => (p, value, t),
            3 => (p, q, value),
            4 => (t, p, value),
            _ => (value, p, q),
        };
        Self::from_rgb(r, g, b)
    }

    /// Mean of the three color channels.
    pub fn brightness(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }

    /// Whether the brightness is below `threshold`.
    pub fn is_dark(&self, threshold: f32) -> bool {
        self.brightness() < threshold
    }

    /// Whether the red channel exceeds `threshold`.
    pub fn is_red(&self, threshold: f32) -> bool {
        self.r > threshold
    }

    /// Whether the green channel exceeds `threshold`.
    pub fn is_green(&self, threshold: f32) -> bool {
        self.g > threshold
    }

    /// Whether the blue channel exceeds `threshold`.
    pub fn is_blue(&self, threshold: f32) -> bool {
        self.b > threshold
    }
}
