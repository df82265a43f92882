//! Canonical color-space conversions.
//!
//! Every detector goes through this module so the color and shape paths
//! agree on hue semantics. `Hsb` is the normalized form used for
//! perceptual color distances; `Hsv` uses the 0..180 / 0..255 units
//! conventional for integer mask thresholds.

use crate::frame::Rgb;

/// Hue, saturation and brightness, all components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsb {
    pub h: f32,
    pub s: f32,
    pub b: f32,
}

/// Hue in `[0, 180)`, saturation and value in `[0, 255]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

/// Convert an 8-bit RGB triple to normalized HSB.
pub fn rgb_to_hsb(rgb: Rgb) -> Hsb {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        (((g - b) / delta).rem_euclid(6.0)) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };

    Hsb { h, s, b: max }
}

/// Convert an 8-bit RGB triple to OpenCV-unit HSV.
pub fn hsv_of(rgb: Rgb) -> Hsv {
    let hsb = rgb_to_hsb(rgb);
    Hsv {
        h: hsb.h * 180.0,
        s: hsb.s * 255.0,
        v: hsb.b * 255.0,
    }
}

/// Circular distance between two normalized hues.
///
/// Both inputs are in `[0, 1]`; the result is in `[0, 0.5]`.
#[inline]
pub fn hue_distance(h1: f32, h2: f32) -> f32 {
    let d = (h1 - h2).abs();
    d.min(1.0 - d)
}
