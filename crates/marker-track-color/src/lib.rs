//! Color-based marker detection.
//!
//! Two independent pieces live here: the color detector, which calibrates
//! a target color from a sample patch and scans frames for a weighted
//! centroid of matching pixels, and the HSV mask generator used by the
//! shape pipeline to isolate candidate regions.

mod detector;
mod mask;

pub use detector::{calibrate_color, ColorDetector};
pub use mask::{create_color_mask, ColorMaskParams};
