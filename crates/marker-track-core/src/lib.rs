//! Core types and utilities for colored-marker tracking.
//!
//! This crate is intentionally small: a borrowed RGB frame view, a binary
//! mask raster, the canonical color-space math shared by every detector,
//! and the calibration error type. It does *not* depend on any concrete
//! detector or image container.

mod colorspace;
mod error;
mod frame;
mod logger;
mod mask;

pub use colorspace::{hsv_of, hue_distance, rgb_to_hsb, Hsb, Hsv};
pub use error::CalibrateError;
pub use frame::{Rgb, RgbFrameView};
pub use logger::{init_with_level, LogGate};
pub use mask::Mask;
