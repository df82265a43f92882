//! Shape-based marker detection.
//!
//! The pipeline is mask -> morphological denoise -> external contours ->
//! signature scoring. Calibration records a reference signature for the
//! marker; detection scores every candidate contour against it and keeps
//! the best one above the acceptance threshold.

mod analyzer;
mod contour;
mod detector;
mod morphology;

pub use analyzer::{analyze_shape, match_score, ShapeSignature, ShapeType};
pub use contour::{approx_polygon, find_external_contours, Contour};
pub use detector::{ShapeDetector, ShapeDetectorParams, ShapeHit, ShapeQuery, ShapeSearch};
pub use morphology::{close, dilate, erode, open, DENOISE_KERNEL};
