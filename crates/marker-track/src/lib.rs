//! Adaptive colored-marker tracking for freehand drawing gestures.
//!
//! The pipeline locates a hand-held colored marker in a video stream:
//! the user clicks the marker once to calibrate, after which every
//! frame is resolved to a tagged [`FrameResult`]. Two detectors run in
//! parallel (a perceptual color scan and a contour-shape matcher), a
//! fusion layer reconciles their answers, an adaptive controller
//! tightens acceptance thresholds while the marker is out of sight, and
//! an exponential smoother stabilizes the reported position.
//!
//! ```
//! use marker_track::{FrameResult, MarkerTracker, RgbFrameView, TrackerParams};
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), marker_track::CalibrateError> {
//! let data = vec![40u8; 640 * 480 * 3];
//! let frame = RgbFrameView::new(640, 480, &data)?;
//!
//! let mut tracker = MarkerTracker::new(TrackerParams::default());
//! tracker.calibrate(&frame, Point2::new(320, 240))?;
//!
//! match tracker.process_frame(&frame) {
//!     FrameResult::Found { position, .. } => println!("marker at {position:?}"),
//!     FrameResult::Lost => println!("marker lost"),
//!     FrameResult::Miss => {}
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

mod adaptive;
mod config;
mod fusion;
#[cfg(feature = "image")]
mod interop;
mod tracker;

pub use adaptive::{AdaptiveThresholdController, ThresholdState, Tier};
pub use config::{AdaptiveParams, DetectionMode, TrackerParams};
pub use fusion::{DetectionFusion, DetectionOutcome, DetectionSource, FrameResult, TrackPhase};
#[cfg(feature = "image")]
pub use interop::rgb_view;
pub use tracker::{PositionTracker, TRAIL_CAPACITY};

pub use marker_track_color::{calibrate_color, ColorDetector, ColorMaskParams};
pub use marker_track_core::{
    hsv_of, init_with_level, rgb_to_hsb, CalibrateError, Hsb, Hsv, Rgb, RgbFrameView,
};
pub use marker_track_shape::{ShapeDetector, ShapeDetectorParams, ShapeSignature, ShapeType};

/// Everything calibration learned about one marker.
///
/// Profiles are plain data and serialize cleanly, so a marker picked in
/// one session can be restored in the next with [`MarkerTracker::set_profile`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Dominant sampled color of the marker tip.
    pub target_color: Rgb,
    /// Reference contour signature; `None` when no clean contour was
    /// visible at calibration time (color-only tracking still works).
    pub reference_shape: Option<ShapeSignature>,
}

/// The top-level tracking pipeline.
pub struct MarkerTracker {
    params: TrackerParams,
    profile: Option<CalibrationProfile>,
    fusion: DetectionFusion,
}

impl MarkerTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            fusion: DetectionFusion::new(params),
            profile: None,
            params,
        }
    }

    /// Learn the marker under the user's pick at `point`.
    ///
    /// Samples the dominant color around the point and, when a matching
    /// contour is visible there, records its shape signature. Replaces
    /// any previous profile and resets all tracking state. Errors only
    /// when `point` is outside the frame.
    pub fn calibrate(
        &mut self,
        frame: &RgbFrameView<'_>,
        point: Point2<i32>,
    ) -> Result<CalibrationProfile, CalibrateError> {
        let target_color = calibrate_color(frame, point)?;
        let shape = ShapeDetector::new(self.params.shape);
        let reference_shape = shape.calibrate(
            frame,
            Point2::new(point.x as f32, point.y as f32),
            target_color,
            &self.params.mask,
        );
        let profile = CalibrationProfile {
            target_color,
            reference_shape,
        };
        log::info!(
            "calibrated: target rgb({}, {}, {}), shape reference {}",
            target_color[0],
            target_color[1],
            target_color[2],
            if reference_shape.is_some() {
                "recorded"
            } else {
                "unavailable"
            }
        );
        self.profile = Some(profile);
        self.fusion.reset();
        Ok(profile)
    }

    /// Restore a previously saved profile, resetting tracking state.
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.profile = Some(profile);
        self.fusion.reset();
    }

    /// Process one frame against the current profile.
    ///
    /// Returns [`FrameResult::Miss`] until [`calibrate`](Self::calibrate)
    /// has succeeded.
    pub fn process_frame(&mut self, frame: &RgbFrameView<'_>) -> FrameResult {
        self.process_frame_at(frame, Instant::now())
    }

    /// [`process_frame`](Self::process_frame) with an explicit clock,
    /// so the adaptive timing can be driven deterministically.
    pub fn process_frame_at(&mut self, frame: &RgbFrameView<'_>, now: Instant) -> FrameResult {
        match self.profile {
            Some(profile) => self.fusion.process(frame, &profile, now),
            None => FrameResult::Miss,
        }
    }

    #[inline]
    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    #[inline]
    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    #[inline]
    pub fn phase(&self) -> TrackPhase {
        self.fusion.phase()
    }

    /// Raw detector verdict of the most recent frame, including
    /// candidates the fusion policy rejected.
    #[inline]
    pub fn last_outcome(&self) -> DetectionOutcome {
        self.fusion.last_outcome()
    }

    /// Recent smoothed positions, oldest first.
    pub fn trail(&self) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.fusion.trail().iter().copied()
    }
}
