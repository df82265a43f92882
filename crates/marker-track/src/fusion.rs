//! Detector fusion and the tracking state machine.
//!
//! Each frame runs the color and shape detectors (per the configured
//! mode), reconciles their answers into at most one accepted position,
//! and advances the Searching / Tracking / Lost state. Loss is reported
//! exactly once per episode; every later frame of the same episode is a
//! plain miss.

use std::time::Instant;

use nalgebra::Point2;

use marker_track_color::ColorDetector;
use marker_track_core::{LogGate, RgbFrameView};
use marker_track_shape::{ShapeDetector, ShapeHit, ShapeQuery};

use crate::adaptive::AdaptiveThresholdController;
use crate::config::{DetectionMode, TrackerParams};
use crate::tracker::PositionTracker;
use crate::CalibrationProfile;

/// The color detector reports no confidence of its own; its hits carry
/// full score.
const COLOR_HIT_SCORE: f32 = 1.0;

/// Lifecycle of a tracked marker.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TrackPhase {
    /// No position accepted yet since calibration or reset.
    #[default]
    Searching,
    Tracking,
    /// Had a position, then missed enough consecutive frames.
    Lost,
}

/// Which detector(s) produced the per-frame verdict.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DetectionSource {
    Color,
    Shape,
    /// Both detectors agreed; the shape position is used.
    ColorAndShape,
    /// A candidate was discarded by the fusion policy, or nothing hit.
    Rejected,
}

/// Raw detector verdict for one frame, before smoothing.
///
/// Produced fresh each frame. A `Rejected` outcome with a nonzero score
/// means a candidate existed but the fusion policy discarded it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionOutcome {
    pub position: Option<Point2<f32>>,
    pub source: DetectionSource,
    /// Winning candidate's score; 1.0 for color hits, 0.0 when no
    /// candidate existed.
    pub score: f32,
}

impl DetectionOutcome {
    fn empty() -> Self {
        Self {
            position: None,
            source: DetectionSource::Rejected,
            score: 0.0,
        }
    }
}

/// Per-frame outcome of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameResult {
    Found {
        position: Point2<f32>,
        source: DetectionSource,
        /// Dimensions of the frame the position was found in, so
        /// consumers can rescale without holding on to the frame.
        width: usize,
        height: usize,
    },
    /// Emitted once, on the frame the marker transitions to lost.
    Lost,
    /// Nothing accepted this frame.
    Miss,
}

#[derive(Clone, Copy, Debug, Default)]
struct TrackState {
    last_valid_position: Option<Point2<f32>>,
    consecutive_misses: u32,
    phase: TrackPhase,
}

/// Everything reconciliation needs besides the detector hits.
#[derive(Clone, Copy, Debug)]
struct ReconcileContext {
    last_valid: Option<Point2<f32>>,
    lost: bool,
    agreement_radius: f32,
    /// Reacquisition gate in pixels; only enforced while lost.
    max_jump: f32,
}

/// Runs both detectors and owns all per-marker tracking state.
pub struct DetectionFusion {
    params: TrackerParams,
    color: ColorDetector,
    shape: ShapeDetector,
    controller: AdaptiveThresholdController,
    tracker: PositionTracker,
    state: TrackState,
    last_outcome: DetectionOutcome,
    reject_log: LogGate,
}

impl DetectionFusion {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            color: ColorDetector::new(params.sampling_step),
            shape: ShapeDetector::new(params.shape),
            controller: AdaptiveThresholdController::new(params.adaptive),
            tracker: PositionTracker::new(
                params.smoothing_enabled,
                params.smoothing_strength,
                params.min_move_threshold,
            ),
            state: TrackState::default(),
            last_outcome: DetectionOutcome::empty(),
            reject_log: LogGate::default(),
            params,
        }
    }

    #[inline]
    pub fn phase(&self) -> TrackPhase {
        self.state.phase
    }

    /// Raw detector verdict of the most recent frame.
    #[inline]
    pub fn last_outcome(&self) -> DetectionOutcome {
        self.last_outcome
    }

    #[inline]
    pub fn trail(&self) -> &std::collections::VecDeque<Point2<f32>> {
        self.tracker.trail()
    }

    /// Drop all tracking state, keeping the configuration.
    pub fn reset(&mut self) {
        self.controller = AdaptiveThresholdController::new(self.params.adaptive);
        self.tracker.reset();
        self.state = TrackState::default();
        self.last_outcome = DetectionOutcome::empty();
    }

    /// Advance the pipeline by one frame.
    pub fn process(
        &mut self,
        frame: &RgbFrameView<'_>,
        profile: &CalibrationProfile,
        now: Instant,
    ) -> FrameResult {
        let thresholds = *self.controller.state();
        let lost = self.state.phase == TrackPhase::Lost;

        let color_hit = match self.params.detection_mode {
            DetectionMode::Shape => None,
            _ => self
                .color
                .find_marker(frame, profile.target_color, thresholds.color_threshold),
        };

        let shape_hit = match (self.params.detection_mode, profile.reference_shape) {
            (DetectionMode::Color, _) | (_, None) => None,
            (_, Some(reference)) => {
                let (min_area_frac, max_area_frac) = self.controller.area_window(
                    self.params.shape.min_area_frac,
                    self.params.shape.max_area_frac,
                );
                let query = ShapeQuery {
                    target: profile.target_color,
                    mask: self.controller.mask_params(&self.params.mask),
                    min_area_frac,
                    max_area_frac,
                    accept_threshold: thresholds.shape_threshold,
                    last_center: self.state.last_valid_position,
                };
                let search = self.shape.find_marker(frame, &reference, &query);
                if search.accepted.is_none() {
                    if let Some(rejected) = search.best_rejected {
                        if self.reject_log.ready(now) {
                            log::debug!(
                                "best shape candidate rejected: score {:.2} at ({:.0}, {:.0}), threshold {:.2}",
                                rejected.score,
                                rejected.center.x,
                                rejected.center.y,
                                thresholds.shape_threshold
                            );
                        }
                    }
                }
                search.accepted
            }
        };

        let ctx = ReconcileContext {
            last_valid: self.state.last_valid_position,
            lost,
            agreement_radius: if lost {
                self.params.agreement_radius_lost
            } else {
                self.params.agreement_radius
            },
            max_jump: self.params.max_jump_frac * frame.diagonal(),
        };
        let outcome = reconcile(color_hit, shape_hit, &ctx);
        self.last_outcome = outcome;

        self.controller.update(outcome.position.is_some(), now);
        match outcome.position {
            Some(position) => self.accept(position, outcome.source, frame),
            None => self.miss(),
        }
    }

    fn accept(
        &mut self,
        raw: Point2<f32>,
        source: DetectionSource,
        frame: &RgbFrameView<'_>,
    ) -> FrameResult {
        if self.state.phase == TrackPhase::Lost {
            log::info!(
                "marker reacquired at ({:.0}, {:.0})",
                raw.x,
                raw.y
            );
        }
        self.state.phase = TrackPhase::Tracking;
        self.state.consecutive_misses = 0;
        self.state.last_valid_position = Some(raw);
        let position = self.tracker.update(raw);
        FrameResult::Found {
            position,
            source,
            width: frame.width,
            height: frame.height,
        }
    }

    fn miss(&mut self) -> FrameResult {
        self.state.consecutive_misses += 1;
        if self.state.consecutive_misses > self.params.trail_drop_misses {
            self.tracker.clear_trail();
        }
        // only a marker we actually held can be lost
        if self.state.phase == TrackPhase::Tracking
            && self.state.last_valid_position.is_some()
            && self.state.consecutive_misses >= self.params.loss_after_misses
        {
            self.state.phase = TrackPhase::Lost;
            self.tracker.mark_lost();
            log::warn!(
                "marker lost after {} consecutive misses",
                self.state.consecutive_misses
            );
            return FrameResult::Lost;
        }
        FrameResult::Miss
    }
}

/// Collapse the two detector answers into one per-frame verdict.
///
/// Agreement hands the shape position through unconditionally (its
/// centroid is less noisy than the color centroid, and joint evidence
/// reacquires even after a large jump). Disagreement is settled by
/// distance to the last accepted position; while lost, a disagreement
/// winner or single-detector hit farther than `max_jump` from the last
/// position is rejected rather than trusted.
fn reconcile(
    color: Option<Point2<f32>>,
    shape: Option<ShapeHit>,
    ctx: &ReconcileContext,
) -> DetectionOutcome {
    let passes_jump_gate = |p: Point2<f32>| {
        if !ctx.lost {
            return true;
        }
        match ctx.last_valid {
            Some(prev) => (p - prev).norm() <= ctx.max_jump,
            None => true,
        }
    };

    let (point, source, score) = match (color, shape) {
        (Some(c), Some(s)) => {
            if (c - s.center).norm() < ctx.agreement_radius {
                return DetectionOutcome {
                    position: Some(s.center),
                    source: DetectionSource::ColorAndShape,
                    score: s.score,
                };
            }
            match ctx.last_valid {
                Some(prev) if (c - prev).norm() <= (s.center - prev).norm() => {
                    (c, DetectionSource::Color, COLOR_HIT_SCORE)
                }
                Some(_) => (s.center, DetectionSource::Shape, s.score),
                // no history: the shape hit carries more evidence
                None => (s.center, DetectionSource::Shape, s.score),
            }
        }
        (Some(c), None) => (c, DetectionSource::Color, COLOR_HIT_SCORE),
        (None, Some(s)) => (s.center, DetectionSource::Shape, s.score),
        (None, None) => return DetectionOutcome::empty(),
    };

    if passes_jump_gate(point) {
        DetectionOutcome {
            position: Some(point),
            source,
            score,
        }
    } else {
        DetectionOutcome {
            position: None,
            source: DetectionSource::Rejected,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(last_valid: Option<Point2<f32>>, lost: bool) -> ReconcileContext {
        ReconcileContext {
            last_valid,
            lost,
            agreement_radius: if lost { 30.0 } else { 50.0 },
            max_jump: 100.0,
        }
    }

    fn shape_hit(x: f32, y: f32) -> ShapeHit {
        ShapeHit {
            center: Point2::new(x, y),
            score: 0.9,
        }
    }

    #[test]
    fn agreement_takes_shape_position() {
        let out = reconcile(
            Some(Point2::new(100.0, 100.0)),
            Some(shape_hit(140.0, 100.0)),
            &ctx(None, false),
        );
        assert_eq!(out.position, Some(Point2::new(140.0, 100.0)));
        assert_eq!(out.source, DetectionSource::ColorAndShape);
        assert_eq!(out.score, 0.9);
    }

    #[test]
    fn agreement_overrides_jump_gate_while_lost() {
        // both detectors on the same spot, far beyond max_jump
        let out = reconcile(
            Some(Point2::new(500.0, 500.0)),
            Some(shape_hit(505.0, 500.0)),
            &ctx(Some(Point2::new(100.0, 100.0)), true),
        );
        assert_eq!(out.position, Some(Point2::new(505.0, 500.0)));
        assert_eq!(out.source, DetectionSource::ColorAndShape);
    }

    #[test]
    fn lost_agreement_radius_is_narrower() {
        // 40 px apart: agreement while tracking, disagreement while lost
        let color = Some(Point2::new(100.0, 100.0));
        let shape = Some(shape_hit(140.0, 100.0));
        let last = Some(Point2::new(105.0, 100.0));

        let tracking = reconcile(color, shape, &ctx(last, false));
        assert_eq!(tracking.source, DetectionSource::ColorAndShape);

        let lost = reconcile(color, shape, &ctx(last, true));
        assert_eq!(lost.source, DetectionSource::Color);
    }

    #[test]
    fn disagreement_goes_to_candidate_near_last_position() {
        let color = Some(Point2::new(100.0, 100.0));
        let shape = Some(shape_hit(300.0, 300.0));

        let near_color = reconcile(color, shape, &ctx(Some(Point2::new(110.0, 100.0)), false));
        assert_eq!(near_color.position, Some(Point2::new(100.0, 100.0)));
        assert_eq!(near_color.source, DetectionSource::Color);
        assert_eq!(near_color.score, 1.0);

        let near_shape = reconcile(color, shape, &ctx(Some(Point2::new(290.0, 300.0)), false));
        assert_eq!(near_shape.position, Some(Point2::new(300.0, 300.0)));
        assert_eq!(near_shape.source, DetectionSource::Shape);
        assert_eq!(near_shape.score, 0.9);
    }

    #[test]
    fn disagreement_without_history_prefers_shape() {
        let out = reconcile(
            Some(Point2::new(100.0, 100.0)),
            Some(shape_hit(300.0, 300.0)),
            &ctx(None, false),
        );
        assert_eq!(out.source, DetectionSource::Shape);
    }

    #[test]
    fn jump_gate_applies_to_single_hits_while_lost() {
        let color = Some(Point2::new(500.0, 500.0));
        let last = Some(Point2::new(100.0, 100.0));

        assert!(reconcile(color, None, &ctx(last, false)).position.is_some());

        let gated = reconcile(color, None, &ctx(last, true));
        assert_eq!(gated.position, None);
        // the discarded candidate stays visible in the outcome
        assert_eq!(gated.source, DetectionSource::Rejected);
        assert_eq!(gated.score, 1.0);

        // close enough to reacquire
        let near = Some(Point2::new(150.0, 100.0));
        assert!(reconcile(near, None, &ctx(last, true)).position.is_some());
    }

    #[test]
    fn no_candidate_yields_empty_outcome() {
        let out = reconcile(None, None, &ctx(Some(Point2::new(10.0, 10.0)), false));
        assert_eq!(out.position, None);
        assert_eq!(out.source, DetectionSource::Rejected);
        assert_eq!(out.score, 0.0);
    }

    #[test]
    fn single_detector_hits_pass_through() {
        let c = reconcile(Some(Point2::new(10.0, 20.0)), None, &ctx(None, false));
        assert_eq!(c.source, DetectionSource::Color);

        let s = reconcile(None, Some(shape_hit(10.0, 20.0)), &ctx(None, false));
        assert_eq!(s.source, DetectionSource::Shape);
        assert_eq!(s.score, 0.9);
    }
}
