//! Time-driven acceptance strictness.
//!
//! While the marker stays lost, thresholds tighten through discrete
//! tiers so the detectors stop accepting look-alikes; after
//! reacquisition they relax gradually instead of snapping, which would
//! oscillate right at the acceptance boundary.

use std::time::Instant;

use marker_track_color::ColorMaskParams;

use crate::config::AdaptiveParams;

/// Discrete strictness level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum Tier {
    Normal,
    Medium,
    Strict,
}

/// Current acceptance strictness for both detectors.
#[derive(Clone, Copy, Debug)]
pub struct ThresholdState {
    /// Perceptual color distance; lower means stricter.
    pub color_threshold: f32,
    /// Shape match score; higher means stricter.
    pub shape_threshold: f32,
    pub lost_since: Option<Instant>,
    pub tier: Tier,
}

/// Escalates and relaxes detector strictness from wall-clock loss time.
pub struct AdaptiveThresholdController {
    params: AdaptiveParams,
    state: ThresholdState,
    /// Ramp progress in [0, 1] driving the mask-window expansion.
    expansion: f32,
}

impl AdaptiveThresholdController {
    pub fn new(params: AdaptiveParams) -> Self {
        Self {
            state: ThresholdState {
                color_threshold: params.color_base_threshold,
                shape_threshold: params.shape_base_threshold,
                lost_since: None,
                tier: Tier::Normal,
            },
            expansion: 0.0,
            params,
        }
    }

    #[inline]
    pub fn state(&self) -> &ThresholdState {
        &self.state
    }

    /// Advance the controller by one frame.
    ///
    /// `detected` reports whether fusion accepted a candidate this frame;
    /// `now` is passed explicitly so tests can drive time.
    pub fn update(&mut self, detected: bool, now: Instant) {
        if !self.params.enabled {
            self.state.color_threshold = self.params.color_base_threshold;
            self.state.shape_threshold = self.params.shape_base_threshold;
            self.state.lost_since = None;
            self.state.tier = Tier::Normal;
            self.expansion = 0.0;
            return;
        }

        if detected {
            self.state.lost_since = None;
            self.state.tier = Tier::Normal;
            self.expansion = 0.0;
            self.relax();
        } else {
            let since = *self.state.lost_since.get_or_insert(now);
            let lost_for = now.duration_since(since).as_secs_f32();
            self.tighten(lost_for);
        }
        self.clamp();
    }

    /// HSV window with any loss-driven expansion applied.
    pub fn mask_params(&self, base: &ColorMaskParams) -> ColorMaskParams {
        if !self.params.expand_color_window || self.expansion <= 0.0 {
            return *base;
        }
        ColorMaskParams {
            hue_tolerance: base.hue_tolerance + self.expansion * self.params.max_hue_expansion,
            sat_tolerance: base.sat_tolerance + self.expansion * self.params.max_sat_expansion,
            val_tolerance: base.val_tolerance + self.expansion * self.params.max_val_expansion,
            ..*base
        }
    }

    /// Candidate-area window, tightened inward as strictness escalates.
    pub fn area_window(&self, min_frac: f32, max_frac: f32) -> (f32, f32) {
        let p = self.expansion;
        (
            min_frac + p * min_frac,         // up to 2x the floor
            max_frac - p * 0.5 * max_frac,   // down to half the ceiling
        )
    }

    fn relax(&mut self) {
        let shape_span = self.params.shape_strict_threshold - self.params.shape_base_threshold;
        let color_span = self.params.color_base_threshold - self.params.color_strict_threshold;

        self.state.shape_threshold =
            (self.state.shape_threshold - self.params.decay_step).max(self.params.shape_base_threshold);

        let color_step = if shape_span.abs() > f32::EPSILON {
            self.params.decay_step * color_span / shape_span
        } else {
            self.params.decay_step
        };
        self.state.color_threshold =
            (self.state.color_threshold + color_step).min(self.params.color_base_threshold);
    }

    fn tighten(&mut self, lost_for: f32) {
        let color_p = ramp_progress(lost_for, self.params.color_delay, self.params.ramp_seconds);
        let shape_p = ramp_progress(lost_for, self.params.shape_delay, self.params.ramp_seconds);

        // thresholds only move toward strict while lost
        let color_target = two_segment_lerp(
            self.params.color_base_threshold,
            self.params.color_medium_threshold,
            self.params.color_strict_threshold,
            color_p,
        );
        let shape_target = two_segment_lerp(
            self.params.shape_base_threshold,
            self.params.shape_medium_threshold,
            self.params.shape_strict_threshold,
            shape_p,
        );
        self.state.color_threshold = self.state.color_threshold.min(color_target);
        self.state.shape_threshold = self.state.shape_threshold.max(shape_target);

        self.state.tier = self.state.tier.max(tier_of(color_p.max(shape_p)));
        self.expansion = self.expansion.max(color_p.max(shape_p));
    }

    fn clamp(&mut self) {
        self.state.color_threshold = self.state.color_threshold.clamp(
            self.params.color_strict_threshold,
            self.params.color_base_threshold,
        );
        self.state.shape_threshold = self.state.shape_threshold.clamp(
            self.params.shape_base_threshold,
            self.params.shape_strict_threshold,
        );
    }
}

/// 0 before `delay`, then linear to 1 across `ramp_seconds`.
fn ramp_progress(lost_for: f32, delay: f32, ramp_seconds: f32) -> f32 {
    if lost_for < delay {
        return 0.0;
    }
    if ramp_seconds <= f32::EPSILON {
        return 1.0;
    }
    ((lost_for - delay) / ramp_seconds).clamp(0.0, 1.0)
}

fn tier_of(progress: f32) -> Tier {
    if progress >= 1.0 {
        Tier::Strict
    } else if progress > 0.0 {
        Tier::Medium
    } else {
        Tier::Normal
    }
}

/// Piecewise-linear base -> medium -> strict interpolation.
fn two_segment_lerp(base: f32, medium: f32, strict: f32, progress: f32) -> f32 {
    if progress <= 0.5 {
        base + (medium - base) * (progress * 2.0)
    } else {
        medium + (strict - medium) * ((progress - 0.5) * 2.0)
    }
}
