use serde::{Deserialize, Serialize};

use marker_track_color::ColorMaskParams;
use marker_track_shape::ShapeDetectorParams;

/// Which detectors contribute to fusion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    Color,
    Shape,
    Combined,
}

/// Adaptive strictness tunables.
///
/// Color thresholds are perceptual distances (lower accepts less); shape
/// thresholds are match scores (higher accepts less). Both tighten from
/// base through medium to strict as loss persists.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AdaptiveParams {
    pub enabled: bool,
    pub color_base_threshold: f32,
    pub color_medium_threshold: f32,
    pub color_strict_threshold: f32,
    pub shape_base_threshold: f32,
    pub shape_medium_threshold: f32,
    pub shape_strict_threshold: f32,
    /// Continuous loss, in seconds, before the color detector starts
    /// tightening.
    pub color_delay: f32,
    /// Continuous loss, in seconds, before the shape detector starts
    /// tightening.
    pub shape_delay: f32,
    /// Length of the base-to-strict ramp, in seconds.
    pub ramp_seconds: f32,
    /// Per-frame relaxation step after reacquisition, in shape-score
    /// units; the color threshold relaxes proportionally.
    pub decay_step: f32,
    /// Widen the HSV mask window while lost to ride out lighting drift.
    pub expand_color_window: bool,
    pub max_hue_expansion: f32,
    pub max_sat_expansion: f32,
    pub max_val_expansion: f32,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            enabled: true,
            color_base_threshold: 50.0,
            color_medium_threshold: 40.0,
            color_strict_threshold: 30.0,
            shape_base_threshold: 0.5,
            shape_medium_threshold: 0.6,
            shape_strict_threshold: 0.7,
            color_delay: 1.0,
            shape_delay: 1.0,
            ramp_seconds: 2.0,
            decay_step: 0.03,
            expand_color_window: true,
            max_hue_expansion: 10.0,
            max_sat_expansion: 30.0,
            max_val_expansion: 30.0,
        }
    }
}

/// Full configuration surface of the tracker.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrackerParams {
    /// Pixel stride of the color scan (>= 1).
    #[serde(default = "default_sampling_step")]
    pub sampling_step: usize,
    #[serde(default = "default_detection_mode")]
    pub detection_mode: DetectionMode,
    #[serde(default = "default_true")]
    pub smoothing_enabled: bool,
    /// 0 = raw positions through, 1 = frozen; clamped to [0, 1].
    #[serde(default = "default_smoothing_strength")]
    pub smoothing_strength: f32,
    /// Jitter floor in pixels.
    #[serde(default = "default_min_move")]
    pub min_move_threshold: f32,
    #[serde(default)]
    pub adaptive: AdaptiveParams,
    #[serde(default)]
    pub mask: ColorMaskParams,
    #[serde(default)]
    pub shape: ShapeDetectorParams,
    /// Detector-agreement radius while tracking.
    #[serde(default = "default_agreement_radius")]
    pub agreement_radius: f32,
    /// Detector-agreement radius while lost.
    #[serde(default = "default_agreement_radius_lost")]
    pub agreement_radius_lost: f32,
    /// Reacquisition gate while lost, as a fraction of the frame
    /// diagonal.
    #[serde(default = "default_max_jump_frac")]
    pub max_jump_frac: f32,
    /// Consecutive misses before the marker is declared lost.
    #[serde(default = "default_loss_after_misses")]
    pub loss_after_misses: u32,
    /// Consecutive misses after which the trail is dropped.
    #[serde(default = "default_trail_drop_misses")]
    pub trail_drop_misses: u32,
}

fn default_sampling_step() -> usize {
    2
}
fn default_detection_mode() -> DetectionMode {
    DetectionMode::Combined
}
fn default_true() -> bool {
    true
}
fn default_smoothing_strength() -> f32 {
    0.7
}
fn default_min_move() -> f32 {
    2.0
}
fn default_agreement_radius() -> f32 {
    50.0
}
fn default_agreement_radius_lost() -> f32 {
    30.0
}
fn default_max_jump_frac() -> f32 {
    0.15
}
fn default_loss_after_misses() -> u32 {
    3
}
fn default_trail_drop_misses() -> u32 {
    10
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            sampling_step: default_sampling_step(),
            detection_mode: default_detection_mode(),
            smoothing_enabled: true,
            smoothing_strength: default_smoothing_strength(),
            min_move_threshold: default_min_move(),
            adaptive: AdaptiveParams::default(),
            mask: ColorMaskParams::default(),
            shape: ShapeDetectorParams::default(),
            agreement_radius: default_agreement_radius(),
            agreement_radius_lost: default_agreement_radius_lost(),
            max_jump_frac: default_max_jump_frac(),
            loss_after_misses: default_loss_after_misses(),
            trail_drop_misses: default_trail_drop_misses(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_deserialize_with_defaults() {
        let params: TrackerParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.sampling_step, 2);
        assert_eq!(params.detection_mode, DetectionMode::Combined);
        assert_eq!(params.loss_after_misses, 3);
        assert!(params.adaptive.enabled);
    }

    #[test]
    fn mode_names_are_lowercase() {
        let mode: DetectionMode = serde_json::from_str("\"combined\"").unwrap();
        assert_eq!(mode, DetectionMode::Combined);
    }
}
