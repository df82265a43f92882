//! Position smoothing and trail bookkeeping.

use std::collections::VecDeque;

use nalgebra::Point2;

/// Maximum number of trail entries kept for visualization.
pub const TRAIL_CAPACITY: usize = 20;

/// Exponential smoother with a jitter floor and a bounded trail.
///
/// The trail exists for visualization only; tracking logic never reads
/// it.
pub struct PositionTracker {
    smoothing_enabled: bool,
    /// Smoothing strength in [0, 1]; `alpha = 1 - strength`.
    strength: f32,
    min_move: f32,
    smoothed: Option<Point2<f32>>,
    /// Set while the marker is lost; the next accepted position
    /// re-initializes smoothing instead of blending with a stale one.
    lost: bool,
    trail: VecDeque<Point2<f32>>,
}

impl PositionTracker {
    pub fn new(smoothing_enabled: bool, strength: f32, min_move: f32) -> Self {
        Self {
            smoothing_enabled,
            strength: strength.clamp(0.0, 1.0),
            min_move: min_move.max(0.0),
            smoothed: None,
            lost: false,
            trail: VecDeque::with_capacity(TRAIL_CAPACITY),
        }
    }

    /// Fold an accepted raw position into the smoothed track.
    ///
    /// The first position after a reset (or a loss episode) passes
    /// through verbatim. Movements below the jitter floor return the
    /// previous smoothed position unchanged.
    pub fn update(&mut self, raw: Point2<f32>) -> Point2<f32> {
        let out = match self.smoothed {
            Some(prev) if !self.lost => {
                let distance = (raw - prev).norm();
                if distance < self.min_move {
                    prev
                } else if self.smoothing_enabled {
                    let alpha = 1.0 - self.strength;
                    Point2::new(
                        alpha * raw.x + (1.0 - alpha) * prev.x,
                        alpha * raw.y + (1.0 - alpha) * prev.y,
                    )
                } else {
                    raw
                }
            }
            _ => raw,
        };
        self.lost = false;
        self.smoothed = Some(out);
        if self.trail.len() == TRAIL_CAPACITY {
            self.trail.pop_front();
        }
        self.trail.push_back(out);
        out
    }

    /// Recent smoothed positions, oldest first.
    pub fn trail(&self) -> &VecDeque<Point2<f32>> {
        &self.trail
    }

    /// Flag the track as lost so the next update re-initializes.
    pub fn mark_lost(&mut self) {
        self.lost = true;
    }

    /// Clear loss bookkeeping without touching the trail or the
    /// smoothed position.
    ///
    /// For hosts that pause and resume the frame stream while the
    /// marker stays put: the next update blends with the pre-pause
    /// position instead of re-initializing, keeping the stroke
    /// continuous. Reacquisition after a real loss goes through
    /// [`update`](Self::update), which re-initializes instead.
    pub fn reset_lost_status(&mut self) {
        self.lost = false;
    }

    /// Drop the trail only.
    pub fn clear_trail(&mut self) {
        self.trail.clear();
    }

    /// Clear trail and smoothing state.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.lost = false;
        self.trail.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_position_passes_verbatim() {
        let mut tracker = PositionTracker::new(true, 0.7, 2.0);
        let out = tracker.update(Point2::new(40.0, 60.0));
        assert_eq!(out, Point2::new(40.0, 60.0));
    }

    #[test]
    fn repeated_target_converges() {
        let mut tracker = PositionTracker::new(true, 0.7, 0.0);
        tracker.update(Point2::new(0.0, 0.0));
        let target = Point2::new(100.0, 50.0);
        let mut out = Point2::new(0.0, 0.0);
        for _ in 0..40 {
            out = tracker.update(target);
        }
        assert!((out - target).norm() < 0.1, "converged to {out:?}");
    }

    #[test]
    fn jitter_below_floor_is_frozen() {
        let mut tracker = PositionTracker::new(true, 0.7, 2.0);
        let anchor = tracker.update(Point2::new(50.0, 50.0));
        for i in 0..20 {
            let wobble = if i % 2 == 0 { 0.8 } else { -0.8 };
            let out = tracker.update(Point2::new(50.0 + wobble, 50.0 - wobble));
            assert_eq!(out, anchor);
        }
    }

    #[test]
    fn smoothing_disabled_passes_raw() {
        let mut tracker = PositionTracker::new(false, 0.7, 0.0);
        tracker.update(Point2::new(0.0, 0.0));
        let out = tracker.update(Point2::new(30.0, 40.0));
        assert_eq!(out, Point2::new(30.0, 40.0));
    }

    #[test]
    fn trail_is_bounded() {
        let mut tracker = PositionTracker::new(true, 0.0, 0.0);
        for i in 0..50 {
            tracker.update(Point2::new(i as f32, 0.0));
        }
        assert_eq!(tracker.trail().len(), TRAIL_CAPACITY);
        // oldest evicted first: the front is the 31st update
        assert_eq!(tracker.trail().front().unwrap().x, 30.0);
        assert_eq!(tracker.trail().back().unwrap().x, 49.0);
    }

    #[test]
    fn loss_reinitializes_smoothing() {
        let mut tracker = PositionTracker::new(true, 0.9, 0.0);
        tracker.update(Point2::new(10.0, 10.0));
        tracker.mark_lost();
        let out = tracker.update(Point2::new(200.0, 200.0));
        assert_eq!(out, Point2::new(200.0, 200.0));
    }

    #[test]
    fn reset_clears_trail_and_state() {
        let mut tracker = PositionTracker::new(true, 0.7, 0.0);
        tracker.update(Point2::new(10.0, 10.0));
        tracker.update(Point2::new(12.0, 10.0));
        tracker.reset();
        assert!(tracker.trail().is_empty());
        let out = tracker.update(Point2::new(90.0, 90.0));
        assert_eq!(out, Point2::new(90.0, 90.0));
    }

    #[test]
    fn reset_lost_status_keeps_trail_and_smoothing() {
        let mut tracker = PositionTracker::new(true, 0.5, 0.0);
        tracker.update(Point2::new(10.0, 10.0));
        tracker.mark_lost();
        tracker.reset_lost_status();
        assert_eq!(tracker.trail().len(), 1);
        // next update blends with the pre-loss position instead of
        // re-initializing (contrast with reset)
        let out = tracker.update(Point2::new(20.0, 10.0));
        assert_eq!(out, Point2::new(15.0, 10.0));
    }

    #[test]
    fn clear_trail_keeps_smoothing_state() {
        let mut tracker = PositionTracker::new(true, 0.5, 0.0);
        tracker.update(Point2::new(10.0, 10.0));
        tracker.clear_trail();
        assert!(tracker.trail().is_empty());
        let out = tracker.update(Point2::new(20.0, 10.0));
        // still blended against the pre-clear state
        assert_eq!(out, Point2::new(15.0, 10.0));
    }
}
