use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use marker_track_color::{create_color_mask, ColorMaskParams};
use marker_track_core::{Rgb, RgbFrameView};

use crate::analyzer::{analyze_shape, match_score, ShapeSignature};
use crate::contour::{find_external_contours, Contour};
use crate::morphology::{close, open, DENOISE_KERNEL};

/// Tuning of the shape detector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShapeDetectorParams {
    /// Loosest candidate-area window, as fractions of the frame area.
    pub min_area_frac: f32,
    pub max_area_frac: f32,
    /// Candidates scoring below this are dropped before any boost.
    pub min_base_score: f32,
    /// Distance at which the proximity boost bottoms out.
    pub max_tracking_distance: f32,
    /// Pixel radius of the nearest-centroid calibration fallback.
    pub calibration_radius: f32,
}

impl Default for ShapeDetectorParams {
    fn default() -> Self {
        Self {
            min_area_frac: 0.002,
            max_area_frac: 0.03,
            min_base_score: 0.4,
            max_tracking_distance: 150.0,
            calibration_radius: 50.0,
        }
    }
}

/// Per-frame search settings supplied by the caller.
///
/// The adaptive controller owns the thresholds and the fusion layer owns
/// the last accepted center; passing both explicitly keeps detection a
/// pure function of its inputs.
#[derive(Clone, Copy, Debug)]
pub struct ShapeQuery {
    pub target: Rgb,
    pub mask: ColorMaskParams,
    pub min_area_frac: f32,
    pub max_area_frac: f32,
    pub accept_threshold: f32,
    pub last_center: Option<Point2<f32>>,
}

/// One scored candidate position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeHit {
    pub center: Point2<f32>,
    pub score: f32,
}

/// Result of a shape search: the accepted hit, if any, plus the best
/// candidate that fell short of the threshold (diagnostics only).
#[derive(Clone, Copy, Debug, Default)]
pub struct ShapeSearch {
    pub accepted: Option<ShapeHit>,
    pub best_rejected: Option<ShapeHit>,
}

/// Color-and-shape marker detector.
///
/// Calibration records a reference signature from the contour under the
/// user's pick; detection scores candidate contours against it.
#[derive(Clone, Copy, Debug)]
pub struct ShapeDetector {
    params: ShapeDetectorParams,
}

impl ShapeDetector {
    pub fn new(params: ShapeDetectorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &ShapeDetectorParams {
        &self.params
    }

    /// Record the reference shape of the marker at `point`.
    ///
    /// Prefers the contour containing the pick; falls back to the
    /// nearest-centroid contour within `calibration_radius`. Returns
    /// `None` when neither exists — the detector simply stays
    /// uncalibrated, this is not an error.
    pub fn calibrate(
        &self,
        frame: &RgbFrameView<'_>,
        point: Point2<f32>,
        target: Rgb,
        mask_params: &ColorMaskParams,
    ) -> Option<ShapeSignature> {
        let contours = candidate_contours(frame, target, mask_params);
        let chosen = contours
            .iter()
            .find(|c| c.contains(point))
            .or_else(|| self.nearest_within_radius(&contours, point))?;

        let signature = analyze_shape(chosen);
        log::info!(
            "shape reference: {:?}, area {:.0}, compactness {:.2}, {} vertices",
            signature.shape_type,
            signature.area,
            signature.compactness,
            signature.vertex_count
        );
        Some(signature)
    }

    /// Locate the marker by combined color-and-shape evidence.
    ///
    /// Candidates outside the dynamic area window or under the base
    /// score are dropped; the survivors are boosted toward the last
    /// accepted center and the best one must clear `accept_threshold`.
    pub fn find_marker(
        &self,
        frame: &RgbFrameView<'_>,
        reference: &ShapeSignature,
        query: &ShapeQuery,
    ) -> ShapeSearch {
        let frame_area = (frame.width * frame.height) as f32;
        let min_area = query.min_area_frac * frame_area;
        let max_area = query.max_area_frac * frame_area;

        let mut best: Option<ShapeHit> = None;
        for contour in candidate_contours(frame, query.target, &query.mask) {
            let area = contour.area();
            if area < min_area || area > max_area {
                continue;
            }
            let base = match_score(&contour, reference);
            if base < self.params.min_base_score {
                continue;
            }
            let center = contour.centroid();
            let score = match query.last_center {
                Some(prev) => {
                    let d = (center - prev).norm();
                    let proximity = (1.0 - d / self.params.max_tracking_distance).max(0.4) * 1.3;
                    base * proximity
                }
                None => base,
            };
            if best.map(|b| score > b.score).unwrap_or(true) {
                best = Some(ShapeHit { center, score });
            }
        }

        match best {
            Some(hit) if hit.score > query.accept_threshold => ShapeSearch {
                accepted: Some(hit),
                best_rejected: None,
            },
            other => ShapeSearch {
                accepted: None,
                best_rejected: other,
            },
        }
    }

    fn nearest_within_radius<'c>(
        &self,
        contours: &'c [Contour],
        point: Point2<f32>,
    ) -> Option<&'c Contour> {
        contours
            .iter()
            .map(|c| (c, (c.centroid() - point).norm()))
            .filter(|(_, d)| *d <= self.params.calibration_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
    }
}

fn candidate_contours(
    frame: &RgbFrameView<'_>,
    target: Rgb,
    mask_params: &ColorMaskParams,
) -> Vec<Contour> {
    let mask = create_color_mask(frame, target, mask_params);
    let mask = open(&mask, DENOISE_KERNEL, 1);
    let mask = close(&mask, DENOISE_KERNEL, 2);
    find_external_contours(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = [200, 30, 30];

    /// Black frame with one or more red squares.
    fn frame_with_squares(size: usize, squares: &[(usize, usize, usize)]) -> Vec<u8> {
        let mut data = vec![0u8; size * size * 3];
        for &(ox, oy, side) in squares {
            for y in oy..oy + side {
                for x in ox..ox + side {
                    let off = (y * size + x) * 3;
                    data[off..off + 3].copy_from_slice(&RED);
                }
            }
        }
        data
    }

    fn query(last_center: Option<Point2<f32>>) -> ShapeQuery {
        let params = ShapeDetectorParams::default();
        ShapeQuery {
            target: RED,
            mask: ColorMaskParams::default(),
            min_area_frac: params.min_area_frac,
            max_area_frac: params.max_area_frac,
            accept_threshold: 0.5,
            last_center,
        }
    }

    #[test]
    fn calibrates_on_contour_under_point() {
        let data = frame_with_squares(200, &[(60, 60, 30)]);
        let frame = RgbFrameView::new(200, 200, &data).unwrap();
        let detector = ShapeDetector::new(ShapeDetectorParams::default());

        let signature = detector
            .calibrate(&frame, Point2::new(75.0, 75.0), RED, &ColorMaskParams::default())
            .expect("reference shape");
        assert_eq!(signature.shape_type, crate::ShapeType::Rectangle);
        assert!((signature.area - 841.0).abs() < 40.0, "area = {}", signature.area);
    }

    #[test]
    fn calibration_falls_back_to_nearby_centroid() {
        let data = frame_with_squares(200, &[(60, 60, 30)]);
        let frame = RgbFrameView::new(200, 200, &data).unwrap();
        let detector = ShapeDetector::new(ShapeDetectorParams::default());

        // just outside the square, within 50 px of its centroid
        let signature =
            detector.calibrate(&frame, Point2::new(100.0, 75.0), RED, &ColorMaskParams::default());
        assert!(signature.is_some());

        // far away: silent failure
        let none =
            detector.calibrate(&frame, Point2::new(5.0, 195.0), RED, &ColorMaskParams::default());
        assert!(none.is_none());
    }

    #[test]
    fn finds_calibrated_marker_center() {
        let data = frame_with_squares(200, &[(60, 60, 30)]);
        let frame = RgbFrameView::new(200, 200, &data).unwrap();
        let detector = ShapeDetector::new(ShapeDetectorParams::default());
        let reference = detector
            .calibrate(&frame, Point2::new(75.0, 75.0), RED, &ColorMaskParams::default())
            .unwrap();

        let search = detector.find_marker(&frame, &reference, &query(None));
        let hit = search.accepted.expect("marker found");
        assert!((hit.center.x - 74.5).abs() < 1.5);
        assert!((hit.center.y - 74.5).abs() < 1.5);
    }

    #[test]
    fn threshold_rejection_keeps_diagnostics() {
        let data = frame_with_squares(200, &[(60, 60, 30)]);
        let frame = RgbFrameView::new(200, 200, &data).unwrap();
        let detector = ShapeDetector::new(ShapeDetectorParams::default());
        let reference = detector
            .calibrate(&frame, Point2::new(75.0, 75.0), RED, &ColorMaskParams::default())
            .unwrap();

        let mut q = query(None);
        q.accept_threshold = 1.5; // unreachable without a proximity boost
        let search = detector.find_marker(&frame, &reference, &q);
        assert!(search.accepted.is_none());
        let rejected = search.best_rejected.expect("diagnostic candidate");
        assert!(rejected.score > 0.9);
    }

    #[test]
    fn proximity_boost_prefers_candidate_near_last_center() {
        // two identical squares; the one near the last center must win
        let data = frame_with_squares(300, &[(40, 40, 30), (200, 200, 30)]);
        let frame = RgbFrameView::new(300, 300, &data).unwrap();
        let detector = ShapeDetector::new(ShapeDetectorParams::default());
        let reference = detector
            .calibrate(&frame, Point2::new(55.0, 55.0), RED, &ColorMaskParams::default())
            .unwrap();

        let near_first = detector.find_marker(&frame, &reference, &query(Some(Point2::new(55.0, 55.0))));
        let hit = near_first.accepted.expect("marker found");
        assert!(hit.center.x < 100.0, "picked {:?}", hit.center);

        let near_second =
            detector.find_marker(&frame, &reference, &query(Some(Point2::new(214.0, 214.0))));
        let hit = near_second.accepted.expect("marker found");
        assert!(hit.center.x > 100.0, "picked {:?}", hit.center);
    }

    #[test]
    fn area_window_filters_out_oversized_blob() {
        // 60x60 blob is 9% of a 200x200 frame, above the 3% ceiling
        let data = frame_with_squares(200, &[(40, 40, 60)]);
        let frame = RgbFrameView::new(200, 200, &data).unwrap();
        let detector = ShapeDetector::new(ShapeDetectorParams::default());
        let reference = ShapeSignature {
            shape_type: crate::ShapeType::Rectangle,
            area: 3481.0,
            compactness: std::f32::consts::FRAC_PI_4,
            vertex_count: 4,
        };

        let search = detector.find_marker(&frame, &reference, &query(None));
        assert!(search.accepted.is_none());
        assert!(search.best_rejected.is_none());
    }
}
