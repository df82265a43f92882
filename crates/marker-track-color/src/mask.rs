use serde::{Deserialize, Serialize};

use marker_track_core::{hsv_of, Mask, Rgb, RgbFrameView};

/// HSV window for color membership, in OpenCV units (hue 0..180,
/// saturation and value 0..255).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ColorMaskParams {
    /// Half-width of the accepted hue window.
    pub hue_tolerance: f32,
    pub sat_tolerance: f32,
    pub val_tolerance: f32,
    /// Lower bound applied to saturation regardless of tolerance.
    pub sat_floor: f32,
    /// Lower bound applied to value regardless of tolerance.
    pub val_floor: f32,
}

impl Default for ColorMaskParams {
    fn default() -> Self {
        Self {
            hue_tolerance: 15.0,
            sat_tolerance: 50.0,
            val_tolerance: 50.0,
            sat_floor: 30.0,
            val_floor: 30.0,
        }
    }
}

/// Build a binary membership mask of pixels within the HSV window
/// around `target`.
///
/// Red targets sit next to the 0/180 hue discontinuity; when the hue
/// window crosses the boundary it wraps and the two half-ranges are
/// combined with a logical OR.
pub fn create_color_mask(
    frame: &RgbFrameView<'_>,
    target: Rgb,
    params: &ColorMaskParams,
) -> Mask {
    let t = hsv_of(target);

    let s_lo = (t.s - params.sat_tolerance).max(params.sat_floor);
    let s_hi = (t.s + params.sat_tolerance).min(255.0);
    let v_lo = (t.v - params.val_tolerance).max(params.val_floor);
    let v_hi = (t.v + params.val_tolerance).min(255.0);

    let mut mask = Mask::new(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let hsv = hsv_of(frame.pixel(x, y));
            let ok = hue_in_window(hsv.h, t.h, params.hue_tolerance)
                && hsv.s >= s_lo
                && hsv.s <= s_hi
                && hsv.v >= v_lo
                && hsv.v <= v_hi;
            mask.set(x, y, ok);
        }
    }
    mask
}

#[inline]
fn hue_in_window(h: f32, center: f32, tolerance: f32) -> bool {
    let lo = center - tolerance;
    let hi = center + tolerance;
    if lo < 0.0 {
        // wrapped low end: [0, hi] OR [lo + 180, 180)
        h <= hi || h >= lo + 180.0
    } else if hi > 180.0 {
        h >= lo || h <= hi - 180.0
    } else {
        h >= lo && h <= hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_frame(width: usize, height: usize, color: Rgb) -> Vec<u8> {
        let mut data = vec![0u8; width * height * 3];
        for px in data.chunks_exact_mut(3) {
            px.copy_from_slice(&color);
        }
        data
    }

    #[test]
    fn in_window_pixels_are_set() {
        let data = uniform_frame(4, 4, [0, 200, 30]);
        let frame = RgbFrameView::new(4, 4, &data).unwrap();
        let mask = create_color_mask(&frame, [0, 200, 30], &ColorMaskParams::default());
        assert_eq!(mask.count(), 16);
    }

    #[test]
    fn out_of_window_pixels_are_clear() {
        // green frame, blue target
        let data = uniform_frame(4, 4, [0, 200, 30]);
        let frame = RgbFrameView::new(4, 4, &data).unwrap();
        let mask = create_color_mask(&frame, [20, 20, 220], &ColorMaskParams::default());
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn dark_pixels_cut_by_value_floor() {
        let data = uniform_frame(4, 4, [20, 5, 5]);
        let frame = RgbFrameView::new(4, 4, &data).unwrap();
        let mask = create_color_mask(&frame, [200, 40, 40], &ColorMaskParams::default());
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn red_window_wraps_hue_boundary() {
        // Target red sits at hue ~1; a red with hue just below 180 must
        // still match through the wrapped half-range.
        let target: Rgb = [220, 45, 35]; // hue ~1.6
        let high_side: Rgb = [220, 35, 45]; // hue ~178.4
        let data = uniform_frame(2, 2, high_side);
        let frame = RgbFrameView::new(2, 2, &data).unwrap();
        let mask = create_color_mask(&frame, target, &ColorMaskParams::default());
        assert_eq!(mask.count(), 4);

        // hue_in_window itself is exercised at both wrap ends
        assert!(hue_in_window(178.0, 2.0, 15.0));
        assert!(hue_in_window(2.0, 178.0, 15.0));
        assert!(!hue_in_window(90.0, 2.0, 15.0));
    }
}
