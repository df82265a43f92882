use std::collections::HashMap;

use nalgebra::Point2;

use marker_track_core::{hue_distance, rgb_to_hsb, CalibrateError, Rgb, RgbFrameView};

/// Radius of the square patch sampled around the calibration point.
const SAMPLE_RADIUS: i32 = 5;
/// Channel quantization step used to pool near-identical sample colors.
const QUANT_STEP: u32 = 5;
/// Saturation below which the modal sample is treated as washed out.
const MIN_CALIBRATION_SATURATION: f32 = 0.2;
/// Runner-up colors must reach this share of the modal count to be
/// considered during the saturation rescue.
const RESCUE_FREQ_FRAC: f32 = 0.3;

/// Weights of the perceptual color distance.
const RGB_WEIGHT: f32 = 0.5;
const HUE_WEIGHT: f32 = 30.0;
const SAT_WEIGHT: f32 = 10.0;
const BRIGHT_WEIGHT: f32 = 10.0;

/// Pick the target color from an `(2r+1)x(2r+1)` patch around `point`.
///
/// Sampled colors are quantized to the nearest multiple of 5 per channel
/// and the most frequent quantized color wins. A washed-out mode
/// (saturation below 0.2, typically a background pick) is replaced by the
/// most saturated color among those with at least 30 % of the modal
/// count, provided that color is itself saturated enough.
pub fn calibrate_color(
    frame: &RgbFrameView<'_>,
    point: Point2<i32>,
) -> Result<Rgb, CalibrateError> {
    if !frame.contains(point.x, point.y) {
        return Err(CalibrateError::OutOfBounds {
            x: point.x,
            y: point.y,
            width: frame.width,
            height: frame.height,
        });
    }

    let mut counts: HashMap<Rgb, usize> = HashMap::new();
    for dy in -SAMPLE_RADIUS..=SAMPLE_RADIUS {
        for dx in -SAMPLE_RADIUS..=SAMPLE_RADIUS {
            let x = point.x + dx;
            let y = point.y + dy;
            if !frame.contains(x, y) {
                continue;
            }
            let quantized = quantize(frame.pixel(x as usize, y as usize));
            *counts.entry(quantized).or_insert(0) += 1;
        }
    }

    // The patch always contains at least the calibration point itself.
    let (&mode, &mode_count) = counts
        .iter()
        .max_by_key(|(_, &count)| count)
        .expect("non-empty sample patch");

    let mut target = mode;
    if rgb_to_hsb(mode).s < MIN_CALIBRATION_SATURATION {
        let min_count = (mode_count as f32 * RESCUE_FREQ_FRAC).ceil() as usize;
        let rescue = counts
            .iter()
            .filter(|(_, &count)| count >= min_count)
            .map(|(&color, _)| (color, rgb_to_hsb(color).s))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((color, sat)) = rescue {
            if sat > MIN_CALIBRATION_SATURATION {
                target = color;
            }
        }
    }

    log::debug!(
        "calibrated color ({}, {}, {}) from patch at ({}, {})",
        target[0],
        target[1],
        target[2],
        point.x,
        point.y
    );
    Ok(target)
}

#[inline]
fn quantize(rgb: Rgb) -> Rgb {
    let q = |c: u8| -> u8 {
        let rounded = (c as u32 + QUANT_STEP / 2) / QUANT_STEP * QUANT_STEP;
        rounded.min(255) as u8
    };
    [q(rgb[0]), q(rgb[1]), q(rgb[2])]
}

/// Stride-scanning color detector.
///
/// Detection is a pure function of the frame, the target color and the
/// acceptance threshold; there is no hidden per-frame state.
#[derive(Clone, Copy, Debug)]
pub struct ColorDetector {
    sampling_step: usize,
}

impl ColorDetector {
    /// `sampling_step` is the pixel stride of the scan (>= 1); larger
    /// steps trade accuracy for speed.
    pub fn new(sampling_step: usize) -> Self {
        Self {
            sampling_step: sampling_step.max(1),
        }
    }

    #[inline]
    pub fn sampling_step(&self) -> usize {
        self.sampling_step
    }

    /// Weighted centroid of pixels within `threshold` of `target`.
    ///
    /// The per-pixel distance combines an RGB magnitude term with
    /// circular hue, saturation and brightness differences. Matches
    /// closer to the target weigh more; if the total weight degenerates
    /// to zero the unweighted centroid of the matches is returned.
    /// Returns `None` when no sampled pixel is in range.
    pub fn find_marker(
        &self,
        frame: &RgbFrameView<'_>,
        target: Rgb,
        threshold: f32,
    ) -> Option<Point2<f32>> {
        let target_hsb = rgb_to_hsb(target);

        let mut weighted = Point2::new(0.0f32, 0.0f32);
        let mut total_weight = 0.0f32;
        let mut unweighted = Point2::new(0.0f32, 0.0f32);
        let mut matches = 0usize;

        let mut y = 0;
        while y < frame.height {
            let mut x = 0;
            while x < frame.width {
                let pixel = frame.pixel(x, y);
                let hsb = rgb_to_hsb(pixel);

                let dr = pixel[0] as f32 - target[0] as f32;
                let dg = pixel[1] as f32 - target[1] as f32;
                let db = pixel[2] as f32 - target[2] as f32;
                let distance = RGB_WEIGHT * (dr * dr + dg * dg + db * db).sqrt()
                    + HUE_WEIGHT * hue_distance(hsb.h, target_hsb.h)
                    + SAT_WEIGHT * (hsb.s - target_hsb.s).abs()
                    + BRIGHT_WEIGHT * (hsb.b - target_hsb.b).abs();

                if distance < threshold {
                    let weight = threshold - distance;
                    weighted.x += x as f32 * weight;
                    weighted.y += y as f32 * weight;
                    total_weight += weight;
                    unweighted.x += x as f32;
                    unweighted.y += y as f32;
                    matches += 1;
                }
                x += self.sampling_step;
            }
            y += self.sampling_step;
        }

        if matches == 0 {
            return None;
        }
        if total_weight > 0.0 {
            Some(Point2::new(
                weighted.x / total_weight,
                weighted.y / total_weight,
            ))
        } else {
            Some(Point2::new(
                unweighted.x / matches as f32,
                unweighted.y / matches as f32,
            ))
        }
    }
}
