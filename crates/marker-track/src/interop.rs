//! Conversions from `image` crate containers.

use image::RgbImage;
use marker_track_core::RgbFrameView;

/// Borrow an [`RgbImage`] as a frame view.
///
/// `RgbImage` buffers are tightly packed, so the view is constructed
/// directly without re-validating the buffer length.
pub fn rgb_view(image: &RgbImage) -> RgbFrameView<'_> {
    let width = image.width() as usize;
    RgbFrameView {
        width,
        height: image.height() as usize,
        stride: width * 3,
        data: image.as_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn view_matches_image_pixels() {
        let mut img = RgbImage::new(8, 4);
        img.put_pixel(5, 2, Rgb([10, 20, 30]));
        let view = rgb_view(&img);
        assert_eq!(view.width, 8);
        assert_eq!(view.height, 4);
        assert_eq!(view.pixel(5, 2), [10, 20, 30]);
        assert_eq!(view.pixel(0, 0), [0, 0, 0]);
    }
}
