use crate::error::CalibrateError;

/// 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// Borrowed view over an 8-bit, 3-channel, row-major frame buffer.
///
/// Rows may be padded: `stride` is the distance between row starts in
/// bytes and must be at least `3 * width`. The view never owns or
/// mutates the buffer; it is only valid for the duration of one
/// detection call.
#[derive(Clone, Copy, Debug)]
pub struct RgbFrameView<'a> {
    pub width: usize,
    pub height: usize,
    /// Bytes between consecutive row starts.
    pub stride: usize,
    pub data: &'a [u8],
}

impl<'a> RgbFrameView<'a> {
    /// Wrap a tightly packed RGB buffer (`stride == 3 * width`).
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, CalibrateError> {
        Self::with_stride(width, height, width * 3, data)
    }

    /// Wrap a row-padded RGB buffer with an explicit row stride in bytes.
    pub fn with_stride(
        width: usize,
        height: usize,
        stride: usize,
        data: &'a [u8],
    ) -> Result<Self, CalibrateError> {
        if width == 0 || height == 0 || stride < width * 3 {
            return Err(CalibrateError::InvalidDimensions {
                width,
                height,
                stride,
            });
        }
        let expected = stride * (height - 1) + width * 3;
        if data.len() < expected {
            return Err(CalibrateError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Pixel at `(x, y)`. The caller must stay in bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let off = y * self.stride + x * 3;
        [self.data[off], self.data[off + 1], self.data[off + 2]]
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Frame diagonal in pixels.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        let w = self.width as f32;
        let h = self.height as f32;
        (w * w + h * h).sqrt()
    }
}
