/// Errors surfaced by calibration-time argument checks.
///
/// Per-frame detection never returns these: detection failures are
/// downgraded to "no detection for this frame" so the processing loop
/// keeps running.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrateError {
    #[error("calibration point ({x}, {y}) outside frame {width}x{height}")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },

    #[error("invalid frame buffer length (expected at least {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height}, stride={stride})")]
    InvalidDimensions {
        width: usize,
        height: usize,
        stride: usize,
    },
}
