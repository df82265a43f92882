//! Binary morphology with square structuring elements.
//!
//! Pixels outside the mask count as clear, so erosion eats into blobs
//! touching the frame border.

use marker_track_core::Mask;

/// Kernel size of the standard denoising passes.
pub const DENOISE_KERNEL: usize = 5;

pub fn erode(mask: &Mask, kernel: usize) -> Mask {
    transform(mask, kernel, true)
}

pub fn dilate(mask: &Mask, kernel: usize) -> Mask {
    transform(mask, kernel, false)
}

/// Erode then dilate; removes speckle noise smaller than the kernel.
pub fn open(mask: &Mask, kernel: usize, iterations: usize) -> Mask {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = dilate(&erode(&out, kernel), kernel);
    }
    out
}

/// Dilate then erode; fills holes smaller than the kernel.
pub fn close(mask: &Mask, kernel: usize, iterations: usize) -> Mask {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = erode(&dilate(&out, kernel), kernel);
    }
    out
}

fn transform(mask: &Mask, kernel: usize, all: bool) -> Mask {
    let radius = (kernel / 2) as i32;
    let width = mask.width as i32;
    let height = mask.height as i32;
    let mut out = Mask::new(mask.width, mask.height);

    for y in 0..height {
        for x in 0..width {
            let mut hit = all;
            'kernel: for ky in -radius..=radius {
                for kx in -radius..=radius {
                    let nx = x + kx;
                    let ny = y + ky;
                    let on = nx >= 0
                        && ny >= 0
                        && nx < width
                        && ny < height
                        && mask.get(nx as usize, ny as usize);
                    if all && !on {
                        hit = false;
                        break 'kernel;
                    }
                    if !all && on {
                        hit = true;
                        break 'kernel;
                    }
                }
            }
            out.set(x as usize, y as usize, hit);
        }
    }
    out
}
