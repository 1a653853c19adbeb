use super::types::Mask;
use crate::error::{try_alloc, Error, Result};
use ndarray::{Array2, ArrayView2};

/// Largest width or height `resample` will produce
pub const MAX_DIMENSION: u32 = 640;

const SMOOTH_SIGMA: f32 = 2.0;
const SMOOTH_THRESHOLD: f32 = 0.9;

/// Resize a mask to the target size with nearest-neighbor sampling
///
/// Both target dimensions are first clamped to [`MAX_DIMENSION`]. A mask that
/// already fits inside the clamped target is returned as-is; masks are never
/// upsampled in that case.
pub fn resample(mask: &Mask, target_width: u32, target_height: u32) -> Result<Mask> {
    let target_width = target_width.min(MAX_DIMENSION);
    let target_height = target_height.min(MAX_DIMENSION);

    let (width, height) = mask.dimensions();
    // Nothing to sample from a degenerate mask
    if width == 0 || height == 0 || (height <= target_height && width <= target_width) {
        return Ok(mask.clone());
    }

    let _span = tracing::debug_span!("resample", width, height, target_width, target_height)
        .entered();

    let x_ratio = width as f64 / target_width as f64;
    let y_ratio = height as f64 / target_height as f64;

    let src = mask.as_raw();
    let mut data = try_alloc(target_width, target_height, 1, 0u8)?;

    for (y, row) in data
        .chunks_exact_mut(target_width.max(1) as usize)
        .enumerate()
    {
        let src_y = ((y as f64 * y_ratio) as usize).min(height as usize - 1);
        let src_row = &src[src_y * width as usize..(src_y + 1) * width as usize];
        for (x, cell) in row.iter_mut().enumerate() {
            let src_x = ((x as f64 * x_ratio) as usize).min(width as usize - 1);
            *cell = src_row[src_x];
        }
    }

    Mask::from_raw(target_width, target_height, data)
}

/// Threshold raw per-pixel logits into a binary mask
///
/// A cell is foreground only when its score is strictly greater than zero,
/// which is the 0.5 point of the sigmoid.
pub fn binarize(logits: ArrayView2<'_, f32>) -> Result<Mask> {
    let (height, width) = logits.dim();
    let data: Vec<u8> = logits.iter().map(|&v| u8::from(v > 0.0)).collect();
    Mask::from_raw(width as u32, height as u32, data)
}

/// Smooth jagged mask edges with a Gaussian blur followed by a high threshold
///
/// Only the interior is convolved: every cell within `kernel_size / 2` of an
/// edge comes out as background. The 0.9 re-threshold keeps a cell only if
/// its neighbourhood is almost entirely foreground, so the mask shrinks
/// slightly while its outline gets smoother.
///
/// `kernel_size` should be small relative to the mask. When it reaches the
/// smaller mask dimension the interior is empty and the result is all zeros.
pub fn smooth(mask: &Mask, kernel_size: usize) -> Result<Mask> {
    if kernel_size == 0 {
        return Err(Error::InvalidKernel(kernel_size));
    }

    let _span = tracing::debug_span!("smooth", kernel_size).entered();

    let (width, height) = mask.dimensions();
    if kernel_size >= width.min(height) as usize {
        tracing::warn!(
            "Smoothing kernel {} does not fit a {}x{} mask, result will be empty",
            kernel_size,
            width,
            height
        );
    }

    let grid = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        if mask.get(x as u32, y as u32) > 0 {
            1.0f32
        } else {
            0.0
        }
    });

    let kernel = gaussian_kernel(kernel_size);
    let blurred = convolve_interior(&grid, &kernel);

    let data: Vec<u8> = blurred
        .iter()
        .map(|&v| u8::from(v > SMOOTH_THRESHOLD))
        .collect();
    Mask::from_raw(width, height, data)
}

/// Square Gaussian kernel centred at `size / 2`, normalised to sum to 1
fn gaussian_kernel(size: usize) -> Array2<f32> {
    let mean = (size / 2) as f32;
    let two_sigma_sq = 2.0 * SMOOTH_SIGMA * SMOOTH_SIGMA;
    let scale = 1.0 / (std::f32::consts::PI * two_sigma_sq);

    let mut kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let di = i as f32 - mean;
        let dj = j as f32 - mean;
        scale * (-(di * di + dj * dj) / two_sigma_sq).exp()
    });

    let sum = kernel.sum();
    kernel.mapv_inplace(|w| w / sum);
    kernel
}

/// Convolve without padding. Cells the kernel cannot fully cover stay 0.
fn convolve_interior(image: &Array2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
    let (height, width) = image.dim();
    let size = kernel.nrows();
    let offset = size / 2;
    let mut out = Array2::<f32>::zeros((height, width));

    for i in offset..height.saturating_sub(offset) {
        for j in offset..width.saturating_sub(offset) {
            let mut sum = 0.0f32;
            for ki in 0..size {
                let row = i - offset + ki;
                for kj in 0..size {
                    sum += image[[row, j - offset + kj]] * kernel[[ki, kj]];
                }
            }
            out[[i, j]] = sum;
        }
    }

    out
}
