use crate::segmentation::UpstreamFailure;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by mask transforms and compositing.
///
/// Every variant fails a single call only. No shared state is left
/// half-written when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mask does not have the size of the image (or mask) it is combined with.
    /// Dimensions are `(width, height)`.
    #[error("mask dimensions {actual:?} do not match target dimensions {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A cell that must be binary holds something other than 0 or 1.
    #[error("mask value at ({x}, {y}) must be 0 or 1, found {value}")]
    InvalidMaskValue { x: u32, y: u32, value: u8 },

    /// A pixel buffer could not be allocated.
    #[error("could not allocate {bytes} bytes for a pixel buffer")]
    ResourceExhausted { bytes: usize },

    /// Raw buffer length disagrees with the declared size.
    #[error("buffer of length {len} cannot hold a {width}x{height} grid")]
    InvalidBuffer { width: u32, height: u32, len: usize },

    #[error("smoothing kernel size must be at least 1, got {0}")]
    InvalidKernel(usize),

    #[error(transparent)]
    Upstream(#[from] UpstreamFailure),
}

/// Allocate a buffer of `width * height * channels` elements without aborting
/// the process when memory is short.
pub(crate) fn try_alloc<T: Clone>(
    width: u32,
    height: u32,
    channels: usize,
    fill: T,
) -> Result<Vec<T>> {
    let elem = std::mem::size_of::<T>().max(1);
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(Error::ResourceExhausted { bytes: usize::MAX })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::ResourceExhausted {
        bytes: len.saturating_mul(elem),
    })?;
    buf.resize(len, fill);
    Ok(buf)
}

/// Fresh, fully transparent RGBA image.
pub(crate) fn blank_rgba(width: u32, height: u32) -> Result<image::RgbaImage> {
    let buf = try_alloc(width, height, 4, 0u8)?;
    let len = buf.len();
    image::RgbaImage::from_raw(width, height, buf).ok_or(Error::InvalidBuffer {
        width,
        height,
        len,
    })
}
