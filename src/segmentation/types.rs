use crate::error::{try_alloc, Error, Result};
use image::RgbaImage;
use std::time::Duration;

/// Binary instance mask: 0 = background, 1 = foreground
/// Stored flattened in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    /// Wrap a row-major buffer. Fails if `data.len() != width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::InvalidBuffer {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn zeros(width: u32, height: u32) -> Result<Self> {
        let data = try_alloc(width, height, 1, 0u8)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// The 0x0 mask.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    /// Build from nested rows. Every row must have the same length.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.as_ref().len()) as u32;

        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            let row = row.as_ref();
            if row.len() as u32 != width {
                return Err(Error::DimensionMismatch {
                    expected: (width, height),
                    actual: (row.len() as u32, height),
                });
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns (width, height), matching `image::GenericImageView::dimensions`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at column `x`, row `y`. Panics when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = value;
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Iterate rows as slices
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact panics on 0; a zero-width mask has no rows worth yielding
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// Detection box for one instance.
///
/// Only `class_id` is consumed by the renderers; the geometry is carried
/// through for callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundingBox {
    pub class_id: u32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub label: Option<String>,
}

impl BoundingBox {
    pub fn for_class(class_id: u32) -> Self {
        Self {
            class_id,
            ..Self::default()
        }
    }
}

/// A single detected instance
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    pub mask: Mask,
    pub bbox: BoundingBox,
}

impl SegmentationResult {
    pub fn new(mask: Mask, bbox: BoundingBox) -> Self {
        Self { mask, bbox }
    }

    pub fn class_id(&self) -> u32 {
        self.bbox.class_id
    }
}

/// Per-stage durations reported by the segmenter. Not used by rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    pub pre_process: Duration,
    pub inference: Duration,
    pub post_process: Duration,
}

impl Timings {
    pub fn total(&self) -> Duration {
        self.pre_process + self.inference + self.post_process
    }
}

/// Every instance found in one frame, in detection order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentationBatch {
    pub results: Vec<SegmentationResult>,
    pub timings: Timings,
}

impl SegmentationBatch {
    pub fn new(results: Vec<SegmentationResult>) -> Self {
        Self {
            results,
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// The segmenter could not produce a result for a frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("segmentation failed: {message}")]
pub struct UpstreamFailure {
    pub message: String,
}

impl UpstreamFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Trait for instance segmentation backends
/// Anything that turns a frame into per-instance masks plugs in here
pub trait InstanceSegmenter {
    /// Process a frame and return every detected instance
    ///
    /// Masks in the returned batch are already binarized and sized to `frame`
    /// (subject to the resample ceiling).
    fn segment(
        &mut self,
        frame: &RgbaImage,
    ) -> std::result::Result<SegmentationBatch, UpstreamFailure>;

    /// Reset internal state
    ///
    /// Call this when starting a new preview stream
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless segmenters
    }

    /// Get the segmenter's preferred input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}
