mod files;

pub use files::PngDirectorySink;

use crate::render::OutputImagePair;
use anyhow::Result;
use image::RgbaImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write one composed output. `index` is its position in the batch output.
    fn write_pair(&mut self, index: usize, pair: &OutputImagePair<'_>) -> Result<()>;

    /// Write a rendered live-preview surface
    fn write_preview(&mut self, surface: &RgbaImage) -> Result<()>;
}
