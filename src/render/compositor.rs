use super::palette::{ColorAssigner, PALETTE};
use super::{CompositeOptions, OutputImagePair, OutputMode, OVERLAY_ALPHA};
use crate::error::{blank_rgba, Error, Result};
use crate::segmentation::{Mask, SegmentationBatch};
use image::{Rgb, Rgba, RgbaImage};

const MASKED_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Turns a segmentation batch into still output images
///
/// Owns the class colors for the batch path, so colors stay stable across
/// calls on the same compositor.
#[derive(Debug, Clone)]
pub struct MaskCompositor {
    colors: ColorAssigner,
    instance_color: Rgb<u8>,
}

impl Default for MaskCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskCompositor {
    pub fn new() -> Self {
        Self {
            colors: ColorAssigner::new(),
            // pink
            instance_color: PALETTE[4],
        }
    }

    /// Color used for every instance when outputs are separate
    pub fn with_instance_color(mut self, color: Rgb<u8>) -> Self {
        self.instance_color = color;
        self
    }

    pub fn colors(&self) -> &ColorAssigner {
        &self.colors
    }

    /// Start a new color session
    pub fn reset(&mut self) {
        tracing::info!("Resetting compositor colors");
        self.colors.reset();
    }

    /// Render `batch` against `original`
    ///
    /// Every mask must already have the dimensions of `original`. An empty
    /// batch yields no outputs in every mode.
    pub fn compose<'a>(
        &mut self,
        original: &'a RgbaImage,
        batch: &SegmentationBatch,
        options: CompositeOptions,
    ) -> Result<Vec<OutputImagePair<'a>>> {
        let mode = options.mode();
        let _span = tracing::debug_span!("compose", ?mode, instances = batch.len()).entered();

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let (width, height) = original.dimensions();

        let outputs = match mode {
            OutputMode::PerInstanceMasked => batch
                .results
                .iter()
                .map(|r| masked_out(original, &r.mask).map(OutputImagePair::masked))
                .collect::<Result<Vec<_>>>()?,

            OutputMode::PerInstanceOverlay => batch
                .results
                .iter()
                .map(|r| -> Result<OutputImagePair<'a>> {
                    let mut overlay = blank_rgba(width, height)?;
                    apply_transparent_overlay(&mut overlay, &r.mask, self.instance_color)?;
                    Ok(OutputImagePair::overlaid(original, overlay))
                })
                .collect::<Result<Vec<_>>>()?,

            OutputMode::CombinedMasked => {
                let masks: Vec<&Mask> = batch.results.iter().map(|r| &r.mask).collect();
                let combined = union_masks(&masks)?;
                vec![OutputImagePair::masked(masked_out(original, &combined)?)]
            }

            OutputMode::CombinedOverlay => {
                let mut overlay = blank_rgba(width, height)?;
                for result in &batch.results {
                    let color = self.colors.color_for(result.class_id());
                    apply_transparent_overlay(&mut overlay, &result.mask, color)?;
                }
                vec![OutputImagePair::overlaid(original, overlay)]
            }
        };

        tracing::debug!("Composed {} output(s)", outputs.len());
        Ok(outputs)
    }
}

fn check_dimensions(expected: (u32, u32), mask: &Mask) -> Result<()> {
    if mask.dimensions() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: mask.dimensions(),
        });
    }
    Ok(())
}

/// Keep foreground pixels of `image` and paint everything else opaque black
///
/// The mask must be exactly the image size and strictly binary.
pub fn masked_out(image: &RgbaImage, mask: &Mask) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    check_dimensions((width, height), mask)?;

    let mut out = blank_rgba(width, height)?;
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        *pixel = match mask.get(x, y) {
            1 => *image.get_pixel(x, y),
            0 => MASKED_BACKGROUND,
            value => return Err(Error::InvalidMaskValue { x, y, value }),
        };
    }
    Ok(out)
}

/// Merge masks into one, the first non-zero value written to a cell wins
///
/// For binary masks this is a logical OR. All masks must share the first
/// mask's dimensions; no masks gives the empty mask.
pub fn union_masks(masks: &[&Mask]) -> Result<Mask> {
    let Some(first) = masks.first() else {
        return Ok(Mask::empty());
    };

    let (width, height) = first.dimensions();
    let mut combined = Mask::zeros(width, height)?;

    for mask in masks {
        check_dimensions((width, height), mask)?;
        for (cell, &value) in combined.as_raw_mut().iter_mut().zip(mask.as_raw()) {
            if *cell == 0 {
                *cell = value;
            }
        }
    }

    Ok(combined)
}

/// Paint every foreground cell of `mask` onto `overlay` in `color` at the
/// overlay alpha. Background cells keep whatever the overlay already had.
pub fn apply_transparent_overlay(
    overlay: &mut RgbaImage,
    mask: &Mask,
    color: Rgb<u8>,
) -> Result<()> {
    check_dimensions(overlay.dimensions(), mask)?;

    let Rgb([r, g, b]) = color;
    let paint = Rgba([r, g, b, OVERLAY_ALPHA]);
    for (pixel, &value) in overlay.pixels_mut().zip(mask.as_raw()) {
        if value > 0 {
            *pixel = paint;
        }
    }
    Ok(())
}
