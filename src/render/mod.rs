mod compositor;
mod overlay;
pub mod palette;

pub use compositor::{apply_transparent_overlay, masked_out, union_masks, MaskCompositor};
pub use overlay::OverlayRenderer;
pub use palette::{ColorAssigner, PALETTE};

use crate::error::{blank_rgba, Result};
use image::{imageops, RgbaImage};
use std::borrow::Cow;

/// Alpha given to every painted mask pixel (~37.6% opacity)
pub const OVERLAY_ALPHA: u8 = 96;

/// How a batch is turned into output images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeOptions {
    /// One output per instance instead of one for the whole batch
    pub separate_output: bool,
    /// Black out the background instead of drawing a translucent overlay
    pub mask_only: bool,
}

impl CompositeOptions {
    pub fn mode(&self) -> OutputMode {
        match (self.separate_output, self.mask_only) {
            (true, true) => OutputMode::PerInstanceMasked,
            (true, false) => OutputMode::PerInstanceOverlay,
            (false, true) => OutputMode::CombinedMasked,
            (false, false) => OutputMode::CombinedOverlay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    PerInstanceMasked,
    PerInstanceOverlay,
    CombinedMasked,
    CombinedOverlay,
}

/// A base image and the optional overlay meant to be shown on top of it
///
/// In overlay modes the base borrows the caller's original image; in
/// mask-only modes it is a freshly rendered image.
#[derive(Debug, Clone)]
pub struct OutputImagePair<'a> {
    pub base: Cow<'a, RgbaImage>,
    pub overlay: Option<RgbaImage>,
}

impl<'a> OutputImagePair<'a> {
    pub fn masked(base: RgbaImage) -> Self {
        Self {
            base: Cow::Owned(base),
            overlay: None,
        }
    }

    pub fn overlaid(base: &'a RgbaImage, overlay: RgbaImage) -> Self {
        Self {
            base: Cow::Borrowed(base),
            overlay: Some(overlay),
        }
    }

    /// Blend the overlay onto a copy of the base
    ///
    /// An overlay of a different size is stretched to the base with
    /// nearest-neighbor sampling first.
    pub fn flatten(&self) -> Result<RgbaImage> {
        let (width, height) = self.base.dimensions();
        let mut out = blank_rgba(width, height)?;
        out.copy_from_slice(self.base.as_raw());

        if let Some(overlay) = &self.overlay {
            if overlay.dimensions() == out.dimensions() {
                imageops::overlay(&mut out, overlay, 0, 0);
            } else {
                let scaled =
                    imageops::resize(overlay, width, height, imageops::FilterType::Nearest);
                imageops::overlay(&mut out, &scaled, 0, 0);
            }
        }
        Ok(out)
    }
}
