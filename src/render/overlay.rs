use super::palette::{ColorAssigner, PALETTE};
use super::OVERLAY_ALPHA;
use crate::error::{blank_rgba, Error, Result};
use crate::segmentation::{Mask, SegmentationBatch, SegmentationResult, UpstreamFailure};
use image::{imageops, Rgb, Rgba, RgbaImage};

/// Live-preview renderer that paints class-colored masks onto a display surface
///
/// Holds the latest results and its own color session. Per-mask scratch
/// images live only for the duration of [`OverlayRenderer::draw`].
#[derive(Debug)]
pub struct OverlayRenderer {
    surface_width: u32,
    surface_height: u32,
    results: Option<Vec<SegmentationResult>>,
    frame_width: u32,
    frame_height: u32,
    scale_x: f32,
    scale_y: f32,
    colors: ColorAssigner,
    needs_redraw: bool,
}

impl OverlayRenderer {
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self {
            surface_width,
            surface_height,
            results: None,
            frame_width: 1,
            frame_height: 1,
            scale_x: 1.0,
            scale_y: 1.0,
            colors: ColorAssigner::new(),
            needs_redraw: false,
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_width, self.surface_height)
    }

    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    pub fn colors(&self) -> &ColorAssigner {
        &self.colors
    }

    pub fn results(&self) -> &[SegmentationResult] {
        self.results.as_deref().unwrap_or(&[])
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Replace the displayed results with a new frame's batch
    ///
    /// `frame_width`/`frame_height` are the size of the frame the masks were
    /// produced for; masks are scaled from it to the surface when drawn.
    pub fn set_results(&mut self, batch: SegmentationBatch, frame_width: u32, frame_height: u32) {
        self.frame_width = frame_width;
        self.frame_height = frame_height;
        self.update_scale();

        for result in &batch.results {
            self.colors.color_for(result.class_id());
        }

        tracing::debug!(
            "Overlay updated: {} instance(s), scale {:.3}x{:.3}",
            batch.len(),
            self.scale_x,
            self.scale_y
        );

        self.results = Some(batch.results);
        self.needs_redraw = true;
    }

    /// Drop the current results and start a new color session
    pub fn clear(&mut self) {
        tracing::debug!("Clearing overlay");
        self.results = None;
        self.colors.reset();
        self.needs_redraw = true;
    }

    /// Feed one inference outcome: show it on success, clear on failure
    pub fn on_inference(
        &mut self,
        outcome: std::result::Result<SegmentationBatch, UpstreamFailure>,
        frame_width: u32,
        frame_height: u32,
    ) {
        match outcome {
            Ok(batch) => self.set_results(batch, frame_width, frame_height),
            Err(failure) => {
                tracing::warn!("Clearing overlay after failed frame: {}", failure);
                self.clear();
            }
        }
    }

    /// Change the surface size; the current results are rescaled to it
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface_width = width;
        self.surface_height = height;
        self.update_scale();
        self.needs_redraw = true;
    }

    // A zero frame side counts as 1
    fn update_scale(&mut self) {
        self.scale_x = self.surface_width as f32 / self.frame_width.max(1) as f32;
        self.scale_y = self.surface_height as f32 / self.frame_height.max(1) as f32;
    }

    /// Paint every current result onto `canvas`, which must be surface-sized
    ///
    /// A mask whose scratch buffer cannot be allocated is skipped; the
    /// remaining masks are still drawn.
    pub fn draw(&mut self, canvas: &mut RgbaImage) -> Result<()> {
        let surface = (self.surface_width, self.surface_height);
        if canvas.dimensions() != surface {
            return Err(Error::DimensionMismatch {
                expected: surface,
                actual: canvas.dimensions(),
            });
        }

        let _span = tracing::debug_span!("overlay_draw", instances = self.results().len())
            .entered();

        for result in self.results() {
            let color = self.colors.get(result.class_id()).unwrap_or(PALETTE[7]);
            match self.draw_mask(canvas, &result.mask, color) {
                Ok(()) => {}
                Err(Error::ResourceExhausted { bytes }) => {
                    tracing::warn!("Skipping mask, could not allocate {} bytes", bytes);
                }
                Err(e) => return Err(e),
            }
        }

        self.needs_redraw = false;
        Ok(())
    }

    fn draw_mask(&self, canvas: &mut RgbaImage, mask: &Mask, color: Rgb<u8>) -> Result<()> {
        let (mask_width, mask_height) = mask.dimensions();
        if mask_width == 0 || mask_height == 0 {
            return Ok(());
        }

        let scratch = colorize(mask, color)?;

        // Never larger than the surface
        let scaled_width = ((mask_width as f32 * self.scale_x).round() as u32)
            .min(self.surface_width)
            .max(1);
        let scaled_height = ((mask_height as f32 * self.scale_y).round() as u32)
            .min(self.surface_height)
            .max(1);
        if (scaled_width, scaled_height) == scratch.dimensions() {
            imageops::overlay(canvas, &scratch, 0, 0);
        } else {
            let scaled = imageops::resize(
                &scratch,
                scaled_width,
                scaled_height,
                imageops::FilterType::Nearest,
            );
            imageops::overlay(canvas, &scaled, 0, 0);
        }

        Ok(())
    }
}

/// Mask-sized image: foreground in `color` at overlay alpha, rest transparent
fn colorize(mask: &Mask, color: Rgb<u8>) -> Result<RgbaImage> {
    let (width, height) = mask.dimensions();
    let mut scratch = blank_rgba(width, height)?;

    let Rgb([r, g, b]) = color;
    let paint = Rgba([r, g, b, OVERLAY_ALPHA]);
    for (pixel, &value) in scratch.pixels_mut().zip(mask.as_raw()) {
        if value == 1 {
            *pixel = paint;
        }
    }
    Ok(scratch)
}
