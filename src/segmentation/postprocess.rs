use super::transform::{self, MAX_DIMENSION};
use super::types::Mask;
use crate::error::Result;
use ndarray::ArrayView2;

/// Settings for turning raw instance logits into frame-sized masks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostprocessConfig {
    /// Run Gaussian edge smoothing after resampling
    pub smooth_edges: bool,
    /// Side of the square smoothing kernel
    pub smooth_kernel: usize,
    /// Ceiling applied to the resample target on each axis
    pub max_dimension: u32,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            smooth_edges: false,
            smooth_kernel: 4,
            max_dimension: MAX_DIMENSION,
        }
    }
}

/// Postprocessor for converting per-instance logits into display masks
pub struct MaskPostprocessor {
    config: PostprocessConfig,
}

impl MaskPostprocessor {
    pub fn new(config: PostprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Postprocess model logits into a mask sized for the frame
    ///
    /// Steps:
    /// 1. Threshold logits at zero
    /// 2. Resample to the frame dimensions (never above the ceiling)
    /// 3. Optionally smooth edges
    pub fn process(
        &self,
        logits: ArrayView2<'_, f32>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Mask> {
        let _span = tracing::debug_span!("postprocess").entered();

        let mask = transform::binarize(logits)?;
        self.finish(&mask, frame_width, frame_height)
    }

    /// Resample and optionally smooth an already binary mask
    pub fn finish(&self, mask: &Mask, frame_width: u32, frame_height: u32) -> Result<Mask> {
        let target_width = frame_width.min(self.config.max_dimension);
        let target_height = frame_height.min(self.config.max_dimension);
        let resized = transform::resample(mask, target_width, target_height)?;

        if self.config.smooth_edges {
            transform::smooth(&resized, self.config.smooth_kernel)
        } else {
            Ok(resized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn binarizes_and_downsamples() {
        let logits = Array2::from_shape_fn((8, 8), |(y, _)| if y < 4 { 2.0f32 } else { -2.0 });
        let post = MaskPostprocessor::new(PostprocessConfig::default());

        let mask = post.process(logits.view(), 4, 4).unwrap();
        assert_eq!(mask.dimensions(), (4, 4));
        assert_eq!(mask.rows().next().unwrap(), &[1, 1, 1, 1]);
        assert_eq!(mask.rows().last().unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn lower_ceiling_limits_output() {
        let logits = Array2::from_elem((50, 50), 1.0f32);
        let post = MaskPostprocessor::new(PostprocessConfig {
            max_dimension: 20,
            ..PostprocessConfig::default()
        });

        let mask = post.process(logits.view(), 100, 30).unwrap();
        assert_eq!(mask.dimensions(), (20, 20));
    }

    #[test]
    fn smoothing_is_optional() {
        let logits = Array2::from_elem((12, 12), 1.0f32);
        let plain = MaskPostprocessor::new(PostprocessConfig::default());
        let smoothed = MaskPostprocessor::new(PostprocessConfig {
            smooth_edges: true,
            smooth_kernel: 3,
            ..PostprocessConfig::default()
        });

        let a = plain.process(logits.view(), 12, 12).unwrap();
        let b = smoothed.process(logits.view(), 12, 12).unwrap();
        assert_eq!(a.foreground_count(), 144);
        // One-cell border band is cleared
        assert_eq!(b.foreground_count(), 100);
    }
}
