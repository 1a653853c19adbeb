use super::postprocess::{MaskPostprocessor, PostprocessConfig};
use super::types::{
    BoundingBox, InstanceSegmenter, SegmentationBatch, SegmentationResult, Timings,
    UpstreamFailure,
};
use image::{GrayImage, RgbaImage};
use ndarray::Array2;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

/// One instance mask stored on disk, tagged with its class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSource {
    pub class_id: u32,
    pub path: PathBuf,
}

impl FromStr for MaskSource {
    type Err = String;

    /// Parses `CLASS:PATH`, e.g. `0:person.png`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, path) = s
            .split_once(':')
            .ok_or_else(|| format!("expected CLASS:PATH, got '{s}'"))?;
        let class_id = class
            .trim()
            .parse()
            .map_err(|e| format!("invalid class id '{class}': {e}"))?;
        if path.is_empty() {
            return Err(format!("missing mask path in '{s}'"));
        }
        Ok(Self {
            class_id,
            path: PathBuf::from(path),
        })
    }
}

/// Segmenter that replays instance masks from grayscale image files
///
/// Each pixel is mapped to a logit centred on mid-grey, so anything brighter
/// than 127 is foreground after binarization. Masks then go through the same
/// postprocessing a model's output would, so a file smaller than the frame is
/// not upsampled and will not composite against it.
pub struct MaskFileSegmenter {
    sources: Vec<MaskSource>,
    postprocessor: MaskPostprocessor,
    width: u32,
    height: u32,
}

impl MaskFileSegmenter {
    pub fn new(
        sources: Vec<MaskSource>,
        config: PostprocessConfig,
    ) -> Result<Self, UpstreamFailure> {
        let (width, height) = match sources.first() {
            Some(first) => image::image_dimensions(&first.path).map_err(|e| {
                UpstreamFailure::new(format!(
                    "Failed to read mask {}: {}",
                    first.path.display(),
                    e
                ))
            })?,
            None => (0, 0),
        };

        tracing::info!(
            "Mask file segmenter ready: {} instance(s) at {}x{}",
            sources.len(),
            width,
            height
        );

        Ok(Self {
            sources,
            postprocessor: MaskPostprocessor::new(config),
            width,
            height,
        })
    }

    fn load(&self, source: &MaskSource) -> Result<GrayImage, UpstreamFailure> {
        image::open(&source.path)
            .map(|img| img.to_luma8())
            .map_err(|e| {
                UpstreamFailure::new(format!(
                    "Failed to load mask {}: {}",
                    source.path.display(),
                    e
                ))
            })
    }
}

fn luma_to_logits(mask: &GrayImage) -> Array2<f32> {
    let (width, height) = mask.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        mask.get_pixel(x as u32, y as u32)[0] as f32 - 127.5
    })
}

impl InstanceSegmenter for MaskFileSegmenter {
    fn segment(&mut self, frame: &RgbaImage) -> Result<SegmentationBatch, UpstreamFailure> {
        let _span = tracing::debug_span!("mask_file_segment").entered();
        let (frame_width, frame_height) = frame.dimensions();

        let load_start = Instant::now();
        let masks = self
            .sources
            .iter()
            .map(|source| self.load(source).map(|m| (source.class_id, m)))
            .collect::<Result<Vec<_>, _>>()?;
        let inference = load_start.elapsed();

        let post_start = Instant::now();
        let mut results = Vec::with_capacity(masks.len());
        for (class_id, luma) in &masks {
            let logits = luma_to_logits(luma);
            let mask = self
                .postprocessor
                .process(logits.view(), frame_width, frame_height)
                .map_err(|e| UpstreamFailure::new(e.to_string()))?;
            results.push(SegmentationResult::new(mask, BoundingBox::for_class(*class_id)));
        }
        let post_process = post_start.elapsed();

        tracing::debug!(
            "Segmented {} instance(s) in {:.1}ms",
            results.len(),
            (inference + post_process).as_secs_f64() * 1000.0
        );

        Ok(SegmentationBatch::new(results).with_timings(Timings {
            inference,
            post_process,
            ..Timings::default()
        }))
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
