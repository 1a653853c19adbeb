mod mask_files;
mod postprocess;
pub mod transform;
pub mod types;

pub use mask_files::{MaskFileSegmenter, MaskSource};
pub use postprocess::{MaskPostprocessor, PostprocessConfig};
pub use transform::{binarize, resample, smooth, MAX_DIMENSION};
pub use types::{
    BoundingBox, InstanceSegmenter, Mask, SegmentationBatch, SegmentationResult, Timings,
    UpstreamFailure,
};

use std::path::Path;

/// Create the default segmenter, which replays masks from files
pub fn create_file_segmenter(
    sources: Vec<MaskSource>,
    config: PostprocessConfig,
) -> Result<Box<dyn InstanceSegmenter>, UpstreamFailure> {
    for source in &sources {
        if !Path::new(&source.path).exists() {
            return Err(UpstreamFailure::new(format!(
                "Mask file {} does not exist",
                source.path.display()
            )));
        }
    }
    let segmenter = MaskFileSegmenter::new(sources, config)?;
    Ok(Box::new(segmenter))
}
