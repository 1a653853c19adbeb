use anyhow::{bail, Context, Result};
use clap::Parser;
use image::{imageops, RgbaImage};
use segfx::output::{OutputSink, PngDirectorySink};
use segfx::render::{CompositeOptions, MaskCompositor, OverlayRenderer};
use segfx::segmentation::{self, InstanceSegmenter, MaskSource, PostprocessConfig, MAX_DIMENSION};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image
    #[arg(short, long)]
    image: PathBuf,

    /// Instance mask as CLASS:PATH (grayscale, bright = foreground). Repeatable.
    ///
    /// Masks are only ever downsampled to the working frame. A mask smaller
    /// than the frame is kept at its own size and compositing fails with a
    /// dimension mismatch.
    #[arg(short, long = "mask", value_name = "CLASS:PATH")]
    masks: Vec<MaskSource>,

    /// Produce one output per instance instead of one combined output
    #[arg(long)]
    separate: bool,

    /// Black out the background instead of drawing a translucent overlay
    #[arg(long)]
    mask_only: bool,

    /// Smooth mask edges with a Gaussian blur
    #[arg(long)]
    smooth_edges: bool,

    /// Side of the smoothing kernel
    #[arg(long, default_value_t = 4)]
    smooth_kernel: usize,

    /// Directory to write outputs into
    #[arg(short, long, default_value = "segfx-out")]
    output_dir: PathBuf,

    /// Also render the live overlay onto a preview surface, e.g. 1280x720
    #[arg(long, value_parser = parse_size)]
    preview: Option<(u32, u32)>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w = w.parse().map_err(|e| format!("invalid width '{w}': {e}"))?;
    let h = h.parse().map_err(|e| format!("invalid height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("preview size must be non-zero, got '{s}'"));
    }
    Ok((w, h))
}

/// Largest size with the image's aspect ratio that fits the resample ceiling
fn working_size(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= MAX_DIMENSION {
        return (width, height);
    }
    let scale = MAX_DIMENSION as f64 / longest as f64;
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.masks.is_empty() {
        bail!("At least one --mask is required");
    }

    tracing::info!("segfx starting");
    tracing::info!("Image: {}", args.image.display());
    tracing::info!(
        "Instances: {}, separate={}, mask_only={}, smooth_edges={}",
        args.masks.len(),
        args.separate,
        args.mask_only,
        args.smooth_edges
    );

    let original = image::open(&args.image)
        .with_context(|| format!("Failed to open {}", args.image.display()))?
        .to_rgba8();

    // Work at a resolution the mask resampler can reach
    let (width, height) = original.dimensions();
    let (work_width, work_height) = working_size(width, height);
    let frame = if (work_width, work_height) != (width, height) {
        tracing::info!(
            "Reducing {}x{} image to {}x{} working resolution",
            width,
            height,
            work_width,
            work_height
        );
        imageops::resize(
            &original,
            work_width,
            work_height,
            imageops::FilterType::Lanczos3,
        )
    } else {
        original
    };

    let config = PostprocessConfig {
        smooth_edges: args.smooth_edges,
        smooth_kernel: args.smooth_kernel,
        ..PostprocessConfig::default()
    };
    let mut segmenter = segmentation::create_file_segmenter(args.masks.clone(), config)
        .context("Failed to initialize segmenter")?;

    let stem = args
        .image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let mut sink = PngDirectorySink::new(&args.output_dir, stem)
        .context("Failed to initialize output")?;

    let options = CompositeOptions {
        separate_output: args.separate,
        mask_only: args.mask_only,
    };

    run_pipeline(segmenter.as_mut(), &frame, options, args.preview, &mut sink)?;

    tracing::info!("Done");
    Ok(())
}

fn run_pipeline<O>(
    segmenter: &mut dyn InstanceSegmenter,
    frame: &RgbaImage,
    options: CompositeOptions,
    preview: Option<(u32, u32)>,
    sink: &mut O,
) -> Result<()>
where
    O: OutputSink,
{
    let (frame_width, frame_height) = frame.dimensions();

    let outcome = segmenter.segment(frame);

    if let Some((surface_width, surface_height)) = preview {
        let mut renderer = OverlayRenderer::new(surface_width, surface_height);
        renderer.on_inference(outcome.clone(), frame_width, frame_height);

        let mut surface = imageops::resize(
            frame,
            surface_width,
            surface_height,
            imageops::FilterType::Triangle,
        );
        renderer
            .draw(&mut surface)
            .context("Failed to draw preview overlay")?;
        sink.write_preview(&surface)
            .context("Failed to write preview")?;
    }

    let batch = outcome.context("Failed to segment frame")?;
    tracing::info!(
        "Segmentation: {} instance(s), inference={:.1}ms, post={:.1}ms",
        batch.len(),
        batch.timings.inference.as_secs_f64() * 1000.0,
        batch.timings.post_process.as_secs_f64() * 1000.0
    );

    let compose_start = Instant::now();
    let mut compositor = MaskCompositor::new();
    let outputs = compositor
        .compose(frame, &batch, options)
        .context("Failed to compose outputs")?;
    tracing::info!(
        "Composed {} output(s) in {:.1}ms",
        outputs.len(),
        compose_start.elapsed().as_secs_f64() * 1000.0
    );

    for (index, pair) in outputs.iter().enumerate() {
        sink.write_pair(index, pair)
            .with_context(|| format!("Failed to write output {}", index))?;
    }

    Ok(())
}
