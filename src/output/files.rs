use super::OutputSink;
use crate::render::OutputImagePair;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Writes outputs as PNG files into a directory
///
/// Files are named `<stem>_<index>_base.png`, `<stem>_<index>_overlay.png`
/// and `<stem>_<index>_composite.png`; the preview is `<stem>_preview.png`.
pub struct PngDirectorySink {
    dir: PathBuf,
    stem: String,
    written: Vec<PathBuf>,
}

impl PngDirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P, stem: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        tracing::info!("Writing outputs to {}", dir.display());

        Ok(Self {
            dir,
            stem: stem.into(),
            written: Vec::new(),
        })
    }

    /// Every file written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, name: String, image: &RgbaImage) -> Result<()> {
        let path = self.dir.join(name);
        image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

impl OutputSink for PngDirectorySink {
    fn write_pair(&mut self, index: usize, pair: &OutputImagePair<'_>) -> Result<()> {
        self.save(format!("{}_{}_base.png", self.stem, index), &pair.base)?;

        if let Some(overlay) = &pair.overlay {
            self.save(format!("{}_{}_overlay.png", self.stem, index), overlay)?;
        }

        let composite = pair.flatten().context("Failed to flatten output")?;
        self.save(format!("{}_{}_composite.png", self.stem, index), &composite)
    }

    fn write_preview(&mut self, surface: &RgbaImage) -> Result<()> {
        self.save(format!("{}_preview.png", self.stem), surface)
    }
}
