//! Post-processing for instance segmentation output.
//!
//! Binary masks from a segmenter are resampled and smoothed
//! ([`segmentation`]), then rendered either as still images in one of four
//! output modes ([`render::MaskCompositor`]) or painted live onto a preview
//! surface ([`render::OverlayRenderer`]).

pub mod error;
pub mod output;
pub mod render;
pub mod segmentation;

pub use error::{Error, Result};
