//! qr_scout - candidate-region detection and adaptive scan pacing for QR codes
//!
//! A fixed-grid heuristic search scores square windows for finder markers,
//! quiet zone and data variation, keeps the best of each overlapping cluster,
//! and pads the survivors so an external decoder gets a little context. When
//! the search is off or finds nothing, a fixed overlapping tiling takes over.
//! For live sources, a scheduler paces scan cycles and watches their cost.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Detector and scan configuration, with environment overrides
pub mod config;
/// Decoder seam and the rqrr-backed implementation
pub mod decode;
/// Candidate detection stages (scoring, grid search, suppression, expansion, fallback)
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (Rect, Region, LumaImage, DecodedCode, etc.)
pub mod models;
/// Detection and full scan pipelines
pub mod pipeline;
/// Live scan scheduling
pub mod scheduler;
/// Image loading, statistics and file-backed frame sources
pub mod tools;
/// Utility functions (grayscale, contrast, cropping)
pub mod utils;

pub use config::{DetectorConfig, ScanConfig, ScanStrategy, SubframeSet};
#[cfg(feature = "rqrr")]
pub use decode::RqrrDecoder;
pub use decode::{Decoder, RawCode};
pub use error::{ConfigError, DecodeError, ImageError, ScanError, SourceError};
pub use models::{
    CodeSource, ColorImage, Corners, DecodedCode, LumaImage, Point, Rect, Region, RegionKind,
};
pub use pipeline::{Detection, RegionDetector, ScanReport, Scanner};
pub use scheduler::{
    AdjustmentPolicy, Backoff, FrameSource, MonitorOnly, ScanLoop, ScanScheduleState,
};

/// Detect candidate regions in an RGBA image with default settings
///
/// # Arguments
/// * `rgba` - Raw RGBA bytes (4 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// Expanded regions, highest confidence first, or an error if the buffer
/// length does not match the dimensions
pub fn detect_regions(rgba: &[u8], width: usize, height: usize) -> Result<Vec<Region>, ImageError> {
    let color = ColorImage::rgba(width, height, rgba.to_vec())?;
    Ok(RegionDetector::default().detect_color(&color).regions)
}

/// Detect candidate regions in a luminance buffer with default settings
pub fn detect_regions_from_grayscale(
    gray: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<Region>, ImageError> {
    let luma = LumaImage::new(width, height, gray.to_vec())?;
    Ok(RegionDetector::default().detect(&luma).regions)
}
