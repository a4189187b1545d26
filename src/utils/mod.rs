//! Utility functions for image processing
//!
//! This module provides the buffer helpers the region pipeline needs:
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Contrast enhancement (applied to crops before decoding)
//! - Cropping (extracting a candidate region for the decoder)

pub mod contrast;
pub mod crop;
pub mod grayscale;
