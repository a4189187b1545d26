use super::{Corners, Region};

/// Where a decoded code was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodeSource {
    /// Whole-frame decode attempt, no region involved
    Direct,
    /// Decoded from the crop of this (expanded) region
    Region(Region),
}

/// A code returned by the decoder, in full-image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCode {
    /// Decoded payload text
    pub payload: String,
    /// Code corners relative to the full image
    pub corners: Corners,
    /// What produced the crop that decoded
    pub source: CodeSource,
    /// Region confidence, or 1.0 for a direct hit
    pub confidence: f32,
}

impl DecodedCode {
    /// The region this code was cropped from, if any
    pub fn source_region(&self) -> Option<&Region> {
        match &self.source {
            CodeSource::Region(region) => Some(region),
            CodeSource::Direct => None,
        }
    }
}
