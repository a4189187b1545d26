//! Error types
//!
//! Scoring and geometry never fail; degenerate input yields zero scores or
//! empty region lists. Errors only surface at the edges: buffer construction,
//! configuration, the external decoder and the live frame source.

use thiserror::Error;

/// Pixel buffer does not match its declared shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Buffer length disagrees with `width * height * channels`
    #[error("invalid buffer size: expected {expected} bytes, got {actual}")]
    BufferSize {
        /// Required length
        expected: usize,
        /// Provided length
        actual: usize,
    },
    /// Channel count other than 1, 3 or 4
    #[error("unsupported channel count {0}")]
    Channels(usize),
}

/// Rejected configuration value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Grid must have at least one cell per axis
    #[error("grid size must be at least 1, got {0}")]
    GridSize(usize),
    /// Scale list is empty or contains a value outside (0, 1]
    #[error("scale factors must be non-empty and within (0, 1], got {0:?}")]
    Scales(Vec<f32>),
    /// Fraction or threshold outside its allowed range
    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Field name
        name: &'static str,
        /// Provided value
        value: f64,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },
    /// Scan interval or history window of zero
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    /// Unknown scan strategy name
    #[error("unknown scan strategy {0:?} (expected \"heuristic\" or \"direct\")")]
    Strategy(String),
    /// Unknown sub-frame set name
    #[error("unknown sub-frame set {0:?} (expected off, quadrants or center-top)")]
    Subframes(String),
}

/// Failure reported by the external decode capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode failed: {0}")]
pub struct DecodeError(pub String);

/// Live frame source could not deliver a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source was closed or disconnected
    #[error("frame source unavailable: {0}")]
    Unavailable(String),
    /// A frame arrived but could not be turned into a luminance buffer
    #[error("bad frame: {0}")]
    Frame(#[from] ImageError),
}

/// Top-level error for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    /// See [`ImageError`]
    #[error(transparent)]
    Image(#[from] ImageError),
    /// See [`ConfigError`]
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`DecodeError`]
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`SourceError`]
    #[error(transparent)]
    Source(#[from] SourceError),
    /// `start` was called on a scheduler that is already running
    #[error("scan loop already running")]
    AlreadyRunning,
    /// The worker thread could not be spawned
    #[error("failed to spawn scan worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ImageError::BufferSize {
            expected: 12,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "invalid buffer size: expected 12 bytes, got 10"
        );

        let scan: ScanError = SourceError::Unavailable("camera closed".into()).into();
        assert_eq!(scan.to_string(), "frame source unavailable: camera closed");
    }
}
