//! Candidate-region detection
//!
//! This module contains the stages that turn a luminance buffer into a short
//! list of regions worth handing to a decoder:
//! - Pattern scoring (finder corners, quiet zone, data variation)
//! - Fixed-grid window search
//! - Non-maximum suppression
//! - Region expansion
//! - Fallback tiling when the search is off or finds nothing

/// Fixed overlapping tiles for the degraded mode
pub mod fallback;
/// Outward padding clamped to image bounds
pub mod expand;
/// Grid search over cells, scales and window positions
pub mod grid;
/// IoU and greedy suppression
pub mod nms;
/// Heuristic confidence for one rectangle
pub mod scorer;
