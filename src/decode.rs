//! Decoder seam
//!
//! The pipeline only needs "luma buffer in, payload and corners out", so the
//! backing decoder is a trait. Plain closures implement it, which keeps tests
//! free of any real decoding library. With the `rqrr` feature enabled,
//! [`RqrrDecoder`] wraps the rqrr crate.

use crate::error::DecodeError;
use crate::models::Corners;

/// A payload read from a buffer, with corners in that buffer's coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RawCode {
    /// Decoded text
    pub payload: String,
    /// Code outline, clockwise from top-left
    pub corners: Corners,
}

impl RawCode {
    /// Create a raw result
    pub fn new(payload: impl Into<String>, corners: Corners) -> Self {
        Self {
            payload: payload.into(),
            corners,
        }
    }
}

/// Something that can read a code out of a luminance buffer
///
/// `Ok(None)` means nothing was found. `Err` is reserved for a decoder that
/// found a symbol and failed on it, or failed internally; the scanner logs it
/// and moves on to the next region.
pub trait Decoder {
    /// Attempt to decode one code from a `width x height` row-major buffer
    fn decode(
        &self,
        luma: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Option<RawCode>, DecodeError>;
}

impl<F> Decoder for F
where
    F: Fn(&[u8], usize, usize) -> Result<Option<RawCode>, DecodeError>,
{
    fn decode(
        &self,
        luma: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Option<RawCode>, DecodeError> {
        self(luma, width, height)
    }
}

/// Decoder backed by rqrr
#[cfg(feature = "rqrr")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

#[cfg(feature = "rqrr")]
impl RqrrDecoder {
    /// Create the decoder
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "rqrr")]
impl Decoder for RqrrDecoder {
    fn decode(
        &self,
        luma: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Option<RawCode>, DecodeError> {
        use crate::models::Point;

        if width == 0 || height == 0 || luma.len() < width * height {
            return Ok(None);
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| luma[y * width + x]);
        let grids = prepared.detect_grids();

        let mut last_err = None;
        for grid in &grids {
            match grid.decode() {
                Ok((_meta, content)) => {
                    let pts = grid.bounds.map(|p| Point::new(p.x as f32, p.y as f32));
                    return Ok(Some(RawCode::new(content, Corners::from_clockwise(pts))));
                }
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) => Err(DecodeError(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    #[test]
    fn test_closure_decoder() {
        let dec = |luma: &[u8], w: usize, _h: usize| -> Result<Option<RawCode>, DecodeError> {
            if luma.first() == Some(&0) {
                let c = Corners::from_clockwise([
                    Point::new(0.0, 0.0),
                    Point::new(w as f32, 0.0),
                    Point::new(w as f32, w as f32),
                    Point::new(0.0, w as f32),
                ]);
                Ok(Some(RawCode::new("hit", c)))
            } else {
                Ok(None)
            }
        };
        assert_eq!(dec.decode(&[0, 1, 2, 3], 2, 2).unwrap().unwrap().payload, "hit");
        assert!(dec.decode(&[9, 1, 2, 3], 2, 2).unwrap().is_none());
    }

    #[cfg(feature = "rqrr")]
    #[test]
    fn test_rqrr_blank_frame() {
        let luma = vec![255u8; 64 * 64];
        assert_eq!(RqrrDecoder::new().decode(&luma, 64, 64), Ok(None));
        assert_eq!(RqrrDecoder::new().decode(&[], 0, 0), Ok(None));
    }
}
