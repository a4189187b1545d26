use crate::error::ImageError;
use crate::utils::grayscale::{rgb_to_grayscale, rgba_to_grayscale};

/// Single-channel luminance buffer, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl LumaImage {
    /// Wrap a luminance buffer, checking its length
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(ImageError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image filled with a single value
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Reduce a color (or already gray) image to luminance
    pub fn from_color(color: &ColorImage) -> Self {
        let data = match color.channels {
            4 => rgba_to_grayscale(&color.data, color.width, color.height),
            3 => rgb_to_grayscale(&color.data, color.width, color.height),
            _ => color.data.clone(),
        };
        Self {
            width: color.width,
            height: color.height,
            data,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw pixels
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw pixels
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel at (x, y); caller guarantees bounds
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Pixel at signed coordinates, `None` outside the image
    #[inline]
    pub fn get_checked(&self, x: isize, y: isize) -> Option<u8> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.width + x as usize])
    }

    /// Set pixel at (x, y)
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }
}

/// Interleaved color buffer (3 or 4 channels) or a 1-channel passthrough
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl ColorImage {
    /// Wrap an interleaved buffer, checking channel count and length
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(ImageError::Channels(channels));
        }
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(ImageError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// RGBA buffer, 4 bytes per pixel
    pub fn rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        Self::new(width, height, 4, data)
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw interleaved bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
