/// Luminance reduction for color frames
/// Y = 0.299*R + 0.587*G + 0.114*B
/// Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
///
/// Every variant produces identical output; the parallel ones split work by
/// rows with rayon and the `_with_buffer` ones write into caller memory.
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline(always)]
fn luma(px: &[u8]) -> u8 {
    let lum = (COEF_R * px[0] as u32 + COEF_G * px[1] as u32 + COEF_B * px[2] as u32) >> 8;
    lum.min(255) as u8
}

fn convert_into(src: &[u8], channels: usize, out: &mut [u8]) {
    // 8-wide unroll keeps the inner loop free of bounds checks
    let mut src_chunks = src.chunks_exact(channels * 8);
    let mut out_chunks = out.chunks_exact_mut(8);
    for (block, dst) in (&mut src_chunks).zip(&mut out_chunks) {
        for (j, d) in dst.iter_mut().enumerate() {
            *d = luma(&block[j * channels..]);
        }
    }
    let tail = out_chunks.into_remainder().len();
    let done = out.len() - tail;
    for (i, px) in src[done * channels..].chunks_exact(channels).enumerate() {
        out[done + i] = luma(px);
    }
}

/// Convert RGB image to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    rgb_to_grayscale_with_buffer(rgb, width, height, &mut gray);
    gray
}

/// Convert RGBA image to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    rgba_to_grayscale_with_buffer(rgba, width, height, &mut gray);
    gray
}

/// Convert RGB to grayscale using a pre-allocated buffer (no allocation)
///
/// # Arguments
/// * `rgb` - Input RGB image data
/// * `width` - Image width
/// * `height` - Image height
/// * `output` - Pre-allocated output buffer (must have length >= width * height)
///
/// # Returns
/// Number of pixels written (width * height)
pub fn rgb_to_grayscale_with_buffer(
    rgb: &[u8],
    width: usize,
    height: usize,
    output: &mut [u8],
) -> usize {
    let pixel_count = width * height;
    assert!(output.len() >= pixel_count, "Output buffer too small");
    assert!(rgb.len() >= pixel_count * 3, "Input buffer too small");
    convert_into(&rgb[..pixel_count * 3], 3, &mut output[..pixel_count]);
    pixel_count
}

/// Convert RGBA to grayscale using a pre-allocated buffer (no allocation)
pub fn rgba_to_grayscale_with_buffer(
    rgba: &[u8],
    width: usize,
    height: usize,
    output: &mut [u8],
) -> usize {
    let pixel_count = width * height;
    assert!(output.len() >= pixel_count, "Output buffer too small");
    assert!(rgba.len() >= pixel_count * 4, "Input buffer too small");
    convert_into(&rgba[..pixel_count * 4], 4, &mut output[..pixel_count]);
    pixel_count
}

// ============== Parallel Processing with Rayon ==============

fn convert_parallel(src: &[u8], channels: usize, width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    // Process rows in parallel
    gray.par_chunks_mut(width)
        .zip(src.par_chunks(width * channels))
        .for_each(|(row, src_row)| convert_into(src_row, channels, row));

    gray
}

/// Convert RGB to grayscale using parallel processing
/// Processes rows in parallel for multi-core speedup
pub fn rgb_to_grayscale_parallel(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_parallel(&rgb[..width * height * 3], 3, width, height)
}

/// Convert RGBA to grayscale using parallel processing
pub fn rgba_to_grayscale_parallel(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_parallel(&rgba[..width * height * 4], 4, width, height)
}
