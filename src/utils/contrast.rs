/// Linear contrast stretch around mid-gray
use crate::models::LumaImage;

/// Return a copy with contrast scaled by `factor`
///
/// Each value becomes `(factor - 1) * 128 + factor * v`, clamped to [0, 255].
/// `factor` of 1.0 is the identity. The source buffer is left untouched so
/// it can still be shared by other consumers.
pub fn enhance_contrast(image: &LumaImage, factor: f32) -> LumaImage {
    let mut out = image.clone();
    enhance_contrast_in_place(out.data_mut(), factor);
    out
}

/// In-place variant for buffers the caller already owns
pub fn enhance_contrast_in_place(data: &mut [u8], factor: f32) {
    if !factor.is_finite() {
        return;
    }
    let offset = (factor - 1.0) * 128.0;
    let lut: [u8; 256] =
        std::array::from_fn(|v| (offset + factor * v as f32).clamp(0.0, 255.0) as u8);
    for v in data.iter_mut() {
        *v = lut[*v as usize];
    }
}
