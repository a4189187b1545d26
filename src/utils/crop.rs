/// Sub-image extraction
use crate::models::{LumaImage, Rect};

/// Copy the pixels under `rect` into a new image
///
/// The rectangle is clipped to the source bounds first, so the result may be
/// smaller than requested (or empty).
pub fn crop(image: &LumaImage, rect: &Rect) -> LumaImage {
    let r = rect.clip(image.width(), image.height());
    let mut data = Vec::with_capacity(r.area());
    let src = image.data();
    for y in r.y..r.bottom() {
        let start = y * image.width() + r.x;
        data.extend_from_slice(&src[start..start + r.width]);
    }
    // Length matches by construction
    LumaImage::new(r.width, r.height, data).unwrap_or_else(|_| LumaImage::filled(0, 0, 0))
}
