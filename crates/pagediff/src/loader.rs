//! Image loading and normalization.
//!
//! Captures arrive as PNG in whatever channel layout the capture tool
//! produced (RGBA, RGB or grayscale). Everything downstream assumes a fully
//! opaque 3-channel buffer, so transparency is composited over a white page
//! background here and never reappears.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::CompareError;

/// Load a PNG and normalize it to an opaque RGB buffer.
///
/// Alpha is composited over white: `out = fg * a + 255 * (1 - a)` per
/// channel. Grayscale inputs are expanded to three channels. No resizing
/// is performed.
pub fn load_rgb(path: &Path) -> Result<RgbImage, CompareError> {
    let decoded = image::open(path).map_err(|source| CompareError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = normalize_rgb(decoded);
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(CompareError::EmptyInput {
            width: rgb.width(),
            height: rgb.height(),
        });
    }
    Ok(rgb)
}

/// Flatten any decoded image to opaque RGB, compositing alpha over white.
pub fn normalize_rgb(decoded: DynamicImage) -> RgbImage {
    match decoded {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other if other.color().has_alpha() => composite_over_white(&other.to_rgba8()),
        other => other.to_rgb8(),
    }
}

fn composite_over_white(rgba: &image::RgbaImage) -> RgbImage {
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let a = src[3] as f32 / 255.0;
        for c in 0..3 {
            let fg = src[c] as f32;
            dst[c] = (fg * a + 255.0 * (1.0 - a)).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
