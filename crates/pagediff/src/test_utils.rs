//! Shared test utilities for image-based unit tests.
//!
//! Consolidated here to avoid per-module copies of the synthetic image
//! builders used across the alignment, scoring and detection tests.

use image::{GrayImage, Luma, Rgb, RgbImage};
use rand::prelude::*;

/// Solid-color RGB canvas.
pub(crate) fn solid_rgb(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(color))
}

/// Fill a rectangle of an RGB image, clipped to bounds.
pub(crate) fn fill_rect_rgb(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
    for yy in y..(y + h).min(img.height()) {
        for xx in x..(x + w).min(img.width()) {
            img.put_pixel(xx, yy, Rgb(color));
        }
    }
}

/// Fill a rectangle of a grayscale image, clipped to bounds.
pub(crate) fn fill_rect_gray(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
    for yy in y..(y + h).min(img.height()) {
        for xx in x..(x + w).min(img.width()) {
            img.put_pixel(xx, yy, Luma([value]));
        }
    }
}

/// Fill a rectangle with seeded random grayscale noise — textured enough
/// for corner detection, reproducible across runs.
pub(crate) fn noise_block(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for yy in y..(y + h).min(img.height()) {
        for xx in x..(x + w).min(img.width()) {
            img.put_pixel(xx, yy, Luma([rng.gen::<u8>()]));
        }
    }
}

/// RGB variant of [`noise_block`]; gray noise so all channels agree.
pub(crate) fn noise_block_rgb(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for yy in y..(y + h).min(img.height()) {
        for xx in x..(x + w).min(img.width()) {
            let v = rng.gen::<u8>();
            img.put_pixel(xx, yy, Rgb([v, v, v]));
        }
    }
}
