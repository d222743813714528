//! Rendering of comparison artifacts.
//!
//! Produces the false-color heatmap, the red-wash overlay and per-region
//! crops. The overlay wash is masked to the retained regions' boxes, not
//! the whole diff map, so filtered-out noise never shows up as an "issue".

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::regions::RegionBox;

/// Overlay wash opacity inside highlighted pixels.
const WASH_ALPHA: f32 = 0.35;

/// Border thickness of the region rectangles, in pixels.
const BORDER_PX: u32 = 2;

/// Padding around per-region crops, in pixels.
pub(crate) const CROP_PAD: u32 = 10;

/// Jet-style false-color rendering of the dissimilarity map.
pub fn render_heatmap(dissim: &GrayImage) -> RgbImage {
    let (w, h) = dissim.dimensions();
    let mut out = RgbImage::new(w, h);
    for (src, dst) in dissim.pixels().zip(out.pixels_mut()) {
        *dst = jet(src[0]);
    }
    out
}

/// Highlight mask: dissimilarity above the cutoff, restricted to the union
/// of the retained regions' boxes. Also returns the number of set pixels,
/// which is the numerator of the reported change ratio.
pub fn highlight_mask(dissim: &GrayImage, regions: &[RegionBox], cutoff: u8) -> (GrayImage, u64) {
    let (w, h) = dissim.dimensions();
    let mut mask = GrayImage::new(w, h);
    let mut count = 0u64;
    for region in regions {
        let x1 = (region.x + region.w).min(w);
        let y1 = (region.y + region.h).min(h);
        for y in region.y..y1 {
            for x in region.x..x1 {
                if dissim.get_pixel(x, y)[0] > cutoff && mask.get_pixel(x, y)[0] == 0 {
                    mask.put_pixel(x, y, image::Luma([255]));
                    count += 1;
                }
            }
        }
    }
    (mask, count)
}

/// Overlay: aligned candidate with a semi-transparent red wash inside the
/// highlight mask, plus a red border around each retained region.
pub fn render_overlay(aligned: &RgbImage, mask: &GrayImage, regions: &[RegionBox]) -> RgbImage {
    let mut out = aligned.clone();
    for (dst, m) in out.pixels_mut().zip(mask.pixels()) {
        if m[0] > 0 {
            dst[0] = blend(dst[0], 255, WASH_ALPHA);
            dst[1] = blend(dst[1], 0, WASH_ALPHA);
            dst[2] = blend(dst[2], 0, WASH_ALPHA);
        }
    }
    for region in regions {
        draw_region_border(&mut out, region);
    }
    out
}

/// Padded crop of one region from the clean aligned candidate, clipped to
/// the image bounds.
pub fn region_crop(aligned: &RgbImage, region: &RegionBox) -> RgbImage {
    let (w, h) = aligned.dimensions();
    let x0 = region.x.saturating_sub(CROP_PAD);
    let y0 = region.y.saturating_sub(CROP_PAD);
    let x1 = (region.x + region.w + CROP_PAD).min(w);
    let y1 = (region.y + region.h + CROP_PAD).min(h);
    image::imageops::crop_imm(aligned, x0, y0, x1 - x0, y1 - y0).to_image()
}

#[inline]
fn blend(base: u8, tint: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + tint as f32 * alpha).round() as u8
}

fn draw_region_border(canvas: &mut RgbImage, region: &RegionBox) {
    let red = Rgb([255u8, 0, 0]);
    for i in 0..BORDER_PX {
        if region.w <= 2 * i || region.h <= 2 * i {
            break;
        }
        let rect = Rect::at((region.x + i) as i32, (region.y + i) as i32)
            .of_size(region.w - 2 * i, region.h - 2 * i);
        draw_hollow_rect_mut(canvas, rect, red);
    }
}

/// Piecewise-linear jet ramp: dark blue → cyan → yellow → red.
fn jet(v: u8) -> Rgb<u8> {
    let t = v as f32 / 255.0;
    let r = (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0);
    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}
