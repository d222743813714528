//! Common-area cropping.
//!
//! When a component-level capture is aligned against a full-page reference,
//! the warp leaves empty canvas around the projected content. Comparing
//! that padding against real content would flood the diff with false
//! regions, so both images are restricted to the intersection of the
//! projected candidate bounds with the reference bounds.

use image::imageops::crop_imm;
use image::RgbImage;

use crate::align::SimilarityTransform;

/// Crop both images to the true overlapping area.
///
/// Projects the corners of the original (pre-warp) candidate through the
/// transform, intersects the resulting bounding box with the reference
/// bounds, and crops both images to it. Falls back to the full images
/// (clipped to common dimensions) when the transform is absent or the box
/// degenerates.
pub fn crop_common(
    reference: &RgbImage,
    aligned: &RgbImage,
    transform: Option<&SimilarityTransform>,
    candidate_dims: (u32, u32),
) -> (RgbImage, RgbImage) {
    if let Some(t) = transform {
        let (cw, ch) = (candidate_dims.0 as f64, candidate_dims.1 as f64);
        let corners = [[0.0, 0.0], [cw, 0.0], [cw, ch], [0.0, ch]];
        let projected: Vec<[f64; 2]> = corners.iter().map(|&c| t.apply(c)).collect();

        let x_min = projected.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        let y_min = projected.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
        let x_max = projected.iter().map(|p| p[0]).fold(f64::NEG_INFINITY, f64::max);
        let y_max = projected.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max);

        let x0 = (x_min.floor().max(0.0)) as u32;
        let y0 = (y_min.floor().max(0.0)) as u32;
        let x1 = (x_max.ceil() as i64).clamp(0, reference.width() as i64) as u32;
        let y1 = (y_max.ceil() as i64).clamp(0, reference.height() as i64) as u32;

        if x1 > x0 && y1 > y0 {
            let w = x1 - x0;
            let h = y1 - y0;
            let ref_crop = crop_imm(reference, x0, y0, w, h).to_image();
            let aligned_crop = crop_imm(aligned, x0, y0, w, h).to_image();
            return clip_to_common(ref_crop, aligned_crop);
        }
        tracing::debug!("projected candidate bounds degenerate, keeping full images");
    }
    clip_to_common(reference.clone(), aligned.clone())
}

/// Clip both images to their shared min dimensions. Redundant after a valid
/// crop, but keeps downstream dimension invariants unconditional.
fn clip_to_common(a: RgbImage, b: RgbImage) -> (RgbImage, RgbImage) {
    let w = a.width().min(b.width());
    let h = a.height().min(b.height());
    if a.dimensions() == (w, h) && b.dimensions() == (w, h) {
        return (a, b);
    }
    (
        crop_imm(&a, 0, 0, w, h).to_image(),
        crop_imm(&b, 0, 0, w, h).to_image(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::solid_rgb;

    #[test]
    fn no_transform_keeps_full_common_area() {
        let reference = solid_rgb(100, 80, [255, 255, 255]);
        let aligned = solid_rgb(100, 80, [0, 0, 0]);
        let (r, a) = crop_common(&reference, &aligned, None, (100, 80));
        assert_eq!(r.dimensions(), (100, 80));
        assert_eq!(a.dimensions(), (100, 80));
    }

    #[test]
    fn small_candidate_restricts_comparison_to_its_projection() {
        let reference = solid_rgb(200, 100, [255, 255, 255]);
        let aligned = solid_rgb(200, 100, [255, 255, 255]);
        // Candidate is a 60x40 component landing at (10, 20) in reference space.
        let t = SimilarityTransform {
            scale: 1.0,
            tx: 10.0,
            ty: 20.0,
        };
        let (r, a) = crop_common(&reference, &aligned, Some(&t), (60, 40));
        assert_eq!(r.dimensions(), (60, 40));
        assert_eq!(a.dimensions(), (60, 40));
    }

    #[test]
    fn projection_is_clipped_to_reference_bounds() {
        let reference = solid_rgb(100, 100, [255, 255, 255]);
        let aligned = solid_rgb(100, 100, [255, 255, 255]);
        // Candidate extends past the right/bottom edge of the reference.
        let t = SimilarityTransform {
            scale: 1.0,
            tx: 60.0,
            ty: 70.0,
        };
        let (r, _) = crop_common(&reference, &aligned, Some(&t), (100, 100));
        assert_eq!(r.dimensions(), (40, 30));
    }

    #[test]
    fn fully_off_canvas_projection_falls_back_to_full_images() {
        let reference = solid_rgb(50, 50, [255, 255, 255]);
        let aligned = solid_rgb(50, 50, [255, 255, 255]);
        let t = SimilarityTransform {
            scale: 1.0,
            tx: 500.0,
            ty: 500.0,
        };
        let (r, a) = crop_common(&reference, &aligned, Some(&t), (50, 50));
        assert_eq!(r.dimensions(), (50, 50));
        assert_eq!(a.dimensions(), (50, 50));
    }

    #[test]
    fn mismatched_inputs_clip_to_shared_dims() {
        let reference = solid_rgb(90, 60, [255, 255, 255]);
        let aligned = solid_rgb(80, 70, [255, 255, 255]);
        let (r, a) = crop_common(&reference, &aligned, None, (80, 70));
        assert_eq!(r.dimensions(), (80, 60));
        assert_eq!(a.dimensions(), (80, 60));
    }
}
