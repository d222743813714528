//! Geometric alignment of a candidate capture to its reference.
//!
//! Pipeline: grayscale → multi-scale binary features → ratio-test matching
//! → RANSAC similarity fit → plausibility gates → axis-aligned warp.
//!
//! Web captures of the same page are never rotated, so the accepted model
//! is scale + translation only: the estimator may use rotation to explain
//! correspondences, but the rotational term is zeroed before warping.
//! Every degenerate path (few keypoints, few matches, failed or implausible
//! fit) silently falls back to a plain bilinear resize — a comparison must
//! always produce a result, even for low-texture captures.

mod estimate;
mod features;
mod matcher;

pub use estimate::RansacConfig;
pub use features::FeatureConfig;

pub(crate) use features::detect_and_describe;
pub(crate) use matcher::match_descriptors;

use image::imageops::{grayscale, resize, FilterType};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// Alignment configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AlignConfig {
    /// Feature detection controls.
    pub features: FeatureConfig,
    /// Lowe ratio-test threshold.
    pub ratio: f32,
    /// Minimum keypoints per image before matching is attempted.
    pub min_keypoints: usize,
    /// Minimum ratio-test survivors before estimation is attempted.
    pub min_matches: usize,
    /// RANSAC similarity fitting controls.
    pub ransac: RansacConfig,
    /// Minimum plausible decomposed scale.
    pub scale_min: f64,
    /// Maximum plausible decomposed scale.
    pub scale_max: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            ratio: 0.75,
            min_keypoints: 10,
            min_matches: 8,
            ransac: RansacConfig::default(),
            scale_min: 0.9,
            scale_max: 1.1,
        }
    }
}

/// Accepted candidate→reference mapping: axis-aligned uniform scale plus
/// translation (rotation already forced to zero).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimilarityTransform {
    /// Uniform scale factor.
    pub scale: f64,
    /// Translation x in reference pixels.
    pub tx: f64,
    /// Translation y in reference pixels.
    pub ty: f64,
}

impl SimilarityTransform {
    /// Map a candidate-frame point into the reference frame.
    #[inline]
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [self.scale * p[0] + self.tx, self.scale * p[1] + self.ty]
    }

    /// Row-major 2×3 matrix form for serialization.
    pub fn to_rows(&self) -> [[f64; 3]; 2] {
        [[self.scale, 0.0, self.tx], [0.0, self.scale, self.ty]]
    }
}

/// Align `candidate` into `reference`'s pixel grid.
///
/// Returns the aligned image at exactly the reference dimensions, plus the
/// accepted transform, or `None` when any fallback path resized instead.
pub fn align(
    reference: &RgbImage,
    candidate: &RgbImage,
    config: &AlignConfig,
) -> (RgbImage, Option<SimilarityTransform>) {
    let ref_gray = grayscale(reference);
    let cand_gray = grayscale(candidate);

    let (ref_kps, ref_descs) = detect_and_describe(&ref_gray, &config.features);
    let (cand_kps, cand_descs) = detect_and_describe(&cand_gray, &config.features);

    if ref_kps.len() < config.min_keypoints || cand_kps.len() < config.min_keypoints {
        tracing::debug!(
            reference_keypoints = ref_kps.len(),
            candidate_keypoints = cand_kps.len(),
            "too few keypoints, falling back to resize alignment"
        );
        return (naive_resize(candidate, reference.dimensions()), None);
    }

    let matches = match_descriptors(&ref_descs, &cand_descs, config.ratio);
    if matches.len() < config.min_matches {
        tracing::debug!(matches = matches.len(), "too few good matches, falling back to resize alignment");
        return (naive_resize(candidate, reference.dimensions()), None);
    }
    let mean_distance =
        matches.iter().map(|m| m.distance as f64).sum::<f64>() / matches.len() as f64;
    tracing::debug!(matches = matches.len(), mean_distance, "descriptor matching finished");

    // Estimate candidate→reference, so src points come from the candidate.
    let src: Vec<[f64; 2]> = matches.iter().map(|m| [cand_kps[m.train].x, cand_kps[m.train].y]).collect();
    let dst: Vec<[f64; 2]> = matches.iter().map(|m| [ref_kps[m.query].x, ref_kps[m.query].y]).collect();

    let Some(model) = estimate::estimate_similarity_ransac(&src, &dst, &config.ransac) else {
        tracing::debug!("similarity estimation failed, falling back to resize alignment");
        return (naive_resize(candidate, reference.dimensions()), None);
    };

    let (sx, sy) = model.row_scales();
    let scale = 0.5 * (sx + sy);
    if !(config.scale_min..=config.scale_max).contains(&scale) {
        tracing::debug!(scale, "implausible scale, falling back to resize alignment");
        return (naive_resize(candidate, reference.dimensions()), None);
    }

    // Zero the rotation term: keep the decomposed scale and the raw
    // translation only.
    let transform = SimilarityTransform {
        scale,
        tx: model.tx,
        ty: model.ty,
    };

    let aligned = warp_to_reference(candidate, reference.dimensions(), &transform);
    (aligned, Some(transform))
}

/// Bilinear-resize fallback to the reference's exact dimensions.
pub(crate) fn naive_resize(candidate: &RgbImage, (w, h): (u32, u32)) -> RgbImage {
    if candidate.dimensions() == (w, h) {
        candidate.clone()
    } else {
        resize(candidate, w, h, FilterType::Triangle)
    }
}

fn warp_to_reference(candidate: &RgbImage, (w, h): (u32, u32), t: &SimilarityTransform) -> RgbImage {
    let matrix = [
        t.scale as f32,
        0.0,
        t.tx as f32,
        0.0,
        t.scale as f32,
        t.ty as f32,
        0.0,
        0.0,
        1.0,
    ];
    let Some(projection) = Projection::from_matrix(matrix) else {
        return naive_resize(candidate, (w, h));
    };
    let mut canvas = RgbImage::new(w, h);
    warp_into(candidate, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut canvas);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{noise_block_rgb, solid_rgb};
    use approx::assert_relative_eq;

    #[test]
    fn blank_images_fall_back_to_resize() {
        let reference = solid_rgb(100, 80, [255, 255, 255]);
        let candidate = solid_rgb(50, 40, [255, 255, 255]);
        let (aligned, transform) = align(&reference, &candidate, &AlignConfig::default());
        assert_eq!(aligned.dimensions(), (100, 80));
        assert!(transform.is_none());
    }

    #[test]
    fn same_size_blank_fallback_is_a_copy() {
        let reference = solid_rgb(64, 64, [255, 255, 255]);
        let candidate = solid_rgb(64, 64, [10, 20, 30]);
        let (aligned, transform) = align(&reference, &candidate, &AlignConfig::default());
        assert!(transform.is_none());
        assert_eq!(aligned.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn translated_texture_recovers_the_shift() {
        let mut reference = solid_rgb(220, 220, [255, 255, 255]);
        noise_block_rgb(&mut reference, 50, 50, 120, 120, 5);
        let mut candidate = solid_rgb(220, 220, [255, 255, 255]);
        noise_block_rgb(&mut candidate, 53, 55, 120, 120, 5);

        let (aligned, transform) = align(&reference, &candidate, &AlignConfig::default());
        let t = transform.expect("textured translated copy must align");
        assert_relative_eq!(t.scale, 1.0, epsilon = 0.02);
        assert_relative_eq!(t.tx, -3.0, epsilon = 1.5);
        assert_relative_eq!(t.ty, -5.0, epsilon = 1.5);
        assert_eq!(aligned.dimensions(), (220, 220));
    }

    #[test]
    fn doubled_scale_is_rejected_as_implausible() {
        let mut reference = solid_rgb(200, 200, [255, 255, 255]);
        noise_block_rgb(&mut reference, 40, 40, 120, 120, 5);
        let candidate = resize(&reference, 400, 400, FilterType::Triangle);

        let (aligned, transform) = align(&reference, &candidate, &AlignConfig::default());
        assert!(transform.is_none(), "2x scale must not produce a warp");
        assert_eq!(aligned.dimensions(), (200, 200));
    }

    #[test]
    fn transform_rows_are_axis_aligned() {
        let t = SimilarityTransform {
            scale: 1.05,
            tx: -4.0,
            ty: 2.5,
        };
        let rows = t.to_rows();
        assert_eq!(rows[0][1], 0.0);
        assert_eq!(rows[1][0], 0.0);
        assert_relative_eq!(rows[0][0], rows[1][1]);
        let p = t.apply([10.0, 20.0]);
        assert_relative_eq!(p[0], 1.05 * 10.0 - 4.0);
        assert_relative_eq!(p[1], 1.05 * 20.0 + 2.5);
    }
}
