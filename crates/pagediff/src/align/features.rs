//! Oriented multi-scale binary features for screenshot alignment.
//!
//! FAST-9 corners are detected on an image pyramid (scale factor 1.2),
//! oriented by intensity centroid, and described with a 256-bit binary
//! test pattern sampled from a smoothed patch. The test pattern is
//! generated once from a fixed seed so feature extraction is fully
//! deterministic across runs.

use image::imageops::{resize, FilterType};
use image::GrayImage;
use imageproc::corners::corners_fast9;
use imageproc::filter::gaussian_blur_f32;
use rand::prelude::*;

/// Border (pixels) inside which keypoints are discarded: rotated descriptor
/// offsets reach |13|·√2 ≈ 18.4 px, and the orientation patch needs 15 px.
const PATCH_MARGIN: u32 = 20;

/// Half-extent of the binary test offsets.
const PATTERN_EXTENT: f32 = 13.0;

/// Number of binary tests per descriptor (four u64 words).
const PATTERN_TESTS: usize = 256;

/// Feature detection configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FeatureConfig {
    /// Target total number of keypoints across all pyramid levels.
    pub n_features: usize,
    /// Number of pyramid levels.
    pub n_levels: usize,
    /// Pyramid downscale factor between levels.
    pub scale_factor: f32,
    /// FAST-9 intensity threshold.
    pub fast_threshold: u8,
    /// Seed for the binary test pattern.
    pub pattern_seed: u64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_features: 5000,
            n_levels: 8,
            scale_factor: 1.2,
            fast_threshold: 20,
            pattern_seed: 42,
        }
    }
}

/// A detected keypoint in full-resolution pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    /// X in full-resolution pixels.
    pub x: f64,
    /// Y in full-resolution pixels.
    pub y: f64,
    /// Corner response score at the detection level.
    pub response: f32,
    /// Patch orientation in radians.
    pub angle: f32,
}

/// 256-bit binary descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor(pub [u64; 4]);

impl Descriptor {
    /// Hamming distance to another descriptor.
    #[inline]
    pub fn hamming(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Detect keypoints and compute their descriptors.
///
/// Returns parallel vectors; keypoints too close to an image border for a
/// full descriptor patch are dropped.
pub fn detect_and_describe(gray: &GrayImage, config: &FeatureConfig) -> (Vec<Keypoint>, Vec<Descriptor>) {
    let pattern = build_pattern(config.pattern_seed);
    let (w, h) = gray.dimensions();

    // Pyramid geometry first, so per-level budgets can be area-proportional.
    let mut levels: Vec<(u32, u32, f32)> = Vec::new();
    let min_dim = 2 * PATCH_MARGIN + 3;
    for l in 0..config.n_levels {
        let scale = config.scale_factor.powi(l as i32);
        let lw = (w as f32 / scale).round() as u32;
        let lh = (h as f32 / scale).round() as u32;
        if lw < min_dim || lh < min_dim {
            break;
        }
        levels.push((lw, lh, scale));
    }
    let total_area: f64 = levels.iter().map(|&(lw, lh, _)| lw as f64 * lh as f64).sum();
    if total_area <= 0.0 {
        return (Vec::new(), Vec::new());
    }

    let mut keypoints = Vec::new();
    let mut descriptors = Vec::new();

    for &(lw, lh, scale) in &levels {
        let level_img = if scale == 1.0 {
            gray.clone()
        } else {
            resize(gray, lw, lh, FilterType::Triangle)
        };
        // Binary tests need a smoothed patch to be repeatable.
        let blurred = gaussian_blur_f32(&level_img, 2.0);

        let budget =
            ((config.n_features as f64 * (lw as f64 * lh as f64) / total_area).ceil() as usize).max(1);

        let mut corners = corners_fast9(&level_img, config.fast_threshold);
        corners.retain(|c| {
            c.x >= PATCH_MARGIN && c.y >= PATCH_MARGIN && c.x < lw - PATCH_MARGIN && c.y < lh - PATCH_MARGIN
        });
        corners.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        corners.truncate(budget);

        for corner in corners {
            let kp = Keypoint {
                x: corner.x as f64 * scale as f64,
                y: corner.y as f64 * scale as f64,
                response: corner.score,
                angle: intensity_centroid_angle(&blurred, corner.x, corner.y),
            };
            let descriptor = describe(&blurred, corner.x, corner.y, kp.angle, &pattern);
            keypoints.push(kp);
            descriptors.push(descriptor);
        }
    }

    // Defensive global cap: keep the strongest responses if the per-level
    // budgets overshoot the target.
    if keypoints.len() > config.n_features {
        let mut order: Vec<usize> = (0..keypoints.len()).collect();
        order.sort_by(|&a, &b| {
            keypoints[b]
                .response
                .partial_cmp(&keypoints[a].response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(config.n_features);
        order.sort_unstable();
        let keypoints = order.iter().map(|&i| keypoints[i]).collect();
        let descriptors = order.iter().map(|&i| descriptors[i]).collect();
        return (keypoints, descriptors);
    }

    (keypoints, descriptors)
}

/// One binary test: two offsets relative to the keypoint center.
type TestPair = [f32; 4];

fn build_pattern(seed: u64) -> Vec<TestPair> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..PATTERN_TESTS)
        .map(|_| {
            [
                rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
                rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
                rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
                rng.gen_range(-PATTERN_EXTENT..=PATTERN_EXTENT),
            ]
        })
        .collect()
}

/// Patch orientation from the intensity centroid (radius 15).
fn intensity_centroid_angle(img: &GrayImage, cx: u32, cy: u32) -> f32 {
    const RADIUS: i32 = 15;
    let mut m10 = 0.0f32;
    let mut m01 = 0.0f32;
    for dy in -RADIUS..=RADIUS {
        for dx in -RADIUS..=RADIUS {
            if dx * dx + dy * dy > RADIUS * RADIUS {
                continue;
            }
            let x = (cx as i32 + dx) as u32;
            let y = (cy as i32 + dy) as u32;
            let v = img.get_pixel(x, y)[0] as f32;
            m10 += dx as f32 * v;
            m01 += dy as f32 * v;
        }
    }
    m01.atan2(m10)
}

fn describe(img: &GrayImage, cx: u32, cy: u32, angle: f32, pattern: &[TestPair]) -> Descriptor {
    let (cos_a, sin_a) = (angle.cos(), angle.sin());
    let mut words = [0u64; 4];
    for (i, &[px, py, qx, qy]) in pattern.iter().enumerate() {
        let p = rotate_sample(img, cx, cy, px, py, cos_a, sin_a);
        let q = rotate_sample(img, cx, cy, qx, qy, cos_a, sin_a);
        if p < q {
            words[i / 64] |= 1u64 << (i % 64);
        }
    }
    Descriptor(words)
}

#[inline]
fn rotate_sample(img: &GrayImage, cx: u32, cy: u32, ox: f32, oy: f32, cos_a: f32, sin_a: f32) -> u8 {
    let rx = (cos_a * ox - sin_a * oy).round() as i32;
    let ry = (sin_a * ox + cos_a * oy).round() as i32;
    let x = (cx as i32 + rx).clamp(0, img.width() as i32 - 1) as u32;
    let y = (cy as i32 + ry).clamp(0, img.height() as i32 - 1) as u32;
    img.get_pixel(x, y)[0]
}
