//! RANSAC estimation of a candidate→reference similarity transform.
//!
//! The model is restricted to translation + uniform scale + rotation
//! (4 DoF) — never a full homography. Samples 2-point minimal subsets,
//! selects the model with the most inliers under a reprojection threshold,
//! and re-fits to all inliers by least squares.

use nalgebra::{Matrix4, Vector4};
use rand::prelude::*;

/// Configuration for RANSAC similarity fitting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RansacConfig {
    /// Maximum number of RANSAC iterations.
    pub max_iters: usize,
    /// Inlier reprojection threshold in pixels.
    pub inlier_threshold: f64,
    /// Minimum number of inliers for a valid model.
    pub min_inliers: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            inlier_threshold: 5.0,
            min_inliers: 8,
            seed: 42,
        }
    }
}

/// Full similarity model `[x'; y'] = [a -b; b a][x; y] + [tx; ty]`.
#[derive(Debug, Clone, Copy)]
pub struct Similarity {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Similarity {
    /// Map a point through the transform.
    #[inline]
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.a * p[0] - self.b * p[1] + self.tx,
            self.b * p[0] + self.a * p[1] + self.ty,
        ]
    }

    /// Row norms of the 2×2 linear part; equal for an exact similarity,
    /// kept separate so the caller can average them the same way the
    /// decomposed-scale gate expects.
    pub fn row_scales(&self) -> (f64, f64) {
        let s = (self.a * self.a + self.b * self.b).sqrt();
        (s, s)
    }
}

/// Fit a similarity transform robustly from matched point pairs.
///
/// `src[i]` maps to approximately `dst[i]`. Returns `None` when the data
/// cannot support a model with `min_inliers` inliers.
pub fn estimate_similarity_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> Option<Similarity> {
    let n = src.len().min(dst.len());
    if n < 2 {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best_inlier_count = 0usize;
    let mut best_mask: Vec<bool> = vec![false; n];

    for _ in 0..config.max_iters {
        let sample = sample_indices(&mut rng, n, 2);
        let Some(model) =
            similarity_from_two_pairs(src[sample[0]], dst[sample[0]], src[sample[1]], dst[sample[1]])
        else {
            continue;
        };

        let mut inlier_count = 0usize;
        let mut mask = vec![false; n];
        for i in 0..n {
            if reprojection_error(&model, src[i], dst[i]) < config.inlier_threshold {
                mask[i] = true;
                inlier_count += 1;
            }
        }

        if inlier_count > best_inlier_count {
            best_inlier_count = inlier_count;
            best_mask = mask;

            // Early exit: if >90% of points are inliers, stop searching
            if best_inlier_count * 10 > n * 9 {
                break;
            }
        }
    }

    if best_inlier_count < config.min_inliers {
        return None;
    }

    // Re-fit to all inliers
    let (inlier_src, inlier_dst): (Vec<_>, Vec<_>) = best_mask
        .iter()
        .enumerate()
        .filter(|(_, &m)| m)
        .map(|(i, _)| (src[i], dst[i]))
        .unzip();

    let refined = fit_similarity_lsq(&inlier_src, &inlier_dst)?;

    // Recount with the refined model; a bad re-fit must not silently win.
    let final_count = (0..n)
        .filter(|&i| reprojection_error(&refined, src[i], dst[i]) < config.inlier_threshold)
        .count();
    if final_count < config.min_inliers {
        return None;
    }

    Some(refined)
}

#[inline]
fn reprojection_error(model: &Similarity, src: [f64; 2], dst: [f64; 2]) -> f64 {
    let p = model.apply(src);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// Exact similarity through two correspondences, or `None` when the source
/// points are (near-)coincident.
fn similarity_from_two_pairs(p1: [f64; 2], q1: [f64; 2], p2: [f64; 2], q2: [f64; 2]) -> Option<Similarity> {
    let dp = [p2[0] - p1[0], p2[1] - p1[1]];
    let dq = [q2[0] - q1[0], q2[1] - q1[1]];
    let len_sq = dp[0] * dp[0] + dp[1] * dp[1];
    if len_sq < 1e-9 {
        return None;
    }
    // Complex division dq / dp gives (a, b) directly.
    let a = (dq[0] * dp[0] + dq[1] * dp[1]) / len_sq;
    let b = (dq[1] * dp[0] - dq[0] * dp[1]) / len_sq;
    let tx = q1[0] - (a * p1[0] - b * p1[1]);
    let ty = q1[1] - (b * p1[0] + a * p1[1]);
    Some(Similarity { a, b, tx, ty })
}

/// Least-squares similarity over all correspondences via the 4×4 normal
/// equations.
fn fit_similarity_lsq(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Similarity> {
    let n = src.len().min(dst.len());
    if n < 2 {
        return None;
    }

    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0; // Σ (x² + y²)
    let mut sqx = 0.0;
    let mut sqy = 0.0;
    let mut sa = 0.0; // Σ (x·qx + y·qy)
    let mut sb = 0.0; // Σ (x·qy − y·qx)
    for i in 0..n {
        let [x, y] = src[i];
        let [qx, qy] = dst[i];
        sx += x;
        sy += y;
        sxx += x * x + y * y;
        sqx += qx;
        sqy += qy;
        sa += x * qx + y * qy;
        sb += x * qy - y * qx;
    }
    let nf = n as f64;

    #[rustfmt::skip]
    let m = Matrix4::new(
        sxx, 0.0, sx,  sy,
        0.0, sxx, -sy, sx,
        sx, -sy,  nf,  0.0,
        sy,  sx,  0.0, nf,
    );
    let rhs = Vector4::new(sa, sb, sqx, sqy);
    let solution = m.lu().solve(&rhs)?;
    let model = Similarity {
        a: solution[0],
        b: solution[1],
        tx: solution[2],
        ty: solution[3],
    };
    (model.a.is_finite() && model.b.is_finite() && model.tx.is_finite() && model.ty.is_finite())
        .then_some(model)
}

/// Sample `k` distinct indices from `0..n` using Fisher–Yates partial shuffle.
fn sample_indices(rng: &mut impl rand::Rng, n: usize, k: usize) -> Vec<usize> {
    debug_assert!(k <= n);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}
