//! Structural-similarity diff scoring.
//!
//! Windowed SSIM (uniform 7×7 window, Wang et al. constants K1=0.01,
//! K2=0.03, L=255) computed per color channel. In color-aware mode the
//! per-pixel dissimilarity is `1 − min(channel SSIM)`: the worst-case
//! channel is the diff signal, so a color-only change is never masked by
//! high similarity in the other channels.
//!
//! The dissimilarity map is scaled to a fixed absolute byte range, NOT
//! min-max normalized per comparison — per-call normalization would inflate
//! noise into false "major" differences whenever the true largest
//! differences are filtered out downstream.

use image::imageops::grayscale;
use image::{GrayImage, RgbImage};

const WIN_RADIUS: i64 = 3;
const C1: f64 = 6.5025; // (0.01 * 255)^2
const C2: f64 = 58.5225; // (0.03 * 255)^2

/// Compute the global similarity score and the per-pixel dissimilarity map.
///
/// Both images must share dimensions (the pipeline crops them beforehand);
/// any excess is ignored. The score is the global mean similarity in
/// [0, 1]-ish SSIM range (1 = identical); the map is absolute-scaled to
/// 0–255 bytes.
pub fn score(a: &RgbImage, b: &RgbImage, color_aware: bool) -> (f64, GrayImage) {
    let w = a.width().min(b.width()) as usize;
    let h = a.height().min(b.height()) as usize;
    if w == 0 || h == 0 {
        return (1.0, GrayImage::new(w as u32, h as u32));
    }

    if color_aware {
        let mut channel_means = [0.0f64; 3];
        let mut min_map = vec![f64::INFINITY; w * h];
        for c in 0..3 {
            let xa = extract_channel(a, c, w, h);
            let xb = extract_channel(b, c, w, h);
            let (mean, map) = windowed_ssim(&xa, &xb, w, h);
            channel_means[c] = mean;
            for (dst, &v) in min_map.iter_mut().zip(map.iter()) {
                if v < *dst {
                    *dst = v;
                }
            }
        }
        let global = channel_means.iter().sum::<f64>() / 3.0;
        (global, dissimilarity_bytes(&min_map, w, h))
    } else {
        let ga = grayscale(a);
        let gb = grayscale(b);
        let xa = gray_values(&ga, w, h);
        let xb = gray_values(&gb, w, h);
        let (mean, map) = windowed_ssim(&xa, &xb, w, h);
        (mean, dissimilarity_bytes(&map, w, h))
    }
}

/// Global grayscale SSIM between two equally-sized grayscale buffers.
///
/// Used by the classifier to test "structure preserved, style changed".
pub(crate) fn gray_similarity(a: &GrayImage, b: &GrayImage) -> f64 {
    let w = a.width().min(b.width()) as usize;
    let h = a.height().min(b.height()) as usize;
    if w == 0 || h == 0 {
        return 1.0;
    }
    let xa = gray_values(a, w, h);
    let xb = gray_values(b, w, h);
    windowed_ssim(&xa, &xb, w, h).0
}

fn extract_channel(img: &RgbImage, c: usize, w: usize, h: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            out.push(img.get_pixel(x as u32, y as u32)[c] as f64);
        }
    }
    out
}

fn gray_values(img: &GrayImage, w: usize, h: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            out.push(img.get_pixel(x as u32, y as u32)[0] as f64);
        }
    }
    out
}

fn dissimilarity_bytes(similarity: &[f64], w: usize, h: usize) -> GrayImage {
    let mut out = GrayImage::new(w as u32, h as u32);
    for (dst, &s) in out.pixels_mut().zip(similarity.iter()) {
        let d = ((1.0 - s) * 255.0).round().clamp(0.0, 255.0);
        dst[0] = d as u8;
    }
    out
}

/// Summed-area table over an `w`×`h` buffer.
struct Integral {
    data: Vec<f64>,
    w: usize,
}

impl Integral {
    fn new(values: impl Iterator<Item = f64>, w: usize, h: usize) -> Self {
        let stride = w + 1;
        let mut data = vec![0.0f64; stride * (h + 1)];
        let mut it = values;
        for y in 1..=h {
            let mut row_sum = 0.0;
            for x in 1..=w {
                row_sum += it.next().unwrap_or(0.0);
                data[y * stride + x] = data[(y - 1) * stride + x] + row_sum;
            }
        }
        Self { data, w }
    }

    /// Inclusive window sum over `[x0, x1] × [y0, y1]`.
    #[inline]
    fn window_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let stride = self.w + 1;
        self.data[(y1 + 1) * stride + (x1 + 1)] + self.data[y0 * stride + x0]
            - self.data[y0 * stride + (x1 + 1)]
            - self.data[(y1 + 1) * stride + x0]
    }
}

/// Per-pixel SSIM over a uniform window clamped at the borders.
///
/// Returns the global mean and the full map. Uses the unbiased sample
/// normalization for variances, so identical inputs give exactly 1.0.
fn windowed_ssim(x: &[f64], y: &[f64], w: usize, h: usize) -> (f64, Vec<f64>) {
    let ix = Integral::new(x.iter().copied(), w, h);
    let iy = Integral::new(y.iter().copied(), w, h);
    let ixx = Integral::new(x.iter().map(|v| v * v), w, h);
    let iyy = Integral::new(y.iter().map(|v| v * v), w, h);
    let ixy = Integral::new(x.iter().zip(y.iter()).map(|(a, b)| a * b), w, h);

    let mut map = vec![0.0f64; w * h];
    let mut total = 0.0f64;
    for py in 0..h {
        let y0 = (py as i64 - WIN_RADIUS).max(0) as usize;
        let y1 = ((py as i64 + WIN_RADIUS) as usize).min(h - 1);
        for px in 0..w {
            let x0 = (px as i64 - WIN_RADIUS).max(0) as usize;
            let x1 = ((px as i64 + WIN_RADIUS) as usize).min(w - 1);
            let np = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;

            let sx = ix.window_sum(x0, y0, x1, y1);
            let sy = iy.window_sum(x0, y0, x1, y1);
            let sxx = ixx.window_sum(x0, y0, x1, y1);
            let syy = iyy.window_sum(x0, y0, x1, y1);
            let sxy = ixy.window_sum(x0, y0, x1, y1);

            let ux = sx / np;
            let uy = sy / np;
            let cov_norm = if np > 1.0 { np / (np - 1.0) } else { 0.0 };
            let vx = cov_norm * (sxx / np - ux * ux);
            let vy = cov_norm * (syy / np - uy * uy);
            let vxy = cov_norm * (sxy / np - ux * uy);

            let s = ((2.0 * ux * uy + C1) * (2.0 * vxy + C2))
                / ((ux * ux + uy * uy + C1) * (vx + vy + C2));
            map[py * w + px] = s;
            total += s;
        }
    }
    (total / (w * h) as f64, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fill_rect_rgb, noise_block_rgb, solid_rgb};
    use approx::assert_relative_eq;

    #[test]
    fn identical_images_score_one_with_a_zero_map() {
        let mut img = solid_rgb(64, 48, [200, 200, 200]);
        noise_block_rgb(&mut img, 5, 5, 40, 30, 3);
        let (s, map) = score(&img, &img.clone(), true);
        assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        assert!(map.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn identical_images_score_one_in_grayscale_mode() {
        let img = solid_rgb(32, 32, [90, 120, 30]);
        let (s, map) = score(&img, &img.clone(), false);
        assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        assert!(map.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn color_only_change_is_caught_only_in_color_mode() {
        let a = solid_rgb(100, 100, [128, 128, 128]);
        let mut b = solid_rgb(100, 100, [128, 128, 128]);
        // Shift only the blue channel inside a patch.
        fill_rect_rgb(&mut b, 30, 30, 40, 40, [128, 128, 220]);

        let (color_score, color_map) = score(&a, &b, true);
        assert!(color_score < 0.999, "color-aware score {}", color_score);
        assert!(color_map.get_pixel(50, 50)[0] > 10);

        let (gray_score, gray_map) = score(&a, &b, false);
        assert!(gray_score > 0.99, "grayscale score {}", gray_score);
        assert!(gray_map.get_pixel(50, 50)[0] <= 2);
    }

    #[test]
    fn map_scale_is_absolute_not_per_call() {
        // The byte value of one fixed difference must not depend on what
        // else appears in the image pair.
        let a1 = solid_rgb(60, 60, [255, 255, 255]);
        let mut b1 = a1.clone();
        fill_rect_rgb(&mut b1, 10, 10, 20, 20, [255, 0, 0]);
        let (_, map1) = score(&a1, &b1, true);

        let a2 = solid_rgb(60, 60, [255, 255, 255]);
        let mut b2 = a2.clone();
        fill_rect_rgb(&mut b2, 10, 10, 20, 20, [255, 0, 0]);
        // An additional, much stronger difference elsewhere.
        fill_rect_rgb(&mut b2, 40, 40, 15, 15, [0, 0, 0]);
        let (_, map2) = score(&a2, &b2, true);

        assert_eq!(map1.get_pixel(20, 20)[0], map2.get_pixel(20, 20)[0]);
    }

    #[test]
    fn dissimilarity_grows_with_difference() {
        let a = solid_rgb(40, 40, [255, 255, 255]);
        let mut slightly = a.clone();
        fill_rect_rgb(&mut slightly, 10, 10, 20, 20, [230, 230, 230]);
        let mut strongly = a.clone();
        fill_rect_rgb(&mut strongly, 10, 10, 20, 20, [0, 0, 0]);

        let (s_slight, m_slight) = score(&a, &slightly, true);
        let (s_strong, m_strong) = score(&a, &strongly, true);
        assert!(s_strong < s_slight);
        assert!(m_strong.get_pixel(20, 20)[0] > m_slight.get_pixel(20, 20)[0]);
    }

    #[test]
    fn gray_similarity_is_high_for_same_structure() {
        let mut a = GrayImage::from_pixel(40, 40, image::Luma([255]));
        for y in 10..30 {
            for x in 10..30 {
                a.put_pixel(x, y, image::Luma([40]));
            }
        }
        let b = a.clone();
        assert_relative_eq!(gray_similarity(&a, &b), 1.0, epsilon = 1e-12);
    }
}
