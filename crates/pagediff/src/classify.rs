//! Heuristic classification of difference regions.
//!
//! Inspects the reference and candidate crops of one region and decides
//! *what kind* of difference it is. The checks run in a fixed order and the
//! first match wins:
//!
//! 1. content-band count delta (multi-band crops only)
//! 2. whitespace flip
//! 3. wide / tall spacing strips
//! 4. pure vertical content shift (row-projection cross-correlation)
//! 5. uniform padding band
//! 6. structure-preserved color shift
//! 7. edge-density text heuristic
//! 8. generic layout fallback
//!
//! The numeric cutoffs are tuning values, exposed on [`ClassifyConfig`];
//! their relative ordering matters more than the exact constants.

use image::imageops::grayscale;
use image::{GrayImage, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::edges::canny;
use serde::{Deserialize, Serialize};

use crate::ssim::gray_similarity;

/// Which side of a region carries the uniform padding band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddedEdge {
    /// Uniform band at the top of the crop.
    Top,
    /// Uniform band at the bottom of the crop.
    Bottom,
}

/// Classified difference kind for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffClass {
    /// Reference has more content bands than the candidate.
    MissingContent,
    /// Candidate has more content bands than the reference.
    ExtraContent,
    /// Reference side is blank, candidate is not.
    ExtraElement,
    /// Candidate side is blank, reference is not.
    MissingElement,
    /// Wide flat strip with a near-uniform side.
    SectionSpacing {
        /// Strip height in pixels.
        height_px: u32,
    },
    /// Tall narrow strip with a near-uniform side.
    ColumnSpacing {
        /// Strip width in pixels.
        width_px: u32,
    },
    /// Spacing strip where both sides carry content.
    SpacingPadding,
    /// Same content, displaced vertically.
    SectionShift {
        /// Estimated shift magnitude in pixels.
        shift_px: u32,
    },
    /// Uniform margin band added or removed on one edge.
    PaddingMargin {
        /// Which edge is uniform.
        edge: PaddedEdge,
    },
    /// Shapes match, color/style does not.
    ColorStyle,
    /// Dense-edge region, most likely text or content pixels changed.
    TextContent,
    /// Generic layout mismatch.
    Layout,
    /// Degenerate crop, nothing to inspect.
    Unknown,
}

/// Reporting category used by the retention feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffCategory {
    /// Color/style differences.
    Color,
    /// Content/text differences.
    Content,
    /// Layout, spacing and element-presence differences.
    Layout,
    /// Unclassifiable.
    Other,
}

impl DiffClass {
    /// Retention category for the feature-flag filter.
    pub fn category(self) -> DiffCategory {
        match self {
            DiffClass::ColorStyle => DiffCategory::Color,
            DiffClass::MissingContent | DiffClass::ExtraContent | DiffClass::TextContent => {
                DiffCategory::Content
            }
            DiffClass::ExtraElement
            | DiffClass::MissingElement
            | DiffClass::SectionSpacing { .. }
            | DiffClass::ColumnSpacing { .. }
            | DiffClass::SpacingPadding
            | DiffClass::SectionShift { .. }
            | DiffClass::PaddingMargin { .. }
            | DiffClass::Layout => DiffCategory::Layout,
            DiffClass::Unknown => DiffCategory::Other,
        }
    }
}

impl std::fmt::Display for DiffClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffClass::MissingContent => write!(f, "Missing Content (Text/List)"),
            DiffClass::ExtraContent => write!(f, "Extra Content (Text/List)"),
            DiffClass::ExtraElement => write!(f, "Extra Element"),
            DiffClass::MissingElement => write!(f, "Missing Element"),
            DiffClass::SectionSpacing { height_px } => {
                write!(f, "Section Spacing / Margin Issue (height: {}px)", height_px)
            }
            DiffClass::ColumnSpacing { width_px } => {
                write!(f, "Column Spacing / Gap Issue (width: {}px)", width_px)
            }
            DiffClass::SpacingPadding => write!(f, "Spacing/Padding Issue"),
            DiffClass::SectionShift { shift_px } => {
                write!(f, "Section Spacing Mismatch (~{}px shift)", shift_px)
            }
            DiffClass::PaddingMargin { edge } => {
                let side = match edge {
                    PaddedEdge::Top => "top",
                    PaddedEdge::Bottom => "bottom",
                };
                write!(f, "Padding/Margin Difference ({})", side)
            }
            DiffClass::ColorStyle => write!(f, "Color/Style Mismatch"),
            DiffClass::TextContent => write!(f, "Text/Content Mismatch"),
            DiffClass::Layout => write!(f, "Layout Mismatch"),
            DiffClass::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Classifier thresholds. Heuristic tuning values; the defaults come from
/// production captures and are tunable, not sacred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Fraction of a row's max ink for it to count as a content row.
    pub line_row_frac: f64,
    /// A band-count delta fires only when the busier crop has at least this
    /// many bands; a single solid block reads as an element, not content.
    pub min_content_lines: usize,
    /// Mean luma above which a crop counts as blank.
    pub blank_mean: f64,
    /// Mean luma below which a crop counts as carrying content.
    pub content_mean: f64,
    /// Aspect ratio above which a crop is a horizontal spacing strip.
    pub wide_aspect: f64,
    /// Aspect ratio below which a crop is a vertical spacing strip.
    pub tall_aspect: f64,
    /// Luma stddev under which a strip side counts as uniform.
    pub strip_std: f64,
    /// Minimum crop extent (both dims) for shift correlation.
    pub shift_min_dim: u32,
    /// Minimum normalized correlation peak to accept a shift.
    pub shift_peak: f64,
    /// Minimum |shift| in pixels to report a shift.
    pub shift_min_px: u32,
    /// Luma stddev under which a padding band counts as uniform.
    pub pad_uniform_std: f64,
    /// Luma stddev above which the crop middle counts as busy.
    pub pad_busy_std: f64,
    /// Grayscale SSIM above which structure counts as preserved.
    pub structure_ssim: f64,
    /// Canny edge-pixel fraction above which a crop reads as text.
    pub edge_density: f64,
    /// Canny low threshold.
    pub canny_low: f32,
    /// Canny high threshold.
    pub canny_high: f32,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            line_row_frac: 0.02,
            min_content_lines: 2,
            blank_mean: 250.0,
            content_mean: 245.0,
            wide_aspect: 4.0,
            tall_aspect: 0.25,
            strip_std: 20.0,
            shift_min_dim: 20,
            shift_peak: 0.6,
            shift_min_px: 2,
            pad_uniform_std: 10.0,
            pad_busy_std: 25.0,
            structure_ssim: 0.90,
            edge_density: 0.05,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Classify one region from its reference and candidate crops.
pub fn classify(ref_crop: &RgbImage, cand_crop: &RgbImage, config: &ClassifyConfig) -> DiffClass {
    let (w, h) = ref_crop.dimensions();
    if w == 0 || h == 0 || cand_crop.width() == 0 || cand_crop.height() == 0 {
        return DiffClass::Unknown;
    }

    let gray_ref = grayscale(ref_crop);
    let gray_cand = grayscale(cand_crop);

    // 1. Content-band delta. Requires genuinely multi-band content on at
    // least one side so a single solid block falls through to the
    // whitespace check.
    let lines_ref = count_content_lines(&gray_ref, config.line_row_frac);
    let lines_cand = count_content_lines(&gray_cand, config.line_row_frac);
    if lines_ref.max(lines_cand) >= config.min_content_lines {
        if lines_ref > lines_cand {
            return DiffClass::MissingContent;
        }
        if lines_cand > lines_ref {
            return DiffClass::ExtraContent;
        }
    }

    // 2. Whitespace flip.
    let mean_ref = mean_luma(&gray_ref);
    let mean_cand = mean_luma(&gray_cand);
    if mean_ref > config.blank_mean && mean_cand < config.content_mean {
        return DiffClass::ExtraElement;
    }
    if mean_ref < config.content_mean && mean_cand > config.blank_mean {
        return DiffClass::MissingElement;
    }

    // 3. Spacing strips.
    let aspect = w as f64 / h as f64;
    let std_ref = std_luma(&gray_ref);
    let std_cand = std_luma(&gray_cand);
    if aspect > config.wide_aspect {
        if std_ref < config.strip_std || std_cand < config.strip_std {
            return DiffClass::SectionSpacing { height_px: h };
        }
        return DiffClass::SpacingPadding;
    }
    if aspect < config.tall_aspect {
        if std_ref < config.strip_std || std_cand < config.strip_std {
            return DiffClass::ColumnSpacing { width_px: w };
        }
        return DiffClass::SpacingPadding;
    }

    // 4. Pure vertical shift of otherwise-matching content.
    if w > config.shift_min_dim && h > config.shift_min_dim {
        if let Some((shift, peak)) = row_projection_shift(&gray_ref, &gray_cand) {
            if peak > config.shift_peak && shift.unsigned_abs() as u32 > config.shift_min_px {
                return DiffClass::SectionShift {
                    shift_px: shift.unsigned_abs() as u32,
                };
            }
        }
    }

    // 5. Uniform padding band on one edge with busy content in the middle.
    if let Some(edge) = padded_edge(&gray_ref, config) {
        return DiffClass::PaddingMargin { edge };
    }

    // 6. Structure preserved, color/style changed.
    if gray_similarity(&gray_ref, &gray_cand) > config.structure_ssim {
        return DiffClass::ColorStyle;
    }

    // 7. Edge density says text.
    let edges = canny(&gray_ref, config.canny_low, config.canny_high);
    let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count();
    if edge_pixels as f64 / (w as f64 * h as f64) > config.edge_density {
        return DiffClass::TextContent;
    }

    DiffClass::Layout
}

/// Count distinct horizontal content bands via inverse-Otsu binarization and
/// row-projection run-length analysis.
pub(crate) fn count_content_lines(gray: &GrayImage, row_frac: f64) -> usize {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return 0;
    }
    // A uniform crop has no bands regardless of where Otsu lands.
    let first = gray.get_pixel(0, 0)[0];
    if gray.pixels().all(|p| p[0] == first) {
        return 0;
    }
    let level = otsu_level(gray);
    let ink = threshold(gray, level, ThresholdType::BinaryInverted);

    let row_cutoff = w as f64 * 255.0 * row_frac;
    let mut lines = 0usize;
    let mut in_line = false;
    let mut any_ink = false;
    for y in 0..h {
        let row_sum: f64 = (0..w).map(|x| ink.get_pixel(x, y)[0] as f64).sum();
        if row_sum > 0.0 {
            any_ink = true;
        }
        let has_content = row_sum > row_cutoff;
        if has_content && !in_line {
            lines += 1;
            in_line = true;
        } else if !has_content {
            in_line = false;
        }
    }
    if !any_ink {
        return 0;
    }
    lines
}

pub(crate) fn mean_luma(gray: &GrayImage) -> f64 {
    let n = (gray.width() * gray.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    gray.pixels().map(|p| p[0] as f64).sum::<f64>() / n
}

pub(crate) fn std_luma(gray: &GrayImage) -> f64 {
    let n = (gray.width() * gray.height()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = mean_luma(gray);
    let var = gray.pixels().map(|p| (p[0] as f64 - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Cross-correlate the normalized row projections of both crops.
///
/// Returns `(best_lag, peak)` or `None` when either projection is flat.
fn row_projection_shift(a: &GrayImage, b: &GrayImage) -> Option<(i64, f64)> {
    let proj_a = centered_row_projection(a)?;
    let proj_b = centered_row_projection(b)?;
    let n = proj_a.len().min(proj_b.len());
    if n < 2 {
        return None;
    }

    let mut best_lag = 0i64;
    let mut best = f64::NEG_INFINITY;
    for lag in -(n as i64 - 1)..=(n as i64 - 1) {
        let mut c = 0.0;
        for i in 0..n as i64 {
            let j = i - lag;
            if j >= 0 && j < n as i64 {
                c += proj_a[i as usize] * proj_b[j as usize];
            }
        }
        if c > best {
            best = c;
            best_lag = lag;
        }
    }
    Some((best_lag, best))
}

/// Row means, mean-centered and L2-normalized. `None` for flat content.
fn centered_row_projection(gray: &GrayImage) -> Option<Vec<f64>> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let mut proj: Vec<f64> = (0..h)
        .map(|y| (0..w).map(|x| gray.get_pixel(x, y)[0] as f64).sum::<f64>() / w as f64)
        .collect();
    let mean = proj.iter().sum::<f64>() / proj.len() as f64;
    for v in proj.iter_mut() {
        *v -= mean;
    }
    let norm = proj.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm <= f64::EPSILON {
        return None;
    }
    for v in proj.iter_mut() {
        *v /= norm;
    }
    Some(proj)
}

/// Detect a uniform top/bottom third paired with a busy middle.
fn padded_edge(gray: &GrayImage, config: &ClassifyConfig) -> Option<PaddedEdge> {
    let (w, h) = gray.dimensions();
    let third = (h / 3).max(1);
    if h < 3 || third * 2 >= h {
        return None;
    }
    let top = crop_rows(gray, 0, third, w);
    let bottom = crop_rows(gray, h - third, third, w);
    let middle = crop_rows(gray, third, h - 2 * third, w);

    let top_std = std_luma(&top);
    let bottom_std = std_luma(&bottom);
    let mid_std = std_luma(&middle);

    if (top_std < config.pad_uniform_std || bottom_std < config.pad_uniform_std)
        && mid_std > config.pad_busy_std
    {
        if top_std < bottom_std {
            return Some(PaddedEdge::Top);
        }
        return Some(PaddedEdge::Bottom);
    }
    None
}

fn crop_rows(gray: &GrayImage, y: u32, rows: u32, w: u32) -> GrayImage {
    image::imageops::crop_imm(gray, 0, y, w, rows).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fill_rect_rgb, solid_rgb};
    use image::Luma;

    fn text_lines(w: u32, h: u32, n_lines: u32) -> RgbImage {
        let mut img = solid_rgb(w, h, [255, 255, 255]);
        let band = h / (2 * n_lines + 1);
        for i in 0..n_lines {
            let y = band * (2 * i + 1);
            fill_rect_rgb(&mut img, 4, y, w - 8, band.max(1), [30, 30, 30]);
        }
        img
    }

    #[test]
    fn fewer_candidate_lines_is_missing_content() {
        let cfg = ClassifyConfig::default();
        let reference = text_lines(120, 90, 4);
        let candidate = text_lines(120, 90, 2);
        assert_eq!(classify(&reference, &candidate, &cfg), DiffClass::MissingContent);
        assert_eq!(classify(&candidate, &reference, &cfg), DiffClass::ExtraContent);
    }

    #[test]
    fn blank_versus_solid_block_is_an_element_flip() {
        let cfg = ClassifyConfig::default();
        let blank = solid_rgb(60, 60, [255, 255, 255]);
        let mut block = solid_rgb(60, 60, [255, 255, 255]);
        fill_rect_rgb(&mut block, 5, 5, 50, 50, [200, 30, 30]);
        assert_eq!(classify(&blank, &block, &cfg), DiffClass::ExtraElement);
        assert_eq!(classify(&block, &blank, &cfg), DiffClass::MissingElement);
    }

    #[test]
    fn wide_uniform_strip_is_section_spacing() {
        let cfg = ClassifyConfig::default();
        // Off-white so the whitespace-flip rule stays quiet while the strip
        // itself remains uniform.
        let reference = solid_rgb(200, 20, [248, 248, 248]);
        let mut candidate = solid_rgb(200, 20, [255, 255, 255]);
        // Speckle the candidate so neither side is blank enough for the
        // whitespace flip, but the reference strip stays uniform.
        for x in (0..200).step_by(3) {
            for y in 0..20 {
                candidate.put_pixel(x, y, image::Rgb([90, 90, 90]));
            }
        }
        assert_eq!(
            classify(&reference, &candidate, &cfg),
            DiffClass::SectionSpacing { height_px: 20 }
        );
    }

    #[test]
    fn tall_uniform_strip_is_column_spacing() {
        let cfg = ClassifyConfig::default();
        let reference = solid_rgb(20, 200, [248, 248, 248]);
        let mut candidate = solid_rgb(20, 200, [255, 255, 255]);
        for y in (0..200).step_by(3) {
            for x in 0..20 {
                candidate.put_pixel(x, y, image::Rgb([90, 90, 90]));
            }
        }
        assert_eq!(
            classify(&reference, &candidate, &cfg),
            DiffClass::ColumnSpacing { width_px: 20 }
        );
    }

    #[test]
    fn vertical_shift_of_same_content_is_a_section_shift() {
        let cfg = ClassifyConfig::default();
        let mut reference = solid_rgb(80, 80, [255, 255, 255]);
        fill_rect_rgb(&mut reference, 10, 20, 60, 12, [40, 40, 40]);
        let mut candidate = solid_rgb(80, 80, [255, 255, 255]);
        fill_rect_rgb(&mut candidate, 10, 30, 60, 12, [40, 40, 40]);
        match classify(&reference, &candidate, &cfg) {
            DiffClass::SectionShift { shift_px } => {
                assert!((8..=12).contains(&shift_px), "shift {}", shift_px)
            }
            other => panic!("expected SectionShift, got {:?}", other),
        }
    }

    #[test]
    fn color_change_with_same_structure_is_color_style() {
        let cfg = ClassifyConfig::default();
        let reference = solid_rgb(60, 60, [128, 128, 128]);
        let candidate = solid_rgb(60, 60, [128, 128, 150]);
        assert_eq!(classify(&reference, &candidate, &cfg), DiffClass::ColorStyle);
    }

    #[test]
    fn degenerate_crop_is_unknown() {
        let cfg = ClassifyConfig::default();
        let empty = RgbImage::new(0, 0);
        let other = solid_rgb(10, 10, [0, 0, 0]);
        assert_eq!(classify(&empty, &other, &cfg), DiffClass::Unknown);
    }

    #[test]
    fn line_counter_sees_bands_not_pixels() {
        let img = text_lines(100, 70, 3);
        let gray = grayscale(&img);
        assert_eq!(count_content_lines(&gray, 0.02), 3);

        let blank = GrayImage::from_pixel(50, 50, Luma([255]));
        assert_eq!(count_content_lines(&blank, 0.02), 0);
    }

    #[test]
    fn categories_partition_the_classes() {
        assert_eq!(DiffClass::ColorStyle.category(), DiffCategory::Color);
        assert_eq!(DiffClass::ExtraContent.category(), DiffCategory::Content);
        assert_eq!(DiffClass::TextContent.category(), DiffCategory::Content);
        assert_eq!(DiffClass::ExtraElement.category(), DiffCategory::Layout);
        assert_eq!(
            DiffClass::SectionShift { shift_px: 4 }.category(),
            DiffCategory::Layout
        );
        assert_eq!(DiffClass::Unknown.category(), DiffCategory::Other);
    }
}
