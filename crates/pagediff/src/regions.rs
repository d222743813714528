//! Region detection on the dissimilarity map.
//!
//! Light Gaussian blur suppresses single-pixel noise, Otsu picks a
//! data-driven threshold adapted to each comparison's noise floor, dilation
//! merges nearby fragments, and 8-connected components become bounding-box
//! candidates. Candidates are filtered by area and by mean in-box severity;
//! the severity filter (not area alone) is what keeps issue counts
//! monotonic across tolerance presets.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::RegionParams;

/// A detected difference region in common-area pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
    /// Mean dissimilarity inside the bounding box.
    pub severity: f32,
}

/// Detect difference regions in a dissimilarity map.
///
/// Returns regions sorted top-to-bottom, left-to-right for deterministic,
/// human-scannable ordering.
pub fn detect_regions(dissim: &GrayImage, params: &RegionParams) -> Vec<RegionBox> {
    let (w, h) = dissim.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // 3x3 Gaussian kernel equivalent.
    let blurred = gaussian_blur_f32(dissim, 0.8);
    let level = otsu_level(&blurred);
    let mask = threshold(&blurred, level, ThresholdType::Binary);
    let mask = if params.dilate_iter > 0 {
        dilate(&mask, Norm::LInf, params.dilate_iter)
    } else {
        mask
    };

    let labeled = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

    // Bounding box per component; BTreeMap keeps label iteration stable.
    let mut boxes: BTreeMap<u32, (u32, u32, u32, u32)> = BTreeMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let id = label[0];
        if id == 0 {
            continue;
        }
        let entry = boxes.entry(id).or_insert((x, x, y, y));
        entry.0 = entry.0.min(x);
        entry.1 = entry.1.max(x);
        entry.2 = entry.2.min(y);
        entry.3 = entry.3.max(y);
    }

    let mut regions: Vec<RegionBox> = boxes
        .into_values()
        .filter_map(|(x0, x1, y0, y1)| {
            let bw = x1 - x0 + 1;
            let bh = y1 - y0 + 1;
            if bw * bh < params.min_area {
                return None;
            }
            let severity = mean_in_box(dissim, x0, y0, bw, bh);
            if severity < params.severity_min as f32 {
                return None;
            }
            Some(RegionBox {
                x: x0,
                y: y0,
                w: bw,
                h: bh,
                severity,
            })
        })
        .collect();

    regions.sort_by_key(|r| (r.y, r.x));
    regions
}

fn mean_in_box(map: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> f32 {
    let mut sum = 0u64;
    for yy in y..y + h {
        for xx in x..x + w {
            sum += map.get_pixel(xx, yy)[0] as u64;
        }
    }
    sum as f32 / (w * h) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tolerance;
    use crate::test_utils::fill_rect_gray;

    fn loose_params(severity_min: u8) -> RegionParams {
        RegionParams {
            severity_min,
            min_area: 9,
            dilate_iter: 1,
            highlight_thresh: 15,
        }
    }

    #[test]
    fn empty_map_has_no_regions() {
        let map = GrayImage::new(120, 90);
        assert!(detect_regions(&map, &Tolerance::Medium.region_params()).is_empty());
    }

    #[test]
    fn single_blob_yields_one_region_around_it() {
        let mut map = GrayImage::new(200, 150);
        fill_rect_gray(&mut map, 40, 30, 30, 20, 220);
        let regions = detect_regions(&map, &loose_params(50));
        assert_eq!(regions.len(), 1);
        let r = regions[0];
        // Blur + one dilation pass pad the box by a few pixels at most.
        assert!(r.x >= 35 && r.x <= 40, "x = {}", r.x);
        assert!(r.y >= 25 && r.y <= 30, "y = {}", r.y);
        assert!((28..=40).contains(&r.w), "w = {}", r.w);
        assert!((18..=30).contains(&r.h), "h = {}", r.h);
        assert!(r.severity > 50.0);
    }

    #[test]
    fn severity_filter_keeps_exactly_the_stronger_blob() {
        let mut map = GrayImage::new(200, 100);
        // Strong blob passes, weak blob survives Otsu but fails severity.
        fill_rect_gray(&mut map, 20, 20, 20, 20, 255);
        fill_rect_gray(&mut map, 120, 20, 20, 20, 120);
        let regions = detect_regions(&map, &loose_params(200));
        assert_eq!(regions.len(), 1);
        assert!((17..=21).contains(&regions[0].x), "x = {}", regions[0].x);
        // Dropping the severity gate brings the weak blob back.
        let regions = detect_regions(&map, &loose_params(40));
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn min_area_discards_specks() {
        let mut map = GrayImage::new(100, 100);
        fill_rect_gray(&mut map, 10, 10, 3, 3, 255);
        let params = RegionParams {
            severity_min: 3,
            min_area: 400,
            dilate_iter: 0,
            highlight_thresh: 15,
        };
        assert!(detect_regions(&map, &params).is_empty());
    }

    #[test]
    fn regions_sort_row_major() {
        let mut map = GrayImage::new(300, 300);
        fill_rect_gray(&mut map, 200, 20, 20, 20, 255);
        fill_rect_gray(&mut map, 20, 20, 20, 20, 255);
        fill_rect_gray(&mut map, 20, 200, 20, 20, 255);
        let regions = detect_regions(&map, &loose_params(50));
        assert_eq!(regions.len(), 3);
        assert!(regions[0].y <= regions[1].y && regions[1].y <= regions[2].y);
        assert!(regions[0].x < regions[1].x);
    }

    #[test]
    fn preset_ordering_is_monotonic_on_a_mixed_map() {
        let mut map = GrayImage::new(400, 300);
        // A spread of difference strengths and sizes.
        fill_rect_gray(&mut map, 20, 20, 30, 30, 255);
        fill_rect_gray(&mut map, 100, 20, 12, 12, 140);
        fill_rect_gray(&mut map, 180, 20, 7, 7, 90);
        fill_rect_gray(&mut map, 20, 120, 40, 8, 70);
        fill_rect_gray(&mut map, 120, 120, 6, 6, 200);

        let n_strict = detect_regions(&map, &Tolerance::Strict.region_params()).len();
        let n_medium = detect_regions(&map, &Tolerance::Medium.region_params()).len();
        let n_relaxed = detect_regions(&map, &Tolerance::Relaxed.region_params()).len();
        assert!(
            n_strict >= n_medium && n_medium >= n_relaxed,
            "strict={} medium={} relaxed={}",
            n_strict,
            n_medium,
            n_relaxed
        );
        assert!(n_strict >= 1);
    }
}
