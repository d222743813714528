//! Pipeline orchestrator: load → align → crop → score → detect → classify
//! → render.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::align;
use crate::classify;
use crate::config::CompareConfig;
use crate::crop::crop_common;
use crate::error::CompareError;
use crate::loader::load_rgb;
use crate::regions::{detect_regions, RegionBox};
use crate::render;
use crate::ssim;

use super::{ComparisonResult, Region};

/// Compare two PNG files and write artifacts into `out_dir`.
pub(crate) fn compare_files(
    reference_path: &Path,
    candidate_path: &Path,
    out_dir: &Path,
    config: &CompareConfig,
) -> Result<ComparisonResult, CompareError> {
    let reference = load_rgb(reference_path)?;
    let candidate = load_rgb(candidate_path)?;
    compare_images(&reference, &candidate, out_dir, config)
}

/// Compare two in-memory images and write artifacts into `out_dir`.
pub(crate) fn compare_images(
    reference: &RgbImage,
    candidate: &RgbImage,
    out_dir: &Path,
    config: &CompareConfig,
) -> Result<ComparisonResult, CompareError> {
    if reference.width() == 0 || reference.height() == 0 {
        return Err(CompareError::EmptyInput {
            width: reference.width(),
            height: reference.height(),
        });
    }
    if candidate.width() == 0 || candidate.height() == 0 {
        return Err(CompareError::EmptyInput {
            width: candidate.width(),
            height: candidate.height(),
        });
    }
    std::fs::create_dir_all(out_dir).map_err(|source| CompareError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    // Alignment + common-area crop.
    let candidate_dims = candidate.dimensions();
    let (aligned, transform) = align::align(reference, candidate, &config.align);
    tracing::debug!(aligned = transform.is_some(), "alignment finished");
    let (reference, aligned) = crop_common(reference, &aligned, transform.as_ref(), candidate_dims);
    let (w, h) = reference.dimensions();

    let aligned_path = save_artifact(&aligned, &out_dir.join("stage_aligned.png"));

    // Perceptual scoring.
    let (score, dissim) = ssim::score(&reference, &aligned, config.check_colors);
    tracing::debug!(score, "similarity scored");

    // Region detection and classification.
    let params = config.tolerance.region_params();
    let raw_regions = detect_regions(&dissim, &params);
    tracing::debug!(candidates = raw_regions.len(), "regions detected");

    let mut kept_boxes: Vec<RegionBox> = Vec::new();
    let mut regions: Vec<Region> = Vec::new();
    for raw in raw_regions {
        let ref_crop = image::imageops::crop_imm(&reference, raw.x, raw.y, raw.w, raw.h).to_image();
        let cand_crop = image::imageops::crop_imm(&aligned, raw.x, raw.y, raw.w, raw.h).to_image();
        let kind = classify::classify(&ref_crop, &cand_crop, &config.classify);

        let keep = match kind.category() {
            classify::DiffCategory::Color => config.check_colors,
            classify::DiffCategory::Content => config.check_content,
            classify::DiffCategory::Layout => config.check_layout,
            classify::DiffCategory::Other => true,
        };
        if !keep {
            tracing::debug!(%kind, "region dropped by category filter");
            continue;
        }

        let id = regions.len() + 1;
        let crop = render::region_crop(&aligned, &raw);
        let crop_path = save_artifact(&crop, &out_dir.join(format!("issue_{}.png", id)));

        regions.push(Region {
            id,
            x: raw.x,
            y: raw.y,
            w: raw.w,
            h: raw.h,
            severity: raw.severity,
            kind,
            description: kind.to_string(),
            location: location_label(raw.x, raw.y, raw.w, raw.h, w, h),
            dims: format!("{}x{}px", raw.w, raw.h),
            crop_path,
        });
        kept_boxes.push(raw);
    }

    // Overlay, heatmap and change ratio.
    let heatmap_path = save_artifact(&render::render_heatmap(&dissim), &out_dir.join("diff_heatmap.png"));

    let total_pixels = (w as u64 * h as u64).max(1);
    let (change_pixels, overlay_path) = if config.render_overlay {
        let (mask, count) = render::highlight_mask(&dissim, &kept_boxes, params.highlight_thresh);
        let overlay = render::render_overlay(&aligned, &mask, &kept_boxes);
        (count, save_artifact(&overlay, &out_dir.join("diff_overlay.png")))
    } else {
        // Without the overlay mask, approximate with the region area sum.
        let area: u64 = kept_boxes.iter().map(|r| r.w as u64 * r.h as u64).sum();
        (area.min(total_pixels), None)
    };
    let change_ratio = change_pixels as f64 / total_pixels as f64;

    tracing::info!(
        score,
        change_ratio,
        regions = regions.len(),
        "comparison finished"
    );

    Ok(ComparisonResult {
        score,
        change_ratio,
        regions,
        image_size: [w, h],
        transform: transform.map(|t| t.to_rows()),
        aligned_path,
        overlay_path,
        heatmap_path,
    })
}

/// Write one artifact; failures are logged and the comparison continues.
fn save_artifact(img: &RgbImage, path: &Path) -> Option<PathBuf> {
    match img.save(path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to write artifact, continuing");
            None
        }
    }
}

/// Quadrant-based human-readable location tag.
pub(crate) fn location_label(x: u32, y: u32, w: u32, h: u32, total_w: u32, total_h: u32) -> String {
    let cw = total_w as f64 / 2.0;
    let ch = total_h as f64 / 2.0;

    let vertical = if ((y + h) as f64) < ch * 0.6 {
        "Top"
    } else if y as f64 > ch * 1.4 {
        "Bottom"
    } else {
        "Center"
    };
    let horizontal = if ((x + w) as f64) < cw * 0.6 {
        "Left"
    } else if x as f64 > cw * 1.4 {
        "Right"
    } else {
        "Center"
    };

    if vertical == "Center" && horizontal == "Center" {
        return "Center".to_string();
    }
    format!("{}-{}", vertical, horizontal)
}
