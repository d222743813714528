//! Comparison configuration.
//!
//! [`Tolerance`] bundles the region-detector thresholds into named presets
//! (or a continuous 0–100 sensitivity percentage), and [`CompareConfig`]
//! is the top-level knob set consumed by the pipeline.

use serde::{Deserialize, Serialize};

use crate::align::AlignConfig;
use crate::classify::ClassifyConfig;

/// Noise-tolerance policy for region detection.
///
/// Presets trade sensitivity against noise: `Strict` surfaces everything,
/// `Relaxed` only obvious differences. `Percent(p)` maps a 0–100 sensitivity
/// percentage continuously between those extremes (higher = more sensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tolerance {
    /// High sensitivity: catches everything, keeps regions separate.
    Strict,
    /// Balanced sensitivity.
    #[default]
    Medium,
    /// Low sensitivity: only obvious differences, merges aggressively.
    Relaxed,
    /// Explicit sensitivity percentage in [0, 100]; values above 100 clamp.
    Percent(u8),
}

/// Derived region-detector thresholds for one tolerance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionParams {
    /// Minimum mean dissimilarity inside a region's bounding box.
    pub severity_min: u8,
    /// Minimum bounding-box area in px².
    pub min_area: u32,
    /// Dilation passes applied to the binary mask (3×3 structuring element).
    pub dilate_iter: u8,
    /// Dissimilarity cutoff used only for the overlay highlight mask.
    pub highlight_thresh: u8,
}

impl Default for RegionParams {
    fn default() -> Self {
        Tolerance::Medium.region_params()
    }
}

impl Tolerance {
    /// Resolve this policy into concrete detector thresholds.
    pub fn region_params(self) -> RegionParams {
        match self {
            Tolerance::Strict => RegionParams {
                severity_min: 3,
                min_area: 25,
                dilate_iter: 1,
                highlight_thresh: 15,
            },
            Tolerance::Medium => RegionParams {
                severity_min: 25,
                min_area: 150,
                dilate_iter: 2,
                highlight_thresh: 50,
            },
            Tolerance::Relaxed => RegionParams {
                severity_min: 60,
                min_area: 500,
                dilate_iter: 4,
                highlight_thresh: 100,
            },
            Tolerance::Percent(p) => {
                let sensitivity = p.min(100) as f64 / 100.0;
                let attenuation = 1.0 - sensitivity;
                let dilate_iter = if p >= 80 {
                    1
                } else if p >= 50 {
                    2
                } else {
                    3
                };
                RegionParams {
                    severity_min: ((130.0 * attenuation) as u8).max(3),
                    min_area: ((600.0 * attenuation) as u32).max(20),
                    dilate_iter,
                    highlight_thresh: ((200.0 * attenuation) as u8).max(5),
                }
            }
        }
    }
}

/// Top-level comparison configuration.
///
/// The `check_*` flags mirror the caller's feature toggles: `check_colors`
/// selects the color-aware scorer and retains color-classified regions,
/// `check_content` / `check_layout` retain content- and layout-classified
/// regions. Detection always runs; disabled categories are dropped after
/// classification.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Region-detection noise tolerance.
    pub tolerance: Tolerance,
    /// Score color-aware and retain color differences.
    pub check_colors: bool,
    /// Retain content/text differences.
    pub check_content: bool,
    /// Retain layout/spacing differences.
    pub check_layout: bool,
    /// Render the red-wash overlay artifact.
    pub render_overlay: bool,
    /// Geometric alignment controls.
    pub align: AlignConfig,
    /// Region classifier thresholds.
    pub classify: ClassifyConfig,
}

impl CompareConfig {
    /// Default configuration with every check enabled.
    pub fn new() -> Self {
        Self {
            tolerance: Tolerance::default(),
            check_colors: true,
            check_content: true,
            check_layout: true,
            render_overlay: true,
            align: AlignConfig::default(),
            classify: ClassifyConfig::default(),
        }
    }

    /// Configuration with an explicit tolerance policy.
    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            ..Self::new()
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_thresholds_are_stable() {
        let strict = Tolerance::Strict.region_params();
        assert_eq!(strict.severity_min, 3);
        assert_eq!(strict.min_area, 25);
        assert_eq!(strict.dilate_iter, 1);

        let relaxed = Tolerance::Relaxed.region_params();
        assert_eq!(relaxed.severity_min, 60);
        assert_eq!(relaxed.min_area, 500);
        assert_eq!(relaxed.dilate_iter, 4);
    }

    #[test]
    fn presets_order_monotonically() {
        let s = Tolerance::Strict.region_params();
        let m = Tolerance::Medium.region_params();
        let r = Tolerance::Relaxed.region_params();
        assert!(s.severity_min < m.severity_min && m.severity_min < r.severity_min);
        assert!(s.min_area < m.min_area && m.min_area < r.min_area);
        assert!(s.dilate_iter < m.dilate_iter && m.dilate_iter < r.dilate_iter);
    }

    #[test]
    fn percent_interpolates_between_extremes() {
        let high = Tolerance::Percent(95).region_params();
        let low = Tolerance::Percent(25).region_params();
        assert!(high.severity_min < low.severity_min);
        assert!(high.min_area < low.min_area);
        assert!(high.dilate_iter < low.dilate_iter);
        // High sensitivity keeps subtle differences.
        assert!(high.severity_min <= 7);
        // Low sensitivity only keeps obvious ones.
        assert!(low.severity_min >= 90);
    }

    #[test]
    fn percent_clamps_and_floors() {
        let max = Tolerance::Percent(200).region_params();
        assert_eq!(max.severity_min, 3);
        assert_eq!(max.min_area, 20);
        assert_eq!(max.highlight_thresh, 5);

        let min = Tolerance::Percent(0).region_params();
        assert_eq!(min.severity_min, 130);
        assert_eq!(min.min_area, 600);
    }
}
