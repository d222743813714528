use std::path::PathBuf;

use crate::classify::DiffClass;

/// One retained difference region with its report metadata.
///
/// Coordinates are in common-area pixels. The descriptive fields
/// (`description`, `location`, `dims`) are consumed verbatim by report
/// renderers, which do no image analysis of their own — keep them stable
/// and self-describing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Region {
    /// 1-based issue number in report order.
    pub id: usize,
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
    /// Mean dissimilarity inside the bounding box (0–255).
    pub severity: f32,
    /// Classified difference kind.
    pub kind: DiffClass,
    /// Human-readable kind label, e.g. "Color/Style Mismatch".
    pub description: String,
    /// Quadrant-based location tag, e.g. "Top-Left".
    pub location: String,
    /// Human-readable dimensions, e.g. "50x50px".
    pub dims: String,
    /// Path of the rendered crop, if it was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_path: Option<PathBuf>,
}

/// Full comparison result for one reference/candidate pair.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComparisonResult {
    /// Global similarity score in SSIM range (1 = identical).
    pub score: f64,
    /// Fraction of common-area pixels flagged as changed.
    pub change_ratio: f64,
    /// Retained regions in row-major order.
    pub regions: Vec<Region>,
    /// Common-area dimensions [width, height].
    pub image_size: [u32; 2],
    /// Accepted candidate→reference transform (row-major 2×3), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<[[f64; 3]; 2]>,
    /// Path of the aligned candidate artifact, if it was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned_path: Option<PathBuf>,
    /// Path of the overlay artifact, if rendering was enabled and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_path: Option<PathBuf>,
    /// Path of the heatmap artifact, if it was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap_path: Option<PathBuf>,
}

impl ComparisonResult {
    /// Number of retained regions.
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }
}
