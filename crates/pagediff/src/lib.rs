//! pagediff — visual-diff engine for web screenshot QA.
//!
//! Compares a freshly captured screenshot against a reference rendering and
//! reports *where* and *why* they differ. The pipeline stages are:
//!
//! 1. **Load** – PNG decoding, alpha composited over a white page background.
//! 2. **Align** – multi-scale binary features + RANSAC similarity fit,
//!    constrained to axis-aligned scale + translation (web captures never
//!    rotate); every degenerate path falls back to a plain resize.
//! 3. **Crop** – restrict comparison to the true overlapping area of the
//!    candidate's projection and the reference bounds.
//! 4. **Score** – windowed SSIM per color channel; worst-case channel forms
//!    the absolute-scaled dissimilarity map.
//! 5. **Detect** – Otsu-adaptive thresholding, dilation merging and
//!    connected components, filtered by area and mean severity.
//! 6. **Classify** – per-region heuristics label the difference kind
//!    (content bands, element presence, spacing, color/style, text).
//! 7. **Render** – heatmap, region-masked red overlay and per-issue crops.
//!
//! # Public API
//! - [`Comparator`] and [`CompareConfig`] as primary entry points
//! - [`Tolerance`] presets / percentage sensitivity
//! - [`ComparisonResult`] with its ordered [`Region`] list
//! - individual stage contracts ([`load_rgb`], [`align`], [`crop_common`],
//!   [`score`], [`detect_regions`], [`classify`]) for callers that embed
//!   single stages
//!
//! The comparison is synchronous and single-threaded per invocation; each
//! call owns its images, maps and output files exclusively. Callers that
//! want parallelism run independent comparisons on their own workers.

mod align;
mod api;
mod classify;
mod config;
mod crop;
mod error;
mod loader;
mod pipeline;
mod regions;
mod render;
mod ssim;

#[cfg(test)]
pub(crate) mod test_utils;

pub use align::{align, AlignConfig, FeatureConfig, RansacConfig, SimilarityTransform};
pub use api::Comparator;
pub use classify::{classify, ClassifyConfig, DiffCategory, DiffClass, PaddedEdge};
pub use config::{CompareConfig, RegionParams, Tolerance};
pub use crop::crop_common;
pub use error::CompareError;
pub use loader::load_rgb;
pub use pipeline::{ComparisonResult, Region};
pub use regions::{detect_regions, RegionBox};
pub use ssim::score;
