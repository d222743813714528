//! High-level comparison API.
//!
//! [`Comparator`] is the primary entry point for comparing a candidate
//! capture against its reference. It wraps a [`CompareConfig`] and provides
//! convenience constructors for common scenarios.

use std::path::Path;

use image::RgbImage;

use crate::config::{CompareConfig, Tolerance};
use crate::error::CompareError;
use crate::pipeline;
use crate::pipeline::ComparisonResult;

/// Primary comparison interface.
///
/// Encapsulates the comparison configuration. Create once, compare many
/// capture pairs.
///
/// # Examples
///
/// ```no_run
/// use pagediff::{Comparator, Tolerance};
/// use std::path::Path;
///
/// let comparator = Comparator::with_tolerance(Tolerance::Strict);
/// let result = comparator
///     .compare_files(
///         Path::new("reference.png"),
///         Path::new("capture.png"),
///         Path::new("out"),
///     )
///     .unwrap();
/// println!("score {:.3}, {} regions", result.score, result.num_regions());
/// ```
pub struct Comparator {
    config: CompareConfig,
}

impl Comparator {
    /// Create a comparator with the default configuration.
    pub fn new() -> Self {
        Self {
            config: CompareConfig::new(),
        }
    }

    /// Create a comparator with an explicit noise-tolerance policy.
    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            config: CompareConfig::with_tolerance(tolerance),
        }
    }

    /// Create with full config control.
    pub fn with_config(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut CompareConfig {
        &mut self.config
    }

    /// Compare two PNG files, writing artifacts into `out_dir`.
    pub fn compare_files(
        &self,
        reference: &Path,
        candidate: &Path,
        out_dir: &Path,
    ) -> Result<ComparisonResult, CompareError> {
        pipeline::compare_files(reference, candidate, out_dir, &self.config)
    }

    /// Compare two in-memory images, writing artifacts into `out_dir`.
    pub fn compare_images(
        &self,
        reference: &RgbImage,
        candidate: &RgbImage,
        out_dir: &Path,
    ) -> Result<ComparisonResult, CompareError> {
        pipeline::compare_images(reference, candidate, out_dir, &self.config)
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}
