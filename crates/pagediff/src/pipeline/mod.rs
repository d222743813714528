//! High-level comparison pipeline.
//!
//! This module is the internal "glue" layer that wires together the stages:
//! load → align → crop-common → score → detect → classify/filter → render.
//!
//! Algorithmic primitives live in `crate::align`, `crate::ssim`,
//! `crate::regions`, `crate::classify` and `crate::render`. The pipeline
//! layer focuses on stage boundaries, call order, artifact placement and
//! result assembly.

mod result;
mod run;

pub use result::{ComparisonResult, Region};

pub(crate) use run::{compare_files, compare_images};
