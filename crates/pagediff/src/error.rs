//! Comparison error taxonomy.
//!
//! Only unrecoverable conditions become errors. Alignment degeneracy falls
//! back to resize-alignment, an empty common area falls back to the full
//! images, and individual artifact-write failures are logged and skipped.

use std::path::PathBuf;

/// Errors that can abort a comparison.
#[derive(Debug)]
pub enum CompareError {
    /// Input image file could not be decoded.
    Decode {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },
    /// I/O failure outside per-artifact rendering (e.g. output directory
    /// creation).
    Io {
        /// Path of the offending file or directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// An input image has zero width or height.
    EmptyInput {
        /// Input width in pixels.
        width: u32,
        /// Input height in pixels.
        height: u32,
    },
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode { path, source } => {
                write!(f, "failed to decode image {}: {}", path.display(), source)
            }
            Self::Io { path, source } => {
                write!(f, "i/o error at {}: {}", path.display(), source)
            }
            Self::EmptyInput { width, height } => {
                write!(f, "input image has degenerate dimensions {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for CompareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::EmptyInput { .. } => None,
        }
    }
}
