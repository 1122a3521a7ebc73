//! # Track extractor module
//!
//! The track extractor converts one monochrome camera frame per tick into:
//!
//! - per-row track geometry (left edge, right edge, centreline, width),
//! - a lateral deviation signal used as the steering error.
//!
//! Processing is staged: the frame is binarised by the configured threshold
//! strategy, optionally cleaned with one erode/dilate pass, then scanned by
//! one of two interchangeable edge algorithms:
//!
//! - [`EdgeScanMode::GradientScan`] - bottom-to-top row scan anchored on the
//!   previous row's edges, accepting foreground to background transitions
//!   with a strong raw-intensity gradient.
//! - [`EdgeScanMode::ColumnScan`] - longest-white-column anchoring with
//!   per-row pattern matching, smoothing, lost-row repair and a least
//!   squares centreline fit.
//!
//! Partial edge loss never aborts a frame: missing edges are substituted
//! from the previous row or predicted from slope. Full loss only clears the
//! `track_found` flag, the geometry keeps its last written values and the
//! deviation holds.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod scan_columns;
mod scan_gradient;
mod state;
mod threshold;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;
pub use threshold::{binarize, otsu_threshold, Mask};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Foreground (track surface) value in the binary mask.
pub const MASK_FOREGROUND: u8 = 255;

/// Background value in the binary mask.
pub const MASK_BACKGROUND: u8 = 0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during track extraction.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error(
        "Invalid scan window: start row {start} must be below end row {end} in the image"
    )]
    InvalidScanWindow { start: usize, end: usize },
}
