//! Parameters structure for the track extractor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use sense_if::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Thresholding strategy used to binarise a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Constant threshold level.
    Fixed,

    /// Global histogram-variance split (Otsu).
    Otsu,

    /// Local adaptive mean over a window, minus a fixed bias.
    Adaptive,

    /// Adaptive above the midline row, global Otsu below. Distant rows see
    /// more lighting variance than the near field.
    Banded,
}

/// Edge extraction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeScanMode {
    /// Gradient-tracked scan anchored on the previous row's edges.
    GradientScan,

    /// Longest-white-column anchoring with smoothing, repair and centreline
    /// fit.
    ColumnScan,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the track extractor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- THRESHOLDING ----
    /// Strategy used to binarise the frame.
    pub threshold_mode: ThresholdMode,

    /// Threshold level for `ThresholdMode::Fixed`.
    pub fixed_threshold: u8,

    /// Window size of the local adaptive mean, in pixels.
    pub adaptive_block_size: usize,

    /// Bias subtracted from the local mean to reject noise.
    pub adaptive_offset: u8,

    /// If true one erosion then one dilation pass is applied to the mask.
    pub morphology_enabled: bool,

    // ---- EDGE SCAN ----
    /// Edge extraction algorithm to run.
    pub edge_scan_mode: EdgeScanMode,

    /// Bottom row of the scan window (scans run bottom to top).
    pub scan_start_row: usize,

    /// Top row of the scan window (exclusive).
    pub scan_end_row: usize,

    /// Row step of the scan.
    pub scan_step: usize,

    /// Margin of columns excluded at both image borders.
    pub edge_search_margin: usize,

    /// Minimum raw-intensity gradient accepted as an edge transition.
    pub gradient_threshold: i16,

    /// Maximum edge position change between adjacent rows, in pixels.
    pub edge_jump_limit: usize,

    // ---- ROW VALIDATION ----
    /// Minimum plausible track width in pixels.
    pub track_width_min: usize,

    /// Maximum plausible track width in pixels.
    pub track_width_max: usize,

    /// Minimum number of valid rows for the track to count as found.
    pub track_found_min_rows: usize,

    // ---- COLUMN SCAN ----
    /// First column of the band searched for the longest white columns.
    pub column_band_start: usize,

    /// Last column (exclusive) of the band searched for the longest white
    /// columns.
    pub column_band_end: usize,

    /// Number of trailing valid transitions blended into the repair slope.
    pub repair_slope_points: usize,

    /// Minimum number of valid rows required before the least squares fit is
    /// attempted.
    pub fit_min_points: usize,

    /// Maximum difference between fitted and raw centre for the blend to be
    /// applied, in pixels.
    pub fit_blend_max_diff_px: f64,

    // ---- DEVIATION ----
    /// Clamp applied to the deviation signal, in pixels.
    pub deviation_limit_px: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            threshold_mode: ThresholdMode::Fixed,
            fixed_threshold: 128,
            adaptive_block_size: 16,
            adaptive_offset: 10,
            morphology_enabled: false,
            edge_scan_mode: EdgeScanMode::GradientScan,
            scan_start_row: 110,
            scan_end_row: 10,
            scan_step: 1,
            edge_search_margin: 10,
            gradient_threshold: 50,
            edge_jump_limit: 30,
            track_width_min: 20,
            track_width_max: FRAME_WIDTH,
            track_found_min_rows: 50,
            column_band_start: 30,
            column_band_end: FRAME_WIDTH - 30,
            repair_slope_points: 5,
            fit_min_points: 10,
            fit_blend_max_diff_px: 20.0,
            deviation_limit_px: 80.0,
        }
    }
}

impl Params {
    /// True if the scan window lies inside the image and runs bottom to top.
    pub fn scan_window_valid(&self) -> bool {
        self.scan_start_row > self.scan_end_row
            && self.scan_start_row < FRAME_HEIGHT
            && self.scan_step > 0
    }
}
