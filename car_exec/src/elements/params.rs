//! Parameters structure for the feature recogniser

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the feature recogniser.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- GENERIC LIFECYCLE ----
    /// Ticks after which FOUND advances to ENTERING.
    pub found_dwell_ticks: u32,

    /// Ticks after which ENTERING advances to IN_ELEMENT.
    pub entering_dwell_ticks: u32,

    /// Ticks after which LEAVING advances to PASSED.
    pub leaving_dwell_ticks: u32,

    /// Ticks after a pass during which no new detection runs.
    pub redetect_holdoff_ticks: u32,

    // ---- INTERSECTION ----
    /// Confidence required for an intersection to become active.
    pub cross_confidence_threshold: u8,

    /// Row band checked for excess width (start, end).
    pub cross_band: (usize, usize),

    /// Width above which a row counts as wide, in pixels.
    pub cross_width_threshold: usize,

    /// Minimum number of wide rows for detection.
    pub cross_min_wide_rows: usize,

    /// Minimum band-average width for detection, in pixels.
    pub cross_min_avg_width: f64,

    /// Row band checked for the track narrowing back on exit.
    pub cross_exit_band: (usize, usize),

    /// Narrow rows required to pass the intersection.
    pub cross_exit_narrow_rows: usize,

    /// Minimum dwell before the narrow-row exit applies, in ticks.
    pub cross_exit_min_ticks: u32,

    /// Hard dwell timeout, in ticks.
    pub cross_timeout_ticks: u32,

    // ---- ROUNDABOUT ----
    /// Confidence required for a roundabout to become active.
    pub circle_confidence_threshold: u8,

    /// Row band over which the centreline curvature is averaged.
    pub circle_band: (usize, usize),

    /// Mean centreline delta above which a tick counts as curved, in
    /// pixels per row.
    pub circle_curvature_threshold: f64,

    /// Length the qualifying run must reach for detection.
    pub circle_min_run: u32,

    /// Low-curvature run length which, after the minimum dwell, passes the
    /// roundabout.
    pub circle_exit_run: u32,

    /// Minimum dwell before the low-curvature exit applies, in ticks.
    pub circle_exit_min_ticks: u32,

    /// Hard dwell timeout, in ticks.
    pub circle_timeout_ticks: u32,

    // ---- RAMP ----
    /// Confidence required for a ramp to become active.
    pub ramp_confidence_threshold: u8,

    /// Row band of the far (top) brightness sample.
    pub ramp_top_band: (usize, usize),

    /// Row band of the near (bottom) brightness sample.
    pub ramp_bottom_band: (usize, usize),

    /// Column band of both brightness samples.
    pub ramp_col_band: (usize, usize),

    /// Brightness contrast which indicates a ramp.
    pub ramp_brightness_change: f64,

    /// Valid-row floor below which rows count as lost to the ramp.
    pub ramp_edge_lost_floor: usize,

    /// Consecutive low-valid-row ticks which indicate a ramp.
    pub ramp_edge_lost_ticks: u32,

    /// Dwell after which the ramp is passed, in ticks.
    pub ramp_pass_ticks: u32,

    // ---- PARKING ----
    /// Confidence required for a parking marker to become active.
    pub parking_confidence_threshold: u8,

    /// Row band checked for marker lines.
    pub parking_band: (usize, usize),

    /// Brightness above which a within-track pixel counts as marker white.
    pub parking_white_threshold: u8,

    /// Fraction of within-track pixels which must be white for a marker
    /// row.
    pub parking_white_fraction: f64,

    /// Marker rows required for detection.
    pub parking_min_rows: usize,

    /// Estimated distance to the stop point when detected, in meters.
    pub parking_distance_m: f64,

    // ---- OBSTACLE ----
    /// Confidence required for an obstacle to become active.
    pub obstacle_confidence_threshold: u8,

    /// Row band checked for dark area.
    pub obstacle_band: (usize, usize),

    /// Row band checked by the pass handler.
    pub obstacle_exit_band: (usize, usize),

    /// Brightness below which a pixel counts as dark.
    pub obstacle_dark_threshold: u8,

    /// Dark area which triggers detection, in pixels.
    pub obstacle_min_area: usize,

    /// Dark rows required for detection.
    pub obstacle_min_rows: usize,

    /// Minimum dwell before the area-drop exit applies, in ticks.
    pub obstacle_exit_min_ticks: u32,

    /// Hard dwell timeout, in ticks.
    pub obstacle_timeout_ticks: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            found_dwell_ticks: 5,
            entering_dwell_ticks: 15,
            leaving_dwell_ticks: 10,
            redetect_holdoff_ticks: 1,

            cross_confidence_threshold: 65,
            cross_band: (20, 60),
            cross_width_threshold: 140,
            cross_min_wide_rows: 3,
            cross_min_avg_width: 80.0,
            cross_exit_band: (60, 90),
            cross_exit_narrow_rows: 20,
            cross_exit_min_ticks: 30,
            cross_timeout_ticks: 80,

            circle_confidence_threshold: 70,
            circle_band: (30, 80),
            circle_curvature_threshold: 0.6,
            circle_min_run: 10,
            circle_exit_run: 15,
            circle_exit_min_ticks: 80,
            circle_timeout_ticks: 200,

            ramp_confidence_threshold: 50,
            ramp_top_band: (10, 30),
            ramp_bottom_band: (70, 90),
            // Near full width so a laterally shifted corridor does not read
            // as a brightness change
            ramp_col_band: (10, 178),
            ramp_brightness_change: 30.0,
            ramp_edge_lost_floor: 8,
            ramp_edge_lost_ticks: 5,
            ramp_pass_ticks: 80,

            parking_confidence_threshold: 70,
            parking_band: (60, 80),
            parking_white_threshold: 200,
            parking_white_fraction: 0.7,
            parking_min_rows: 3,
            parking_distance_m: 0.6,

            obstacle_confidence_threshold: 60,
            obstacle_band: (40, 80),
            obstacle_exit_band: (50, 90),
            obstacle_dark_threshold: 100,
            obstacle_min_area: 100,
            obstacle_min_rows: 5,
            obstacle_exit_min_ticks: 40,
            obstacle_timeout_ticks: 100,
        }
    }
}
