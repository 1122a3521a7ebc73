//! # Telemetry module
//!
//! The telemetry snapshot summarising the control core state for the
//! out-of-scope display and tuning link. Field names here are the contract
//! with those consumers.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Telemetry snapshot sent once per tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarTm {
    /// Cycle number this snapshot was taken on.
    pub cycle: u64,

    /// True if the track was found this tick.
    pub track_found: bool,

    /// Lateral deviation in pixels.
    pub deviation_px: f64,

    /// Name of the active feature type, "NONE" if idle.
    pub element_type: String,

    /// Name of the active feature's lifecycle state.
    pub element_state: String,

    /// Confidence of the active feature, 0-100.
    pub element_confidence: u8,

    /// Name of the path plan state.
    pub plan_state: String,

    /// Plan progress as current_node / node_count x 100.
    pub plan_progress: u8,

    /// Number of intersections passed this run.
    pub cross_count: u8,

    /// Number of roundabouts passed this run.
    pub circle_count: u8,

    /// Number of obstacles passed this run.
    pub obstacle_count: u8,

    /// Demanded left drive duty.
    pub left_duty: f64,

    /// Demanded right drive duty.
    pub right_duty: f64,

    /// Demanded steering angle in degrees.
    pub steer_angle_deg: f64,
}
