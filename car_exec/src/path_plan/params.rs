//! Parameters structure for the path planner

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the path planner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- COST WEIGHTS ----
    /// Weight of the distance term in the node cost.
    pub distance_weight: f64,

    /// Weight of the time term in the node cost.
    pub time_weight: f64,

    /// Weight of the risk term in the node cost.
    pub risk_weight: f64,

    // ---- PREFERENCES ----
    /// Preference for left-handed options, 0-100.
    pub prefer_left: u8,

    /// Preference for right-handed options, 0-100.
    pub prefer_right: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            distance_weight: 0.4,
            time_weight: 0.3,
            risk_weight: 0.3,
            prefer_left: 50,
            prefer_right: 50,
        }
    }
}
