//! Parameters structure for the position controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the position controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Encoder pulses per meter of travel, from calibration.
    pub pulses_per_meter: f64,

    /// Position error below which the target counts as reached, in pulses.
    pub tolerance_pulses: i64,

    /// Proportional gain of the position loop.
    pub kp: f64,

    /// Integral gain of the position loop.
    pub ki: f64,

    /// Derivative gain of the position loop.
    pub kd: f64,

    /// Maximum magnitude of the speed demand, in meters per second.
    pub max_speed_dem_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            pulses_per_meter: 5000.0,
            tolerance_pulses: 50,
            kp: 0.004,
            ki: 0.0,
            kd: 0.002,
            max_speed_dem_ms: 1.5,
        }
    }
}
