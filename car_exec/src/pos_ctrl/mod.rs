//! # Position controller module
//!
//! Integrates encoder pulse deltas into an odometry distance and, when
//! armed, holds a longitudinal position with a PID loop whose output is a
//! speed demand. Used by parking maneuvers and the stop-at-distance
//! command.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Position control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PosMode {
    /// Not holding a position, only integrating odometry.
    Disabled,

    /// Driving towards the target position.
    Enabled,

    /// The target position has been reached.
    Reached,
}

impl Default for PosMode {
    fn default() -> Self {
        PosMode::Disabled
    }
}
