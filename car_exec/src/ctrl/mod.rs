//! # Control cascade module
//!
//! The per-tick orchestrating controller. Each tick it:
//!
//! 1. refreshes the measured wheel speeds from the encoder sample,
//! 2. determines the target left/right speed and steering angle, from the
//!    executing plan node if one exists, else from the active scene's base
//!    speed and the extracted deviation,
//! 3. evaluates the left and right speed PID loops against those targets
//!    and the steering PID loop (setpoint zero) against the deviation,
//!    unless a manual angle is imposed by the planner or the avoidance
//!    logic,
//! 4. emits duty demands for both drive actuators and an angle demand for
//!    the steering servo.
//!
//! Scenes are whole gain/base-speed records; a scene switch swaps all three
//! loops' gains and the base speed between ticks, never mid-tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod pid;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Vehicle run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CarState {
    /// Actuators stopped, control loops idle.
    Stopped,

    /// The cascade runs every tick.
    Running,

    /// Control suspended, module state kept.
    Paused,
}

/// Obstacle avoidance sub-states, driven while skirting an obstacle without
/// planner control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AvoidState {
    Idle,
    TurningOut,
    Bypassing,
    Returning,
}

/// Possible errors that can occur during cascade processing.
///
/// The cascade is total over its inputs: arithmetic edge cases fall back to
/// guarded defaults and scene selection is closed over the scene enum, so
/// no error is currently produced.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {}

impl Default for CarState {
    fn default() -> Self {
        CarState::Stopped
    }
}

impl Default for AvoidState {
    fn default() -> Self {
        AvoidState::Idle
    }
}
