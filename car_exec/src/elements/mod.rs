//! # Feature recogniser module
//!
//! Detects track features (intersections, roundabouts, ramps, obstacles,
//! parking markers) from the extracted geometry and the raw frame, and
//! advances the active feature through its lifecycle:
//!
//! ```text
//! NONE -> FOUND -> ENTERING -> IN_ELEMENT -> LEAVING -> PASSED -> NONE
//! ```
//!
//! At most one feature is active at a time. While idle the detectors run in
//! fixed priority order (parking > obstacle > roundabout > intersection >
//! ramp) and the first to fire with sufficient confidence becomes active.
//! While active, a generic dwell-driven lifecycle is composed with a
//! per-type handler which may force `PASSED` early. A passed feature is
//! archived as the last element and the recogniser returns to idle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod detect;
mod handle;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Types of track feature the recogniser can identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    /// No feature
    None,

    /// Intersection (crossing)
    Cross,

    /// Roundabout
    Circle,

    /// Ramp
    Ramp,

    /// Obstacle on the track
    Obstacle,

    /// Parking marker
    Parking,
}

/// Lifecycle states of a feature episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementState {
    /// No feature active
    None,

    /// Feature detected, not yet entered
    Found,

    /// Vehicle is entering the feature
    Entering,

    /// Vehicle is inside the feature
    InElement,

    /// Vehicle is leaving the feature
    Leaving,

    /// Feature has been passed, terminal for the episode
    Passed,
}

/// Turn direction of a roundabout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
}

/// Possible errors that can occur during feature recognition.
///
/// Recognition is total over its inputs: unmet detector preconditions simply
/// leave the recogniser idle, so no error is currently produced.
#[derive(Debug, thiserror::Error)]
pub enum ElementError {}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ElementType {
    fn default() -> Self {
        ElementType::None
    }
}

impl Default for ElementState {
    fn default() -> Self {
        ElementState::None
    }
}

impl Default for TurnDirection {
    fn default() -> Self {
        TurnDirection::Left
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ElementType::None => "NONE",
            ElementType::Cross => "CROSS",
            ElementType::Circle => "CIRCLE",
            ElementType::Ramp => "RAMP",
            ElementType::Obstacle => "OBSTACLE",
            ElementType::Parking => "PARKING",
        };
        write!(f, "{}", name)
    }
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ElementState::None => "NONE",
            ElementState::Found => "FOUND",
            ElementState::Entering => "ENTERING",
            ElementState::InElement => "IN_ELEMENT",
            ElementState::Leaving => "LEAVING",
            ElementState::Passed => "PASSED",
        };
        write!(f, "{}", name)
    }
}
