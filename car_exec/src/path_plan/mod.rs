//! # Path planner module
//!
//! The planner reacts to a newly found track feature by queueing a short
//! template of maneuver nodes (capacity 20), then executes the queue node by
//! node. Each node carries a target distance, duration, speed and steering
//! angle; a node completes when its distance is travelled, its duration
//! elapses, or its associated feature is passed, whichever comes first.
//!
//! In `Optimal` decision mode competing templates for a feature (for
//! instance the three intersection variants) are scored with a weighted
//! distance/time/risk cost and the cheapest is queued. `Manual` mode
//! suppresses planning entirely.
//!
//! No internal transition produces the `Failed` state; it exists for an
//! external fault signal only.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cost;
mod params;
mod presets;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use cost::*;
pub use params::*;
pub use state::*;

use crate::elements::ElementType;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Capacity of the maneuver node queue.
pub const NODE_QUEUE_CAPACITY: usize = 20;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Types of maneuver node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathType {
    Straight,
    LeftTurn,
    RightTurn,
    LeftCircle,
    RightCircle,
    CrossStraight,
    CrossLeft,
    CrossRight,
    AvoidLeft,
    AvoidRight,
    Ramp,
    Parking,
}

/// States of the path plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    /// No plan queued.
    Idle,

    /// A template is being built.
    Planning,

    /// The queue is being executed node by node.
    Executing,

    /// The queue was exhausted.
    Completed,

    /// Reachable through an external fault signal only.
    Failed,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One atomic planned motion segment. Immutable once enqueued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PathNode {
    /// Maneuver type of the node.
    pub node_type: PathType,

    /// Feature the node belongs to, `None` for connecting segments.
    pub element: ElementType,

    /// Target distance to travel, in meters. Zero disables the distance
    /// completion check.
    pub distance_m: f64,

    /// Target duration, in milliseconds. Zero disables the duration
    /// completion check.
    pub duration_ms: u32,

    /// Target speed while the node executes, in meters per second.
    pub target_speed_ms: f64,

    /// Target steering angle while the node executes, in degrees. Zero
    /// leaves steering to the deviation loop.
    pub target_angle_deg: f64,

    /// Selection priority, lower is preferred. Feeds the cost model only.
    pub priority: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PathType {
    fn default() -> Self {
        PathType::Straight
    }
}

impl Default for PlanState {
    fn default() -> Self {
        PlanState::Idle
    }
}

impl Default for PathNode {
    fn default() -> Self {
        Self {
            node_type: PathType::Straight,
            element: ElementType::None,
            distance_m: 0.0,
            duration_ms: 0,
            target_speed_ms: 0.0,
            target_angle_deg: 0.0,
            priority: 0,
        }
    }
}

impl std::fmt::Display for PathType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            PathType::Straight => "STRAIGHT",
            PathType::LeftTurn => "LEFT_TURN",
            PathType::RightTurn => "RIGHT_TURN",
            PathType::LeftCircle => "LEFT_CIRCLE",
            PathType::RightCircle => "RIGHT_CIRCLE",
            PathType::CrossStraight => "CROSS_STRAIGHT",
            PathType::CrossLeft => "CROSS_LEFT",
            PathType::CrossRight => "CROSS_RIGHT",
            PathType::AvoidLeft => "AVOID_LEFT",
            PathType::AvoidRight => "AVOID_RIGHT",
            PathType::Ramp => "RAMP",
            PathType::Parking => "PARKING",
        };
        write!(f, "{}", name)
    }
}
