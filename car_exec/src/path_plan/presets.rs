//! Preset maneuver templates
//!
//! Each recognised feature maps to a short fixed template of nodes. Speeds
//! are fractions of the active scene's base speed, distances and angles are
//! preset per template. Negative angles steer left.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::{PathNode, PathType};
use crate::elements::ElementType;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Roundabout template: approach straight, arc, exit straight.
pub(super) fn circle(left: bool, base_speed_ms: f64) -> Vec<PathNode> {
    let (arc_type, arc_angle) = if left {
        (PathType::LeftCircle, -25.0)
    } else {
        (PathType::RightCircle, 25.0)
    };

    vec![
        PathNode {
            node_type: PathType::Straight,
            element: ElementType::None,
            distance_m: 0.3,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.8,
            target_angle_deg: 0.0,
            priority: 10,
        },
        PathNode {
            node_type: arc_type,
            element: ElementType::Circle,
            distance_m: 2.0,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.7,
            target_angle_deg: arc_angle,
            priority: 20,
        },
        PathNode {
            node_type: PathType::Straight,
            element: ElementType::None,
            distance_m: 0.5,
            duration_ms: 0,
            target_speed_ms: base_speed_ms,
            target_angle_deg: 0.0,
            priority: 30,
        },
    ]
}

/// Intersection straight template: a single pass-through node.
pub(super) fn cross_straight(base_speed_ms: f64) -> Vec<PathNode> {
    vec![PathNode {
        node_type: PathType::CrossStraight,
        element: ElementType::Cross,
        distance_m: 1.5,
        duration_ms: 0,
        target_speed_ms: base_speed_ms,
        target_angle_deg: 0.0,
        priority: 10,
    }]
}

/// Intersection turn template: approach, biased turn, exit.
pub(super) fn cross_turn(left: bool, base_speed_ms: f64) -> Vec<PathNode> {
    let (turn_type, turn_angle) = if left {
        (PathType::CrossLeft, -30.0)
    } else {
        (PathType::CrossRight, 30.0)
    };

    vec![
        PathNode {
            node_type: PathType::Straight,
            element: ElementType::None,
            distance_m: 0.5,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.8,
            target_angle_deg: 0.0,
            priority: 10,
        },
        PathNode {
            node_type: turn_type,
            element: ElementType::Cross,
            distance_m: 0.8,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.6,
            target_angle_deg: turn_angle,
            priority: 20,
        },
        PathNode {
            node_type: PathType::Straight,
            element: ElementType::None,
            distance_m: 0.5,
            duration_ms: 0,
            target_speed_ms: base_speed_ms,
            target_angle_deg: 0.0,
            priority: 30,
        },
    ]
}

/// Obstacle avoidance template: avoid turn, bypass straight, return turn.
pub(super) fn avoid_obstacle(left: bool, base_speed_ms: f64) -> Vec<PathNode> {
    let (avoid_type, avoid_angle) = if left {
        (PathType::AvoidLeft, -20.0)
    } else {
        (PathType::AvoidRight, 20.0)
    };

    let (return_type, return_angle) = if left {
        (PathType::RightTurn, 20.0)
    } else {
        (PathType::LeftTurn, -20.0)
    };

    vec![
        PathNode {
            node_type: avoid_type,
            element: ElementType::Obstacle,
            distance_m: 0.5,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.6,
            target_angle_deg: avoid_angle,
            priority: 10,
        },
        PathNode {
            node_type: PathType::Straight,
            element: ElementType::None,
            distance_m: 0.8,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.7,
            target_angle_deg: 0.0,
            priority: 20,
        },
        PathNode {
            node_type: return_type,
            element: ElementType::None,
            distance_m: 0.5,
            duration_ms: 0,
            target_speed_ms: base_speed_ms * 0.6,
            target_angle_deg: return_angle,
            priority: 30,
        },
    ]
}

/// Ramp template: a single boosted straight.
pub(super) fn ramp(base_speed_ms: f64) -> Vec<PathNode> {
    vec![PathNode {
        node_type: PathType::Ramp,
        element: ElementType::Ramp,
        distance_m: 3.0,
        duration_ms: 3000,
        target_speed_ms: base_speed_ms * 1.3,
        target_angle_deg: 0.0,
        priority: 10,
    }]
}

/// Parking template: a single position-controlled stop node.
pub(super) fn parking(stop_distance_m: f64) -> Vec<PathNode> {
    vec![PathNode {
        node_type: PathType::Parking,
        element: ElementType::Parking,
        distance_m: stop_distance_m,
        duration_ms: 0,
        target_speed_ms: 0.0,
        target_angle_deg: 0.0,
        // Parking outranks everything
        priority: 0,
    }]
}
