//! Maneuver node cost model
//!
//! `cost = w_d * distance + w_t * time + w_r * risk + 0.01 * priority`,
//! where time is distance over speed when the node carries a speed, else
//! the node duration, and risk is a constant per maneuver class.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use ordered_float::OrderedFloat;
use serde::Serialize;

// Internal
use super::{Params, PathNode, PathType};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cost breakdown of one maneuver node.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PathCost {
    pub distance_cost: f64,
    pub time_cost: f64,
    pub risk_cost: f64,
    pub total_cost: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the cost of a node under the configured weights.
pub fn calculate_cost(node: &PathNode, params: &Params) -> PathCost {
    let distance_cost = node.distance_m * params.distance_weight;

    // Time from distance and speed where possible, otherwise the fixed
    // duration term
    let time_cost = if node.target_speed_ms > 0.0 {
        (node.distance_m / node.target_speed_ms) * params.time_weight
    } else {
        (node.duration_ms as f64 / 1000.0) * params.time_weight
    };

    let risk_cost = risk_constant(node.node_type) * params.risk_weight;

    let total_cost = distance_cost + time_cost + risk_cost + (node.priority as f64 * 0.01);

    PathCost {
        distance_cost,
        time_cost,
        risk_cost,
        total_cost,
    }
}

/// Select the minimum-cost candidate. Ties resolve to the first listed
/// candidate.
///
/// Returns `None` for an empty candidate list.
pub fn select_optimal(candidates: &[PathNode], params: &Params) -> Option<PathType> {
    candidates
        .iter()
        .min_by_key(|node| OrderedFloat(calculate_cost(node, params).total_cost))
        .map(|node| node.node_type)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Risk constant per maneuver class: straight < turn < arc < avoidance.
fn risk_constant(node_type: PathType) -> f64 {
    match node_type {
        PathType::Straight | PathType::CrossStraight | PathType::Ramp => 1.0,
        PathType::LeftTurn
        | PathType::RightTurn
        | PathType::CrossLeft
        | PathType::CrossRight => 1.5,
        PathType::LeftCircle | PathType::RightCircle => 2.0,
        PathType::AvoidLeft | PathType::AvoidRight => 2.5,
        PathType::Parking => 1.0,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::elements::ElementType;

    fn node(node_type: PathType, distance_m: f64, speed: f64, priority: u8) -> PathNode {
        PathNode {
            node_type,
            element: ElementType::None,
            distance_m,
            duration_ms: 0,
            target_speed_ms: speed,
            target_angle_deg: 0.0,
            priority,
        }
    }

    #[test]
    fn test_select_minimum_cost() {
        let params = Params::default();

        // Hand computed with weights 0.4/0.3/0.3:
        //   straight: 0.4*1.5 + 0.3*(1.5/1.0) + 0.3*1.0 + 0.3  = 1.65
        //   left:     0.4*0.8 + 0.3*(0.8/1.0) + 0.3*1.5 + 0.5  = 1.51
        //   right:    0.4*2.0 + 0.3*(2.0/1.0) + 0.3*1.5 + 0.5  = 2.35
        let candidates = [
            node(PathType::CrossStraight, 1.5, 1.0, 30),
            node(PathType::CrossLeft, 0.8, 1.0, 50),
            node(PathType::CrossRight, 2.0, 1.0, 50),
        ];

        assert_eq!(
            select_optimal(&candidates, &params),
            Some(PathType::CrossLeft)
        );
    }

    #[test]
    fn test_tie_resolves_to_first_listed() {
        let params = Params::default();

        // Identical nodes apart from type within the same risk class
        let candidates = [
            node(PathType::LeftTurn, 1.0, 1.0, 10),
            node(PathType::RightTurn, 1.0, 1.0, 10),
        ];

        assert_eq!(
            select_optimal(&candidates, &params),
            Some(PathType::LeftTurn)
        );
    }

    #[test]
    fn test_duration_term_used_without_speed() {
        let params = Params::default();

        let stopped = node(PathType::Parking, 0.5, 0.0, 0);
        let with_duration = PathNode {
            duration_ms: 2000,
            ..stopped
        };

        let cost = calculate_cost(&with_duration, &params);
        assert!((cost.time_cost - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(select_optimal(&[], &Params::default()), None);
    }
}
