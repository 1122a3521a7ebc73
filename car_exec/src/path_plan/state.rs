//! Implementations for the path planner state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{cost, presets, Params, PathNode, PathType, PlanState, NODE_QUEUE_CAPACITY};
use crate::elements::{ElementInfo, ElementState, ElementType, TurnDirection};
use sense_if::tc::DecisionMode;
use util::fixed::FixedVec;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path planner state
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathPlanner {
    #[serde(skip)]
    params: Params,

    /// The maneuver node queue.
    nodes: FixedVec<PathNode, NODE_QUEUE_CAPACITY>,

    /// Cursor into the queue.
    current_node: usize,

    /// Plan state.
    state: PlanState,

    /// Decision mode.
    mode: DecisionMode,

    /// Clock latched when the current node started, in milliseconds.
    start_time_ms: u32,

    /// Odometer latched when the current node started, in meters.
    start_position_m: f64,

    // Plan counters for telemetry
    pub circle_count: u8,
    pub cross_count: u8,
    pub obstacle_count: u8,
    pub ramp_count: u8,
    pub parking_count: u8,
}

/// Clock and odometer context for planning and stepping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanContext {
    /// Monotonic clock, in milliseconds.
    pub now_ms: u32,

    /// Odometry-integrated distance, in meters.
    pub odometer_m: f64,

    /// Base speed of the active scene, in meters per second.
    pub base_speed_ms: f64,
}

/// Targets the executing node imposes on the control cascade for one tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NodeDemand {
    /// Maneuver type of the node being executed.
    pub node_type: PathType,

    /// Target speed, in meters per second.
    pub target_speed_ms: f64,

    /// Target steering angle, in degrees.
    pub target_angle_deg: f64,

    /// True if the angle overrides the steering loop.
    pub manual_steer: bool,

    /// True if the node delegates to the position controller.
    pub parking: bool,

    /// Target distance of the node, in meters.
    pub distance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathPlanner {
    /// Create a planner with the given parameters.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// The current plan state.
    pub fn state(&self) -> PlanState {
        self.state
    }

    /// The decision mode.
    pub fn mode(&self) -> DecisionMode {
        self.mode
    }

    /// Select the decision mode.
    pub fn set_mode(&mut self, mode: DecisionMode) {
        self.mode = mode;
    }

    /// Number of queued nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node under the cursor, if executing.
    pub fn current(&self) -> Option<&PathNode> {
        self.nodes.get(self.current_node)
    }

    /// Plan progress as current_node / node_count x 100.
    pub fn progress(&self) -> u8 {
        if self.nodes.is_empty() {
            return 0;
        }

        ((self.current_node * 100) / self.nodes.len()).min(100) as u8
    }

    /// Clear the queue and return to idle.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.current_node = 0;
        self.state = PlanState::Idle;
    }

    /// Force the plan state from outside, for fault injection. No internal
    /// transition produces `Failed`.
    pub fn force_state(&mut self, state: PlanState) {
        self.state = state;
    }

    /// Build and queue the template for a newly found feature.
    ///
    /// In `Manual` mode no planning happens. In `Optimal` mode competing
    /// templates are costed and the cheapest queued.
    pub fn plan(
        &mut self,
        element: ElementType,
        circle_direction: TurnDirection,
        ctx: &PlanContext,
    ) {
        if self.mode == DecisionMode::Manual {
            return;
        }

        self.nodes.clear();
        self.current_node = 0;
        self.state = PlanState::Planning;

        let base = ctx.base_speed_ms;

        let template = match element {
            ElementType::Circle => {
                self.circle_count = self.circle_count.saturating_add(1);

                match circle_direction {
                    TurnDirection::Left => {
                        if self.mode == DecisionMode::Optimal {
                            let selected = self.select_circle_side(base);
                            presets::circle(selected == PathType::LeftCircle, base)
                        } else {
                            presets::circle(true, base)
                        }
                    }
                    TurnDirection::Right => presets::circle(false, base),
                }
            }

            ElementType::Cross => {
                self.cross_count = self.cross_count.saturating_add(1);

                if self.mode == DecisionMode::Optimal {
                    match self.select_cross_variant(base) {
                        PathType::CrossLeft => presets::cross_turn(true, base),
                        PathType::CrossRight => presets::cross_turn(false, base),
                        _ => presets::cross_straight(base),
                    }
                } else {
                    // Straight through by default
                    presets::cross_straight(base)
                }
            }

            ElementType::Obstacle => {
                self.obstacle_count = self.obstacle_count.saturating_add(1);

                let left = self.params.prefer_left > self.params.prefer_right;
                presets::avoid_obstacle(left, base)
            }

            ElementType::Ramp => {
                self.ramp_count = self.ramp_count.saturating_add(1);
                presets::ramp(base)
            }

            ElementType::Parking => {
                self.parking_count = self.parking_count.saturating_add(1);
                presets::parking(0.5)
            }

            ElementType::None => Vec::new(),
        };

        for node in template {
            self.nodes.push(node);
        }

        if !self.nodes.is_empty() {
            self.state = PlanState::Executing;
            self.start_time_ms = ctx.now_ms;
            self.start_position_m = ctx.odometer_m;

            info!(
                "Plan queued for {}: {} nodes",
                element,
                self.nodes.len()
            );
        }
    }

    /// Execute one tick of the current node.
    ///
    /// Returns the targets the node imposes this tick, or `None` when no
    /// plan is executing. Node completion (distance, duration or feature
    /// passed) advances the cursor; an exhausted queue completes the plan.
    pub fn step(&mut self, element: &ElementInfo, ctx: &PlanContext) -> Option<NodeDemand> {
        if self.state != PlanState::Executing {
            return None;
        }

        let node = match self.nodes.get(self.current_node) {
            Some(n) => *n,
            None => {
                self.state = PlanState::Completed;
                return None;
            }
        };

        let demand = NodeDemand {
            node_type: node.node_type,
            target_speed_ms: node.target_speed_ms,
            target_angle_deg: node.target_angle_deg,
            manual_steer: node.target_angle_deg != 0.0,
            parking: node.node_type == PathType::Parking,
            distance_m: node.distance_m,
        };

        if self.node_completed(&node, element, ctx) {
            self.current_node += 1;
            self.start_time_ms = ctx.now_ms;
            self.start_position_m = ctx.odometer_m;

            if self.current_node >= self.nodes.len() {
                self.state = PlanState::Completed;
                info!("Plan completed");
            } else {
                debug!(
                    "Plan advanced to node {} of {}",
                    self.current_node + 1,
                    self.nodes.len()
                );
            }
        }

        Some(demand)
    }

    /// Check the three completion conditions of a node.
    fn node_completed(
        &self,
        node: &PathNode,
        element: &ElementInfo,
        ctx: &PlanContext,
    ) -> bool {
        // Travelled distance
        if node.distance_m > 0.0 {
            let travelled = ctx.odometer_m - self.start_position_m;
            if travelled >= node.distance_m {
                return true;
            }
        }

        // Elapsed time
        if node.duration_ms > 0 {
            let elapsed = ctx.now_ms.saturating_sub(self.start_time_ms);
            if elapsed >= node.duration_ms {
                return true;
            }
        }

        // Associated feature passed
        if node.element != ElementType::None
            && element.element_type == node.element
            && element.state == ElementState::Passed
        {
            return true;
        }

        false
    }

    /// Cost the left and right roundabout arcs and return the cheaper side.
    fn select_circle_side(&self, base_speed_ms: f64) -> PathType {
        let left_arc = presets::circle(true, base_speed_ms)[1];
        let right_arc = presets::circle(false, base_speed_ms)[1];

        let candidates = [
            PathNode {
                priority: 50 + (100 - self.params.prefer_left),
                ..left_arc
            },
            PathNode {
                priority: 50 + (100 - self.params.prefer_right),
                ..right_arc
            },
        ];

        cost::select_optimal(&candidates, &self.params).unwrap_or(PathType::LeftCircle)
    }

    /// Cost the three intersection variants and return the cheapest.
    fn select_cross_variant(&self, base_speed_ms: f64) -> PathType {
        let straight = presets::cross_straight(base_speed_ms)[0];
        let left_turn = presets::cross_turn(true, base_speed_ms)[1];
        let right_turn = presets::cross_turn(false, base_speed_ms)[1];

        let candidates = [
            PathNode {
                priority: 30,
                ..straight
            },
            PathNode {
                priority: 50 + (100 - self.params.prefer_left),
                ..left_turn
            },
            PathNode {
                priority: 50 + (100 - self.params.prefer_right),
                ..right_turn
            },
        ];

        cost::select_optimal(&candidates, &self.params).unwrap_or(PathType::CrossStraight)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn executing_planner(element: ElementType) -> PathPlanner {
        let mut planner = PathPlanner::new(Params::default());
        planner.plan(
            element,
            TurnDirection::Left,
            &PlanContext {
                now_ms: 0,
                odometer_m: 0.0,
                base_speed_ms: 1.0,
            },
        );
        planner
    }

    #[test]
    fn test_plan_queues_template() {
        let planner = executing_planner(ElementType::Circle);

        assert_eq!(planner.state(), PlanState::Executing);
        assert_eq!(planner.node_count(), 3);
        assert_eq!(planner.circle_count, 1);
    }

    #[test]
    fn test_manual_mode_suppresses_planning() {
        let mut planner = PathPlanner::new(Params::default());
        planner.set_mode(DecisionMode::Manual);

        planner.plan(
            ElementType::Cross,
            TurnDirection::Left,
            &PlanContext::default(),
        );

        assert_eq!(planner.state(), PlanState::Idle);
        assert_eq!(planner.node_count(), 0);
    }

    #[test]
    fn test_distance_completion_boundary() {
        // A single 1.0 m node with no duration, queued directly
        let mut planner = PathPlanner::new(Params::default());
        planner.nodes.push(PathNode {
            node_type: PathType::Straight,
            distance_m: 1.0,
            target_speed_ms: 1.0,
            ..Default::default()
        });
        planner.state = PlanState::Executing;
        planner.start_position_m = 0.0;

        let element = ElementInfo::default();

        // Just short of the distance the node must not complete
        let demand = planner
            .step(
                &element,
                &PlanContext {
                    now_ms: 10,
                    odometer_m: 0.999,
                    base_speed_ms: 1.0,
                },
            )
            .unwrap();
        assert_eq!(demand.node_type, PathType::Straight);
        assert_eq!(planner.state(), PlanState::Executing);

        // Exactly at the distance it completes, exhausting the queue
        planner
            .step(
                &element,
                &PlanContext {
                    now_ms: 20,
                    odometer_m: 1.0,
                    base_speed_ms: 1.0,
                },
            )
            .unwrap();
        assert_eq!(planner.state(), PlanState::Completed);
    }

    #[test]
    fn test_feature_passed_completes_node() {
        let mut planner = executing_planner(ElementType::Cross);

        let passed = ElementInfo {
            element_type: ElementType::Cross,
            state: ElementState::Passed,
            ..Default::default()
        };

        planner
            .step(
                &passed,
                &PlanContext {
                    now_ms: 10,
                    odometer_m: 0.1,
                    base_speed_ms: 1.0,
                },
            )
            .unwrap();

        assert_eq!(planner.state(), PlanState::Completed);
    }

    #[test]
    fn test_progress_and_cursor_advance() {
        let mut planner = executing_planner(ElementType::Circle);
        let element = ElementInfo::default();

        assert_eq!(planner.progress(), 0);

        // Complete the first 0.3 m node by distance
        planner
            .step(
                &element,
                &PlanContext {
                    now_ms: 10,
                    odometer_m: 0.3,
                    base_speed_ms: 1.0,
                },
            )
            .unwrap();

        assert_eq!(planner.progress(), 33);
        assert_eq!(planner.state(), PlanState::Executing);
    }

    #[test]
    fn test_failed_only_reachable_externally() {
        let mut planner = executing_planner(ElementType::Ramp);
        let element = ElementInfo::default();

        // Run the plan to completion, Failed must never appear
        for tick in 0..100 {
            planner.step(
                &element,
                &PlanContext {
                    now_ms: tick * 100,
                    odometer_m: tick as f64 * 0.1,
                    base_speed_ms: 1.0,
                },
            );
            assert_ne!(planner.state(), PlanState::Failed);
        }
        assert_eq!(planner.state(), PlanState::Completed);

        planner.force_state(PlanState::Failed);
        assert_eq!(planner.state(), PlanState::Failed);
    }
}
