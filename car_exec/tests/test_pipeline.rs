//! End-to-end pipeline tests
//!
//! These drive the full perception-to-actuation chain the way the
//! executable does: frame -> track extractor -> feature recogniser ->
//! path planner -> control cascade.

use car_lib::ctrl::{CarCtrl, CtrlInput, Params as CtrlParams};
use car_lib::elements::{
    ElementInputData, ElementRecog, ElementState, ElementType, Params as ElementParams,
};
use car_lib::path_plan::{Params as PlanParams, PathPlanner, PlanContext, PlanState};
use car_lib::pos_ctrl::{Params as PosParams, PosCtrl};
use car_lib::sim_cam;
use car_lib::vision::{Params as VisionParams, TrackVision, VisionInputData};
use sense_if::eqpt::{CarDems, EncoderSample, MAX_DRIVE_DUTY};
use sense_if::frame::Frame;
use util::module::State;

/// All pipeline modules with default parameters.
struct Pipeline {
    vision: TrackVision,
    elements: ElementRecog,
    planner: PathPlanner,
    pos: PosCtrl,
    ctrl: CarCtrl,
    dems: CarDems,
    now_ms: u32,
}

impl Pipeline {
    fn new() -> Self {
        let mut ctrl = CarCtrl::with_params(CtrlParams::default());
        ctrl.start();

        Self {
            vision: TrackVision::with_params(VisionParams::default()),
            elements: ElementRecog::with_params(ElementParams::default()),
            planner: PathPlanner::new(PlanParams::default()),
            pos: PosCtrl::with_params(PosParams::default()),
            ctrl,
            dems: CarDems::default(),
            now_ms: 0,
        }
    }

    /// Run one tick of the pipeline on a frame, with encoders simulated
    /// from the previous demands.
    fn tick(&mut self, frame: Frame) -> TickResult {
        self.now_ms += 10;

        let pulses = |duty: f64| ((duty / MAX_DRIVE_DUTY) * 2.0 * 5000.0 * 0.01) as i32;
        let encoders = EncoderSample {
            left_pulses: pulses(self.dems.left_duty),
            right_pulses: pulses(self.dems.right_duty),
        };

        let (vision_out, _) = self
            .vision
            .proc(&VisionInputData {
                frame: frame.clone(),
            })
            .expect("extraction failed");

        let (element, _) = self
            .elements
            .proc(&ElementInputData {
                geometry: vision_out.geometry.clone(),
                frame,
            })
            .expect("recognition failed");

        let (pos_out, _) = self.pos.proc(&encoders).expect("position failed");

        let ctx = PlanContext {
            now_ms: self.now_ms,
            odometer_m: pos_out.distance_m,
            base_speed_ms: self.ctrl.base_speed_ms(),
        };

        if element.state == ElementState::Found {
            self.planner
                .plan(element.element_type, self.elements.circle_direction(), &ctx);
        }

        let node_demand = self.planner.step(&element, &ctx);

        if let Some(nd) = node_demand {
            if nd.parking && !self.pos.is_armed() {
                self.pos.stop_at(nd.distance_m);
            }
        }

        let (dems, _) = self
            .ctrl
            .proc(&CtrlInput {
                encoders,
                deviation: vision_out.deviation,
                track_found: vision_out.geometry.track_found,
                element,
                node_demand,
                pos_speed_dem_ms: pos_out.speed_dem_ms,
                pos_reached: pos_out.reached,
                odometer_m: pos_out.distance_m,
            })
            .expect("cascade failed");

        self.dems = dems;

        TickResult {
            element,
            plan_state: self.planner.state(),
            node_count: self.planner.node_count(),
            dems,
        }
    }
}

struct TickResult {
    element: car_lib::elements::ElementInfo,
    plan_state: PlanState,
    node_count: usize,
    dems: CarDems,
}

#[test]
fn test_intersection_recognised_and_planned_within_one_tick() {
    let mut pipeline = Pipeline::new();

    // Settle on plain track first
    for _ in 0..10 {
        let result = pipeline.tick(sim_cam::straight_frame(94, 120));
        assert_eq!(result.element.element_type, ElementType::None);
        assert_eq!(result.plan_state, PlanState::Idle);
    }

    // The first frame carrying a 30-row band of excess width must yield an
    // intersection and a queued plan in the same tick
    let result = pipeline.tick(sim_cam::intersection_frame(94, 120, 20..50));

    assert_eq!(result.element.element_type, ElementType::Cross);
    assert_eq!(result.element.state, ElementState::Found);
    assert_eq!(result.plan_state, PlanState::Executing);
    assert!(result.node_count > 0);
}

#[test]
fn test_intersection_plan_runs_to_completion() {
    let mut pipeline = Pipeline::new();

    for _ in 0..5 {
        pipeline.tick(sim_cam::straight_frame(94, 120));
    }

    let mut completed = false;

    for tick in 0..2000 {
        let frame = if tick < 40 {
            sim_cam::intersection_frame(94, 120, 20..50)
        } else {
            sim_cam::straight_frame(94, 120)
        };

        let result = pipeline.tick(frame);

        if result.plan_state == PlanState::Completed {
            completed = true;
            break;
        }

        assert_ne!(result.plan_state, PlanState::Failed);
    }

    assert!(completed, "plan never completed");
}

#[test]
fn test_deviation_steers_towards_track() {
    let mut pipeline = Pipeline::new();

    // Track offset right of centre: after settling, the cascade must
    // demand a non-zero steering angle and forward duty
    let mut result = None;
    for _ in 0..10 {
        result = Some(pipeline.tick(sim_cam::straight_frame(130, 100)));
    }

    let result = result.unwrap();
    assert!(result.dems.steer_angle_deg != 0.0);
    assert!(result.dems.left_duty > 0.0);
    assert!(result.dems.right_duty > 0.0);
}

#[test]
fn test_parking_marker_stops_the_vehicle() {
    let mut pipeline = Pipeline::new();

    for _ in 0..5 {
        pipeline.tick(sim_cam::straight_frame(94, 120));
    }

    let mut stopped = false;

    for _ in 0..3000 {
        let mut frame = sim_cam::straight_frame(94, 120);
        sim_cam::paint_parking_marker(&mut frame, 94, 120, 62..70);

        let result = pipeline.tick(frame);

        if result.dems.left_duty == 0.0
            && result.dems.right_duty == 0.0
            && pipeline.pos.is_armed()
        {
            stopped = true;
            break;
        }
    }

    assert!(stopped, "vehicle never stopped for the parking marker");
}

#[test]
fn test_lost_track_holds_deviation_and_keeps_running() {
    let mut pipeline = Pipeline::new();

    for _ in 0..10 {
        pipeline.tick(sim_cam::straight_frame(120, 100));
    }

    // Feed empty frames: the pipeline must keep emitting demands without
    // panicking, holding the last known deviation
    for _ in 0..10 {
        let result = pipeline.tick(Frame::filled(20));
        assert!(result.dems.steer_angle_deg.abs() <= 45.0);
    }
}
