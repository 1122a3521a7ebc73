//! Implementations for the control cascade state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::pid::PidLoop;
use super::{AvoidState, CarState, CtrlError, Params, PidGains, SceneConfig};
use crate::elements::{ElementInfo, ElementState, ElementType};
use crate::path_plan::NodeDemand;
use crate::vision::Deviation;
use sense_if::eqpt::{CarDems, EncoderSample};
use sense_if::tc::Scene;
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control cascade module state
pub struct CarCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// Vehicle run state.
    car_state: CarState,

    /// The active scene.
    scene: Scene,

    /// The active scene's record, kept current with tuning changes.
    active_config: SceneConfig,

    // The three cascade loops
    speed_pid_left: PidLoop,
    speed_pid_right: PidLoop,
    steer_pid: PidLoop,

    /// Obstacle avoidance sub-state.
    avoid_state: AvoidState,

    /// Odometer latched when the avoidance started, in meters.
    avoid_start_m: f64,

    /// Last emitted demands.
    output: CarDems,
}

/// Input data to the control cascade.
#[derive(Default)]
pub struct CtrlInput {
    /// Encoder pulse deltas since the last tick.
    pub encoders: EncoderSample,

    /// Deviation from the track extractor.
    pub deviation: Deviation,

    /// True if the track was found this tick.
    pub track_found: bool,

    /// The active feature episode.
    pub element: ElementInfo,

    /// Targets imposed by the executing plan node, if any.
    pub node_demand: Option<NodeDemand>,

    /// Speed demand from the position controller, if armed.
    pub pos_speed_dem_ms: Option<f64>,

    /// True once the position controller reached its target.
    pub pos_reached: bool,

    /// Odometry-integrated distance, in meters.
    pub odometer_m: f64,
}

/// Status report for cascade processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Target left wheel speed, in meters per second.
    pub target_left_ms: f64,

    /// Target right wheel speed, in meters per second.
    pub target_right_ms: f64,

    /// Measured left wheel speed, in meters per second.
    pub measured_left_ms: f64,

    /// Measured right wheel speed, in meters per second.
    pub measured_right_ms: f64,

    /// True if a manual angle bypassed the steering loop this tick.
    pub manual_steer: bool,

    /// Avoidance sub-state this tick.
    pub avoid_state: AvoidState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CarCtrl {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl State for CarCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = CtrlInput;
    type OutputData = CarDems;
    type StatusReport = StatusReport;
    type ProcError = CtrlError;

    /// Initialise the control cascade.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        let mut arch_path = session.arch_root.clone();
        arch_path.push("ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        self.arch_report = Archiver::from_path(
            session, "ctrl/status_report.csv"
        ).unwrap();

        // Rebuild the loops against the loaded limits and scene
        self.rebuild_loops();
        self.apply_scene(self.scene);

        Ok(())
    }

    /// Perform one tick of the control cascade.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();

        if self.car_state != CarState::Running {
            self.output = CarDems::default();
            return Ok((self.output, self.report));
        }

        // (1) Measured wheel speeds from the encoder deltas
        let pulses_to_ms =
            1.0 / (self.params.pulses_per_meter * self.params.tick_period_s);
        let measured_left = input_data.encoders.left_pulses as f64 * pulses_to_ms;
        let measured_right = input_data.encoders.right_pulses as f64 * pulses_to_ms;

        self.report.measured_left_ms = measured_left;
        self.report.measured_right_ms = measured_right;

        // (2) Target speeds and steering
        let (target_speed, manual_angle) = self.determine_targets(input_data);

        // A reached parking target stops the vehicle
        if input_data.pos_reached
            && (self.parking_active(input_data) || input_data.pos_speed_dem_ms.is_some())
        {
            info!("Position target reached, stopping");
            self.stop();
            return Ok((self.output, self.report));
        }

        let (target_left, target_right) =
            self.differential_split(target_speed, manual_angle);

        self.report.target_left_ms = target_left;
        self.report.target_right_ms = target_right;

        // (3) Loop evaluation
        self.speed_pid_left.set_setpoint(target_left);
        let left_duty = self.speed_pid_left.update(measured_left);

        self.speed_pid_right.set_setpoint(target_right);
        let right_duty = self.speed_pid_right.update(measured_right);

        let steer_angle = match manual_angle {
            Some(angle) => {
                self.report.manual_steer = true;
                angle.clamp(
                    -self.params.max_steer_angle_deg,
                    self.params.max_steer_angle_deg,
                )
            }
            None => {
                // Steering loop drives the deviation to zero
                self.steer_pid.set_setpoint(0.0);
                self.steer_pid.update(input_data.deviation.error_px)
            }
        };

        // (4) Emit limited demands
        self.output = CarDems {
            left_duty,
            right_duty,
            steer_angle_deg: steer_angle,
        }
        .limited();

        trace!(
            "CarCtrl output: duty L {:.0} R {:.0}, steer {:.1} deg",
            self.output.left_duty,
            self.output.right_duty,
            self.output.steer_angle_deg
        );

        Ok((self.output, self.report))
    }
}

impl Archived for CarCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl CarCtrl {
    /// Create a cascade with explicit parameters, for use without a
    /// parameter file.
    pub fn with_params(params: Params) -> Self {
        let scene = Scene::Normal;
        let active_config = *params.scene_config(scene);

        let mut ctrl = Self {
            params,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            car_state: CarState::Stopped,
            scene,
            active_config,
            speed_pid_left: PidLoop::new(0.0, 0.0, 0.0, 0.0, 0.0),
            speed_pid_right: PidLoop::new(0.0, 0.0, 0.0, 0.0, 0.0),
            steer_pid: PidLoop::new(0.0, 0.0, 0.0, 0.0, 0.0),
            avoid_state: AvoidState::Idle,
            avoid_start_m: 0.0,
            output: CarDems::default(),
        };

        ctrl.rebuild_loops();
        ctrl.apply_scene(scene);
        ctrl
    }

    /// The vehicle run state.
    pub fn car_state(&self) -> CarState {
        self.car_state
    }

    /// The active scene.
    pub fn scene(&self) -> Scene {
        self.scene
    }

    /// Base speed of the active scene, in meters per second.
    pub fn base_speed_ms(&self) -> f64 {
        self.active_config.base_speed_ms
    }

    /// The avoidance sub-state.
    pub fn avoid_state(&self) -> AvoidState {
        self.avoid_state
    }

    /// Start the vehicle, resetting all three loops.
    pub fn start(&mut self) {
        self.speed_pid_left.reset();
        self.speed_pid_right.reset();
        self.steer_pid.reset();
        self.avoid_state = AvoidState::Idle;
        self.car_state = CarState::Running;

        info!("Vehicle started, scene {:?}", self.scene);
    }

    /// Stop the vehicle and zero the demands.
    pub fn stop(&mut self) {
        self.output = CarDems::default();
        self.car_state = CarState::Stopped;
    }

    /// Pause control, keeping loop state.
    pub fn pause(&mut self) {
        self.output = CarDems::default();
        self.car_state = CarState::Paused;
    }

    /// Switch the scene, swapping all three loops' gains and the base speed
    /// as one record.
    ///
    /// Called between ticks only (from the command processor at tick
    /// start), so a switch never lands mid-cascade.
    pub fn set_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.apply_scene(scene);

        debug!("Scene switched to {:?}", scene);
    }

    /// The active scene's record.
    pub fn scene_config(&self) -> SceneConfig {
        self.active_config
    }

    /// Save the active record into the given scene's slot.
    pub fn save_scene_config(&mut self, scene: Scene) {
        self.params.set_scene_config(scene, self.active_config);
    }

    /// Replace the speed loop gains of the active record.
    pub fn set_speed_gains(&mut self, gains: PidGains) {
        self.active_config.speed = gains;
        self.speed_pid_left.set_gains(gains.kp, gains.ki, gains.kd);
        self.speed_pid_right.set_gains(gains.kp, gains.ki, gains.kd);
    }

    /// Replace the steering loop gains of the active record.
    pub fn set_steer_gains(&mut self, gains: PidGains) {
        self.active_config.steer = gains;
        self.steer_pid.set_gains(gains.kp, gains.ki, gains.kd);
    }

    /// Apply output limits from the parameters to all three loops.
    fn rebuild_loops(&mut self) {
        self.speed_pid_left
            .set_output_limits(self.params.max_duty, -self.params.max_duty);
        self.speed_pid_right
            .set_output_limits(self.params.max_duty, -self.params.max_duty);
        self.steer_pid.set_output_limits(
            self.params.max_steer_angle_deg,
            -self.params.max_steer_angle_deg,
        );
    }

    /// Load a scene record into the live loops.
    fn apply_scene(&mut self, scene: Scene) {
        let config = *self.params.scene_config(scene);
        self.active_config = config;

        self.speed_pid_left
            .set_gains(config.speed.kp, config.speed.ki, config.speed.kd);
        self.speed_pid_right
            .set_gains(config.speed.kp, config.speed.ki, config.speed.kd);
        self.steer_pid
            .set_gains(config.steer.kp, config.steer.ki, config.steer.kd);
    }

    /// True if a parking node or parking feature is in control.
    fn parking_active(&self, input: &CtrlInput) -> bool {
        input
            .node_demand
            .map(|nd| nd.parking)
            .unwrap_or(input.element.element_type == ElementType::Parking)
    }

    /// Determine the target speed and any manual steering angle for this
    /// tick.
    fn determine_targets(&mut self, input: &CtrlInput) -> (f64, Option<f64>) {
        let base = self.active_config.base_speed_ms;

        // An executing plan node owns the targets
        if let Some(nd) = input.node_demand {
            if nd.parking {
                return (input.pos_speed_dem_ms.unwrap_or(0.0), None);
            }

            let manual = if nd.manual_steer {
                Some(nd.target_angle_deg)
            } else {
                None
            };
            return (nd.target_speed_ms, manual);
        }

        // A running avoidance takes over next, it must finish even after
        // the obstacle episode has been archived
        if self.avoid_state != AvoidState::Idle {
            return self.step_avoidance(input);
        }

        // Otherwise the active feature adjusts the scene targets
        match input.element.element_type {
            ElementType::Parking if input.element.state != ElementState::Found => {
                (input.pos_speed_dem_ms.unwrap_or(0.0), None)
            }

            ElementType::Ramp => (base * 1.3, None),

            ElementType::Obstacle => {
                if input.element.state == ElementState::Entering {
                    self.avoid_start_m = input.odometer_m;
                    self.avoid_state = AvoidState::TurningOut;
                    debug!("Avoidance started at {:.3} m", self.avoid_start_m);
                    self.step_avoidance(input)
                } else {
                    // Slow down while the obstacle is only found
                    (base * 0.6, None)
                }
            }

            _ => (base, None),
        }
    }

    /// Advance the avoidance sub-state machine and return its targets.
    fn step_avoidance(&mut self, input: &CtrlInput) -> (f64, Option<f64>) {
        let speed = self.params.avoid_speed_ms;
        let angle = self.params.avoid_angle_deg;

        let targets = match self.avoid_state {
            AvoidState::TurningOut => {
                if input.odometer_m - self.avoid_start_m > self.params.avoid_distance_m {
                    self.avoid_state = AvoidState::Bypassing;
                }
                (speed, Some(-angle))
            }
            AvoidState::Bypassing => {
                let obstacle_gone = input.element.element_type != ElementType::Obstacle
                    || input.element.state == ElementState::Passed;
                if obstacle_gone {
                    self.avoid_state = AvoidState::Returning;
                }
                (speed, Some(0.0))
            }
            AvoidState::Returning => {
                if input.track_found {
                    self.avoid_state = AvoidState::Idle;
                }
                (speed, Some(angle))
            }
            AvoidState::Idle => (self.active_config.base_speed_ms, None),
        };

        self.report.avoid_state = self.avoid_state;
        targets
    }

    /// Split a speed target across the wheels for a commanded steering
    /// angle, following the Ackermann geometry. Near-singular angles fall
    /// back to a symmetric split.
    fn differential_split(&self, speed_ms: f64, angle_deg: Option<f64>) -> (f64, f64) {
        let angle = match angle_deg {
            Some(a) if a != 0.0 => a,
            _ => return (speed_ms, speed_ms),
        };

        let tan_theta = angle.to_radians().tan();
        if tan_theta.abs() < self.params.tan_guard {
            return (speed_ms, speed_ms);
        }

        let ratio =
            self.params.track_width_m * tan_theta / (2.0 * self.params.wheelbase_m);

        (speed_ms * (1.0 - ratio), speed_ms * (1.0 + ratio))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn running_ctrl() -> CarCtrl {
        let mut ctrl = CarCtrl::with_params(Params::default());
        ctrl.start();
        ctrl
    }

    #[test]
    fn test_stopped_vehicle_emits_zero_demands() {
        let mut ctrl = CarCtrl::with_params(Params::default());

        let (dems, _) = ctrl.proc(&CtrlInput::default()).unwrap();
        assert_eq!(dems.left_duty, 0.0);
        assert_eq!(dems.right_duty, 0.0);
        assert_eq!(dems.steer_angle_deg, 0.0);
    }

    #[test]
    fn test_running_vehicle_drives_towards_base_speed() {
        let mut ctrl = running_ctrl();

        // Standstill measurement, positive speed error, positive duty
        let (dems, report) = ctrl.proc(&CtrlInput::default()).unwrap();
        assert!(dems.left_duty > 0.0);
        assert!(dems.right_duty > 0.0);
        assert_eq!(report.target_left_ms, ctrl.base_speed_ms());
    }

    #[test]
    fn test_duty_limited() {
        let mut ctrl = running_ctrl();

        // Large negative measured speed forces the loop into saturation
        let input = CtrlInput {
            encoders: EncoderSample {
                left_pulses: -30000,
                right_pulses: -30000,
            },
            ..Default::default()
        };

        let (dems, _) = ctrl.proc(&input).unwrap();
        assert_eq!(dems.left_duty, ctrl.params.max_duty);
        assert_eq!(dems.right_duty, ctrl.params.max_duty);
    }

    #[test]
    fn test_steering_follows_deviation() {
        let mut ctrl = running_ctrl();

        let input = CtrlInput {
            deviation: Deviation {
                error_px: 40.0,
                ratio: 40.0 / 94.0,
            },
            ..Default::default()
        };

        let (dems, report) = ctrl.proc(&input).unwrap();
        assert!(!report.manual_steer);
        assert!(dems.steer_angle_deg != 0.0);
        assert!(dems.steer_angle_deg.abs() <= ctrl.params.max_steer_angle_deg);
    }

    #[test]
    fn test_scene_switch_swaps_record() {
        let mut ctrl = running_ctrl();

        let normal_base = ctrl.base_speed_ms();
        ctrl.set_scene(Scene::Straight);

        assert_eq!(ctrl.scene(), Scene::Straight);
        assert!(ctrl.base_speed_ms() > normal_base);

        let (_, report) = ctrl.proc(&CtrlInput::default()).unwrap();
        assert_eq!(report.target_left_ms, ctrl.base_speed_ms());
    }

    #[test]
    fn test_avoidance_sequence() {
        let mut ctrl = running_ctrl();

        let obstacle = |state, odometer_m| CtrlInput {
            element: ElementInfo {
                element_type: ElementType::Obstacle,
                state,
                confidence: 80,
                frame_count: 10,
                distance_m: 0.0,
            },
            track_found: true,
            odometer_m,
            ..Default::default()
        };

        // Entering starts the turn-out leg with a manual angle
        let (dems, report) = ctrl.proc(&obstacle(ElementState::Entering, 1.0)).unwrap();
        assert_eq!(report.avoid_state, AvoidState::TurningOut);
        assert!(report.manual_steer);
        assert!(dems.steer_angle_deg < 0.0);

        // Past the avoid distance the bypass leg holds straight
        let (_, report) = ctrl.proc(&obstacle(ElementState::InElement, 1.4)).unwrap();
        assert_eq!(report.avoid_state, AvoidState::Bypassing);

        // Once the obstacle passes, return towards the track
        let (dems, report) = ctrl.proc(&obstacle(ElementState::Passed, 1.6)).unwrap();
        assert_eq!(report.avoid_state, AvoidState::Returning);
        assert!(dems.steer_angle_deg >= 0.0);

        // Track reacquired, avoidance ends
        let mut input = CtrlInput::default();
        input.track_found = true;
        let (_, report) = ctrl.proc(&input).unwrap();
        assert_eq!(report.avoid_state, AvoidState::Idle);
    }

    #[test]
    fn test_scene_record_save_and_reload() {
        let mut ctrl = CarCtrl::with_params(Params::default());

        // Tune the active record, save it into the Curve slot
        let tuned = PidGains {
            kp: 0.9,
            ki: 0.02,
            kd: 1.5,
        };
        ctrl.set_steer_gains(tuned);
        ctrl.save_scene_config(Scene::Curve);

        // Switch away and back, the whole record must come back
        ctrl.set_scene(Scene::Normal);
        ctrl.set_scene(Scene::Curve);

        assert_eq!(ctrl.scene_config().steer.kp, tuned.kp);
        assert_eq!(ctrl.scene_config().steer.ki, tuned.ki);
        assert_eq!(ctrl.scene_config().steer.kd, tuned.kd);
    }

    #[test]
    fn test_differential_split_guards_small_angles() {
        let ctrl = CarCtrl::with_params(Params::default());

        let (l, r) = ctrl.differential_split(1.0, Some(1e-8));
        assert_eq!(l, r);

        let (l, r) = ctrl.differential_split(1.0, Some(20.0));
        assert!(l < r);
    }
}
