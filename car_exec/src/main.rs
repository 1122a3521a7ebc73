//! Main vehicle control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop (fixed 10 ms tick):
//!         - Command processing
//!         - Frame acquisition
//!         - Track extraction
//!         - Feature recognition
//!         - Position determination
//!         - Path planning and execution
//!         - Control cascade processing
//!         - Telemetry and archiving
//!
//! Without real camera and encoder hardware the executable drives the
//! pipeline from the simulated camera and a simple actuator model, which is
//! also how the end-to-end tests exercise it.
//!
//! # Modules
//!
//! All cyclic modules (e.g. `vision`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State`
//!        trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use car_lib::{
    data_store::DataStore,
    elements::{ElementInputData, ElementState, ElementType},
    path_plan::{PathPlanner, PlanContext},
    sim_cam::SimCam,
    tc_processor,
    vision::VisionInputData,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use sense_if::{
    eqpt::EncoderSample,
    tc::{CarCmd, DecisionMode, Scene},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.01;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

/// Top speed of the simulated drive train at full duty.
const SIM_FULL_DUTY_SPEED_MS: f64 = 2.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the executable itself.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct CarExecParams {
    /// Scene selected at start.
    scene: Scene,

    /// Decision mode selected at start.
    decision_mode: DecisionMode,

    /// Enable feature recognition at start.
    enable_element_recognition: bool,

    /// Enable path planning at start.
    enable_path_planning: bool,
}

impl Default for CarExecParams {
    fn default() -> Self {
        Self {
            scene: Scene::Normal,
            decision_mode: DecisionMode::Auto,
            enable_element_recognition: true,
            enable_path_planning: true,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("car_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Linecar Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: CarExecParams = util::params::load_or_default("car_exec.toml")
        .wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.vision
        .init("vision.toml", &session)
        .wrap_err("Failed to initialise TrackVision")?;
    info!("TrackVision init complete");

    ds.elements
        .init("elements.toml", &session)
        .wrap_err("Failed to initialise ElementRecog")?;
    info!("ElementRecog init complete");

    ds.pos_ctrl
        .init("pos_ctrl.toml", &session)
        .wrap_err("Failed to initialise PosCtrl")?;
    info!("PosCtrl init complete");

    ds.car_ctrl
        .init("ctrl.toml", &session)
        .wrap_err("Failed to initialise CarCtrl")?;
    info!("CarCtrl init complete");

    let planner_params = util::params::load_or_default("path_plan.toml")
        .wrap_err("Could not load path planner params")?;
    ds.planner = PathPlanner::new(planner_params);
    info!("PathPlanner init complete");

    let sim_params = util::params::load_or_default("sim_cam.toml")
        .wrap_err("Could not load sim camera params")?;
    let mut sim_cam = SimCam::new(sim_params);
    info!("SimCam init complete");

    info!("Module initialisation complete\n");

    // ---- START ----

    tc_processor::exec(&mut ds, &CarCmd::SetScene(exec_params.scene));
    tc_processor::exec(
        &mut ds,
        &CarCmd::SetDecisionMode(exec_params.decision_mode),
    );
    tc_processor::exec(
        &mut ds,
        &CarCmd::EnableElementRecognition(exec_params.enable_element_recognition),
    );
    tc_processor::exec(
        &mut ds,
        &CarCmd::EnablePathPlanning(exec_params.enable_path_planning),
    );
    tc_processor::exec(&mut ds, &CarCmd::Start);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Simulated encoder feedback from the previous cycle's demands,
        // sampled before the demands are cleared for this cycle
        let encoders = sim_encoders(&ds);

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- DATA INPUT ----

        ds.encoders = encoders;

        // Simulated frame capture
        ds.frame_buffer.publish(sim_cam.capture());

        // ---- CONTROL ALGORITHM PROCESSING ----

        exec_cycle(&mut ds);

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.vision.write() {
            warn!("Vision archive error: {}", e);
        }
        if let Err(e) = ds.elements.write() {
            warn!("Elements archive error: {}", e);
        }
        if let Err(e) = ds.pos_ctrl.write() {
            warn!("PosCtrl archive error: {}", e);
        }
        if let Err(e) = ds.car_ctrl.write() {
            warn!("CarCtrl archive error: {}", e);
        }

        // ---- TELEMETRY ----

        if ds.is_1_hz_cycle {
            session.save(
                format!("tm/cycle_{:06}.json", ds.num_cycles),
                ds.make_tm(),
            );
        }

        // ---- CYCLE MANAGEMENT ----

        if sim_cam.course_finished() {
            info!("End of simulated course reached, stopping");
            tc_processor::exec(&mut ds, &CarCmd::Stop);
            break;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");
    info!(
        "Passed: {} intersections, {} roundabouts, {} obstacles",
        ds.elements.cross_passed,
        ds.elements.circle_passed,
        ds.elements.obstacle_passed
    );

    session.exit();

    Ok(())
}

/// Run the perception-to-actuation pipeline for one tick.
fn exec_cycle(ds: &mut DataStore) {
    // Track extraction, only when a new frame is ready. The previous
    // geometry and deviation stay valid otherwise.
    let frame = ds.frame_buffer.take();

    if let Some(ref frame) = frame {
        match ds.vision.proc(&VisionInputData {
            frame: frame.clone(),
        }) {
            Ok((output, report)) => {
                ds.vision_output = output;
                ds.vision_status_rpt = report;
            }
            Err(e) => {
                // A failed extraction holds the last geometry, the loop
                // must keep progressing
                warn!("Error during TrackVision processing: {}", e)
            }
        }
    }

    // Feature recognition
    if ds.element_recognition_enabled {
        if let Some(frame) = frame {
            match ds.elements.proc(&ElementInputData {
                geometry: ds.vision_output.geometry.clone(),
                frame,
            }) {
                Ok((info, _)) => ds.element_info = info,
                Err(e) => warn!("Error during ElementRecog processing: {}", e),
            }
        }
    }

    // Position determination
    match ds.pos_ctrl.proc(&ds.encoders) {
        Ok((output, _)) => ds.pos_output = output,
        Err(e) => warn!("Error during PosCtrl processing: {}", e),
    }

    // Path planning and execution
    let mut node_demand = None;

    if ds.path_planning_enabled {
        let ctx = PlanContext {
            now_ms: session::get_elapsed_ms(),
            odometer_m: ds.pos_output.distance_m,
            base_speed_ms: ds.car_ctrl.base_speed_ms(),
        };

        if ds.element_info.state == ElementState::Found {
            ds.planner.plan(
                ds.element_info.element_type,
                ds.elements.circle_direction(),
                &ctx,
            );
        }

        node_demand = ds.planner.step(&ds.element_info, &ctx);

        // A parking node arms the position hold once
        if let Some(nd) = node_demand {
            if nd.parking && !ds.pos_ctrl.is_armed() {
                ds.pos_ctrl.stop_at(nd.distance_m);
            }
        }
    } else if ds.element_info.element_type == ElementType::Parking
        && ds.element_info.state == ElementState::Entering
        && !ds.pos_ctrl.is_armed()
    {
        // Without a planner the parking feature itself arms the stop
        ds.pos_ctrl.stop_at(0.5);
    }

    // Control cascade
    let ctrl_input = car_lib::ctrl::CtrlInput {
        encoders: ds.encoders,
        deviation: ds.vision_output.deviation,
        track_found: ds.vision_output.geometry.track_found,
        element: ds.element_info,
        node_demand,
        pos_speed_dem_ms: ds.pos_output.speed_dem_ms,
        pos_reached: ds.pos_output.reached,
        odometer_m: ds.pos_output.distance_m,
    };

    match ds.car_ctrl.proc(&ctrl_input) {
        Ok((dems, report)) => {
            ds.car_dems = dems;
            ds.ctrl_status_rpt = report;
        }
        Err(e) => warn!("Error during CarCtrl processing: {}", e),
    }
}

/// Simple drive train model closing the loop in place of real encoders.
///
/// The wheels are assumed to track the demanded duty within one tick, so
/// the pulse delta is the duty fraction at the model's top speed.
fn sim_encoders(ds: &DataStore) -> EncoderSample {
    use sense_if::eqpt::MAX_DRIVE_DUTY;

    let pulses_per_tick = |duty: f64| -> i32 {
        let speed_ms = util::maths::lin_map(
            (-MAX_DRIVE_DUTY, MAX_DRIVE_DUTY),
            (-SIM_FULL_DUTY_SPEED_MS, SIM_FULL_DUTY_SPEED_MS),
            duty,
        );
        (speed_ms * 5000.0 * CYCLE_PERIOD_S) as i32
    };

    EncoderSample {
        left_pulses: pulses_per_tick(ds.car_dems.left_duty),
        right_pulses: pulses_per_tick(ds.car_dems.right_duty),
    }
}
