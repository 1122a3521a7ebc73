//! # Telecommand Processor
//!
//! Applies commands from the host link to the data store. Commands are
//! executed at tick start, before any module runs, so their effects never
//! land mid-tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use sense_if::tc::CarCmd;

use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a command against the data store.
pub fn exec(ds: &mut DataStore, cmd: &CarCmd) {
    info!("Executing command: {:?}", cmd);

    match cmd {
        CarCmd::Start => ds.car_ctrl.start(),

        CarCmd::Stop => {
            ds.car_ctrl.stop();
            ds.planner.reset();
            ds.pos_ctrl.disable();
        }

        CarCmd::Pause => ds.car_ctrl.pause(),

        CarCmd::SetDecisionMode(mode) => ds.planner.set_mode(*mode),

        CarCmd::SetScene(scene) => ds.car_ctrl.set_scene(*scene),

        CarCmd::StopAtDistance(distance_m) => ds.pos_ctrl.stop_at(*distance_m),

        CarCmd::EnableElementRecognition(enable) => {
            ds.element_recognition_enabled = *enable
        }

        CarCmd::EnablePathPlanning(enable) => {
            ds.path_planning_enabled = *enable;
            if *enable {
                ds.planner.reset();
            }
        }
    }
}
