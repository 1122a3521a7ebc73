//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use sense_if::{
    eqpt::{CarDems, EncoderSample},
    frame::FrameBuffer,
    tm::CarTm,
};

use crate::{
    ctrl::{self, CarCtrl},
    elements::{ElementInfo, ElementRecog},
    path_plan::PathPlanner,
    pos_ctrl::{PosCtrl, PosOutput},
    vision::{self, TrackVision, VisionOutputData},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    // Inputs
    /// Frame buffer fed by the camera driver
    pub frame_buffer: FrameBuffer,

    /// Encoder sample accumulated since the last tick
    pub encoders: EncoderSample,

    // Module enables
    pub element_recognition_enabled: bool,
    pub path_planning_enabled: bool,

    // Track extractor
    pub vision: TrackVision,
    pub vision_output: VisionOutputData,
    pub vision_status_rpt: vision::StatusReport,

    // Feature recogniser
    pub elements: ElementRecog,
    pub element_info: ElementInfo,

    // Path planner
    pub planner: PathPlanner,

    // Position controller
    pub pos_ctrl: PosCtrl,
    pub pos_output: PosOutput,

    // Control cascade
    pub car_ctrl: CarCtrl,
    pub car_dems: CarDems,
    pub ctrl_status_rpt: ctrl::StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and
    /// sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u64) == 0;

        self.vision_status_rpt = vision::StatusReport::default();
        self.ctrl_status_rpt = ctrl::StatusReport::default();
        self.car_dems = CarDems::default();
    }

    /// Build the telemetry snapshot for this cycle.
    pub fn make_tm(&self) -> CarTm {
        CarTm {
            cycle: self.num_cycles,
            track_found: self.vision_output.geometry.track_found,
            deviation_px: self.vision_output.deviation.error_px,
            element_type: self.element_info.element_type.to_string(),
            element_state: self.element_info.state.to_string(),
            element_confidence: self.element_info.confidence,
            plan_state: format!("{:?}", self.planner.state()),
            plan_progress: self.planner.progress(),
            cross_count: self.elements.cross_passed,
            circle_count: self.elements.circle_passed,
            obstacle_count: self.elements.obstacle_passed,
            left_duty: self.car_dems.left_duty,
            right_duty: self.car_dems.right_duty,
            steer_angle_deg: self.car_dems.steer_angle_deg,
        }
    }
}
