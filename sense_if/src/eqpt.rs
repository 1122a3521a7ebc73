//! # Vehicle Equipment Demands and Samples

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum magnitude of a drive duty demand.
pub const MAX_DRIVE_DUTY: f64 = 8000.0;

/// Maximum magnitude of the steering angle demand in degrees.
pub const MAX_STEER_ANGLE_DEG: f64 = 45.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are sent from the control core to the actuator driver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct CarDems {
    /// Left drive duty, signed, limited to `±MAX_DRIVE_DUTY`.
    pub left_duty: f64,

    /// Right drive duty, signed, limited to `±MAX_DRIVE_DUTY`.
    pub right_duty: f64,

    /// Steering angle demand in degrees, limited to `±MAX_STEER_ANGLE_DEG`.
    pub steer_angle_deg: f64,
}

/// Encoder pulse deltas accumulated by the encoder driver since the last
/// sample.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct EncoderSample {
    /// Left wheel pulses since the last sample (signed).
    pub left_pulses: i32,

    /// Right wheel pulses since the last sample (signed).
    pub right_pulses: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Response from the actuator driver based on the demands sent by the core.
#[derive(Serialize, Deserialize, Debug)]
pub enum CarDemsResponse {
    /// Demands were valid and will be executed
    DemsOk,

    /// Demands were invalid and have been rejected
    DemsInvalid,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl CarDems {
    /// Return a copy of the demands with all values limited to the equipment
    /// capabilities.
    pub fn limited(&self) -> Self {
        Self {
            left_duty: self.left_duty.clamp(-MAX_DRIVE_DUTY, MAX_DRIVE_DUTY),
            right_duty: self.right_duty.clamp(-MAX_DRIVE_DUTY, MAX_DRIVE_DUTY),
            steer_angle_deg: self
                .steer_angle_deg
                .clamp(-MAX_STEER_ANGLE_DEG, MAX_STEER_ANGLE_DEG),
        }
    }
}
