//! # Sensing and actuation interface crate.
//!
//! Provides the common boundary types between the control core and the
//! out-of-scope drivers: the camera frame buffer, encoder samples, actuator
//! demands, telecommands and telemetry.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Camera frame data and the frame-ready buffer
pub mod frame;

/// Demand and sample definitions for the vehicle equipment (motors, servo,
/// encoders)
pub mod eqpt;

/// Telecommand definitions
pub mod tc;

/// Telemetry definitions
pub mod tm;
