//! # Telecommand module
//!
//! Commands sent to the control core by the out-of-scope tuning/host link.
//! Commands are applied at tick start only, so a mode or scene change never
//! takes effect mid-tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the vehicle control core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CarCmd {
    /// Start the control loop, resetting the control loops.
    Start,

    /// Bring the vehicle to a stop and halt control processing.
    Stop,

    /// Pause control processing, keeping module state.
    Pause,

    /// Select the planner decision mode.
    SetDecisionMode(DecisionMode),

    /// Select the active gain/base-speed scene.
    SetScene(Scene),

    /// Command a stop at the given distance ahead, in meters.
    StopAtDistance(f64),

    /// Enable or disable feature recognition.
    EnableElementRecognition(bool),

    /// Enable or disable path planning.
    EnablePathPlanning(bool),
}

/// Planner decision modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionMode {
    /// No automatic planning, external control only.
    Manual,

    /// Default templates are used for each feature.
    Auto,

    /// Competing templates are costed and the cheapest selected.
    Optimal,
}

/// Driving scenes, each naming a gain/base-speed record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Scene {
    Normal,
    Straight,
    Curve,
    Circle,
    Ramp,
    Obstacle,
    Parking,
    Debug,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum CarCmdParseError {
    #[error("Command contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CarCmd {
    /// Parse a command from a JSON packet.
    pub fn from_json(json_str: &str) -> Result<Self, CarCmdParseError> {
        serde_json::from_str(json_str).map_err(CarCmdParseError::InvalidJson)
    }
}

impl Default for DecisionMode {
    fn default() -> Self {
        DecisionMode::Auto
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::Normal
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_command_from_json() {
        let cmd = CarCmd::from_json(r#"{"SetScene":"Curve"}"#).unwrap();
        assert_eq!(cmd, CarCmd::SetScene(Scene::Curve));

        let cmd = CarCmd::from_json(r#""Start""#).unwrap();
        assert_eq!(cmd, CarCmd::Start);

        assert!(CarCmd::from_json("not json").is_err());
    }
}
