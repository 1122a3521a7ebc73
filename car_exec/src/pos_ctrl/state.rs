//! Implementations for the position controller state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{Params, PosMode};
use crate::ctrl::pid::PidLoop;
use sense_if::eqpt::EncoderSample;
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position controller module state
#[derive(Default)]
pub struct PosCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// Accumulated encoder position, in pulses.
    position_pulses: i64,

    /// Target position, in pulses.
    target_pulses: i64,

    /// Target distance, in meters.
    target_distance_m: f64,

    /// Position control mode.
    mode: PosMode,

    /// Position-hold loop, output is a speed demand in meters per second.
    pid: Option<PidLoop>,
}

/// Output data from the position controller.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PosOutput {
    /// Odometry-integrated distance since start, in meters.
    pub distance_m: f64,

    /// Speed demand towards the target, `None` unless position hold is
    /// enabled.
    pub speed_dem_ms: Option<f64>,

    /// True once the target position is reached.
    pub reached: bool,
}

/// Status report for position controller processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Position control mode.
    pub mode: PosMode,

    /// Position error, in pulses.
    pub error_pulses: i64,
}

/// Position control never fails: a missing target simply leaves the
/// controller disabled.
#[derive(Debug, thiserror::Error)]
pub enum PosCtrlError {}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PosCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = EncoderSample;
    type OutputData = PosOutput;
    type StatusReport = StatusReport;
    type ProcError = PosCtrlError;

    /// Initialise the position controller.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        let mut arch_path = session.arch_root.clone();
        arch_path.push("pos_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        self.arch_report = Archiver::from_path(
            session, "pos_ctrl/status_report.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the position controller.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Integrate the mean of both wheels
        let avg_pulses =
            (input_data.left_pulses as i64 + input_data.right_pulses as i64) / 2;
        self.position_pulses += avg_pulses;

        let distance_m = self.position_pulses as f64 / self.params.pulses_per_meter;
        let error_pulses = self.target_pulses - self.position_pulses;

        self.report = StatusReport {
            mode: self.mode,
            error_pulses,
        };

        let mut speed_dem_ms = None;
        let mut reached = false;

        if self.mode == PosMode::Enabled {
            if error_pulses.abs() < self.params.tolerance_pulses {
                self.mode = PosMode::Reached;
                reached = true;
                speed_dem_ms = Some(0.0);
                info!("Position target reached at {:.3} m", distance_m);
            } else if let Some(ref mut pid) = self.pid {
                pid.set_setpoint(self.target_pulses as f64);
                speed_dem_ms = Some(pid.update(self.position_pulses as f64));
            }
        } else if self.mode == PosMode::Reached {
            reached = true;
            speed_dem_ms = Some(0.0);
        }

        Ok((
            PosOutput {
                distance_m,
                speed_dem_ms,
                reached,
            },
            self.report,
        ))
    }
}

impl Archived for PosCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl PosCtrl {
    /// Create a controller with explicit parameters, for use without a
    /// parameter file.
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// The position control mode.
    pub fn mode(&self) -> PosMode {
        self.mode
    }

    /// Odometry-integrated distance, in meters.
    pub fn distance_m(&self) -> f64 {
        self.position_pulses as f64 / self.params.pulses_per_meter
    }

    /// True while a position hold is armed or reached.
    pub fn is_armed(&self) -> bool {
        self.mode != PosMode::Disabled
    }

    /// Arm a stop the given distance ahead of the current position.
    ///
    /// The target is relative to the current position so the shared
    /// odometer keeps running for the planner's distance checks.
    pub fn stop_at(&mut self, distance_m: f64) {
        self.target_pulses =
            self.position_pulses + (distance_m * self.params.pulses_per_meter) as i64;
        self.target_distance_m = distance_m;

        let mut pid = PidLoop::new(
            self.params.kp,
            self.params.ki,
            self.params.kd,
            self.params.max_speed_dem_ms,
            -self.params.max_speed_dem_ms,
        );
        pid.set_setpoint(self.target_pulses as f64);
        self.pid = Some(pid);

        self.mode = PosMode::Enabled;

        debug!(
            "Position hold armed: stop in {:.3} m",
            distance_m
        );
    }

    /// Disarm the position hold.
    pub fn disable(&mut self) {
        self.mode = PosMode::Disabled;
        self.pid = None;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_odometry_integration() {
        let mut pos = PosCtrl::with_params(Params::default());

        // 5000 pulses per meter, 50 pulses per tick on both wheels
        for _ in 0..100 {
            pos.proc(&EncoderSample {
                left_pulses: 50,
                right_pulses: 50,
            })
            .unwrap();
        }

        assert!((pos.distance_m() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_at_reaches_target() {
        let mut pos = PosCtrl::with_params(Params::default());
        pos.stop_at(0.5);

        let mut reached = false;
        for _ in 0..200 {
            let (output, _) = pos
                .proc(&EncoderSample {
                    left_pulses: 20,
                    right_pulses: 20,
                })
                .unwrap();

            assert!(output.speed_dem_ms.is_some());

            if output.reached {
                reached = true;
                break;
            }
        }

        assert!(reached, "position target never reached");
        assert_eq!(pos.mode(), PosMode::Reached);
    }

    #[test]
    fn test_speed_demand_decreases_towards_target() {
        let mut pos = PosCtrl::with_params(Params::default());
        pos.stop_at(1.0);

        let (far, _) = pos
            .proc(&EncoderSample {
                left_pulses: 0,
                right_pulses: 0,
            })
            .unwrap();

        // Drive most of the way there
        for _ in 0..48 {
            pos.proc(&EncoderSample {
                left_pulses: 100,
                right_pulses: 100,
            })
            .unwrap();
        }

        let (near, _) = pos
            .proc(&EncoderSample {
                left_pulses: 0,
                right_pulses: 0,
            })
            .unwrap();

        assert!(near.speed_dem_ms.unwrap() < far.speed_dem_ms.unwrap());
    }
}
