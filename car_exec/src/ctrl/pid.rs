//! # PID loop
//!
//! The generic closed-loop compute unit shared by the speed, steering and
//! position controllers. Discrete form, evaluated once per tick:
//!
//! ```text
//! output = kp*e + ki*clamp(sum(e), +-integral_max) + kd*(e - e_prev)
//! ```
//!
//! clamped to the output limits. The integral accumulator is clamped, not
//! the integral term alone, and the previous error updates on every
//! evaluation regardless of clamping. State persists across ticks and is
//! reset only on explicit start or scene-change events.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the output maximum used as the default integral clamp.
const DEFAULT_INTEGRAL_FRACTION: f64 = 0.8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID loop
#[derive(Debug, Serialize, Clone)]
pub struct PidLoop {
    /// Proportional gain
    kp: f64,

    /// Integral gain
    ki: f64,

    /// Derivative gain
    kd: f64,

    /// Target value
    setpoint: f64,

    /// Previous error
    last_error: f64,

    /// The integral accumulation, clamped to the integral limit
    integral: f64,

    /// Clamp on the integral accumulator
    integral_max: f64,

    /// Upper output limit
    output_max: f64,

    /// Lower output limit
    output_min: f64,

    /// Last computed output
    output: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidLoop {
    /// Create a new loop with the given gains and output limits.
    ///
    /// The integral clamp defaults to 80% of the output maximum.
    pub fn new(kp: f64, ki: f64, kd: f64, output_max: f64, output_min: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            last_error: 0.0,
            integral: 0.0,
            integral_max: output_max.abs() * DEFAULT_INTEGRAL_FRACTION,
            output_max,
            output_min,
            output: 0.0,
        }
    }

    /// Set the target value.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    /// Replace the gains, keeping the accumulated state.
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Replace the output limits and rescale the default integral clamp.
    pub fn set_output_limits(&mut self, output_max: f64, output_min: f64) {
        self.output_max = output_max;
        self.output_min = output_min;
        self.integral_max = output_max.abs() * DEFAULT_INTEGRAL_FRACTION;
    }

    /// Override the integral clamp.
    pub fn set_integral_limit(&mut self, integral_max: f64) {
        self.integral_max = integral_max;
    }

    /// Evaluate the loop against a measurement.
    pub fn update(&mut self, measured: f64) -> f64 {
        let error = self.setpoint - measured;

        // Proportional term
        let p_out = self.kp * error;

        // Integral term, accumulator clamped
        self.integral = (self.integral + error).clamp(-self.integral_max, self.integral_max);
        let i_out = self.ki * self.integral;

        // Derivative term
        let d_out = self.kd * (error - self.last_error);

        self.output = (p_out + i_out + d_out).clamp(self.output_min, self.output_max);

        // The previous error updates whether or not the output clamped
        self.last_error = error;

        self.output
    }

    /// Reset the accumulated state, keeping gains and limits.
    pub fn reset(&mut self) {
        self.last_error = 0.0;
        self.integral = 0.0;
        self.output = 0.0;
    }

    /// Last computed output.
    pub fn output(&self) -> f64 {
        self.output
    }

    /// Last error.
    pub fn last_error(&self) -> f64 {
        self.last_error
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional_linearity() {
        let mut pid = PidLoop::new(2.0, 0.0, 0.0, 1000.0, -1000.0);
        pid.set_setpoint(10.0);

        // With ki = kd = 0 and kp = 2 the output is exactly twice the error
        assert!((pid.update(4.0) - 12.0).abs() < 1e-12);
        assert!((pid.update(12.0) - -4.0).abs() < 1e-12);
    }

    #[test]
    fn test_output_saturation() {
        let mut pid = PidLoop::new(2.0, 0.0, 0.0, 10.0, -10.0);
        pid.set_setpoint(100.0);

        assert_eq!(pid.update(0.0), 10.0);

        pid.set_setpoint(-100.0);
        assert_eq!(pid.update(0.0), -10.0);
    }

    #[test]
    fn test_integral_clamped_to_80_percent() {
        let mut pid = PidLoop::new(0.0, 1.0, 0.0, 100.0, -100.0);
        pid.set_setpoint(50.0);

        // Accumulate far beyond the clamp
        let mut out = 0.0;
        for _ in 0..100 {
            out = pid.update(0.0);
        }

        assert_eq!(out, 80.0);
    }

    #[test]
    fn test_last_error_updates_while_saturated() {
        let mut pid = PidLoop::new(100.0, 0.0, 1.0, 10.0, -10.0);
        pid.set_setpoint(10.0);

        pid.update(0.0);
        assert_eq!(pid.last_error(), 10.0);

        pid.update(5.0);
        assert_eq!(pid.last_error(), 5.0);
    }

    #[test]
    fn test_reset_clears_state_only() {
        let mut pid = PidLoop::new(1.0, 1.0, 1.0, 100.0, -100.0);
        pid.set_setpoint(10.0);
        pid.update(0.0);

        pid.reset();

        assert_eq!(pid.output(), 0.0);
        assert_eq!(pid.last_error(), 0.0);

        // Gains survive the reset: p = 1, i = 1, d = 1 for a unit error
        assert!((pid.update(9.0) - 3.0).abs() < 1e-12);
    }
}
