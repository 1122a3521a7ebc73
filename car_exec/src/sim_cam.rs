//! # Simulated camera
//!
//! Synthetic frame source used for development and test. Frames show a
//! bright track corridor on a dark floor, optionally overlaid with feature
//! signatures (a widened intersection band, a parking marker, an obstacle
//! blob, a darkened far field for a ramp) and Perlin surface noise.
//!
//! The [`SimCam`] runs a scripted course of phases for the executable; the
//! free builder functions produce single frames for tests and benches.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use noise::{NoiseFn, Perlin};
use serde::Deserialize;

// Internal
use sense_if::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Intensity of the floor outside the track.
pub const FLOOR_LEVEL: u8 = 30;

/// Intensity of the track surface.
pub const SURFACE_LEVEL: u8 = 180;

/// Intensity of parking marker paint.
pub const MARKER_LEVEL: u8 = 240;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the simulated camera.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Track centre column of the course.
    pub track_center_px: usize,

    /// Track width of the course, in pixels.
    pub track_width_px: usize,

    /// Peak amplitude of the Perlin surface noise, in intensity levels.
    pub noise_amplitude: f64,

    /// Spatial scale of the surface noise.
    pub noise_scale: f64,

    /// The scripted course.
    pub course: Vec<CoursePhase>,
}

/// One phase of the scripted course.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoursePhase {
    /// What the track shows during the phase.
    pub kind: PhaseKind,

    /// Phase length in ticks.
    pub ticks: u64,
}

/// Track signatures the course can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Straight,
    Intersection,
    Curve,
    Obstacle,
    Ramp,
    Parking,
}

/// Simulated camera state.
pub struct SimCam {
    params: Params,
    perlin: Perlin,
    tick: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            track_center_px: FRAME_WIDTH / 2,
            track_width_px: 120,
            noise_amplitude: 6.0,
            noise_scale: 0.08,
            course: vec![
                CoursePhase {
                    kind: PhaseKind::Straight,
                    ticks: 200,
                },
                CoursePhase {
                    kind: PhaseKind::Intersection,
                    ticks: 60,
                },
                CoursePhase {
                    kind: PhaseKind::Straight,
                    ticks: 140,
                },
                CoursePhase {
                    kind: PhaseKind::Obstacle,
                    ticks: 60,
                },
                CoursePhase {
                    kind: PhaseKind::Straight,
                    ticks: 140,
                },
                CoursePhase {
                    kind: PhaseKind::Parking,
                    ticks: 400,
                },
            ],
        }
    }
}

impl SimCam {
    /// Create a simulated camera running the given course.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            perlin: Perlin::new(),
            tick: 0,
        }
    }

    /// True once the course is over.
    pub fn course_finished(&self) -> bool {
        let total: u64 = self.params.course.iter().map(|p| p.ticks).sum();
        self.tick >= total
    }

    /// Capture the next frame of the course.
    pub fn capture(&mut self) -> Frame {
        let centre = self.params.track_center_px;
        let width = self.params.track_width_px;

        let mut frame = match self.active_phase() {
            PhaseKind::Straight => straight_frame(centre, width),
            PhaseKind::Intersection => intersection_frame(centre, width, 20..50),
            PhaseKind::Curve => curved_frame(centre, width, 1.0),
            PhaseKind::Obstacle => obstacle_frame(centre, width, 45..75),
            PhaseKind::Ramp => ramp_frame(centre, width),
            PhaseKind::Parking => {
                let mut f = straight_frame(centre, width);
                paint_parking_marker(&mut f, centre, width, 62..70);
                f
            }
        };

        self.apply_noise(&mut frame);
        self.tick += 1;

        frame
    }

    /// The phase the current tick falls into.
    fn active_phase(&self) -> PhaseKind {
        let mut remaining = self.tick;
        for phase in &self.params.course {
            if remaining < phase.ticks {
                return phase.kind;
            }
            remaining -= phase.ticks;
        }

        PhaseKind::Straight
    }

    /// Overlay Perlin noise on the frame surface.
    fn apply_noise(&self, frame: &mut Frame) {
        if self.params.noise_amplitude <= 0.0 {
            return;
        }

        let scale = self.params.noise_scale;
        let t = self.tick as f64 * 0.1;

        for row in 0..FRAME_HEIGHT {
            for col in 0..FRAME_WIDTH {
                let n = self
                    .perlin
                    .get([col as f64 * scale, row as f64 * scale + t]);
                let value = frame.get(row, col) as f64 + n * self.params.noise_amplitude;
                frame.set(row, col, value.clamp(0.0, 255.0) as u8);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FRAME BUILDERS
// ------------------------------------------------------------------------------------------------

/// A straight track corridor of the given centre and width.
pub fn straight_frame(center_px: usize, width_px: usize) -> Frame {
    let mut frame = Frame::filled(FLOOR_LEVEL);
    for row in 0..FRAME_HEIGHT {
        paint_corridor_row(&mut frame, row, center_px as f64, width_px);
    }
    frame
}

/// A track whose centre drifts by the given pixels per row towards the top
/// of the image.
pub fn drifting_frame(center_px: usize, width_px: usize, drift_px_per_row: f64) -> Frame {
    let mut frame = Frame::filled(FLOOR_LEVEL);
    for row in 0..FRAME_HEIGHT {
        let centre = center_px as f64 + drift_px_per_row * (FRAME_HEIGHT - 1 - row) as f64;
        paint_corridor_row(&mut frame, row, centre, width_px);
    }
    frame
}

/// A track bending towards the top of the image, with the centre shift
/// capped so the corridor stays inside the frame.
pub fn curved_frame(center_px: usize, width_px: usize, curve_px_per_row: f64) -> Frame {
    let mut frame = Frame::filled(FLOOR_LEVEL);

    let max_shift = (FRAME_WIDTH - 10 - width_px / 2)
        .saturating_sub(center_px) as f64;

    for row in 0..FRAME_HEIGHT {
        let shift = if row < 90 {
            (curve_px_per_row * (90 - row) as f64).min(max_shift)
        } else {
            0.0
        };
        paint_corridor_row(&mut frame, row, center_px as f64 + shift, width_px);
    }

    frame
}

/// A straight track with a widened band of rows, the intersection
/// signature.
pub fn intersection_frame(
    center_px: usize,
    width_px: usize,
    wide_rows: std::ops::Range<usize>,
) -> Frame {
    let mut frame = straight_frame(center_px, width_px);
    for row in wide_rows {
        if row < FRAME_HEIGHT {
            paint_corridor_row(&mut frame, row, center_px as f64, width_px + 40);
        }
    }
    frame
}

/// A straight track with a dark obstacle blob over the corridor centre.
pub fn obstacle_frame(
    center_px: usize,
    width_px: usize,
    rows: std::ops::Range<usize>,
) -> Frame {
    let mut frame = straight_frame(center_px, width_px);

    let blob_half = width_px / 6;
    for row in rows {
        if row < FRAME_HEIGHT {
            for col in center_px.saturating_sub(blob_half)
                ..(center_px + blob_half).min(FRAME_WIDTH)
            {
                frame.set(row, col, FLOOR_LEVEL);
            }
        }
    }

    frame
}

/// A straight track whose far field has dropped dark, the ramp crest
/// signature.
pub fn ramp_frame(center_px: usize, width_px: usize) -> Frame {
    let mut frame = straight_frame(center_px, width_px);
    for row in 0..35 {
        for col in 0..FRAME_WIDTH {
            frame.set(row, col, FLOOR_LEVEL);
        }
    }
    frame
}

/// Paint bright marker rows across the corridor, the parking signature.
pub fn paint_parking_marker(
    frame: &mut Frame,
    center_px: usize,
    width_px: usize,
    rows: std::ops::Range<usize>,
) {
    let half = width_px / 2;
    for row in rows {
        if row < FRAME_HEIGHT {
            for col in center_px.saturating_sub(half)..(center_px + half).min(FRAME_WIDTH) {
                frame.set(row, col, MARKER_LEVEL);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Paint one corridor row of the given centre and width.
fn paint_corridor_row(frame: &mut Frame, row: usize, center_px: f64, width_px: usize) {
    let half = (width_px / 2) as f64;
    let start = (center_px - half).max(0.0) as usize;
    let end = ((center_px + half) as usize).min(FRAME_WIDTH);

    for col in start..end {
        frame.set(row, col, SURFACE_LEVEL);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_straight_frame_geometry() {
        let frame = straight_frame(94, 120);

        assert_eq!(frame.get(60, 94), SURFACE_LEVEL);
        assert_eq!(frame.get(60, 10), FLOOR_LEVEL);
        assert_eq!(frame.get(60, 180), FLOOR_LEVEL);
    }

    #[test]
    fn test_course_advances_and_finishes() {
        let params = Params {
            noise_amplitude: 0.0,
            course: vec![
                CoursePhase {
                    kind: PhaseKind::Straight,
                    ticks: 2,
                },
                CoursePhase {
                    kind: PhaseKind::Intersection,
                    ticks: 1,
                },
            ],
            ..Default::default()
        };

        let mut cam = SimCam::new(params);

        assert!(!cam.course_finished());
        let _ = cam.capture();
        let _ = cam.capture();

        // Third frame is the intersection phase: corridor wider at row 30
        let frame = cam.capture();
        assert_eq!(frame.get(30, 94 - 70), SURFACE_LEVEL);

        assert!(cam.course_finished());
    }
}
