//! Implementations for the track extractor state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::threshold::{self, Mask};
use super::{scan_columns, scan_gradient, EdgeScanMode, Params, VisionError};
use sense_if::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Track extractor module state
#[derive(Default)]
pub struct TrackVision {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    geometry: TrackGeometry,
    mask: Mask,

    /// Deviation held from the last tick with valid rows
    last_deviation: Deviation,
}

/// Input data to the track extractor.
#[derive(Default)]
pub struct VisionInputData {
    /// The frame captured for this tick.
    pub frame: Frame,
}

/// Output data from the track extractor, republished each tick and read-only
/// downstream.
#[derive(Clone, Default)]
pub struct VisionOutputData {
    /// Per-row track geometry.
    pub geometry: TrackGeometry,

    /// Lateral deviation signal.
    pub deviation: Deviation,

    /// The binary mask the geometry was extracted from.
    pub mask: Mask,
}

/// Per-row track geometry.
#[derive(Clone)]
pub struct TrackGeometry {
    /// Left track edge per row, in pixel columns.
    pub left_edge: [usize; FRAME_HEIGHT],

    /// Right track edge per row, in pixel columns.
    pub right_edge: [usize; FRAME_HEIGHT],

    /// Track centreline per row, in pixel columns. Carried forward on
    /// invalid rows.
    pub center: [f64; FRAME_HEIGHT],

    /// Track width per row, in pixels.
    pub width: [usize; FRAME_HEIGHT],

    /// True for rows whose width passed the plausibility check.
    pub row_valid: [bool; FRAME_HEIGHT],

    /// Number of valid rows in the scan window.
    pub valid_row_count: usize,

    /// True iff the valid row count reached the configured minimum.
    pub track_found: bool,
}

/// Lateral deviation of the track centre from the image centre.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct Deviation {
    /// Signed deviation in pixels, clamped to the configured limit.
    pub error_px: f64,

    /// Deviation normalised by the image half width, -1.0 to 1.0.
    pub ratio: f64,
}

/// Status report for track extractor processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Number of rows passing the width check this tick.
    pub valid_row_count: usize,

    /// True if the track was found this tick.
    pub track_found: bool,

    /// True if the deviation was held from the previous tick.
    pub deviation_held: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            left_edge: [0; FRAME_HEIGHT],
            right_edge: [0; FRAME_HEIGHT],
            center: [(FRAME_WIDTH / 2) as f64; FRAME_HEIGHT],
            width: [0; FRAME_HEIGHT],
            row_valid: [false; FRAME_HEIGHT],
            valid_row_count: 0,
            track_found: false,
        }
    }
}

impl State for TrackVision {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = VisionInputData;
    type OutputData = VisionOutputData;
    type StatusReport = StatusReport;
    type ProcError = VisionError;

    /// Initialise the track extractor.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        // Create the arch folder for vision
        let mut arch_path = session.arch_root.clone();
        arch_path.push("vision");
        std::fs::create_dir_all(arch_path).unwrap();

        self.arch_report = Archiver::from_path(
            session, "vision/status_report.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the track extractor.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if !self.params.scan_window_valid() {
            return Err(VisionError::InvalidScanWindow {
                start: self.params.scan_start_row,
                end: self.params.scan_end_row,
            });
        }

        // Clear the status report
        self.report = StatusReport::default();

        // Binarise with the configured strategy
        self.mask = threshold::binarize(&input_data.frame, &self.params);

        // Extract edges with the configured algorithm. The geometry keeps
        // its last written values on rows the scan cannot recover.
        match self.params.edge_scan_mode {
            EdgeScanMode::GradientScan => scan_gradient::scan(
                &input_data.frame,
                &self.mask,
                &self.params,
                &mut self.geometry,
            ),
            EdgeScanMode::ColumnScan => {
                scan_columns::scan(&self.mask, &self.params, &mut self.geometry)
            }
        }

        // Deviation from the valid rows, held on full loss
        let deviation = self.calc_deviation();

        self.report.valid_row_count = self.geometry.valid_row_count;
        self.report.track_found = self.geometry.track_found;

        trace!(
            "TrackVision: {} valid rows, deviation {:.1} px",
            self.geometry.valid_row_count,
            deviation.error_px
        );

        Ok((
            VisionOutputData {
                geometry: self.geometry.clone(),
                deviation,
                mask: self.mask.clone(),
            },
            self.report,
        ))
    }
}

impl Archived for TrackVision {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl TrackVision {
    /// Create an extractor with explicit parameters, for use without a
    /// parameter file.
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Compute the deviation from the currently valid rows.
    ///
    /// Rows are weighted by distance band from the scan bottom: near rows
    /// steer the vehicle, far rows only bias the estimate. With no valid
    /// rows the previous deviation is held.
    fn calc_deviation(&mut self) -> Deviation {
        let half_width = (FRAME_WIDTH / 2) as f64;

        let mut sum_weight = 0u32;
        let mut sum_weighted_centre = 0.0f64;

        let mut row = self.params.scan_start_row;
        while row > self.params.scan_end_row {
            if self.geometry.row_valid[row] {
                let distance_from_bottom = self.params.scan_start_row - row;
                let weight: u32 = if distance_from_bottom < 30 {
                    3
                } else if distance_from_bottom < 60 {
                    2
                } else {
                    1
                };

                let centre = self.geometry.center[row];
                if centre < FRAME_WIDTH as f64 {
                    sum_weighted_centre += centre * weight as f64;
                    sum_weight += weight;
                }
            }

            if row < self.params.scan_step {
                break;
            }
            row -= self.params.scan_step;
        }

        if sum_weight > 0 {
            let weighted_centre = sum_weighted_centre / sum_weight as f64;

            let error = (weighted_centre - half_width).clamp(
                -self.params.deviation_limit_px,
                self.params.deviation_limit_px,
            );

            self.last_deviation = Deviation {
                error_px: error,
                ratio: error / half_width,
            };
        } else {
            // No valid data, keep the previous deviation
            self.report.deviation_held = true;
        }

        self.last_deviation
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_cam;

    fn extract(vision: &mut TrackVision, frame: Frame) -> VisionOutputData {
        let (output, _) = vision
            .proc(&VisionInputData { frame })
            .expect("extraction failed");
        output
    }

    #[test]
    fn test_straight_track_found() {
        let mut vision = TrackVision::with_params(Params::default());
        let output = extract(&mut vision, sim_cam::straight_frame(94, 120));

        assert!(output.geometry.track_found);
        assert!(output.deviation.error_px.abs() < 3.0);
    }

    #[test]
    fn test_offset_track_gives_signed_deviation() {
        let mut vision = TrackVision::with_params(Params::default());

        // Track shifted right of the image centre, deviation positive
        let output = extract(&mut vision, sim_cam::straight_frame(124, 120));
        assert!(output.deviation.error_px > 10.0);

        // And shifted left, negative
        let mut vision = TrackVision::with_params(Params::default());
        let output = extract(&mut vision, sim_cam::straight_frame(64, 120));
        assert!(output.deviation.error_px < -10.0);
    }

    #[test]
    fn test_deviation_bounded() {
        let mut vision = TrackVision::with_params(Params::default());

        // An extreme offset must clamp at the limit
        let output = extract(&mut vision, sim_cam::straight_frame(170, 40));
        assert!(output.deviation.error_px.abs() <= 80.0);
    }

    #[test]
    fn test_deviation_held_on_lost_track() {
        let mut vision = TrackVision::with_params(Params::default());

        let found = extract(&mut vision, sim_cam::straight_frame(110, 120));
        assert!(found.geometry.track_found);

        // A frame with no track at all: deviation unchanged, found flag
        // dropped
        let lost = extract(&mut vision, Frame::filled(20));
        assert!(!lost.geometry.track_found);
        assert_eq!(lost.deviation.error_px, found.deviation.error_px);
        assert_eq!(lost.deviation.ratio, found.deviation.ratio);
    }

    #[test]
    fn test_edge_continuity_under_drift() {
        let mut vision = TrackVision::with_params(Params::default());

        // Track centre drifting 1 px every row, well within 2 px/row
        let frame = sim_cam::drifting_frame(94, 120, 1.0);
        let output = extract(&mut vision, frame);

        let params = Params::default();
        for row in (params.scan_end_row + 2)..params.scan_start_row {
            if output.geometry.row_valid[row] && output.geometry.row_valid[row + 1] {
                let delta = (output.geometry.left_edge[row] as i64
                    - output.geometry.left_edge[row + 1] as i64)
                    .abs();
                assert!(
                    delta <= params.edge_jump_limit as i64,
                    "left edge jump {} at row {}",
                    delta,
                    row
                );
            }
        }
    }

    #[test]
    fn test_column_scan_finds_straight_track() {
        let params = Params {
            edge_scan_mode: EdgeScanMode::ColumnScan,
            ..Default::default()
        };
        let mut vision = TrackVision::with_params(params);
        let output = extract(&mut vision, sim_cam::straight_frame(94, 120));

        assert!(output.geometry.track_found);
        assert!(output.deviation.error_px.abs() < 3.0);
    }
}
