//! Implementations for the feature recogniser state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{detect, handle, ElementError, ElementState, ElementType, Params, TurnDirection};
use crate::vision::TrackGeometry;
use sense_if::frame::Frame;
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Feature recogniser module state
#[derive(Default)]
pub struct ElementRecog {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// The active feature episode.
    current: ElementInfo,

    /// The most recently passed feature.
    last: ElementInfo,

    /// Ticks remaining before detection may run again after a pass.
    holdoff: u32,

    // Per-type working state, reset with each episode
    pub(crate) cross: CrossAux,
    pub(crate) circle: CircleAux,
    pub(crate) ramp: RampAux,
    pub(crate) parking: ParkingAux,
    pub(crate) obstacle: ObstacleAux,

    // Pass counters for telemetry
    pub cross_passed: u8,
    pub circle_passed: u8,
    pub ramp_passed: u8,
    pub obstacle_passed: u8,
}

/// Input data to the feature recogniser.
#[derive(Default)]
pub struct ElementInputData {
    /// Track geometry extracted this tick.
    pub geometry: TrackGeometry,

    /// The raw frame the geometry was extracted from.
    pub frame: Frame,
}

/// The state of one feature episode.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ElementInfo {
    /// Feature type, `None` when idle.
    pub element_type: ElementType,

    /// Lifecycle state. `None` iff `element_type` is `None`.
    pub state: ElementState,

    /// Detection confidence, 0-100.
    pub confidence: u8,

    /// Ticks since the feature was found.
    pub frame_count: u32,

    /// Estimated distance to the feature, in meters, where the detector
    /// provides one.
    pub distance_m: f64,
}

/// Status report for feature recognition processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Active feature type.
    pub element_type: ElementType,

    /// Active lifecycle state.
    pub state: ElementState,

    /// Active confidence.
    pub confidence: u8,

    /// Ticks since the feature was found.
    pub frame_count: u32,
}

// Per-type working state. Lifted out of the handlers so an episode reset
// clears every counter.

/// Intersection working state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CrossAux {
    pub left_found: bool,
    pub right_found: bool,

    /// Ticks spent driving straight through the intersection.
    pub straight_count: u32,
}

/// Roundabout working state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CircleAux {
    /// Mean centreline delta of the last tick, pixels per row.
    pub curvature: f64,

    /// Turn direction implied by the curvature sign.
    pub direction: TurnDirection,

    /// Qualifying-tick run counter, incremented and decremented, never
    /// reset while idle.
    pub continuous_run: u32,

    /// Low-curvature run counter used by the pass handler.
    pub low_curvature_run: u32,
}

/// Ramp working state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RampAux {
    pub brightness_changed: bool,

    /// Consecutive ticks with the valid row count below the floor.
    pub edge_lost_count: u32,
}

/// Parking working state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ParkingAux {
    /// Marker rows counted at detection.
    pub white_rows: usize,
}

/// Obstacle working state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ObstacleAux {
    /// Dark area of the last tick, in pixels.
    pub area: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ElementRecog {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = ElementInputData;
    type OutputData = ElementInfo;
    type StatusReport = StatusReport;
    type ProcError = ElementError;

    /// Initialise the feature recogniser.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        let mut arch_path = session.arch_root.clone();
        arch_path.push("elements");
        std::fs::create_dir_all(arch_path).unwrap();

        self.arch_report = Archiver::from_path(
            session, "elements/status_report.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the feature recogniser.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if self.current.element_type != ElementType::None {
            self.advance_episode(input_data);
        } else if self.holdoff > 0 {
            self.holdoff -= 1;
        } else {
            self.run_detectors(input_data);
        }

        self.report = StatusReport {
            element_type: self.current.element_type,
            state: self.current.state,
            confidence: self.current.confidence,
            frame_count: self.current.frame_count,
        };

        let output = self.current;

        // A passed episode archives and resets, so the tick after a pass
        // reports the recogniser idle
        if self.current.state == ElementState::Passed {
            self.archive_and_reset();
        }

        Ok((output, self.report))
    }
}

impl Archived for ElementRecog {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl ElementRecog {
    /// Create a recogniser with explicit parameters, for use without a
    /// parameter file.
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// The active feature episode.
    pub fn current(&self) -> &ElementInfo {
        &self.current
    }

    /// The most recently passed feature.
    pub fn last(&self) -> &ElementInfo {
        &self.last
    }

    /// Turn direction of the active or last roundabout.
    pub fn circle_direction(&self) -> TurnDirection {
        self.circle.direction
    }

    /// Advance the active episode by one tick.
    fn advance_episode(&mut self, input: &ElementInputData) {
        self.current.frame_count += 1;

        handle::update_lifecycle(&mut self.current, &self.params);

        if self.current.state != ElementState::Passed {
            match self.current.element_type {
                ElementType::Cross => handle::handle_cross(
                    &input.geometry,
                    &self.params,
                    &mut self.current,
                    &mut self.cross,
                ),
                ElementType::Circle => handle::handle_circle(
                    &input.geometry,
                    &self.params,
                    &mut self.current,
                    &mut self.circle,
                ),
                ElementType::Ramp => handle::handle_ramp(&self.params, &mut self.current),
                ElementType::Parking => handle::handle_parking(&mut self.current),
                ElementType::Obstacle => handle::handle_obstacle(
                    &input.frame,
                    &input.geometry,
                    &self.params,
                    &mut self.current,
                ),
                ElementType::None => (),
            }
        }
    }

    /// Run the detectors in priority order and activate the first that
    /// fires with sufficient confidence.
    fn run_detectors(&mut self, input: &ElementInputData) {
        let geometry = &input.geometry;
        let frame = &input.frame;

        let fired = if let Some(confidence) =
            detect::detect_parking(frame, geometry, &self.params, &mut self.parking)
        {
            Some((ElementType::Parking, confidence, self.params.parking_confidence_threshold,
                self.params.parking_distance_m))
        } else if let Some(confidence) =
            detect::detect_obstacle(frame, geometry, &self.params, &mut self.obstacle)
        {
            Some((ElementType::Obstacle, confidence, self.params.obstacle_confidence_threshold, 0.0))
        } else if let Some(confidence) =
            detect::detect_circle(geometry, &self.params, &mut self.circle)
        {
            Some((ElementType::Circle, confidence, self.params.circle_confidence_threshold, 0.0))
        } else if let Some(confidence) =
            detect::detect_cross(geometry, &self.params, &mut self.cross)
        {
            Some((ElementType::Cross, confidence, self.params.cross_confidence_threshold, 0.0))
        } else if let Some(confidence) =
            detect::detect_ramp(frame, geometry, &self.params, &mut self.ramp)
        {
            Some((ElementType::Ramp, confidence, self.params.ramp_confidence_threshold, 0.0))
        } else {
            None
        };

        if let Some((element_type, confidence, threshold, distance_m)) = fired {
            if confidence >= threshold {
                self.current = ElementInfo {
                    element_type,
                    state: ElementState::Found,
                    confidence,
                    frame_count: 1,
                    distance_m,
                };

                info!(
                    "Element found: {} (confidence {})",
                    element_type, confidence
                );
            }
        }
    }

    /// Archive the passed episode and return to idle.
    fn archive_and_reset(&mut self) {
        debug!(
            "Element passed: {} after {} ticks",
            self.current.element_type, self.current.frame_count
        );

        match self.current.element_type {
            ElementType::Cross => self.cross_passed = self.cross_passed.saturating_add(1),
            ElementType::Circle => self.circle_passed = self.circle_passed.saturating_add(1),
            ElementType::Ramp => self.ramp_passed = self.ramp_passed.saturating_add(1),
            ElementType::Obstacle => {
                self.obstacle_passed = self.obstacle_passed.saturating_add(1)
            }
            _ => (),
        }

        self.last = self.current;
        self.current = ElementInfo::default();

        self.cross = CrossAux::default();
        self.circle = CircleAux::default();
        self.ramp = RampAux::default();
        self.parking = ParkingAux::default();
        self.obstacle = ObstacleAux::default();

        self.holdoff = self.params.redetect_holdoff_ticks;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_cam;
    use crate::vision::{Params as VisionParams, TrackVision, VisionInputData};

    /// Run a frame through the extractor and recogniser, returning the
    /// recogniser output.
    fn process(
        vision: &mut TrackVision,
        recog: &mut ElementRecog,
        frame: Frame,
    ) -> ElementInfo {
        let (vision_out, _) = vision
            .proc(&VisionInputData {
                frame: frame.clone(),
            })
            .expect("extraction failed");

        let (info, _) = recog
            .proc(&ElementInputData {
                geometry: vision_out.geometry,
                frame,
            })
            .expect("recognition failed");

        info
    }

    #[test]
    fn test_no_element_on_plain_track() {
        let mut vision = TrackVision::with_params(VisionParams::default());
        let mut recog = ElementRecog::with_params(Params::default());

        for _ in 0..20 {
            let info = process(&mut vision, &mut recog, sim_cam::straight_frame(94, 120));
            assert_eq!(info.element_type, ElementType::None);
        }
    }

    #[test]
    fn test_cross_detected_on_wide_band() {
        let mut vision = TrackVision::with_params(VisionParams::default());
        let mut recog = ElementRecog::with_params(Params::default());

        let frame = sim_cam::intersection_frame(94, 120, 20..50);
        let info = process(&mut vision, &mut recog, frame);

        assert_eq!(info.element_type, ElementType::Cross);
        assert_eq!(info.state, ElementState::Found);
        assert!(info.confidence >= 65);
    }

    #[test]
    fn test_parking_has_priority_over_cross() {
        let mut vision = TrackVision::with_params(VisionParams::default());
        let mut recog = ElementRecog::with_params(Params::default());

        // A frame carrying both a wide band and a parking marker must
        // activate the parking element
        let mut frame = sim_cam::intersection_frame(94, 120, 20..50);
        sim_cam::paint_parking_marker(&mut frame, 94, 120, 62..70);

        let info = process(&mut vision, &mut recog, frame);
        assert_eq!(info.element_type, ElementType::Parking);
    }

    #[test]
    fn test_exclusivity_and_passed_reset() {
        let mut vision = TrackVision::with_params(VisionParams::default());
        let mut recog = ElementRecog::with_params(Params::default());

        let mut passed_seen = false;

        for tick in 0..200 {
            // Intersection band for a while, then plain track
            let frame = if tick < 40 {
                sim_cam::intersection_frame(94, 120, 20..50)
            } else {
                sim_cam::straight_frame(94, 120)
            };

            let info = process(&mut vision, &mut recog, frame);

            // Never more than one active element by construction; check the
            // NONE <-> NONE-state invariant instead
            if info.element_type == ElementType::None {
                assert_eq!(info.state, ElementState::None);
            } else {
                assert_ne!(info.state, ElementState::None);
            }

            if passed_seen {
                // The tick after a pass must report idle
                assert_eq!(info.element_type, ElementType::None);
                passed_seen = false;
            }

            if info.state == ElementState::Passed {
                passed_seen = true;
            }
        }

        assert!(recog.cross_passed >= 1, "intersection never passed");
    }

    #[test]
    fn test_obstacle_detected_and_passed() {
        let mut vision = TrackVision::with_params(VisionParams::default());
        let mut recog = ElementRecog::with_params(Params::default());

        let mut found = false;
        let mut passed = false;

        for tick in 0..200 {
            let frame = if tick < 30 {
                sim_cam::obstacle_frame(94, 120, 45..75)
            } else {
                sim_cam::straight_frame(94, 120)
            };

            let info = process(&mut vision, &mut recog, frame);

            if info.element_type == ElementType::Obstacle {
                found = true;
            }
            if found && info.state == ElementState::Passed {
                passed = true;
                break;
            }
        }

        assert!(found, "obstacle never found");
        assert!(passed, "obstacle never passed");
    }
}
