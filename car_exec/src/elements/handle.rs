//! Per-feature lifecycle handlers
//!
//! Handlers run each tick while their feature is active, on top of the
//! generic dwell lifecycle. A handler may force `PASSED` early when the
//! scene shows the feature is behind the vehicle, and every handler has a
//! hard dwell timeout so an episode can never hang.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::detect::{curvature, dark_area};
use super::state::{CircleAux, CrossAux, ElementInfo};
use super::{ElementState, Params};
use crate::vision::TrackGeometry;
use sense_if::frame::{Frame, FRAME_HEIGHT};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Advance the generic dwell lifecycle.
pub(super) fn update_lifecycle(info: &mut ElementInfo, params: &Params) {
    match info.state {
        ElementState::Found => {
            if info.frame_count > params.found_dwell_ticks {
                info.state = ElementState::Entering;
            }
        }
        ElementState::Entering => {
            if info.frame_count > params.entering_dwell_ticks {
                info.state = ElementState::InElement;
            }
        }
        // IN_ELEMENT is left by the per-type handlers
        ElementState::InElement => (),
        ElementState::Leaving => {
            if info.frame_count > params.leaving_dwell_ticks {
                info.state = ElementState::Passed;
            }
        }
        _ => (),
    }
}

/// Intersection handler: passed once the track narrows back over the exit
/// band, or on timeout.
pub(super) fn handle_cross(
    geometry: &TrackGeometry,
    params: &Params,
    info: &mut ElementInfo,
    aux: &mut CrossAux,
) {
    aux.straight_count += 1;

    let (start, end) = params.cross_exit_band;
    let mut narrow_count = 0usize;

    for row in start..end.min(FRAME_HEIGHT) {
        let width = geometry.width[row];
        if width > 0 && width < params.cross_width_threshold {
            narrow_count += 1;
        }
    }

    if narrow_count > params.cross_exit_narrow_rows
        && aux.straight_count > params.cross_exit_min_ticks
    {
        info.state = ElementState::Passed;
    } else if aux.straight_count > params.cross_timeout_ticks {
        info.state = ElementState::Passed;
    }
}

/// Roundabout handler: passed after a sustained low-curvature run, or on
/// timeout. The run counter lives in the roundabout state so it resets with
/// the episode.
pub(super) fn handle_circle(
    geometry: &TrackGeometry,
    params: &Params,
    info: &mut ElementInfo,
    aux: &mut CircleAux,
) {
    let curv = curvature(geometry, params.circle_band);
    aux.curvature = curv;

    if curv.abs() < params.circle_curvature_threshold / 3.0 {
        aux.low_curvature_run += 1;
    } else {
        aux.low_curvature_run = 0;
    }

    if aux.low_curvature_run > params.circle_exit_run
        && info.frame_count > params.circle_exit_min_ticks
    {
        aux.continuous_run = 0;
        aux.low_curvature_run = 0;
        info.state = ElementState::Passed;
    } else if info.frame_count > params.circle_timeout_ticks {
        aux.low_curvature_run = 0;
        info.state = ElementState::Passed;
    }
}

/// Ramp handler: passed after a fixed dwell.
pub(super) fn handle_ramp(params: &Params, info: &mut ElementInfo) {
    if info.frame_count > params.ramp_pass_ticks {
        info.state = ElementState::Passed;
    }
}

/// Parking handler: enter immediately, the position controller brings the
/// vehicle to a stop. A parking episode never passes.
pub(super) fn handle_parking(info: &mut ElementInfo) {
    if info.state == ElementState::Found {
        info.state = ElementState::Entering;
    }
}

/// Obstacle handler: passed once the dark area falls below half the
/// detection trigger, or on timeout.
pub(super) fn handle_obstacle(
    frame: &Frame,
    geometry: &TrackGeometry,
    params: &Params,
    info: &mut ElementInfo,
) {
    let (area, _) = dark_area(
        frame,
        geometry,
        params.obstacle_exit_band,
        params.obstacle_dark_threshold,
    );

    if area < params.obstacle_min_area / 2 && info.frame_count > params.obstacle_exit_min_ticks {
        info.state = ElementState::Passed;
    } else if info.frame_count > params.obstacle_timeout_ticks {
        info.state = ElementState::Passed;
    }
}
