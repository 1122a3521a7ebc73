//! Feature detectors
//!
//! Each detector inspects the tick's geometry and raw frame and returns a
//! confidence when its feature signature is present. Detectors run only
//! while the recogniser is idle, in fixed priority order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::state::{CircleAux, CrossAux, ObstacleAux, ParkingAux, RampAux};
use super::{Params, TurnDirection};
use crate::vision::TrackGeometry;
use sense_if::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Mean centreline delta between successive rows of the band, in pixels per
/// row. Positive when the centreline moves right with increasing row.
pub(super) fn curvature(geometry: &TrackGeometry, band: (usize, usize)) -> f64 {
    let (start, end) = band;
    if start >= end || end > FRAME_HEIGHT {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut count = 0u32;

    for row in start.max(1)..end {
        sum += geometry.center[row] - geometry.center[row - 1];
        count += 1;
    }

    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

/// Intersection: a band of rows much wider than the regular track.
pub(super) fn detect_cross(
    geometry: &TrackGeometry,
    params: &Params,
    aux: &mut CrossAux,
) -> Option<u8> {
    if !geometry.track_found || geometry.valid_row_count < 5 {
        return None;
    }

    let (start, end) = params.cross_band;
    let mut wide_count = 0usize;
    let mut width_sum = 0usize;
    let mut check_rows = 0usize;

    for row in start..end.min(FRAME_HEIGHT) {
        let width = geometry.width[row];
        if width > 0 {
            width_sum += width;
            check_rows += 1;

            if width > params.cross_width_threshold {
                wide_count += 1;
            }
        }
    }

    if check_rows == 0 {
        return None;
    }

    let avg_width = width_sum as f64 / check_rows as f64;

    if wide_count >= params.cross_min_wide_rows && avg_width > params.cross_min_avg_width {
        aux.left_found = true;
        aux.right_found = true;
        Some(((wide_count * 100) / check_rows) as u8)
    } else {
        None
    }
}

/// Roundabout: sustained centreline curvature. The qualifying run counter
/// increments on curved ticks and decrements otherwise, it is never reset
/// outright so brief dropouts do not discard the evidence.
pub(super) fn detect_circle(
    geometry: &TrackGeometry,
    params: &Params,
    aux: &mut CircleAux,
) -> Option<u8> {
    if !geometry.track_found || geometry.valid_row_count < 10 {
        return None;
    }

    let curv = curvature(geometry, params.circle_band);
    aux.curvature = curv;

    if curv.abs() > params.circle_curvature_threshold {
        aux.continuous_run += 1;

        aux.direction = if curv > 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        };

        if aux.continuous_run >= params.circle_min_run {
            let confidence = 60 + aux.continuous_run.saturating_mul(2).min(35) as u8;
            return Some(confidence.min(95));
        }
    } else if aux.continuous_run > 0 {
        aux.continuous_run -= 1;
    }

    None
}

/// Ramp: strong vertical brightness contrast between the far and near
/// fields, or a sustained collapse of the valid row count.
pub(super) fn detect_ramp(
    frame: &Frame,
    geometry: &TrackGeometry,
    params: &Params,
    aux: &mut RampAux,
) -> Option<u8> {
    let top = band_mean(frame, params.ramp_top_band, params.ramp_col_band);
    let bottom = band_mean(frame, params.ramp_bottom_band, params.ramp_col_band);

    if let (Some(top), Some(bottom)) = (top, bottom) {
        let diff = (top - bottom).abs();

        if diff > params.ramp_brightness_change {
            aux.brightness_changed = true;
            let confidence = 55.0 + diff / 5.0;
            return Some(confidence.min(80.0) as u8);
        }
    }

    // Fall back on edge loss: the crest of a ramp takes the track out of
    // view for several ticks
    if geometry.valid_row_count < params.ramp_edge_lost_floor {
        aux.edge_lost_count += 1;

        if aux.edge_lost_count > params.ramp_edge_lost_ticks {
            return Some(55);
        }
    } else {
        aux.edge_lost_count = 0;
    }

    None
}

/// Parking: several rows of the band almost entirely covered by bright
/// marker paint between the track edges.
pub(super) fn detect_parking(
    frame: &Frame,
    geometry: &TrackGeometry,
    params: &Params,
    aux: &mut ParkingAux,
) -> Option<u8> {
    let (start, end) = params.parking_band;
    let mut white_rows = 0usize;

    for row in start..end.min(FRAME_HEIGHT) {
        let left = geometry.left_edge[row];
        let right = geometry.right_edge[row];

        if left < right && right < FRAME_WIDTH {
            let mut white_count = 0usize;
            let check_width = right - left;

            for col in left..right {
                if frame.get(row, col) > params.parking_white_threshold {
                    white_count += 1;
                }
            }

            if check_width > 0
                && (white_count as f64) > (check_width as f64) * params.parking_white_fraction
            {
                white_rows += 1;
            }
        }
    }

    if white_rows >= params.parking_min_rows {
        aux.white_rows = white_rows;
        let confidence = 80 + (white_rows * 2).min(15) as u8;
        Some(confidence.min(95))
    } else {
        None
    }
}

/// Obstacle: a dark area blocking the centre third of the track over several
/// rows.
pub(super) fn detect_obstacle(
    frame: &Frame,
    geometry: &TrackGeometry,
    params: &Params,
    aux: &mut ObstacleAux,
) -> Option<u8> {
    if !geometry.track_found || geometry.valid_row_count < 5 {
        return None;
    }

    let (area, rows) = dark_area(
        frame,
        geometry,
        params.obstacle_band,
        params.obstacle_dark_threshold,
    );
    aux.area = area;

    if area > params.obstacle_min_area && rows >= params.obstacle_min_rows {
        let confidence = 60 + (rows * 3).min(30) as u8;
        Some(confidence.min(90))
    } else {
        None
    }
}

/// Dark pixel area and qualifying row count in the centre third of the
/// track over the given row band. Shared between the obstacle detector and
/// its pass handler.
pub(super) fn dark_area(
    frame: &Frame,
    geometry: &TrackGeometry,
    band: (usize, usize),
    dark_threshold: u8,
) -> (usize, usize) {
    let (start, end) = band;
    let mut area = 0usize;
    let mut rows = 0usize;

    for row in start..end.min(FRAME_HEIGHT) {
        let left = geometry.left_edge[row];
        let right = geometry.right_edge[row];

        if left < right && right < FRAME_WIDTH {
            let centre = (left + right) / 2;
            let width = right - left;

            let check_start = centre.saturating_sub(width / 6);
            let check_end = (centre + width / 6).min(FRAME_WIDTH);

            let mut dark_count = 0usize;
            for col in check_start..check_end {
                if frame.get(row, col) < dark_threshold {
                    dark_count += 1;
                    area += 1;
                }
            }

            if dark_count > (check_end - check_start) / 2 {
                rows += 1;
            }
        }
    }

    (area, rows)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Mean raw intensity over a row/column band, `None` if the band is empty.
fn band_mean(frame: &Frame, rows: (usize, usize), cols: (usize, usize)) -> Option<f64> {
    let mut sum = 0u64;
    let mut count = 0u64;

    for row in rows.0..rows.1.min(FRAME_HEIGHT) {
        for col in cols.0..cols.1.min(FRAME_WIDTH) {
            sum += frame.get(row, col) as u64;
            count += 1;
        }
    }

    if count > 0 {
        Some(sum as f64 / count as f64)
    } else {
        None
    }
}
