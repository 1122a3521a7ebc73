//! Longest-white-column edge scan
//!
//! The two longest contiguous foreground runs from the image bottom (one per
//! image half, within a restricted column band) anchor the left and right
//! edge searches. Each row is scanned outward from its anchor for a 3-pixel
//! foreground/background/background pattern; rows without one are marked
//! lost. The raw edges are then smoothed with a 3-point moving average,
//! lost rows are repaired by slope extrapolation, and the centreline is
//! blended with a least squares row fit.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::state::TrackGeometry;
use super::threshold::Mask;
use super::Params;
use sense_if::frame::{FRAME_HEIGHT, FRAME_WIDTH};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Weight of the fitted centre in the fit/raw blend.
const FIT_BLEND_WEIGHT: f64 = 0.7;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the longest-white-column scan over the mask, filling the geometry.
pub(super) fn scan(mask: &Mask, params: &Params, geometry: &mut TrackGeometry) {
    let margin = params.edge_search_margin;
    let half_width = FRAME_WIDTH / 2;

    // ---- ANCHORS ----

    let left_anchor = longest_run_column(
        mask,
        params.column_band_start.max(margin),
        half_width,
    )
    .unwrap_or(half_width);

    let right_anchor = longest_run_column(
        mask,
        half_width,
        params.column_band_end.min(FRAME_WIDTH - margin),
    )
    .unwrap_or(half_width);

    // ---- RAW EDGE SEARCH ----

    let mut left = [0.0f64; FRAME_HEIGHT];
    let mut right = [0.0f64; FRAME_HEIGHT];
    let mut left_lost = [true; FRAME_HEIGHT];
    let mut right_lost = [true; FRAME_HEIGHT];

    for row in scan_rows(params) {
        // Left edge: foreground at col, background at col-1 and col-2
        let mut col = left_anchor.max(margin + 2);
        while col > margin + 1 {
            if mask.is_foreground(row, col)
                && !mask.is_foreground(row, col - 1)
                && !mask.is_foreground(row, col - 2)
            {
                left[row] = col as f64;
                left_lost[row] = false;
                break;
            }
            col -= 1;
        }

        // Right edge: foreground at col, background at col+1 and col+2
        let mut col = right_anchor.min(FRAME_WIDTH - margin - 3);
        while col < FRAME_WIDTH - margin - 2 {
            if mask.is_foreground(row, col)
                && !mask.is_foreground(row, col + 1)
                && !mask.is_foreground(row, col + 2)
            {
                right[row] = col as f64;
                right_lost[row] = false;
                break;
            }
            col += 1;
        }
    }

    // ---- SMOOTHING, REPAIR, FIT ----

    smooth_edges(&mut left, &left_lost, params);
    smooth_edges(&mut right, &right_lost, params);

    repair_lost_rows(&mut left, &left_lost, params);
    repair_lost_rows(&mut right, &right_lost, params);

    // ---- ROW VALIDATION ----

    geometry.valid_row_count = 0;
    let mut last_centre = half_width as f64;

    for row in scan_rows(params) {
        let l = left[row].round().max(0.0) as usize;
        let r = right[row].round().min((FRAME_WIDTH - 1) as f64) as usize;

        geometry.left_edge[row] = l;
        geometry.right_edge[row] = r;

        let width = r.saturating_sub(l);
        geometry.width[row] = width;

        if width >= params.track_width_min && width <= params.track_width_max {
            let centre = (l + r) as f64 / 2.0;
            geometry.center[row] = centre;
            geometry.row_valid[row] = true;
            geometry.valid_row_count += 1;
            last_centre = centre;
        } else {
            geometry.center[row] = last_centre;
            geometry.row_valid[row] = false;
        }
    }

    fit_centreline(geometry, params);

    geometry.track_found = geometry.valid_row_count >= params.track_found_min_rows;
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Rows of the scan window, bottom to top.
fn scan_rows(params: &Params) -> impl Iterator<Item = usize> + '_ {
    (params.scan_end_row + 1..=params.scan_start_row)
        .rev()
        .step_by(params.scan_step)
}

/// Column with the longest contiguous foreground run from the image bottom,
/// within [start, end). `None` if every run is empty.
fn longest_run_column(mask: &Mask, start: usize, end: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for col in start..end {
        let mut run = 0;
        let mut row = FRAME_HEIGHT - 1;
        loop {
            if !mask.is_foreground(row, col) {
                break;
            }
            run += 1;
            if row == 0 {
                break;
            }
            row -= 1;
        }

        if run > 0 && best.map(|(br, _)| run > br).unwrap_or(true) {
            best = Some((run, col));
        }
    }

    best.map(|(_, col)| col)
}

/// 3-point moving average over rows which are not lost. A row is only
/// smoothed when both of its scan neighbours are present.
fn smooth_edges(edges: &mut [f64; FRAME_HEIGHT], lost: &[bool; FRAME_HEIGHT], params: &Params) {
    let source = *edges;
    let step = params.scan_step;

    for row in scan_rows(params) {
        if lost[row] {
            continue;
        }

        let below = row + step;
        let above = match row.checked_sub(step) {
            Some(r) => r,
            None => continue,
        };

        if below <= params.scan_start_row
            && above > params.scan_end_row
            && !lost[below]
            && !lost[above]
        {
            edges[row] = (source[below] + source[row] + source[above]) / 3.0;
        }
    }
}

/// Repair lost rows by extrapolating from the last valid edge with a slope
/// blended over the trailing valid transitions, clamped to the image bounds.
fn repair_lost_rows(
    edges: &mut [f64; FRAME_HEIGHT],
    lost: &[bool; FRAME_HEIGHT],
    params: &Params,
) {
    let mut slopes: Vec<f64> = Vec::with_capacity(params.repair_slope_points);
    let mut prev_valid: Option<(usize, f64)> = None;

    for row in scan_rows(params) {
        if !lost[row] {
            if let Some((prev_row, prev_edge)) = prev_valid {
                let rows = (prev_row - row) as f64;
                if rows > 0.0 {
                    if slopes.len() == params.repair_slope_points {
                        slopes.remove(0);
                    }
                    slopes.push((edges[row] - prev_edge) / rows);
                }
            }
            prev_valid = Some((row, edges[row]));
        } else if let Some((prev_row, prev_edge)) = prev_valid {
            let slope = if slopes.is_empty() {
                0.0
            } else {
                slopes.iter().sum::<f64>() / slopes.len() as f64
            };

            let predicted = prev_edge + slope * (prev_row - row) as f64;
            edges[row] = predicted.clamp(0.0, (FRAME_WIDTH - 1) as f64);
        }
        // Rows lost before any valid row keep their zero edge and fail the
        // width check later
    }
}

/// Least squares fit of centre against row over the valid rows, blended
/// 70/30 with the raw centre where the two agree.
fn fit_centreline(geometry: &mut TrackGeometry, params: &Params) {
    // Scalar running sums for the 2-term normal equations
    let mut n = 0.0f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    let mut sum_xx = 0.0f64;
    let mut sum_xy = 0.0f64;

    for row in scan_rows(params) {
        if geometry.row_valid[row] {
            let x = row as f64;
            let y = geometry.center[row];
            n += 1.0;
            sum_x += x;
            sum_y += y;
            sum_xx += x * x;
            sum_xy += x * y;
        }
    }

    if (n as usize) < params.fit_min_points {
        return;
    }

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    for row in scan_rows(params) {
        if !geometry.row_valid[row] {
            continue;
        }

        let raw = geometry.center[row];
        let fitted = slope * row as f64 + intercept;

        // Keep the raw centre where the fit disagrees strongly, it is
        // usually a genuine curve the line model cannot follow
        if (fitted - raw).abs() <= params.fit_blend_max_diff_px {
            geometry.center[row] =
                FIT_BLEND_WEIGHT * fitted + (1.0 - FIT_BLEND_WEIGHT) * raw;
        }
    }
}
