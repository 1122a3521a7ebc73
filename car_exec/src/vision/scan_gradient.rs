//! Gradient-tracked edge scan
//!
//! Rows are scanned bottom to top. Each row's search is anchored on the
//! previous row's edge (continuity constraint) and accepts the strongest
//! foreground to background transition whose raw-intensity gradient exceeds
//! the configured threshold. A failed search widens to the running
//! centreline, and a failure there holds the previous row's edge.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::state::TrackGeometry;
use super::threshold::Mask;
use super::Params;
use sense_if::frame::{Frame, FRAME_WIDTH};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Centreline clamp margin, keeps the search anchor away from the borders.
const CENTRE_CLAMP_PX: usize = 20;

/// Upward (outward) slack allowed on top of the continuity window.
const OUTWARD_SLACK_PX: usize = 10;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the gradient-tracked scan over the mask, filling the geometry.
pub(super) fn scan(
    frame: &Frame,
    mask: &Mask,
    params: &Params,
    geometry: &mut TrackGeometry,
) {
    let margin = params.edge_search_margin;
    let half_width = FRAME_WIDTH / 2;

    // Running anchors, reset each frame
    let mut last_left = margin;
    let mut last_right = FRAME_WIDTH - 1 - margin;
    let mut last_centre = half_width as f64;
    let mut centre_col = half_width;

    geometry.valid_row_count = 0;

    // Validity is per tick; edge and centre values are retained so a lost
    // frame keeps the last written geometry
    for valid in geometry.row_valid.iter_mut() {
        *valid = false;
    }

    let mut row = params.scan_start_row;
    while row > params.scan_end_row {
        // ---- LEFT EDGE ----

        let left_floor = last_left
            .saturating_sub(params.edge_jump_limit)
            .max(margin);
        let left_start = (last_left + OUTWARD_SLACK_PX).min(centre_col);

        let left_found =
            search_left(frame, mask, params, row, left_start, left_floor)
                // Widen from the running centreline
                .or_else(|| search_left(frame, mask, params, row, centre_col, margin));

        match left_found {
            Some(col) => {
                geometry.left_edge[row] = col;
                last_left = col;
            }
            // Edge lost, hold the previous row's edge
            None => geometry.left_edge[row] = last_left,
        }

        // ---- RIGHT EDGE ----

        let right_ceil = (last_right + params.edge_jump_limit)
            .min(FRAME_WIDTH - 1 - margin);
        let right_start = last_right
            .saturating_sub(OUTWARD_SLACK_PX)
            .max(centre_col);

        let right_found =
            search_right(frame, mask, params, row, right_start, right_ceil)
                .or_else(|| {
                    search_right(
                        frame,
                        mask,
                        params,
                        row,
                        centre_col,
                        FRAME_WIDTH - 1 - margin,
                    )
                });

        match right_found {
            Some(col) => {
                geometry.right_edge[row] = col;
                last_right = col;
            }
            None => geometry.right_edge[row] = last_right,
        }

        // ---- ROW VALIDATION ----

        // A row where both searches fell back to edge-hold carries values
        // but is not evidence of track
        let edge_seen = left_found.is_some() || right_found.is_some();

        let left = geometry.left_edge[row];
        let right = geometry.right_edge[row];
        let width = right.saturating_sub(left);
        geometry.width[row] = width;

        if edge_seen && width >= params.track_width_min && width <= params.track_width_max {
            let centre = (left + right) as f64 / 2.0;
            geometry.center[row] = centre;
            geometry.row_valid[row] = true;
            geometry.valid_row_count += 1;

            // The next row searches around this row's centreline
            centre_col = (centre as usize)
                .clamp(CENTRE_CLAMP_PX, FRAME_WIDTH - CENTRE_CLAMP_PX);
            last_centre = centre;
        } else {
            geometry.center[row] = last_centre;
            geometry.row_valid[row] = false;

            // Nothing found near the bottom of the image, the rest of the
            // frame will not recover
            if geometry.valid_row_count == 0
                && row + 10 < params.scan_start_row
            {
                break;
            }
        }

        if row < params.scan_step {
            break;
        }
        row -= params.scan_step;
    }

    geometry.track_found = geometry.valid_row_count >= params.track_found_min_rows;
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Raw-intensity gradient at (row, col): difference of the pixels two apart.
fn gradient(frame: &Frame, row: usize, col: usize) -> i16 {
    if col < 1 || col >= FRAME_WIDTH - 1 {
        return 0;
    }

    let g = frame.get(row, col + 1) as i16 - frame.get(row, col - 1) as i16;
    g.abs()
}

/// Search for the left edge between `floor` and `start`, scanning outward
/// (decreasing columns).
///
/// Returns the column of the strongest qualifying foreground to background
/// transition.
fn search_left(
    frame: &Frame,
    mask: &Mask,
    params: &Params,
    row: usize,
    start: usize,
    floor: usize,
) -> Option<usize> {
    let mut best: Option<(i16, usize)> = None;

    let mut col = start.min(FRAME_WIDTH - 2);
    while col > floor {
        if mask.is_foreground(row, col) && !mask.is_foreground(row, col - 1) {
            let g = gradient(frame, row, col);
            if g > params.gradient_threshold
                && best.map(|(bg, _)| g > bg).unwrap_or(true)
            {
                best = Some((g, col));
            }
        }
        col -= 1;
    }

    best.map(|(_, col)| col)
}

/// Search for the right edge between `start` and `ceil`, scanning outward
/// (increasing columns).
fn search_right(
    frame: &Frame,
    mask: &Mask,
    params: &Params,
    row: usize,
    start: usize,
    ceil: usize,
) -> Option<usize> {
    let mut best: Option<(i16, usize)> = None;

    let mut col = start.max(1);
    while col < ceil.min(FRAME_WIDTH - 1) {
        if mask.is_foreground(row, col) && !mask.is_foreground(row, col + 1) {
            let g = gradient(frame, row, col);
            if g > params.gradient_threshold
                && best.map(|(bg, _)| g > bg).unwrap_or(true)
            {
                best = Some((g, col));
            }
        }
        col += 1;
    }

    best.map(|(_, col)| col)
}
