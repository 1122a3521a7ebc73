//! Frame binarisation
//!
//! All strategies produce a [`Mask`] of {0, 255} values. The adaptive
//! strategies use a summed-area table so the windowed mean is O(1) per
//! pixel.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use ndarray::Array2;
use serde::{Deserialize, Serialize};

// Internal
use super::{Params, ThresholdMode, MASK_BACKGROUND, MASK_FOREGROUND};
use sense_if::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Binary mask of a frame, values are {0, 255}.
///
/// Transient data, rebuilt each tick.
#[derive(Clone, Serialize, Deserialize)]
pub struct Mask {
    data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Mask {
    /// Create a mask filled with background.
    pub fn new() -> Self {
        Self {
            data: vec![MASK_BACKGROUND; FRAME_WIDTH * FRAME_HEIGHT],
        }
    }

    /// Get the mask value at the given row and column.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * FRAME_WIDTH + col]
    }

    /// Set the mask value at the given row and column.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * FRAME_WIDTH + col] = value;
    }

    /// True if the pixel is foreground (track surface).
    #[inline]
    pub fn is_foreground(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == MASK_FOREGROUND
    }
}

impl Default for Mask {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the global threshold maximising the between-class variance of the
/// frame's histogram (Otsu's method).
///
/// All arithmetic uses integer running sums, the variance is compared as
/// `(sum0*w1 - (sum - sum0)*w0)^2 / (w0*w1)` which equals
/// `w0*w1*(mean0 - mean1)^2`.
pub fn otsu_threshold(frame: &Frame) -> u8 {
    let mut histogram = [0u64; 256];
    for &px in frame.as_raw() {
        histogram[px as usize] += 1;
    }

    let size = (FRAME_WIDTH * FRAME_HEIGHT) as u64;

    let mut sum = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        sum += (i as u64) * count;
    }

    let mut w0 = 0u64;
    let mut sum0 = 0u64;
    let mut max_variance = 0u64;
    let mut threshold = 0u8;

    for (i, &count) in histogram.iter().enumerate() {
        w0 += count;
        if w0 == 0 {
            continue;
        }

        let w1 = size - w0;
        if w1 == 0 {
            break;
        }

        sum0 += (i as u64) * count;

        let diff = (sum0 * w1) as i64 - ((sum - sum0) * w0) as i64;
        let variance = ((diff as i128 * diff as i128) / (w0 * w1) as i128) as u64;

        if variance > max_variance {
            max_variance = variance;
            threshold = i as u8;
        }
    }

    threshold
}

/// Binarise a frame with the strategy selected in the parameters.
pub fn binarize(frame: &Frame, params: &Params) -> Mask {
    let mut mask = match params.threshold_mode {
        ThresholdMode::Fixed => binarize_global(frame, params.fixed_threshold),
        ThresholdMode::Otsu => binarize_global(frame, otsu_threshold(frame)),
        ThresholdMode::Adaptive => {
            binarize_adaptive(frame, params, 0, FRAME_HEIGHT)
        }
        ThresholdMode::Banded => {
            // Adaptive above the midline, global below
            let mut m = binarize_adaptive(frame, params, 0, FRAME_HEIGHT / 2);
            let threshold = otsu_threshold(frame);
            for row in FRAME_HEIGHT / 2..FRAME_HEIGHT {
                for col in 0..FRAME_WIDTH {
                    m.set(row, col, level(frame.get(row, col), threshold));
                }
            }
            m
        }
    };

    if params.morphology_enabled {
        erode(&mut mask);
        dilate(&mut mask);
    }

    mask
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

#[inline]
fn level(px: u8, threshold: u8) -> u8 {
    if px > threshold {
        MASK_FOREGROUND
    } else {
        MASK_BACKGROUND
    }
}

/// Binarise the whole frame against a single threshold level.
fn binarize_global(frame: &Frame, threshold: u8) -> Mask {
    let mut mask = Mask::new();
    for row in 0..FRAME_HEIGHT {
        for col in 0..FRAME_WIDTH {
            mask.set(row, col, level(frame.get(row, col), threshold));
        }
    }
    mask
}

/// Binarise the row range against the local windowed mean minus the
/// configured offset.
fn binarize_adaptive(
    frame: &Frame,
    params: &Params,
    row_start: usize,
    row_end: usize,
) -> Mask {
    let sat = summed_area_table(frame);
    let mut mask = Mask::new();

    for row in row_start..row_end {
        for col in 0..FRAME_WIDTH {
            let mut local_threshold =
                windowed_mean(&sat, row, col, params.adaptive_block_size);

            // Bias towards background to reject noise
            if local_threshold > params.adaptive_offset {
                local_threshold -= params.adaptive_offset;
            }

            mask.set(row, col, level(frame.get(row, col), local_threshold));
        }
    }

    mask
}

/// Build the summed-area table of the frame, padded by one row/column of
/// zeros so window sums need no boundary special cases.
fn summed_area_table(frame: &Frame) -> Array2<u32> {
    let mut sat = Array2::<u32>::zeros((FRAME_HEIGHT + 1, FRAME_WIDTH + 1));

    for row in 0..FRAME_HEIGHT {
        for col in 0..FRAME_WIDTH {
            sat[[row + 1, col + 1]] = frame.get(row, col) as u32
                + sat[[row, col + 1]]
                + sat[[row + 1, col]]
                - sat[[row, col]];
        }
    }

    sat
}

/// Mean intensity of the window of the given size centred on (row, col),
/// clipped to the image bounds.
fn windowed_mean(sat: &Array2<u32>, row: usize, col: usize, size: usize) -> u8 {
    let half = size / 2;

    let row0 = row.saturating_sub(half);
    let col0 = col.saturating_sub(half);
    let row1 = (row + half + 1).min(FRAME_HEIGHT);
    let col1 = (col + half + 1).min(FRAME_WIDTH);

    let count = ((row1 - row0) * (col1 - col0)) as u32;
    if count == 0 {
        return 128;
    }

    let sum = sat[[row1, col1]] + sat[[row0, col0]] - sat[[row0, col1]] - sat[[row1, col0]];

    (sum / count) as u8
}

/// One erosion pass: a pixel becomes background if any 4-neighbour is
/// background.
fn erode(mask: &mut Mask) {
    let source = mask.clone();

    for row in 1..FRAME_HEIGHT - 1 {
        for col in 1..FRAME_WIDTH - 1 {
            if source.get(row - 1, col) == MASK_BACKGROUND
                || source.get(row + 1, col) == MASK_BACKGROUND
                || source.get(row, col - 1) == MASK_BACKGROUND
                || source.get(row, col + 1) == MASK_BACKGROUND
            {
                mask.set(row, col, MASK_BACKGROUND);
            }
        }
    }
}

/// One dilation pass: a pixel becomes foreground if any 4-neighbour is
/// foreground.
fn dilate(mask: &mut Mask) {
    let source = mask.clone();

    for row in 1..FRAME_HEIGHT - 1 {
        for col in 1..FRAME_WIDTH - 1 {
            if source.get(row - 1, col) == MASK_FOREGROUND
                || source.get(row + 1, col) == MASK_FOREGROUND
                || source.get(row, col - 1) == MASK_FOREGROUND
                || source.get(row, col + 1) == MASK_FOREGROUND
            {
                mask.set(row, col, MASK_FOREGROUND);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Build a frame whose histogram is bimodal around the two given levels.
    fn bimodal_frame(low: u8, high: u8) -> Frame {
        let mut frame = Frame::filled(low);
        // Upper half of the image at the high level
        for row in 0..FRAME_HEIGHT / 2 {
            for col in 0..FRAME_WIDTH {
                frame.set(row, col, high);
            }
        }
        frame
    }

    #[test]
    fn test_otsu_bimodal_split() {
        let frame = bimodal_frame(40, 200);

        // For two equal-mass spikes the between-class variance is maximised
        // anywhere between them, the scan picks the first maximiser: the low
        // level itself
        let threshold = otsu_threshold(&frame);
        assert!(
            (threshold as i32 - 40).abs() <= 1,
            "threshold {} not within 1 of 40",
            threshold
        );

        // And the split actually separates the two populations
        let params = Params {
            threshold_mode: ThresholdMode::Otsu,
            ..Default::default()
        };
        let mask = binarize(&frame, &params);
        assert!(mask.is_foreground(0, 0));
        assert!(!mask.is_foreground(FRAME_HEIGHT - 1, 0));
    }

    #[test]
    fn test_adaptive_keeps_corridor_transition_sharp() {
        // A bright corridor on a dark floor: the adaptive strategy must keep
        // the corridor foreground and the floor near the transition
        // background, where the windowed mean is pulled up by the corridor
        let mut frame = Frame::filled(30);
        for row in 0..FRAME_HEIGHT {
            for col in 60..120 {
                frame.set(row, col, 220);
            }
        }

        let params = Params {
            threshold_mode: ThresholdMode::Adaptive,
            ..Default::default()
        };
        let mask = binarize(&frame, &params);

        assert!(mask.is_foreground(60, 90));
        assert!(!mask.is_foreground(60, 56));
    }

    #[test]
    fn test_erode_then_dilate_removes_speckle() {
        let mut frame = Frame::filled(0);
        // Single bright pixel in a dark field
        frame.set(50, 50, 255);

        let params = Params {
            threshold_mode: ThresholdMode::Fixed,
            fixed_threshold: 128,
            morphology_enabled: true,
            ..Default::default()
        };
        let mask = binarize(&frame, &params);

        assert!(!mask.is_foreground(50, 50));
    }
}
