//! # Camera Frame Types
//!
//! The imaging driver owns frame capture and delivers completed frames into a
//! [`FrameBuffer`]. The control core consumes at most one frame per tick; an
//! unconsumed frame is overwritten by the next capture, never queued.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Width of a camera frame in pixels.
pub const FRAME_WIDTH: usize = 188;

/// Height of a camera frame in pixels.
pub const FRAME_HEIGHT: usize = 120;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single monochrome camera frame.
///
/// Samples are 8-bit intensity values in row-major order.
#[derive(Clone, Serialize, Deserialize)]
pub struct Frame {
    data: Vec<u8>,
}

/// Single-slot buffer between the capture driver and the control core.
///
/// Single-producer/single-consumer: the driver publishes, the core takes at
/// tick start. Publishing over an unconsumed frame overwrites it.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FrameBuffer {
    frame: Option<Frame>,
    ready: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    /// Create a frame filled with the given intensity.
    pub fn filled(value: u8) -> Self {
        Self {
            data: vec![value; FRAME_WIDTH * FRAME_HEIGHT],
        }
    }

    /// Create a frame from raw row-major data.
    ///
    /// Returns `None` if the data length does not match the frame dimensions.
    pub fn from_data(data: Vec<u8>) -> Option<Self> {
        if data.len() == FRAME_WIDTH * FRAME_HEIGHT {
            Some(Self { data })
        } else {
            None
        }
    }

    /// Get the sample at the given row and column.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * FRAME_WIDTH + col]
    }

    /// Set the sample at the given row and column.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * FRAME_WIDTH + col] = value;
    }

    /// View the raw row-major samples.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl FrameBuffer {
    /// Publish a new frame into the buffer, overwriting any unconsumed one.
    pub fn publish(&mut self, frame: Frame) {
        self.frame = Some(frame);
        self.ready = true;
    }

    /// True if a frame is waiting to be consumed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Take the pending frame, clearing the ready flag.
    ///
    /// Returns `None` if no frame is ready.
    pub fn take(&mut self) -> Option<Frame> {
        if self.ready {
            self.ready = false;
            self.frame.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_data_checks_dimensions() {
        assert!(Frame::from_data(vec![0; FRAME_WIDTH * FRAME_HEIGHT]).is_some());
        assert!(Frame::from_data(vec![0; 100]).is_none());
    }

    #[test]
    fn test_buffer_overwrites_unconsumed_frame() {
        let mut buf = FrameBuffer::default();

        buf.publish(Frame::filled(10));
        buf.publish(Frame::filled(20));

        let frame = buf.take().unwrap();
        assert_eq!(frame.get(0, 0), 20);

        // Once consumed the buffer is empty again
        assert!(!buf.is_ready());
        assert!(buf.take().is_none());
    }
}
