//! Frame sampling to bound per-frame processing load.
//!
//! Only every Nth captured frame reaches the landmark provider. Frame indices
//! are 1-based: with the default interval of 3, frames 3, 6, 9, ... are
//! processed and every other frame is dropped.

use crate::constants::DEFAULT_FRAME_INTERVAL;
use crate::{Error, Result};

/// Modulo-N frame sampler
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: u64,
    counter: u64,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FRAME_INTERVAL,
            counter: 0,
        }
    }
}

impl FrameSampler {
    /// Create a sampler that processes every `interval`-th frame
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is zero
    pub fn new(interval: u64) -> Result<Self> {
        if interval == 0 {
            return Err(Error::InvalidInput("Frame interval must be greater than 0".to_string()));
        }
        Ok(Self { interval, counter: 0 })
    }

    #[must_use]
    pub const fn interval(&self) -> u64 {
        self.interval
    }

    /// Number of frames seen since creation or the last reset
    #[must_use]
    pub const fn frames_seen(&self) -> u64 {
        self.counter
    }

    /// Whether the frame at `frame_index` (1-based) is processed
    #[must_use]
    pub const fn should_process(&self, frame_index: u64) -> bool {
        frame_index % self.interval == 0
    }

    /// Count a new frame and report whether it is processed
    ///
    /// The counter wraps to zero after `u64::MAX`; zero is a multiple of every
    /// interval, so the wrapped frame is processed.
    pub fn next_frame(&mut self) -> bool {
        self.counter = self.counter.wrapping_add(1);
        self.should_process(self.counter)
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
