//! Flow Control parameters handed out by a receiving node
//!
//! Before each block of Consecutive Frames, the receiver tells the sender how many frames it
//! may send (block size, 0 meaning no limit) and how long to wait between them (STmin).
//! A [FlowControlParametersGenerator] decides on these values.

use std::fmt::Debug;

use crate::packet::StMin;

/// Strategy producing the block size and raw STmin of the next Flow Control
pub trait FlowControlParametersGenerator: Send + Debug {
    /// Returns `(block_size, st_min)` for the next block of Consecutive Frames
    fn generate(&mut self) -> (u8, u8);

    /// Called when a new message reception starts
    fn reset(&mut self) {}
}

/// Generator which always returns the same values. The default lets the sender transmit
/// without pauses
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultFlowControlParametersGenerator {
    /// Block size. 0 lets the sender transmit all remaining frames at once
    pub block_size: u8,
    /// Raw STmin value
    pub st_min: u8,
}

impl DefaultFlowControlParametersGenerator {
    /// Creates a generator with fixed values
    pub fn new(block_size: u8, st_min: StMin) -> Self {
        Self {
            block_size,
            st_min: st_min.0,
        }
    }
}

impl FlowControlParametersGenerator for DefaultFlowControlParametersGenerator {
    fn generate(&mut self) -> (u8, u8) {
        (self.block_size, self.st_min)
    }
}

/// Generator which slows the sender down after every block, up to a limit.
///
/// Useful for receivers which process data while it arrives and fall behind on long
/// transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlingFlowControlParametersGenerator {
    block_size: u8,
    initial_st_min: u8,
    max_st_min: u8,
    step: u8,
    current: u8,
}

impl ThrottlingFlowControlParametersGenerator {
    /// Creates a generator which adds `step` ms of STmin after every block, starting at
    /// `initial_st_min` ms and stopping at `max_st_min` ms
    pub fn new(block_size: u8, initial_st_min: u8, max_st_min: u8, step: u8) -> Self {
        let max_st_min = max_st_min.min(0x7F);
        let initial_st_min = initial_st_min.min(max_st_min);
        Self {
            block_size,
            initial_st_min,
            max_st_min,
            step,
            current: initial_st_min,
        }
    }
}

impl FlowControlParametersGenerator for ThrottlingFlowControlParametersGenerator {
    fn generate(&mut self) -> (u8, u8) {
        let st_min = self.current;
        self.current = self.current.saturating_add(self.step).min(self.max_st_min);
        (self.block_size, st_min)
    }

    fn reset(&mut self) {
        self.current = self.initial_st_min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let mut g = DefaultFlowControlParametersGenerator::new(8, StMin(0xF5));
        assert_eq!(g.generate(), (8, 0xF5));
        assert_eq!(g.generate(), (8, 0xF5));
        assert_eq!(DefaultFlowControlParametersGenerator::default().generate(), (0, 0));
    }

    #[test]
    fn throttling() {
        let mut g = ThrottlingFlowControlParametersGenerator::new(4, 0, 5, 2);
        assert_eq!(g.generate(), (4, 0));
        assert_eq!(g.generate(), (4, 2));
        assert_eq!(g.generate(), (4, 4));
        assert_eq!(g.generate(), (4, 5));
        assert_eq!(g.generate(), (4, 5));
        g.reset();
        assert_eq!(g.generate(), (4, 0));
    }
}
