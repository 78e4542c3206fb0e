//! Flow Control field values

use std::time::Duration;

use strum_macros::{Display, EnumIter};

use crate::{UdsError, UdsResult};

/// Flow status carried by a Flow Control packet
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FlowStatus {
    /// The sender may continue with the next block of Consecutive Frames
    ContinueToSend = 0x0,
    /// The sender must wait for another Flow Control
    Wait = 0x1,
    /// The receiver cannot take a message of the announced length
    Overflow = 0x2,
}

impl TryFrom<u8> for FlowStatus {
    type Error = UdsError;

    fn try_from(value: u8) -> UdsResult<Self> {
        match value {
            0x0 => Ok(FlowStatus::ContinueToSend),
            0x1 => Ok(FlowStatus::Wait),
            0x2 => Ok(FlowStatus::Overflow),
            _ => Err(UdsError::InvalidValue(format!(
                "{value:#X} is not a valid flow status"
            ))),
        }
    }
}

impl From<FlowStatus> for u8 {
    fn from(status: FlowStatus) -> Self {
        status as u8
    }
}

/// Separation time minimum (STmin) as carried by a Flow Control packet.
///
/// | Raw value  | Separation time  |
/// |------------|------------------|
/// | 0x00-0x7F  | 0-127 ms         |
/// | 0xF1-0xF9  | 100-900 µs       |
/// | other      | reserved, 127 ms |
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StMin(pub u8);

impl StMin {
    const MAX_MS: u8 = 0x7F;
    const MICROS_BASE: u8 = 0xF0;

    /// True if the raw value falls in a reserved range
    pub fn is_reserved(&self) -> bool {
        !matches!(self.0, 0x00..=0x7F | 0xF1..=0xF9)
    }

    /// Separation time to apply. Reserved values are treated as the longest time
    pub fn duration(&self) -> Duration {
        match self.0 {
            0x00..=0x7F => Duration::from_millis(self.0 as u64),
            0xF1..=0xF9 => Duration::from_micros((self.0 - Self::MICROS_BASE) as u64 * 100),
            _ => Duration::from_millis(Self::MAX_MS as u64),
        }
    }

    /// Encodes a separation time. Only whole milliseconds up to 127 ms and
    /// multiples of 100 µs below 1 ms can be represented
    pub fn from_duration(time: Duration) -> UdsResult<Self> {
        let micros = time.as_micros();
        if micros % 1000 == 0 && micros / 1000 <= Self::MAX_MS as u128 {
            Ok(Self((micros / 1000) as u8))
        } else if micros < 1000 && micros % 100 == 0 {
            Ok(Self(Self::MICROS_BASE + (micros / 100) as u8))
        } else {
            Err(UdsError::InvalidValue(format!(
                "{micros} µs cannot be encoded as STmin"
            )))
        }
    }
}

impl From<u8> for StMin {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}
