//! Data Length Code handling
//!
//! Classical CAN maps DLC 0-8 directly to the number of data bytes. CAN-FD reuses
//! DLC 9-15 for the longer frame lengths 12-64.

use crate::{UdsError, UdsResult};

/// Largest DLC value
pub const MAX_DLC: u8 = 15;
/// Smallest DLC which can carry a First Frame
pub const MIN_BASE_UDS_DLC: u8 = 8;
/// Largest DLC of a classical CAN frame
pub const MAX_CLASSICAL_DLC: u8 = 8;

const FD_DATA_LENGTHS: [usize; 7] = [12, 16, 20, 24, 32, 48, 64];

/// Number of data bytes of a frame with the given DLC
pub fn dlc_to_data_length(dlc: u8) -> UdsResult<usize> {
    match dlc {
        0..=MAX_CLASSICAL_DLC => Ok(dlc as usize),
        9..=MAX_DLC => Ok(FD_DATA_LENGTHS[(dlc - 9) as usize]),
        _ => Err(UdsError::InvalidValue(format!(
            "DLC must be in range 0-{MAX_DLC}, got {dlc}"
        ))),
    }
}

/// DLC of a frame carrying exactly `data_length` bytes
pub fn data_length_to_dlc(data_length: usize) -> UdsResult<u8> {
    if data_length <= MAX_CLASSICAL_DLC as usize {
        return Ok(data_length as u8);
    }
    FD_DATA_LENGTHS
        .iter()
        .position(|x| *x == data_length)
        .map(|i| i as u8 + 9)
        .ok_or_else(|| {
            UdsError::InconsistentArguments(format!(
                "{data_length} is not a valid CAN frame data length"
            ))
        })
}

/// Smallest DLC of a frame which can carry `data_length` bytes
pub fn minimal_dlc(data_length: usize) -> UdsResult<u8> {
    if data_length <= MAX_CLASSICAL_DLC as usize {
        return Ok(data_length as u8);
    }
    FD_DATA_LENGTHS
        .iter()
        .position(|x| *x >= data_length)
        .map(|i| i as u8 + 9)
        .ok_or_else(|| {
            UdsError::InconsistentArguments(format!(
                "{data_length} bytes do not fit in a CAN-FD frame"
            ))
        })
}

/// True if the DLC is only valid on CAN-FD
pub fn is_fd_dlc(dlc: u8) -> bool {
    dlc > MAX_CLASSICAL_DLC
}
