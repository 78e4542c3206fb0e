//! Module for the CAN bus collaborator used by the transport layer
//!
//! The transport layer never opens or closes a bus. It is handed something implementing
//! [CanBus], shares it with whoever else uses the network, and only sends and polls raw frames.

use std::time::Duration;

/// Communication channel result
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Maximum data length of a classical CAN frame
pub const CAN_MAX_DATA_LENGTH: usize = 8;
/// Maximum data length of a CAN-FD frame
pub const CAN_FD_MAX_DATA_LENGTH: usize = 64;
/// Largest 11bit CAN identifier
pub const STANDARD_ID_MAX: u32 = 0x7FF;
/// Largest 29bit CAN identifier
pub const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

#[derive(Debug)]
/// Error produced by a CAN bus
pub enum ChannelError {
    /// Underlying IO Error with the bus
    IOError(std::io::Error),
    /// The bus' Tx buffer is full
    BufferFull,
    /// The interface is not open
    InterfaceNotOpen,
    /// The bus rejected the frame
    InvalidFrame(String),
    /// Underlying API error with hardware
    APIError {
        /// Name of the API EG: 'socketCAN'
        api_name: String,
        /// Internal API error code
        code: u32,
        /// API error description
        desc: String,
    },
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::IOError(e) => write!(f, "IO error: {e}"),
            ChannelError::BufferFull => write!(f, "bus Transmit buffer is full"),
            ChannelError::InterfaceNotOpen => write!(f, "bus interface is not open"),
            ChannelError::InvalidFrame(reason) => write!(f, "frame rejected by bus: {reason}"),
            ChannelError::APIError {
                api_name,
                code,
                desc,
            } => write!(f, "underlying {api_name} API error ({code}): {desc}"),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::IOError(io_err) = self {
            Some(io_err)
        } else {
            None
        }
    }
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err)
    }
}

/// A raw CAN or CAN-FD frame as seen on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: u32,
    ext: bool,
    fd: bool,
    data: Vec<u8>,
    timestamp: Option<Duration>,
}

impl CanFrame {
    /// Creates a new CAN frame. Frames longer than 8 bytes are marked as CAN-FD frames
    ///
    /// ## Parameters
    /// * id - Arbitration ID of the frame
    /// * data - Frame data
    /// * is_ext - True if the ID is a 29bit identifier
    pub fn new(id: u32, data: &[u8], is_ext: bool) -> Self {
        Self {
            id,
            ext: is_ext,
            fd: data.len() > CAN_MAX_DATA_LENGTH,
            data: data.to_vec(),
            timestamp: None,
        }
    }

    /// Marks the frame as a CAN-FD frame, regardless of its length
    pub fn with_fd(mut self, is_fd: bool) -> Self {
        self.fd = is_fd || self.data.len() > CAN_MAX_DATA_LENGTH;
        self
    }

    /// Attaches the driver's reception timestamp to the frame
    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Arbitration ID of the frame
    pub fn get_address(&self) -> u32 {
        self.id
    }

    /// Data of the frame
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// True if the frame uses a 29bit identifier
    pub fn is_extended(&self) -> bool {
        self.ext
    }

    /// True if the frame is a CAN-FD frame
    pub fn is_fd(&self) -> bool {
        self.fd
    }

    /// Reception timestamp as reported by the driver, if it provides one
    pub fn get_timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    /// Checks the frame could be put on a bus
    pub fn validate(&self) -> ChannelResult<()> {
        let max_id = if self.ext { EXTENDED_ID_MAX } else { STANDARD_ID_MAX };
        if self.id > max_id {
            return Err(ChannelError::InvalidFrame(format!(
                "identifier {:#X} is out of range",
                self.id
            )));
        }
        let max_len = if self.fd {
            CAN_FD_MAX_DATA_LENGTH
        } else {
            CAN_MAX_DATA_LENGTH
        };
        if self.data.len() > max_len {
            return Err(ChannelError::InvalidFrame(format!(
                "{} data bytes do not fit in a {} frame",
                self.data.len(),
                if self.fd { "CAN-FD" } else { "CAN" }
            )));
        }
        Ok(())
    }
}

/// A CAN bus shared with the transport layer.
///
/// Implementations must be usable from the transport interface's background listener
/// thread as well as from the caller's thread.
pub trait CanBus: Send + Sync {
    /// Transmits one frame. The call returns once the bus has confirmed the transmission
    /// (or queued it, if the driver offers no confirmation)
    fn send(&self, frame: &CanFrame) -> ChannelResult<()>;

    /// Polls for a received frame without blocking. Returns `Ok(None)` when nothing is pending
    fn recv(&self) -> ChannelResult<Option<CanFrame>>;
}

impl<T: CanBus + ?Sized> CanBus for std::sync::Arc<T> {
    fn send(&self, frame: &CanFrame) -> ChannelResult<()> {
        (**self).send(frame)
    }

    fn recv(&self) -> ChannelResult<Option<CanFrame>> {
        (**self).recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_frames_are_fd() {
        let f = CanFrame::new(0x7E0, &[0u8; 12], false);
        assert!(f.is_fd());
        assert!(f.validate().is_ok());
        let f = CanFrame::new(0x7E0, &[0u8; 8], false);
        assert!(!f.is_fd());
        assert!(f.with_fd(true).is_fd());
    }

    #[test]
    fn frame_validation() {
        assert!(CanFrame::new(0x800, &[0], false).validate().is_err());
        assert!(CanFrame::new(0x800, &[0], true).validate().is_ok());
        assert!(CanFrame::new(0x2000_0000, &[0], true).validate().is_err());
        assert!(CanFrame::new(0x7E0, &[0; 65], false).validate().is_err());
    }
}
