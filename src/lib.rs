#![warn(
    missing_docs,
    missing_debug_implementations,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    clippy::uninlined_format_args
)]

//! A crate which implements the transport and network layers used by Unified Diagnostic
//! Services (UDS) on CAN and CAN-FD networks.
//!
//! ## ISO 15765-2 (ISO-TP)
//!
//! Diagnostic messages are often longer than a single CAN frame can carry. ISO-TP splits such
//! messages into a *First Frame* followed by a train of *Consecutive Frames*, with the receiver
//! throttling the sender through *Flow Control* frames. Short messages travel in a single
//! *Single Frame*.
//!
//! This crate provides
//! * [addressing] - Encoding and validation of the 5 CAN addressing formats
//!   (normal, normal fixed, extended, mixed 11bit and mixed 29bit)
//! * [packet] - Building and parsing the 4 CAN packet types, including CAN-FD lengths
//! * [segmentation] - Splitting a diagnostic message into CAN packets and joining them back
//! * [flow_control] - Strategies for the Flow Control parameters a receiver hands out
//! * [transport] - The timing governed protocol engine (N_As, N_Ar, N_Bs, N_Br, N_Cs, N_Cr),
//!   with both a blocking and an async API
//!
//! ## Hardware
//!
//! The protocol engine talks to the network through the [channel::CanBus] trait. An in-memory
//! bus is provided in [hardware::simulation] for bench testing, and a SocketCAN adapter is
//! available on Linux with the `socketcan` feature.

use std::time::Duration;

use channel::ChannelError;

pub mod addressing;
pub mod channel;
pub mod clock;
pub mod flow_control;
pub mod hardware;
pub mod message;
pub mod packet;
pub mod segmentation;
pub mod transport;

pub use addressing::{
    AddressingInformation, AddressingParams, AddressingType, CanAddressingFormat,
    PacketAddressing,
};
pub use message::{UdsMessage, UdsMessageRecord};
pub use packet::{
    CanPacket, CanPacketRecord, CanPacketType, FlowStatus, PacketContent, TransmissionDirection,
};
pub use segmentation::CanSegmenter;
pub use transport::{
    AsyncTransportInterface, CanTransportInterface, TransportConfig, TransportInterface,
};

/// Transport layer result
pub type UdsResult<T> = Result<T, UdsError>;

/// Protocol deadlines which can expire during an exchange
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimingParameter {
    /// Transmission of a CAN frame by the sender
    #[strum(serialize = "N_As")]
    NAs,
    /// Transmission of a CAN frame by the receiver
    #[strum(serialize = "N_Ar")]
    NAr,
    /// Reception of a Flow Control frame
    #[strum(serialize = "N_Bs")]
    NBs,
    /// Reception of the next Consecutive Frame
    #[strum(serialize = "N_Cr")]
    NCr,
    /// Caller supplied timeout while waiting for a packet or message
    #[strum(serialize = "receive timeout")]
    Receive,
}

#[derive(Debug, thiserror::Error)]
/// Transport layer error
pub enum UdsError {
    /// A value is outside of its permitted range
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// A value has the wrong kind for the requested operation
    #[error("Invalid type: {0}")]
    InvalidType(String),
    /// Otherwise valid values cannot be combined into a valid result
    #[error("Inconsistent arguments: {0}")]
    InconsistentArguments(String),
    /// A value was provided that the selected packet type does not use
    #[error("Unused argument: {0}")]
    UnusedArgument(String),
    /// Received packets do not form one complete and well ordered message
    #[error("Segmentation error: {0}")]
    Segmentation(String),
    /// A protocol deadline elapsed
    #[error("{parameter} timeout of {} ms exceeded", .timeout.as_millis())]
    Timeout {
        /// The deadline which elapsed
        parameter: TimingParameter,
        /// Configured value of the deadline
        timeout: Duration,
    },
    /// The receiving node reported a buffer overflow through Flow Control
    #[error("Receiver reported buffer overflow")]
    Overflow,
    /// The request cannot be handled by the transport layer
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Error with the underlying CAN bus
    #[error("CAN bus error")]
    Channel(
        #[from]
        #[source]
        ChannelError,
    ),
}

impl UdsError {
    /// Returns true if the error was caused by an elapsed deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, UdsError::Timeout { .. })
    }
}
