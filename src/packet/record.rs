//! Records of packets which were sent or received

use std::time::{Instant, SystemTime};

use strum_macros::Display;

use crate::{
    UdsResult,
    addressing::{AddressingType, CanAddressingFormat},
    channel::CanFrame,
};

use super::CanPacket;

/// Direction of a transmission
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransmissionDirection {
    /// Received by this node
    Received,
    /// Transmitted by this node
    Transmitted,
}

/// A packet together with when and in which direction it was transmitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanPacketRecord {
    packet: CanPacket,
    direction: TransmissionDirection,
    transmission_time: Instant,
    wall_clock_time: SystemTime,
}

impl CanPacketRecord {
    /// Creates a record of a packet
    pub fn new(
        packet: CanPacket,
        direction: TransmissionDirection,
        transmission_time: Instant,
        wall_clock_time: SystemTime,
    ) -> Self {
        Self {
            packet,
            direction,
            transmission_time,
            wall_clock_time,
        }
    }

    /// Creates a record by decoding a bus frame
    pub fn from_frame(
        frame: &CanFrame,
        format: CanAddressingFormat,
        addressing_type: AddressingType,
        direction: TransmissionDirection,
        transmission_time: Instant,
        wall_clock_time: SystemTime,
    ) -> UdsResult<Self> {
        let packet = CanPacket::decode(
            format,
            addressing_type,
            frame.get_address(),
            frame.get_data(),
        )?;
        Ok(Self::new(
            packet,
            direction,
            transmission_time,
            wall_clock_time,
        ))
    }

    /// The recorded packet
    pub fn packet(&self) -> &CanPacket {
        &self.packet
    }

    /// Direction of the transmission
    pub fn direction(&self) -> TransmissionDirection {
        self.direction
    }

    /// Monotonic time the packet was sent or received at
    pub fn transmission_time(&self) -> Instant {
        self.transmission_time
    }

    /// Wall clock time the packet was sent or received at
    pub fn wall_clock_time(&self) -> SystemTime {
        self.wall_clock_time
    }
}

impl std::ops::Deref for CanPacketRecord {
    type Target = CanPacket;

    fn deref(&self) -> &Self::Target {
        &self.packet
    }
}
