//! Diagnostic messages and their transmission records

use std::time::{Instant, SystemTime};

use crate::{
    UdsError, UdsResult,
    addressing::AddressingType,
    packet::{CanPacketRecord, CanPacketType, TransmissionDirection},
};

/// A complete diagnostic message, as handed to or received from the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UdsMessage {
    payload: Vec<u8>,
    addressing_type: AddressingType,
}

impl UdsMessage {
    /// Creates a new message
    pub fn new(payload: &[u8], addressing_type: AddressingType) -> Self {
        Self {
            payload: payload.to_vec(),
            addressing_type,
        }
    }

    /// Message payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Addressing type used to transmit the message
    pub fn addressing_type(&self) -> AddressingType {
        self.addressing_type
    }
}

/// A diagnostic message together with the packets which carried it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdsMessageRecord {
    payload: Vec<u8>,
    packets_records: Vec<CanPacketRecord>,
}

impl UdsMessageRecord {
    /// Creates a record out of the packets of one message.
    ///
    /// The packets must all share the same direction and addressing type. The first one has to
    /// be a Single Frame or a First Frame. Use
    /// [CanSegmenter::desegmentation](crate::segmentation::CanSegmenter::desegmentation) to
    /// build a record from packets which have not been checked yet.
    pub(crate) fn new(payload: Vec<u8>, packets_records: Vec<CanPacketRecord>) -> UdsResult<Self> {
        let first = packets_records.first().ok_or_else(|| {
            UdsError::Segmentation("a message record needs at least one packet".into())
        })?;
        if !matches!(
            first.packet_type(),
            CanPacketType::SingleFrame | CanPacketType::FirstFrame
        ) {
            return Err(UdsError::Segmentation(format!(
                "a message cannot start with a {}",
                first.packet_type()
            )));
        }
        let (direction, addressing_type) = (first.direction(), first.addressing_type());
        if packets_records
            .iter()
            .any(|r| r.direction() != direction || r.addressing_type() != addressing_type)
        {
            return Err(UdsError::Segmentation(
                "packets of a message must share direction and addressing type".into(),
            ));
        }
        Ok(Self {
            payload,
            packets_records,
        })
    }

    /// Message payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Packets which carried the message, in transmission order. Flow Control packets
    /// exchanged in the opposite direction are not part of the record
    pub fn packets_records(&self) -> &[CanPacketRecord] {
        &self.packets_records
    }

    /// Addressing type of the message
    pub fn addressing_type(&self) -> AddressingType {
        self.packets_records[0].addressing_type()
    }

    /// Direction of the transmission
    pub fn direction(&self) -> TransmissionDirection {
        self.packets_records[0].direction()
    }

    /// Time the first packet was transmitted
    pub fn transmission_start(&self) -> Instant {
        self.packets_records[0].transmission_time()
    }

    /// Time the last packet was transmitted
    pub fn transmission_end(&self) -> Instant {
        self.packets_records[self.packets_records.len() - 1].transmission_time()
    }

    /// Wall clock time the first packet was transmitted
    pub fn wall_clock_start(&self) -> SystemTime {
        self.packets_records[0].wall_clock_time()
    }

    /// The message without its transmission details
    pub fn to_message(&self) -> UdsMessage {
        UdsMessage::new(&self.payload, self.addressing_type())
    }
}

impl From<&UdsMessageRecord> for UdsMessage {
    fn from(record: &UdsMessageRecord) -> Self {
        record.to_message()
    }
}
