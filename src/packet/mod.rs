//! Module for CAN packets (N_PDUs)
//!
//! Every CAN frame used by ISO-TP starts with the addressing information bytes of its
//! [CanAddressingFormat], followed by the Protocol Control Information (PCI). The top nibble of
//! the first PCI byte selects the packet type:
//!
//! | Packet             | PCI                                    | Rest                      |
//! |--------------------|----------------------------------------|---------------------------|
//! | Single Frame       | `0L` or `00 LL`                        | payload, filler           |
//! | First Frame        | `1L LL` or `10 00 LL LL LL LL`         | payload (fills the frame) |
//! | Consecutive Frame  | `2N` (N = sequence number)             | payload, filler           |
//! | Flow Control       | `3S` (S = flow status)                 | block size, STmin, filler |

use strum_macros::{Display, EnumIter};

use crate::{
    UdsError, UdsResult,
    addressing::{AddressingType, CanAddressingFormat, PacketAddressing},
    channel::CanFrame,
};

pub mod dlc;
mod flow_status;
mod record;

pub use flow_status::{FlowStatus, StMin};
pub use record::{CanPacketRecord, TransmissionDirection};

/// Filler byte used when none is configured
pub const DEFAULT_FILLER_BYTE: u8 = 0xCC;
/// Largest data length which fits the short (12bit) First Frame encoding
pub const MAX_SHORT_FF_DL: u32 = 0xFFF;
/// Largest sequence number of a Consecutive Frame
pub const MAX_SEQUENCE_NUMBER: u8 = 0xF;

const SHORT_SF_DL_BYTES: usize = 1;
const LONG_SF_DL_BYTES: usize = 2;
const SHORT_FF_DL_BYTES: usize = 2;
const LONG_FF_DL_BYTES: usize = 6;
const CF_HEADER_BYTES: usize = 1;
const FC_HEADER_BYTES: usize = 1;
const FC_CTS_BYTES: usize = 3;

/// Type of a CAN packet
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CanPacketType {
    /// Complete message in one packet
    SingleFrame = 0x0,
    /// First packet of a segmented message
    FirstFrame = 0x1,
    /// Following packet of a segmented message
    ConsecutiveFrame = 0x2,
    /// Receiver pacing of a segmented message
    FlowControl = 0x3,
}

impl TryFrom<u8> for CanPacketType {
    type Error = UdsError;

    /// Packet type from the top nibble of a PCI byte
    fn try_from(pci: u8) -> UdsResult<Self> {
        match pci >> 4 {
            0x0 => Ok(CanPacketType::SingleFrame),
            0x1 => Ok(CanPacketType::FirstFrame),
            0x2 => Ok(CanPacketType::ConsecutiveFrame),
            0x3 => Ok(CanPacketType::FlowControl),
            _ => Err(UdsError::InvalidType(format!(
                "PCI byte {pci:#04X} is not a CAN packet type"
            ))),
        }
    }
}

/// Type specific content of a CAN packet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PacketContent {
    /// Single Frame
    SingleFrame {
        /// Complete message payload
        payload: Vec<u8>,
    },
    /// First Frame
    FirstFrame {
        /// Length of the whole message (FF_DL)
        data_length: u32,
        /// Leading part of the message payload
        payload: Vec<u8>,
        /// Use the 32bit FF_DL encoding even if the length fits 12 bits
        long_format: bool,
    },
    /// Consecutive Frame
    ConsecutiveFrame {
        /// Sequence number, 0-15
        sequence_number: u8,
        /// Next part of the message payload. Decoded packets include any filler bytes
        payload: Vec<u8>,
    },
    /// Flow Control
    FlowControl {
        /// Flow status
        flow_status: FlowStatus,
        /// Block size, only for [FlowStatus::ContinueToSend]
        block_size: Option<u8>,
        /// Raw STmin, only for [FlowStatus::ContinueToSend]
        st_min: Option<u8>,
    },
}

impl PacketContent {
    /// Packet type of the content
    pub fn packet_type(&self) -> CanPacketType {
        match self {
            PacketContent::SingleFrame { .. } => CanPacketType::SingleFrame,
            PacketContent::FirstFrame { .. } => CanPacketType::FirstFrame,
            PacketContent::ConsecutiveFrame { .. } => CanPacketType::ConsecutiveFrame,
            PacketContent::FlowControl { .. } => CanPacketType::FlowControl,
        }
    }

    /// Continue to send Flow Control content
    pub fn continue_to_send(block_size: u8, st_min: u8) -> Self {
        PacketContent::FlowControl {
            flow_status: FlowStatus::ContinueToSend,
            block_size: Some(block_size),
            st_min: Some(st_min),
        }
    }
}

/// A single CAN packet. Immutable once built or decoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanPacket {
    addressing: PacketAddressing,
    dlc: u8,
    raw_frame_data: Vec<u8>,
    content: PacketContent,
}

/// Total frame length for `required` bytes. With a DLC the frame is padded to the length of
/// the DLC, without one the shortest fitting frame is used
fn frame_length(required: usize, dlc: Option<u8>) -> UdsResult<usize> {
    match dlc {
        Some(dlc) => {
            let len = dlc::dlc_to_data_length(dlc)?;
            if required > len {
                Err(UdsError::InconsistentArguments(format!(
                    "{required} bytes do not fit in a frame with DLC {dlc}"
                )))
            } else {
                Ok(len)
            }
        }
        None => dlc::dlc_to_data_length(dlc::minimal_dlc(required)?),
    }
}

impl CanPacket {
    /// Builds a packet
    ///
    /// ## Parameters
    /// * addressing - Addressing of the packet
    /// * content - Packet type and its values
    /// * dlc - DLC of the frame. `None` selects the shortest frame which fits the content
    ///   (CAN frame data optimization)
    /// * filler_byte - Value used to pad unused frame bytes
    pub fn new(
        addressing: PacketAddressing,
        content: PacketContent,
        dlc: Option<u8>,
        filler_byte: u8,
    ) -> UdsResult<Self> {
        let mut raw = addressing.ai_data_bytes();
        let ai_len = raw.len();
        let frame_len = match &content {
            PacketContent::SingleFrame { payload } => {
                if payload.is_empty() {
                    return Err(UdsError::InconsistentArguments(
                        "Single Frame payload cannot be empty".into(),
                    ));
                }
                let short_len = ai_len + SHORT_SF_DL_BYTES + payload.len();
                let use_short = match dlc {
                    Some(dlc) => !dlc::is_fd_dlc(dlc),
                    None => short_len <= dlc::MAX_CLASSICAL_DLC as usize,
                };
                let len = if use_short {
                    let len = frame_length(short_len, dlc)?;
                    raw.push(payload.len() as u8);
                    len
                } else {
                    let len = frame_length(ai_len + LONG_SF_DL_BYTES + payload.len(), dlc)?;
                    raw.push(0x00);
                    raw.push(payload.len() as u8);
                    len
                };
                raw.extend_from_slice(payload);
                len
            }
            PacketContent::FirstFrame {
                data_length,
                payload,
                long_format,
            } => {
                let long = *long_format || *data_length > MAX_SHORT_FF_DL;
                let header = if long { LONG_FF_DL_BYTES } else { SHORT_FF_DL_BYTES };
                let len = ai_len + header + payload.len();
                match dlc {
                    Some(dlc) if dlc::dlc_to_data_length(dlc)? != len => {
                        return Err(UdsError::InconsistentArguments(format!(
                            "First Frame must fill the whole frame of DLC {dlc}, got {len} bytes"
                        )));
                    }
                    _ => {}
                }
                let frame_dlc = dlc::data_length_to_dlc(len)?;
                if frame_dlc < dlc::MIN_BASE_UDS_DLC {
                    return Err(UdsError::InconsistentArguments(format!(
                        "First Frame requires DLC of at least {}, got {frame_dlc}",
                        dlc::MIN_BASE_UDS_DLC
                    )));
                }
                let max_sf_dl = Self::max_single_frame_payload(ai_len, len);
                if (*data_length as usize) <= max_sf_dl.max(payload.len()) {
                    return Err(UdsError::InconsistentArguments(format!(
                        "FF_DL {data_length} does not require segmentation in a {len} byte frame"
                    )));
                }
                if long {
                    raw.extend_from_slice(&[0x10, 0x00]);
                    raw.extend_from_slice(&data_length.to_be_bytes());
                } else {
                    raw.push(0x10 | (data_length >> 8) as u8);
                    raw.push((data_length & 0xFF) as u8);
                }
                raw.extend_from_slice(payload);
                len
            }
            PacketContent::ConsecutiveFrame {
                sequence_number,
                payload,
            } => {
                if *sequence_number > MAX_SEQUENCE_NUMBER {
                    return Err(UdsError::InvalidValue(format!(
                        "sequence number must be in range 0-{MAX_SEQUENCE_NUMBER}, got {sequence_number}"
                    )));
                }
                if payload.is_empty() {
                    return Err(UdsError::InconsistentArguments(
                        "Consecutive Frame payload cannot be empty".into(),
                    ));
                }
                let len = frame_length(ai_len + CF_HEADER_BYTES + payload.len(), dlc)?;
                raw.push(0x20 | sequence_number);
                raw.extend_from_slice(payload);
                len
            }
            PacketContent::FlowControl {
                flow_status,
                block_size,
                st_min,
            } => {
                raw.push(0x30 | u8::from(*flow_status));
                match flow_status {
                    FlowStatus::ContinueToSend => {
                        let (Some(bs), Some(st)) = (block_size, st_min) else {
                            return Err(UdsError::InconsistentArguments(
                                "Continue to send Flow Control requires block size and STmin"
                                    .into(),
                            ));
                        };
                        raw.push(*bs);
                        raw.push(*st);
                        frame_length(ai_len + FC_CTS_BYTES, dlc)?
                    }
                    FlowStatus::Wait | FlowStatus::Overflow => {
                        if block_size.is_some() || st_min.is_some() {
                            return Err(UdsError::UnusedArgument(format!(
                                "{flow_status} Flow Control does not carry block size or STmin"
                            )));
                        }
                        frame_length(ai_len + FC_HEADER_BYTES, dlc)?
                    }
                }
            }
        };
        raw.resize(frame_len, filler_byte);
        Self::from_raw(addressing, raw)
    }

    /// Largest Single Frame payload which fits a frame of `frame_len` bytes
    fn max_single_frame_payload(ai_len: usize, frame_len: usize) -> usize {
        let header = if frame_len <= dlc::MAX_CLASSICAL_DLC as usize {
            SHORT_SF_DL_BYTES
        } else {
            LONG_SF_DL_BYTES
        };
        frame_len.saturating_sub(ai_len + header)
    }

    /// Decodes a packet from the data of a received frame
    ///
    /// ## Parameters
    /// * format - Addressing format the frame was sent with
    /// * addressing_type - Addressing type the frame was received with
    /// * can_id - CAN identifier of the frame
    /// * raw_frame_data - Data bytes of the frame
    pub fn decode(
        format: CanAddressingFormat,
        addressing_type: AddressingType,
        can_id: u32,
        raw_frame_data: &[u8],
    ) -> UdsResult<Self> {
        let params = format.decode(can_id, raw_frame_data)?;
        let addressing = PacketAddressing::from_decoded(format, addressing_type, params)?;
        Self::from_raw(addressing, raw_frame_data.to_vec())
    }

    fn from_raw(addressing: PacketAddressing, raw: Vec<u8>) -> UdsResult<Self> {
        let dlc = dlc::data_length_to_dlc(raw.len())?;
        let ai_len = addressing.format().ai_data_bytes_number();
        let pci = *raw.get(ai_len).ok_or_else(|| {
            UdsError::InconsistentArguments(format!(
                "{} byte frame carries no protocol control information",
                raw.len()
            ))
        })?;
        let too_short = |what: &str| {
            UdsError::InconsistentArguments(format!(
                "{} byte frame is too short for {what}",
                raw.len()
            ))
        };
        let content = match CanPacketType::try_from(pci)? {
            CanPacketType::SingleFrame => {
                let (header, sf_dl) = if pci & 0x0F != 0 {
                    if raw.len() > dlc::MAX_CLASSICAL_DLC as usize {
                        return Err(UdsError::InconsistentArguments(
                            "short SF_DL cannot be used in a CAN-FD frame".into(),
                        ));
                    }
                    (SHORT_SF_DL_BYTES, (pci & 0x0F) as usize)
                } else {
                    let sf_dl = *raw.get(ai_len + 1).ok_or_else(|| too_short("SF_DL"))?;
                    if raw.len() <= dlc::MAX_CLASSICAL_DLC as usize || sf_dl == 0 {
                        return Err(UdsError::InconsistentArguments(format!(
                            "invalid SF_DL in {} byte frame",
                            raw.len()
                        )));
                    }
                    (LONG_SF_DL_BYTES, sf_dl as usize)
                };
                let start = ai_len + header;
                let payload = raw
                    .get(start..start + sf_dl)
                    .ok_or_else(|| too_short("SF_DL"))?;
                PacketContent::SingleFrame {
                    payload: payload.to_vec(),
                }
            }
            CanPacketType::FirstFrame => {
                if dlc < dlc::MIN_BASE_UDS_DLC {
                    return Err(too_short("First Frame"));
                }
                let short_dl = (((pci & 0x0F) as u32) << 8)
                    | *raw.get(ai_len + 1).ok_or_else(|| too_short("FF_DL"))? as u32;
                let (header, data_length, long_format) = if short_dl != 0 {
                    (SHORT_FF_DL_BYTES, short_dl, false)
                } else {
                    let bytes = raw
                        .get(ai_len + 2..ai_len + LONG_FF_DL_BYTES)
                        .ok_or_else(|| too_short("long FF_DL"))?;
                    let dl = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    (LONG_FF_DL_BYTES, dl, true)
                };
                let payload = raw[ai_len + header..].to_vec();
                if (data_length as usize) <= payload.len() {
                    return Err(UdsError::InconsistentArguments(format!(
                        "FF_DL {data_length} does not require segmentation"
                    )));
                }
                PacketContent::FirstFrame {
                    data_length,
                    payload,
                    long_format,
                }
            }
            CanPacketType::ConsecutiveFrame => {
                let payload = raw[ai_len + CF_HEADER_BYTES..].to_vec();
                if payload.is_empty() {
                    return Err(too_short("Consecutive Frame payload"));
                }
                PacketContent::ConsecutiveFrame {
                    sequence_number: pci & 0x0F,
                    payload,
                }
            }
            CanPacketType::FlowControl => {
                let flow_status = FlowStatus::try_from(pci & 0x0F)?;
                match flow_status {
                    FlowStatus::ContinueToSend => {
                        let bytes = raw
                            .get(ai_len + 1..ai_len + FC_CTS_BYTES)
                            .ok_or_else(|| too_short("block size and STmin"))?;
                        PacketContent::continue_to_send(bytes[0], bytes[1])
                    }
                    _ => PacketContent::FlowControl {
                        flow_status,
                        block_size: None,
                        st_min: None,
                    },
                }
            }
        };
        Ok(Self {
            addressing,
            dlc,
            raw_frame_data: raw,
            content,
        })
    }

    /// Addressing of the packet
    pub fn addressing(&self) -> &PacketAddressing {
        &self.addressing
    }

    /// Addressing format of the packet
    pub fn addressing_format(&self) -> CanAddressingFormat {
        self.addressing.format()
    }

    /// Addressing type of the packet
    pub fn addressing_type(&self) -> AddressingType {
        self.addressing.addressing_type()
    }

    /// CAN identifier of the packet
    pub fn can_id(&self) -> u32 {
        self.addressing.can_id()
    }

    /// DLC of the frame
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// All data bytes of the frame, including addressing information and filler bytes
    pub fn raw_frame_data(&self) -> &[u8] {
        &self.raw_frame_data
    }

    /// Type specific content
    pub fn content(&self) -> &PacketContent {
        &self.content
    }

    /// Packet type
    pub fn packet_type(&self) -> CanPacketType {
        self.content.packet_type()
    }

    /// Payload carried by the packet. `None` for Flow Control
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.content {
            PacketContent::SingleFrame { payload }
            | PacketContent::FirstFrame { payload, .. }
            | PacketContent::ConsecutiveFrame { payload, .. } => Some(payload),
            PacketContent::FlowControl { .. } => None,
        }
    }

    /// SF_DL of a Single Frame or FF_DL of a First Frame
    pub fn data_length(&self) -> Option<u32> {
        match &self.content {
            PacketContent::SingleFrame { payload } => Some(payload.len() as u32),
            PacketContent::FirstFrame { data_length, .. } => Some(*data_length),
            _ => None,
        }
    }

    /// Sequence number of a Consecutive Frame
    pub fn sequence_number(&self) -> Option<u8> {
        match &self.content {
            PacketContent::ConsecutiveFrame {
                sequence_number, ..
            } => Some(*sequence_number),
            _ => None,
        }
    }

    /// Flow status of a Flow Control
    pub fn flow_status(&self) -> Option<FlowStatus> {
        match &self.content {
            PacketContent::FlowControl { flow_status, .. } => Some(*flow_status),
            _ => None,
        }
    }

    /// Block size of a continue to send Flow Control
    pub fn block_size(&self) -> Option<u8> {
        match &self.content {
            PacketContent::FlowControl { block_size, .. } => *block_size,
            _ => None,
        }
    }

    /// STmin of a continue to send Flow Control
    pub fn st_min(&self) -> Option<StMin> {
        match &self.content {
            PacketContent::FlowControl { st_min, .. } => st_min.map(StMin),
            _ => None,
        }
    }

    /// The packet as a bus frame
    pub fn to_frame(&self) -> CanFrame {
        CanFrame::new(
            self.can_id(),
            &self.raw_frame_data,
            self.addressing.is_extended_id(),
        )
        .with_fd(dlc::is_fd_dlc(self.dlc))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::addressing::AddressingParams;

    fn normal_tx() -> PacketAddressing {
        CanAddressingFormat::Normal
            .encode(AddressingType::Physical, AddressingParams::from_can_id(0x611))
            .unwrap()
    }

    fn addressing(format: CanAddressingFormat) -> PacketAddressing {
        let params = match format {
            CanAddressingFormat::Normal => AddressingParams::from_can_id(0x611),
            CanAddressingFormat::NormalFixed => AddressingParams::from_addresses(0x12, 0xF1),
            CanAddressingFormat::Extended => {
                AddressingParams::from_can_id(0x611).with_target_address(0x5A)
            }
            CanAddressingFormat::Mixed11Bit => {
                AddressingParams::from_can_id(0x611).with_address_extension(0xA5)
            }
            CanAddressingFormat::Mixed29Bit => {
                AddressingParams::from_addresses(0x12, 0xF1).with_address_extension(0xA5)
            }
        };
        format.encode(AddressingType::Physical, params).unwrap()
    }

    fn round_trip(packet: &CanPacket) {
        let decoded = CanPacket::decode(
            packet.addressing_format(),
            packet.addressing_type(),
            packet.can_id(),
            packet.raw_frame_data(),
        )
        .unwrap();
        assert_eq!(&decoded, packet);
    }

    #[test]
    fn single_frame_scenario() {
        let p = CanPacket::new(
            normal_tx(),
            PacketContent::SingleFrame {
                payload: vec![0x10, 0x03],
            },
            None,
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.raw_frame_data(), &[0x02, 0x10, 0x03]);
        assert_eq!(p.dlc(), 3);
        assert_eq!(p.packet_type(), CanPacketType::SingleFrame);
        assert_eq!(p.data_length(), Some(2));

        let padded = CanPacket::new(
            normal_tx(),
            PacketContent::SingleFrame {
                payload: vec![0x10, 0x03],
            },
            Some(8),
            0xAA,
        )
        .unwrap();
        assert_eq!(
            padded.raw_frame_data(),
            &[0x02, 0x10, 0x03, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]
        );
        round_trip(&p);
        round_trip(&padded);
    }

    #[test]
    fn single_frame_length_boundary() {
        let p = CanPacket::new(
            normal_tx(),
            PacketContent::SingleFrame {
                payload: vec![0x11; 7],
            },
            None,
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.dlc(), 8);
        assert_eq!(p.raw_frame_data()[0], 0x07);

        let p = CanPacket::new(
            normal_tx(),
            PacketContent::SingleFrame {
                payload: vec![0x11; 8],
            },
            None,
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.dlc(), 9);
        assert_eq!(&p.raw_frame_data()[..2], &[0x00, 0x08]);
        assert_eq!(p.raw_frame_data().len(), 12);
        assert_eq!(&p.raw_frame_data()[10..], &[0xCC, 0xCC]);
        assert!(p.to_frame().is_fd());
        round_trip(&p);

        assert!(matches!(
            CanPacket::new(
                normal_tx(),
                PacketContent::SingleFrame {
                    payload: vec![0x11; 8]
                },
                Some(8),
                DEFAULT_FILLER_BYTE,
            ),
            Err(UdsError::InconsistentArguments(_))
        ));
    }

    #[test]
    fn first_frame_length_boundary() {
        let p = CanPacket::new(
            normal_tx(),
            PacketContent::FirstFrame {
                data_length: 4095,
                payload: vec![1, 2, 3, 4, 5, 6],
                long_format: false,
            },
            Some(8),
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.raw_frame_data(), &[0x1F, 0xFF, 1, 2, 3, 4, 5, 6]);
        round_trip(&p);

        let p = CanPacket::new(
            normal_tx(),
            PacketContent::FirstFrame {
                data_length: 4096,
                payload: vec![1, 2],
                long_format: false,
            },
            Some(8),
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(
            p.raw_frame_data(),
            &[0x10, 0x00, 0x00, 0x00, 0x10, 0x00, 1, 2]
        );
        assert_eq!(p.data_length(), Some(4096));
        round_trip(&p);
    }

    #[test]
    fn first_frame_must_fill_frame() {
        assert!(matches!(
            CanPacket::new(
                normal_tx(),
                PacketContent::FirstFrame {
                    data_length: 100,
                    payload: vec![1, 2, 3],
                    long_format: false,
                },
                Some(8),
                DEFAULT_FILLER_BYTE,
            ),
            Err(UdsError::InconsistentArguments(_))
        ));
        // Everything fits into a Single Frame
        assert!(matches!(
            CanPacket::new(
                normal_tx(),
                PacketContent::FirstFrame {
                    data_length: 7,
                    payload: vec![1, 2, 3, 4, 5, 6],
                    long_format: false,
                },
                Some(8),
                DEFAULT_FILLER_BYTE,
            ),
            Err(UdsError::InconsistentArguments(_))
        ));
    }

    #[test]
    fn forced_long_first_frame() {
        let p = CanPacket::new(
            normal_tx(),
            PacketContent::FirstFrame {
                data_length: 20,
                payload: vec![1, 2],
                long_format: true,
            },
            None,
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.raw_frame_data(), &[0x10, 0x00, 0, 0, 0, 20, 1, 2]);
        round_trip(&p);
    }

    #[test]
    fn consecutive_frame() {
        let p = CanPacket::new(
            normal_tx(),
            PacketContent::ConsecutiveFrame {
                sequence_number: 0xF,
                payload: vec![0xAB, 0xCD],
            },
            Some(8),
            0x55,
        )
        .unwrap();
        assert_eq!(p.raw_frame_data(), &[0x2F, 0xAB, 0xCD, 0x55, 0x55, 0x55, 0x55, 0x55]);
        assert_eq!(p.sequence_number(), Some(0xF));
        round_trip(&p);

        assert!(matches!(
            CanPacket::new(
                normal_tx(),
                PacketContent::ConsecutiveFrame {
                    sequence_number: 16,
                    payload: vec![1]
                },
                None,
                DEFAULT_FILLER_BYTE,
            ),
            Err(UdsError::InvalidValue(_))
        ));
    }

    #[test]
    fn flow_control() {
        let fixed = addressing(CanAddressingFormat::NormalFixed);
        let p = CanPacket::new(
            fixed,
            PacketContent::continue_to_send(0x08, 0xAB),
            None,
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.raw_frame_data(), &[0x30, 0x08, 0xAB]);
        assert_eq!(p.block_size(), Some(8));
        assert_eq!(p.st_min(), Some(StMin(0xAB)));
        round_trip(&p);

        let wait = CanPacket::new(
            fixed,
            PacketContent::FlowControl {
                flow_status: FlowStatus::Wait,
                block_size: None,
                st_min: None,
            },
            Some(8),
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(wait.raw_frame_data()[0], 0x31);
        assert_eq!(wait.block_size(), None);
        round_trip(&wait);

        assert!(matches!(
            CanPacket::new(
                fixed,
                PacketContent::FlowControl {
                    flow_status: FlowStatus::Overflow,
                    block_size: Some(1),
                    st_min: None,
                },
                None,
                DEFAULT_FILLER_BYTE,
            ),
            Err(UdsError::UnusedArgument(_))
        ));
        assert!(matches!(
            CanPacket::new(
                fixed,
                PacketContent::FlowControl {
                    flow_status: FlowStatus::ContinueToSend,
                    block_size: Some(1),
                    st_min: None,
                },
                None,
                DEFAULT_FILLER_BYTE,
            ),
            Err(UdsError::InconsistentArguments(_))
        ));
    }

    #[test]
    fn addressing_bytes_prefix_every_packet() {
        for format in CanAddressingFormat::iter() {
            let a = addressing(format);
            let ai = a.ai_data_bytes();
            let contents = [
                PacketContent::SingleFrame {
                    payload: vec![0x3E, 0x00],
                },
                PacketContent::FirstFrame {
                    data_length: 0x100,
                    payload: vec![0x77; 6 - ai.len()],
                    long_format: false,
                },
                PacketContent::ConsecutiveFrame {
                    sequence_number: 3,
                    payload: vec![0x01; 3],
                },
                PacketContent::continue_to_send(0, 0),
            ];
            for content in contents {
                for dlc in [None, Some(8)] {
                    let p = CanPacket::new(a, content.clone(), dlc, DEFAULT_FILLER_BYTE).unwrap();
                    assert!(p.raw_frame_data().starts_with(&ai));
                    assert_eq!(p.packet_type(), content.packet_type());
                    round_trip(&p);
                }
            }
        }
    }

    #[test]
    fn can_fd_dlc() {
        let p = CanPacket::new(
            normal_tx(),
            PacketContent::SingleFrame {
                payload: vec![0x22; 20],
            },
            Some(15),
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.raw_frame_data().len(), 64);
        assert_eq!(&p.raw_frame_data()[..2], &[0x00, 20]);
        round_trip(&p);

        let p = CanPacket::new(
            normal_tx(),
            PacketContent::FirstFrame {
                data_length: 200,
                payload: vec![0x33; 62],
                long_format: false,
            },
            Some(15),
            DEFAULT_FILLER_BYTE,
        )
        .unwrap();
        assert_eq!(p.dlc(), 15);
        round_trip(&p);
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            CanPacket::decode(
                CanAddressingFormat::Normal,
                AddressingType::Physical,
                0x611,
                &[0x40, 0x01]
            ),
            Err(UdsError::InvalidType(_))
        ));
        assert!(matches!(
            CanPacket::decode(
                CanAddressingFormat::Normal,
                AddressingType::Physical,
                0x611,
                &[0x05, 0x01]
            ),
            Err(UdsError::InconsistentArguments(_))
        ));
        assert!(matches!(
            CanPacket::decode(
                CanAddressingFormat::Normal,
                AddressingType::Physical,
                0x611,
                &[0x33, 0x00, 0x00]
            ),
            Err(UdsError::InvalidValue(_))
        ));
        assert!(
            CanPacket::decode(CanAddressingFormat::Normal, AddressingType::Physical, 0x611, &[])
                .is_err()
        );
    }
}
