//! Module for splitting diagnostic messages into CAN packets and joining them back

use crate::{
    UdsError, UdsResult,
    addressing::{AddressingInformation, AddressingType},
    channel::CanFrame,
    message::{UdsMessage, UdsMessageRecord},
    packet::{
        CanPacket, CanPacketRecord, CanPacketType, MAX_SEQUENCE_NUMBER, MAX_SHORT_FF_DL,
        PacketContent, dlc,
    },
};

/// Segmenter of a node. Holds everything needed to turn a message into frames for the node's
/// addressing, and to check packets received by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanSegmenter {
    addressing_information: AddressingInformation,
    dlc: u8,
    use_data_optimization: bool,
    filler_byte: u8,
}

impl CanSegmenter {
    /// Creates a new segmenter
    ///
    /// ## Parameters
    /// * addressing_information - Addressing of the node
    /// * dlc - DLC of full frames, 8 for classical CAN or 9-15 for CAN-FD
    /// * use_data_optimization - Send the last frame of a message with the shortest DLC which
    ///   fits, instead of padding it to `dlc`
    /// * filler_byte - Value of padding bytes
    pub fn new(
        addressing_information: AddressingInformation,
        dlc: u8,
        use_data_optimization: bool,
        filler_byte: u8,
    ) -> UdsResult<Self> {
        check_dlc(dlc)?;
        Ok(Self {
            addressing_information,
            dlc,
            use_data_optimization,
            filler_byte,
        })
    }

    /// Addressing of the node
    pub fn addressing_information(&self) -> &AddressingInformation {
        &self.addressing_information
    }

    /// DLC of full frames
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// Sets the DLC of full frames
    pub fn set_dlc(&mut self, dlc: u8) -> UdsResult<()> {
        check_dlc(dlc)?;
        self.dlc = dlc;
        Ok(())
    }

    /// True if the shortest possible DLC is used for packets which do not fill a frame
    pub fn use_data_optimization(&self) -> bool {
        self.use_data_optimization
    }

    /// Enables or disables CAN frame data optimization
    pub fn set_use_data_optimization(&mut self, enabled: bool) {
        self.use_data_optimization = enabled;
    }

    /// Value of padding bytes
    pub fn filler_byte(&self) -> u8 {
        self.filler_byte
    }

    /// Sets the value of padding bytes
    pub fn set_filler_byte(&mut self, filler_byte: u8) {
        self.filler_byte = filler_byte;
    }

    fn frame_length(&self) -> usize {
        // Checked on construction
        dlc::dlc_to_data_length(self.dlc).unwrap_or(dlc::MAX_CLASSICAL_DLC as usize)
    }

    fn packet_dlc(&self) -> Option<u8> {
        if self.use_data_optimization {
            None
        } else {
            Some(self.dlc)
        }
    }

    /// Longest payload which fits into a single frame
    pub fn max_single_frame_payload(&self) -> usize {
        let frame_len = self.frame_length();
        let sf_dl_bytes = if frame_len <= dlc::MAX_CLASSICAL_DLC as usize {
            1
        } else {
            2
        };
        frame_len - self.addressing_information.ai_data_bytes_number() - sf_dl_bytes
    }

    /// Payload carried by every full Consecutive Frame
    pub fn consecutive_frame_payload(&self) -> usize {
        self.frame_length() - self.addressing_information.ai_data_bytes_number() - 1
    }

    /// Builds a packet sent by this node
    pub fn build_packet(
        &self,
        addressing_type: AddressingType,
        content: PacketContent,
    ) -> UdsResult<CanPacket> {
        CanPacket::new(
            *self.addressing_information.tx_addressing(addressing_type),
            content,
            self.packet_dlc(),
            self.filler_byte,
        )
    }

    /// Classifies a received frame. Returns `None` if the frame is not addressed to this node
    pub fn is_input_packet(&self, can_id: u32, data: &[u8]) -> Option<AddressingType> {
        self.addressing_information.is_input_packet(can_id, data)
    }

    /// Classifies a received bus frame, including its identifier length
    pub fn is_input_frame(&self, frame: &CanFrame) -> Option<AddressingType> {
        self.addressing_information.is_input_frame(frame)
    }

    /// Decodes a received frame which is addressed to this node. Returns `Ok(None)` if the
    /// frame is not addressed to this node
    pub fn decode_input_packet(&self, can_id: u32, data: &[u8]) -> UdsResult<Option<CanPacket>> {
        match self.is_input_packet(can_id, data) {
            Some(addressing_type) => CanPacket::decode(
                self.addressing_information.format(),
                addressing_type,
                can_id,
                data,
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// Splits a message into the packets which carry it.
    ///
    /// Messages which fit into one frame become a single Single Frame. Longer messages become
    /// a First Frame followed by Consecutive Frames with sequence numbers 1, 2, .. 15, 0, 1, ..
    /// Only physically addressed messages can be segmented.
    pub fn segmentation(&self, message: &UdsMessage) -> UdsResult<Vec<CanPacket>> {
        let payload = message.payload();
        let addressing_type = message.addressing_type();
        if payload.is_empty() {
            return Err(UdsError::InconsistentArguments(
                "cannot segment an empty message".into(),
            ));
        }
        if payload.len() <= self.max_single_frame_payload() {
            return Ok(vec![self.build_packet(
                addressing_type,
                PacketContent::SingleFrame {
                    payload: payload.to_vec(),
                },
            )?]);
        }
        if addressing_type == AddressingType::Functional {
            return Err(UdsError::Segmentation(format!(
                "functionally addressed messages must fit into a single frame, got {} bytes",
                payload.len()
            )));
        }
        let data_length = u32::try_from(payload.len()).map_err(|_| {
            UdsError::InvalidValue(format!("{} bytes is too long for ISO-TP", payload.len()))
        })?;
        let ff_header = if data_length > MAX_SHORT_FF_DL { 6 } else { 2 };
        let ff_payload_len =
            self.frame_length() - self.addressing_information.ai_data_bytes_number() - ff_header;
        let (ff_payload, mut rest) = payload.split_at(ff_payload_len);
        let mut packets = vec![CanPacket::new(
            *self.addressing_information.tx_addressing(addressing_type),
            PacketContent::FirstFrame {
                data_length,
                payload: ff_payload.to_vec(),
                long_format: false,
            },
            Some(self.dlc),
            self.filler_byte,
        )?];
        let cf_len = self.consecutive_frame_payload();
        let mut sequence_number = 1u8;
        while !rest.is_empty() {
            let (chunk, remaining) = rest.split_at(cf_len.min(rest.len()));
            packets.push(self.build_packet(
                addressing_type,
                PacketContent::ConsecutiveFrame {
                    sequence_number,
                    payload: chunk.to_vec(),
                },
            )?);
            sequence_number = (sequence_number + 1) & MAX_SEQUENCE_NUMBER;
            rest = remaining;
        }
        Ok(packets)
    }

    /// Joins the records of received or transmitted packets into a message record.
    ///
    /// Valid input is either one Single Frame, or a First Frame followed by Consecutive Frames
    /// with contiguous sequence numbers which carry exactly the announced number of bytes.
    pub fn desegmentation(&self, records: Vec<CanPacketRecord>) -> UdsResult<UdsMessageRecord> {
        let first = records
            .first()
            .ok_or_else(|| UdsError::Segmentation("no packets provided".into()))?;
        match first.packet_type() {
            CanPacketType::SingleFrame => {
                if records.len() != 1 {
                    return Err(UdsError::Segmentation(format!(
                        "Single Frame followed by {} more packet(s)",
                        records.len() - 1
                    )));
                }
                let payload = first.payload().unwrap_or_default().to_vec();
                UdsMessageRecord::new(payload, records)
            }
            CanPacketType::FirstFrame => {
                let data_length = first.data_length().unwrap_or_default() as usize;
                let mut payload = first.payload().unwrap_or_default().to_vec();
                let mut expected_sn = 1u8;
                for (i, record) in records.iter().enumerate().skip(1) {
                    if payload.len() >= data_length {
                        return Err(UdsError::Segmentation(format!(
                            "{} packet(s) after the message was complete",
                            records.len() - i
                        )));
                    }
                    match record.sequence_number() {
                        Some(sn) if sn == expected_sn => {}
                        Some(sn) => {
                            return Err(UdsError::Segmentation(format!(
                                "expected sequence number {expected_sn}, got {sn}"
                            )));
                        }
                        None => {
                            return Err(UdsError::Segmentation(format!(
                                "expected Consecutive Frame, got {}",
                                record.packet_type()
                            )));
                        }
                    }
                    payload.extend_from_slice(record.payload().unwrap_or_default());
                    expected_sn = (expected_sn + 1) & MAX_SEQUENCE_NUMBER;
                }
                if payload.len() < data_length {
                    return Err(UdsError::Segmentation(format!(
                        "message is incomplete, {} of {data_length} bytes received",
                        payload.len()
                    )));
                }
                payload.truncate(data_length);
                UdsMessageRecord::new(payload, records)
            }
            other => Err(UdsError::Segmentation(format!(
                "a message cannot start with a {other}"
            ))),
        }
    }
}

fn check_dlc(dlc: u8) -> UdsResult<()> {
    if (dlc::MIN_BASE_UDS_DLC..=dlc::MAX_DLC).contains(&dlc) {
        Ok(())
    } else {
        Err(UdsError::InvalidValue(format!(
            "DLC must be in range {}-{}, got {dlc}",
            dlc::MIN_BASE_UDS_DLC,
            dlc::MAX_DLC
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Instant, SystemTime};

    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        addressing::{AddressingParams, CanAddressingFormat},
        packet::TransmissionDirection,
    };

    fn ai(format: CanAddressingFormat) -> AddressingInformation {
        let b = AddressingInformation::builder(format);
        match format {
            CanAddressingFormat::Normal => b
                .rx_physical(AddressingParams::from_can_id(0x612))
                .tx_physical(AddressingParams::from_can_id(0x611))
                .rx_functional(AddressingParams::from_can_id(0x6FE))
                .tx_functional(AddressingParams::from_can_id(0x6FF)),
            CanAddressingFormat::NormalFixed => b
                .rx_physical(AddressingParams::from_addresses(0xF1, 0x12))
                .tx_physical(AddressingParams::from_addresses(0x12, 0xF1))
                .rx_functional(AddressingParams::from_addresses(0xF1, 0x33))
                .tx_functional(AddressingParams::from_addresses(0x33, 0xF1)),
            CanAddressingFormat::Extended => b
                .rx_physical(AddressingParams::from_can_id(0x6A0).with_target_address(0xF1))
                .tx_physical(AddressingParams::from_can_id(0x6A1).with_target_address(0x12))
                .rx_functional(AddressingParams::from_can_id(0x6A0).with_target_address(0xF2))
                .tx_functional(AddressingParams::from_can_id(0x6A1).with_target_address(0xFF)),
            CanAddressingFormat::Mixed11Bit => b
                .rx_physical(AddressingParams::from_can_id(0x612).with_address_extension(0x01))
                .tx_physical(AddressingParams::from_can_id(0x611).with_address_extension(0x01))
                .rx_functional(AddressingParams::from_can_id(0x6FE).with_address_extension(0x01))
                .tx_functional(AddressingParams::from_can_id(0x6FF).with_address_extension(0x01)),
            CanAddressingFormat::Mixed29Bit => b
                .rx_physical(AddressingParams::from_addresses(0xF1, 0x12).with_address_extension(0x7))
                .tx_physical(AddressingParams::from_addresses(0x12, 0xF1).with_address_extension(0x7))
                .rx_functional(
                    AddressingParams::from_addresses(0xF1, 0x33).with_address_extension(0x7),
                )
                .tx_functional(
                    AddressingParams::from_addresses(0x33, 0xF1).with_address_extension(0x7),
                ),
        }
        .build()
        .unwrap()
    }

    fn records(packets: Vec<CanPacket>) -> Vec<CanPacketRecord> {
        packets
            .into_iter()
            .map(|p| {
                CanPacketRecord::new(
                    p,
                    TransmissionDirection::Transmitted,
                    Instant::now(),
                    SystemTime::now(),
                )
            })
            .collect()
    }

    #[test]
    fn single_frame_message() {
        let seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, true, 0xCC).unwrap();
        let msg = UdsMessage::new(&[0x10, 0x03], AddressingType::Physical);
        let packets = seg.segmentation(&msg).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].can_id(), 0x611);
        assert_eq!(packets[0].raw_frame_data(), &[0x02, 0x10, 0x03]);

        let record = seg.desegmentation(records(packets)).unwrap();
        assert_eq!(record.payload(), msg.payload());
        assert_eq!(record.direction(), TransmissionDirection::Transmitted);
        assert_eq!(record.to_message(), msg);
    }

    #[test]
    fn functional_single_frame() {
        let seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, false, 0xCC).unwrap();
        let packets = seg
            .segmentation(&UdsMessage::new(&[0x3E, 0x80], AddressingType::Functional))
            .unwrap();
        assert_eq!(packets[0].can_id(), 0x6FF);
        assert_eq!(packets[0].raw_frame_data().len(), 8);
        assert!(matches!(
            seg.segmentation(&UdsMessage::new(&[0u8; 20], AddressingType::Functional)),
            Err(UdsError::Segmentation(_))
        ));
    }

    #[test]
    fn multi_frame_round_trip_all_formats() {
        for format in CanAddressingFormat::iter() {
            for dlc in [8, 12, 15] {
                for optimize in [false, true] {
                    let seg = CanSegmenter::new(ai(format), dlc, optimize, 0x00).unwrap();
                    let payload: Vec<u8> = (0..300u32).map(|x| x as u8).collect();
                    let msg = UdsMessage::new(&payload, AddressingType::Physical);
                    let packets = seg.segmentation(&msg).unwrap();
                    assert_eq!(packets[0].packet_type(), CanPacketType::FirstFrame);
                    assert_eq!(packets[0].data_length(), Some(300));
                    for (i, p) in packets.iter().enumerate().skip(1) {
                        assert_eq!(p.sequence_number(), Some((i % 16) as u8));
                    }
                    let record = seg.desegmentation(records(packets)).unwrap();
                    assert_eq!(record.payload(), payload.as_slice(), "{format} dlc {dlc}");
                }
            }
        }
    }

    #[test]
    fn sequence_numbers_wrap() {
        let seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, false, 0xCC).unwrap();
        let payload = vec![0x55; 6 + 7 * 20];
        let packets = seg
            .segmentation(&UdsMessage::new(&payload, AddressingType::Physical))
            .unwrap();
        assert_eq!(packets.len(), 21);
        let sns: Vec<u8> = packets
            .iter()
            .filter_map(|p| p.sequence_number())
            .collect();
        assert_eq!(&sns[..17], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0, 1]);
    }

    #[test]
    fn long_first_frame() {
        let seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, false, 0xCC).unwrap();
        let payload = vec![0xA5; 5000];
        let packets = seg
            .segmentation(&UdsMessage::new(&payload, AddressingType::Physical))
            .unwrap();
        assert_eq!(&packets[0].raw_frame_data()[..6], &[0x10, 0x00, 0x00, 0x00, 0x13, 0x88]);
        let record = seg.desegmentation(records(packets)).unwrap();
        assert_eq!(record.payload().len(), 5000);
    }

    #[test]
    fn desegmentation_errors() {
        let seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, false, 0xCC).unwrap();
        let payload = vec![0x01; 30];
        let packets = seg
            .segmentation(&UdsMessage::new(&payload, AddressingType::Physical))
            .unwrap();

        assert!(matches!(
            seg.desegmentation(Vec::new()),
            Err(UdsError::Segmentation(_))
        ));
        // Missing last frame
        let mut incomplete = packets.clone();
        incomplete.pop();
        assert!(matches!(
            seg.desegmentation(records(incomplete)),
            Err(UdsError::Segmentation(_))
        ));
        // Out of order
        let mut swapped = packets.clone();
        swapped.swap(1, 2);
        assert!(matches!(
            seg.desegmentation(records(swapped)),
            Err(UdsError::Segmentation(_))
        ));
        // Starting with a Consecutive Frame
        assert!(matches!(
            seg.desegmentation(records(packets[1..].to_vec())),
            Err(UdsError::Segmentation(_))
        ));
        // Trailing packet
        let mut extra = packets.clone();
        extra.push(packets[1].clone());
        assert!(matches!(
            seg.desegmentation(records(extra)),
            Err(UdsError::Segmentation(_))
        ));
        // Two single frames
        let sf = seg
            .segmentation(&UdsMessage::new(&[1], AddressingType::Physical))
            .unwrap();
        assert!(matches!(
            seg.desegmentation(records(vec![sf[0].clone(), sf[0].clone()])),
            Err(UdsError::Segmentation(_))
        ));
    }

    #[test]
    fn invalid_dlc() {
        assert!(matches!(
            CanSegmenter::new(ai(CanAddressingFormat::Normal), 7, false, 0xCC),
            Err(UdsError::InvalidValue(_))
        ));
        let mut seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, false, 0xCC).unwrap();
        assert!(seg.set_dlc(16).is_err());
        assert!(seg.set_dlc(15).is_ok());
        assert_eq!(seg.max_single_frame_payload(), 62);
    }

    #[test]
    fn input_packets() {
        let seg = CanSegmenter::new(ai(CanAddressingFormat::Normal), 8, false, 0xCC).unwrap();
        assert!(seg.decode_input_packet(0x611, &[0x01, 0x3E]).unwrap().is_none());
        let p = seg.decode_input_packet(0x612, &[0x01, 0x3E]).unwrap().unwrap();
        assert_eq!(p.addressing_type(), AddressingType::Physical);
        assert_eq!(p.payload(), Some(&[0x3E][..]));
    }
}
