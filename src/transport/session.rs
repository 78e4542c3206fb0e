//! State machines of a single message transmission and a single message reception
//!
//! Sessions never touch the bus or a clock. A driver asks for the [SessionAction] to perform
//! next, performs it, and reports the outcome back. The blocking and the async transport
//! interface run the same sessions, only the drivers differ.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use log::{debug, error, warn};

use crate::{
    TimingParameter, UdsError, UdsResult,
    addressing::AddressingType,
    flow_control::FlowControlParametersGenerator,
    message::UdsMessageRecord,
    packet::{CanPacket, CanPacketRecord, CanPacketType, FlowStatus, PacketContent, StMin},
    segmentation::CanSegmenter,
};

use super::{TimingParameters, TransportConfig};

/// What a driver has to do next
#[derive(Debug)]
pub(crate) enum SessionAction {
    /// Send the packet and report with [Session::on_transmitted]. The bus has to confirm
    /// the transmission within the timeout of `parameter`
    Transmit {
        packet: CanPacket,
        parameter: TimingParameter,
    },
    /// Sleep until the given time, then ask again
    WaitUntil(Instant),
    /// Wait for a received packet until the given time. Report the packet with
    /// [Session::on_packet] or the elapsed deadline with [Session::on_deadline]
    AwaitPacket(Instant),
    /// The exchange finished
    Complete(UdsMessageRecord),
}

pub(crate) trait Session: Send {
    fn next_action(&mut self, now: Instant) -> UdsResult<SessionAction>;

    /// `confirmation` is the time the bus took to confirm the transmission
    fn on_transmitted(&mut self, record: CanPacketRecord, confirmation: Duration);

    fn on_packet(&mut self, record: CanPacketRecord) -> UdsResult<()>;

    fn on_deadline(&mut self) -> UdsError;

    fn measured(&self) -> &TimingParameters;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TxState {
    Transmit { not_before: Instant },
    AwaitFlowControl { since: Instant, deadline: Instant },
    Done,
}

/// Sender side of a message exchange
#[derive(Debug)]
pub(crate) struct TxSession<'a> {
    config: &'a TransportConfig,
    segmenter: &'a CanSegmenter,
    pending: VecDeque<CanPacket>,
    records: Vec<CanPacketRecord>,
    state: TxState,
    block_size: u8,
    sent_in_block: usize,
    st_min: Duration,
    measured: TimingParameters,
}

impl<'a> TxSession<'a> {
    pub fn new(
        config: &'a TransportConfig,
        segmenter: &'a CanSegmenter,
        packets: Vec<CanPacket>,
        now: Instant,
    ) -> Self {
        Self {
            config,
            segmenter,
            pending: packets.into(),
            records: Vec::new(),
            state: TxState::Transmit { not_before: now },
            block_size: 0,
            sent_in_block: 0,
            st_min: Duration::ZERO,
            measured: TimingParameters::default(),
        }
    }

    fn separation_time(&self) -> Duration {
        self.config.n_cs.unwrap_or_default().max(self.st_min)
    }

    fn await_flow_control(&mut self, since: Instant) {
        self.state = TxState::AwaitFlowControl {
            since,
            deadline: since + self.config.n_bs_timeout,
        };
    }

    fn on_flow_control(
        &mut self,
        record: &CanPacketRecord,
        flow_status: FlowStatus,
        since: Instant,
    ) -> UdsResult<()> {
        let now = record.transmission_time();
        match flow_status {
            FlowStatus::ContinueToSend => {
                self.measured.n_bs = Some(now.saturating_duration_since(since));
                self.block_size = record.block_size().unwrap_or_default();
                let st_min = record.st_min().unwrap_or(StMin(0));
                if st_min.is_reserved() {
                    warn!(
                        "Reserved STmin value {:#04X} received, using {:?}",
                        st_min.0,
                        st_min.duration()
                    );
                }
                self.st_min = st_min.duration();
                if let Some(n_cs) = self.config.n_cs {
                    let n_cs_max = self.config.n_cs_max(self.measured.n_as);
                    if n_cs > n_cs_max {
                        warn!("N_Cs of {n_cs:?} exceeds {n_cs_max:?}, receiver might time out");
                    }
                }
                debug!(
                    "Continue to send, block size {}, STmin {:?}",
                    self.block_size, self.st_min
                );
                self.sent_in_block = 0;
                self.state = TxState::Transmit {
                    not_before: now + self.config.n_cs.unwrap_or_default(),
                };
                Ok(())
            }
            FlowStatus::Wait => {
                debug!("Receiver requested to wait");
                self.await_flow_control(now);
                Ok(())
            }
            FlowStatus::Overflow => {
                error!("Receiver reported overflow, aborting transmission");
                Err(UdsError::Overflow)
            }
        }
    }
}

impl Session for TxSession<'_> {
    fn next_action(&mut self, now: Instant) -> UdsResult<SessionAction> {
        match self.state {
            TxState::Transmit { not_before } => {
                if now < not_before {
                    return Ok(SessionAction::WaitUntil(not_before));
                }
                match self.pending.pop_front() {
                    Some(packet) => Ok(SessionAction::Transmit {
                        packet,
                        parameter: TimingParameter::NAs,
                    }),
                    None => {
                        self.state = TxState::Done;
                        self.next_action(now)
                    }
                }
            }
            TxState::AwaitFlowControl { deadline, .. } => Ok(SessionAction::AwaitPacket(deadline)),
            TxState::Done => Ok(SessionAction::Complete(
                self.segmenter
                    .desegmentation(std::mem::take(&mut self.records))?,
            )),
        }
    }

    fn on_transmitted(&mut self, record: CanPacketRecord, confirmation: Duration) {
        self.measured.n_as = Some(confirmation);
        let sent_at = record.transmission_time();
        let packet_type = record.packet_type();
        self.records.push(record);
        if self.pending.is_empty() {
            self.state = TxState::Done;
            return;
        }
        match packet_type {
            CanPacketType::FirstFrame => self.await_flow_control(sent_at),
            _ => {
                self.sent_in_block += 1;
                if self.block_size != 0 && self.sent_in_block >= self.block_size as usize {
                    self.await_flow_control(sent_at);
                } else {
                    self.state = TxState::Transmit {
                        not_before: sent_at + self.separation_time(),
                    };
                }
            }
        }
    }

    fn on_packet(&mut self, record: CanPacketRecord) -> UdsResult<()> {
        match (self.state, record.flow_status()) {
            (TxState::AwaitFlowControl { since, .. }, Some(flow_status))
                if record.addressing_type() == AddressingType::Physical =>
            {
                self.on_flow_control(&record, flow_status, since)
            }
            _ => {
                warn!(
                    "Ignoring {} received during transmission: {:02X?}",
                    record.packet_type(),
                    record.raw_frame_data()
                );
                Ok(())
            }
        }
    }

    fn on_deadline(&mut self) -> UdsError {
        UdsError::Timeout {
            parameter: TimingParameter::NBs,
            timeout: self.config.n_bs_timeout,
        }
    }

    fn measured(&self) -> &TimingParameters {
        &self.measured
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RxState {
    SendFlowControl { not_before: Instant },
    AwaitConsecutiveFrame { deadline: Instant },
    Done,
}

/// Receiver side of a segmented message exchange, started by a First Frame
#[derive(Debug)]
pub(crate) struct RxSession<'a> {
    config: &'a TransportConfig,
    segmenter: &'a CanSegmenter,
    generator: &'a mut dyn FlowControlParametersGenerator,
    records: Vec<CanPacketRecord>,
    state: RxState,
    data_length: usize,
    received: usize,
    expected_sn: u8,
    block_size: u8,
    received_in_block: usize,
    last_frame: Instant,
    measured: TimingParameters,
}

impl<'a> RxSession<'a> {
    pub fn new(
        config: &'a TransportConfig,
        segmenter: &'a CanSegmenter,
        generator: &'a mut dyn FlowControlParametersGenerator,
        first_frame: CanPacketRecord,
    ) -> Self {
        let mut session = Self {
            config,
            segmenter,
            generator,
            records: Vec::new(),
            state: RxState::Done,
            data_length: 0,
            received: 0,
            expected_sn: 1,
            block_size: 0,
            received_in_block: 0,
            last_frame: first_frame.transmission_time(),
            measured: TimingParameters::default(),
        };
        session.start(first_frame);
        session
    }

    fn start(&mut self, first_frame: CanPacketRecord) {
        self.generator.reset();
        self.data_length = first_frame.data_length().unwrap_or_default() as usize;
        self.received = first_frame.payload().map(<[u8]>::len).unwrap_or_default();
        self.expected_sn = 1;
        self.last_frame = first_frame.transmission_time();
        debug!("Receiving {} byte message", self.data_length);
        self.send_flow_control_after(first_frame.transmission_time());
        self.records = vec![first_frame];
    }

    fn send_flow_control_after(&mut self, time: Instant) {
        let n_br_max = self.config.n_br_max(self.measured.n_ar);
        if self.config.n_br > n_br_max {
            warn!(
                "N_Br of {:?} exceeds {n_br_max:?}, sender might time out",
                self.config.n_br
            );
        }
        self.state = RxState::SendFlowControl {
            not_before: time + self.config.n_br,
        };
    }

    fn on_consecutive_frame(&mut self, record: CanPacketRecord) -> UdsResult<()> {
        let RxState::AwaitConsecutiveFrame { .. } = self.state else {
            warn!("Ignoring Consecutive Frame received before Flow Control was sent");
            return Ok(());
        };
        let sequence_number = record.sequence_number().unwrap_or_default();
        if sequence_number != self.expected_sn {
            error!(
                "Expected sequence number {}, got {sequence_number}. Aborting reception",
                self.expected_sn
            );
            return Err(UdsError::Segmentation(format!(
                "expected sequence number {}, got {sequence_number}",
                self.expected_sn
            )));
        }
        let time = record.transmission_time();
        self.measured.n_cr = Some(time.saturating_duration_since(self.last_frame));
        self.last_frame = time;
        self.received += record.payload().map(<[u8]>::len).unwrap_or_default();
        self.expected_sn = (self.expected_sn + 1) & 0x0F;
        self.received_in_block += 1;
        self.records.push(record);
        if self.received >= self.data_length {
            self.state = RxState::Done;
        } else if self.block_size != 0 && self.received_in_block >= self.block_size as usize {
            self.send_flow_control_after(time);
        } else {
            self.state = RxState::AwaitConsecutiveFrame {
                deadline: time + self.config.n_cr_timeout,
            };
        }
        Ok(())
    }
}

impl Session for RxSession<'_> {
    fn next_action(&mut self, now: Instant) -> UdsResult<SessionAction> {
        match self.state {
            RxState::SendFlowControl { not_before } => {
                if now < not_before {
                    return Ok(SessionAction::WaitUntil(not_before));
                }
                let (block_size, st_min) = self.generator.generate();
                self.block_size = block_size;
                let packet = self.segmenter.build_packet(
                    AddressingType::Physical,
                    PacketContent::continue_to_send(block_size, st_min),
                )?;
                Ok(SessionAction::Transmit {
                    packet,
                    parameter: TimingParameter::NAr,
                })
            }
            RxState::AwaitConsecutiveFrame { deadline } => {
                Ok(SessionAction::AwaitPacket(deadline))
            }
            RxState::Done => Ok(SessionAction::Complete(
                self.segmenter
                    .desegmentation(std::mem::take(&mut self.records))?,
            )),
        }
    }

    fn on_transmitted(&mut self, record: CanPacketRecord, confirmation: Duration) {
        self.measured.n_ar = Some(confirmation);
        self.received_in_block = 0;
        let sent_at = record.transmission_time();
        self.last_frame = sent_at;
        self.state = RxState::AwaitConsecutiveFrame {
            deadline: sent_at + self.config.n_cr_timeout,
        };
    }

    fn on_packet(&mut self, record: CanPacketRecord) -> UdsResult<()> {
        if record.addressing_type() != AddressingType::Physical {
            warn!(
                "Ignoring functionally addressed {} received during reception",
                record.packet_type()
            );
            return Ok(());
        }
        match record.packet_type() {
            CanPacketType::ConsecutiveFrame => self.on_consecutive_frame(record),
            CanPacketType::FirstFrame => {
                warn!("New First Frame received, restarting reception");
                self.start(record);
                Ok(())
            }
            CanPacketType::SingleFrame => {
                warn!("Single Frame received, aborting reception of segmented message");
                self.records = vec![record];
                self.state = RxState::Done;
                Ok(())
            }
            CanPacketType::FlowControl => {
                warn!("Ignoring Flow Control received during reception");
                Ok(())
            }
        }
    }

    fn on_deadline(&mut self) -> UdsError {
        error!(
            "No Consecutive Frame within {:?}, aborting reception",
            self.config.n_cr_timeout
        );
        UdsError::Timeout {
            parameter: TimingParameter::NCr,
            timeout: self.config.n_cr_timeout,
        }
    }

    fn measured(&self) -> &TimingParameters {
        &self.measured
    }
}
