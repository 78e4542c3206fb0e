//! Transport interface for CAN and CAN-FD buses

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use log::{debug, error, trace, warn};

use crate::{
    TimingParameter, UdsError, UdsResult,
    addressing::{AddressingInformation, AddressingType},
    channel::{CanBus, ChannelError},
    clock::{SystemTimeSource, TimeSource},
    flow_control::{DefaultFlowControlParametersGenerator, FlowControlParametersGenerator},
    message::{UdsMessage, UdsMessageRecord},
    packet::{CanPacket, CanPacketRecord, CanPacketType, TransmissionDirection},
    segmentation::CanSegmenter,
};

use super::{
    AsyncTransportInterface, TimingParameters, TransportConfig, TransportInterface,
    buffer::{FrameBuffer, FrameListener, ReceivedFrame},
    session::{RxSession, Session, SessionAction, TxSession},
};

/// Bus access shared by the blocking and the async API. Each API consumes received frames from
/// its own buffer
#[derive(Debug)]
struct BusLink<B: CanBus + 'static> {
    bus: Arc<B>,
    time_source: Arc<dyn TimeSource>,
    sync_buffer: Arc<FrameBuffer>,
    async_buffer: Arc<FrameBuffer>,
    _listener: FrameListener,
}

impl<B: CanBus + 'static> BusLink<B> {
    fn open(bus: Arc<B>, time_source: Arc<dyn TimeSource>, config: &TransportConfig) -> Self {
        let sync_buffer = Arc::new(FrameBuffer::new(
            "sync",
            config.buffer_capacity,
            time_source.clone(),
        ));
        let async_buffer = Arc::new(FrameBuffer::new(
            "async",
            config.buffer_capacity,
            time_source.clone(),
        ));
        let listener = FrameListener::spawn(
            bus.clone(),
            vec![sync_buffer.clone(), async_buffer.clone()],
            time_source.clone(),
            config.poll_interval,
        );
        Self {
            bus,
            time_source,
            sync_buffer,
            async_buffer,
            _listener: listener,
        }
    }

    fn now(&self) -> Instant {
        self.time_source.now()
    }

    /// Checks the bus confirmation time and records a transmitted packet
    fn confirm(
        &self,
        packet: CanPacket,
        parameter: TimingParameter,
        timeout: Duration,
        start: Instant,
    ) -> UdsResult<(CanPacketRecord, Duration)> {
        let confirmed = self.now();
        let elapsed = confirmed.saturating_duration_since(start);
        if elapsed > timeout {
            error!("{parameter} timeout, bus confirmed frame after {elapsed:?}");
            return Err(UdsError::Timeout { parameter, timeout });
        }
        debug!("Tx {:#X} {:02X?}", packet.can_id(), packet.raw_frame_data());
        let record = CanPacketRecord::new(
            packet,
            TransmissionDirection::Transmitted,
            confirmed,
            self.time_source.system_time(),
        );
        Ok((record, elapsed))
    }

    fn transmit(
        &self,
        packet: CanPacket,
        parameter: TimingParameter,
        timeout: Duration,
    ) -> UdsResult<(CanPacketRecord, Duration)> {
        let frame = packet.to_frame();
        let start = self.now();
        self.bus.send(&frame)?;
        self.confirm(packet, parameter, timeout, start)
    }

    async fn transmit_async(
        &self,
        packet: CanPacket,
        parameter: TimingParameter,
        timeout: Duration,
    ) -> UdsResult<(CanPacketRecord, Duration)> {
        let frame = packet.to_frame();
        let bus = self.bus.clone();
        let start = self.now();
        let send = tokio::task::spawn_blocking(move || bus.send(&frame));
        match tokio::time::timeout(timeout, send).await {
            Ok(Ok(sent)) => sent?,
            Ok(Err(e)) => return Err(ChannelError::IOError(std::io::Error::other(e)).into()),
            Err(_) => {
                error!("{parameter} timeout, bus did not confirm frame within {timeout:?}");
                return Err(UdsError::Timeout { parameter, timeout });
            }
        }
        self.confirm(packet, parameter, timeout, start)
    }

    /// Turns a received frame into a packet record. Frames for other nodes and malformed
    /// frames yield `None`
    fn classify(
        &self,
        segmenter: &CanSegmenter,
        received: ReceivedFrame,
    ) -> Option<CanPacketRecord> {
        let frame = &received.frame;
        let Some(addressing_type) = segmenter.is_input_frame(frame) else {
            trace!(
                "Ignoring frame {:#X} addressed to another node",
                frame.get_address()
            );
            return None;
        };
        match CanPacketRecord::from_frame(
            frame,
            segmenter.addressing_information().format(),
            addressing_type,
            TransmissionDirection::Received,
            received.time,
            received.wall_clock_time,
        ) {
            Ok(record) => {
                debug!("Rx {:#X} {:02X?}", frame.get_address(), frame.get_data());
                Some(record)
            }
            Err(e) => {
                warn!(
                    "Ignoring malformed frame {:#X} {:02X?}: {e}",
                    frame.get_address(),
                    frame.get_data()
                );
                None
            }
        }
    }

    /// Next packet addressed to this node, `None` once `deadline` passed
    fn next_input(
        &self,
        segmenter: &CanSegmenter,
        deadline: Option<Instant>,
    ) -> Option<CanPacketRecord> {
        loop {
            let received = self.sync_buffer.wait_pop(deadline)?;
            if let Some(record) = self.classify(segmenter, received) {
                return Some(record);
            }
        }
    }

    async fn next_input_async(
        &self,
        segmenter: &CanSegmenter,
        deadline: Option<Instant>,
    ) -> Option<CanPacketRecord> {
        loop {
            let received = self.async_buffer.wait_pop_async(deadline).await?;
            if let Some(record) = self.classify(segmenter, received) {
                return Some(record);
            }
        }
    }

    fn run(
        &self,
        session: &mut dyn Session,
        segmenter: &CanSegmenter,
        config: &TransportConfig,
    ) -> UdsResult<UdsMessageRecord> {
        loop {
            match session.next_action(self.now())? {
                SessionAction::Transmit { packet, parameter } => {
                    let timeout = transmit_timeout(config, parameter);
                    let (record, confirmation) = self.transmit(packet, parameter, timeout)?;
                    session.on_transmitted(record, confirmation);
                }
                SessionAction::WaitUntil(time) => {
                    std::thread::sleep(time.saturating_duration_since(self.now()))
                }
                SessionAction::AwaitPacket(deadline) => {
                    match self.next_input(segmenter, Some(deadline)) {
                        Some(record) => session.on_packet(record)?,
                        None => return Err(session.on_deadline()),
                    }
                }
                SessionAction::Complete(record) => return Ok(record),
            }
        }
    }

    async fn run_async(
        &self,
        session: &mut dyn Session,
        segmenter: &CanSegmenter,
        config: &TransportConfig,
    ) -> UdsResult<UdsMessageRecord> {
        loop {
            match session.next_action(self.now())? {
                SessionAction::Transmit { packet, parameter } => {
                    let timeout = transmit_timeout(config, parameter);
                    let (record, confirmation) =
                        self.transmit_async(packet, parameter, timeout).await?;
                    session.on_transmitted(record, confirmation);
                }
                SessionAction::WaitUntil(time) => {
                    tokio::time::sleep(time.saturating_duration_since(self.now())).await
                }
                SessionAction::AwaitPacket(deadline) => {
                    match self.next_input_async(segmenter, Some(deadline)).await {
                        Some(record) => session.on_packet(record)?,
                        None => return Err(session.on_deadline()),
                    }
                }
                SessionAction::Complete(record) => return Ok(record),
            }
        }
    }
}

fn transmit_timeout(config: &TransportConfig, parameter: TimingParameter) -> Duration {
    match parameter {
        TimingParameter::NAr => config.n_ar_timeout,
        _ => config.n_as_timeout,
    }
}

fn receive_timeout(timeout: Option<Duration>) -> UdsError {
    UdsError::Timeout {
        parameter: TimingParameter::Receive,
        timeout: timeout.unwrap_or_default(),
    }
}

/// ISO 15765-2 transport interface over a [CanBus].
///
/// Construction starts a background thread which copies every frame on the bus into a
/// blocking and an async receive buffer, so both APIs can be used on the same interface.
/// The thread stops when the interface is dropped.
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
/// use uds_cantp::{
///     AddressingInformation, AddressingParams, AddressingType, CanAddressingFormat,
///     CanTransportInterface, TransportConfig, TransportInterface, UdsMessage,
///     hardware::simulation::VirtualCanBus,
/// };
///
/// let (tester, _ecu) = VirtualCanBus::pair("tester", "ecu");
/// let ai = AddressingInformation::new(
///     CanAddressingFormat::Normal,
///     AddressingParams::from_can_id(0x7E8),
///     AddressingParams::from_can_id(0x7E0),
///     AddressingParams::from_can_id(0x7D0),
///     AddressingParams::from_can_id(0x7DF),
/// )
/// .unwrap();
/// let mut interface = CanTransportInterface::new(Arc::new(tester), ai, TransportConfig::default())
///     .unwrap();
/// interface
///     .send_message(&UdsMessage::new(&[0x10, 0x03], AddressingType::Physical))
///     .unwrap();
/// let response = interface.receive_message(Some(Duration::from_secs(1))).unwrap();
/// ```
#[derive(Debug)]
pub struct CanTransportInterface<B: CanBus + 'static> {
    link: BusLink<B>,
    segmenter: CanSegmenter,
    config: TransportConfig,
    flow_control_generator: Box<dyn FlowControlParametersGenerator>,
    measured: TimingParameters,
}

impl<B: CanBus + 'static> CanTransportInterface<B> {
    /// Creates a transport interface using the system clocks
    pub fn new(
        bus: Arc<B>,
        addressing_information: AddressingInformation,
        config: TransportConfig,
    ) -> UdsResult<Self> {
        Self::with_time_source(
            bus,
            addressing_information,
            config,
            Arc::new(SystemTimeSource::new()),
        )
    }

    /// Creates a transport interface which timestamps packets with `time_source`
    pub fn with_time_source(
        bus: Arc<B>,
        addressing_information: AddressingInformation,
        config: TransportConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> UdsResult<Self> {
        config.validate()?;
        let segmenter = CanSegmenter::new(
            addressing_information,
            config.dlc,
            config.use_data_optimization,
            config.filler_byte,
        )?;
        debug!(
            "Opening {} transport interface, DLC {}",
            segmenter.addressing_information().format(),
            config.dlc
        );
        Ok(Self {
            link: BusLink::open(bus, time_source, &config),
            segmenter,
            config,
            flow_control_generator: Box::new(DefaultFlowControlParametersGenerator::default()),
            measured: TimingParameters::default(),
        })
    }

    /// Replaces the generator of the Flow Control parameters sent when receiving
    pub fn with_flow_control_parameters_generator(
        mut self,
        generator: impl FlowControlParametersGenerator + 'static,
    ) -> Self {
        self.flow_control_generator = Box::new(generator);
        self
    }

    /// Replaces the generator of the Flow Control parameters sent when receiving
    pub fn set_flow_control_parameters_generator(
        &mut self,
        generator: Box<dyn FlowControlParametersGenerator>,
    ) {
        self.flow_control_generator = generator;
    }

    /// Addressing of this node
    pub fn addressing_information(&self) -> &AddressingInformation {
        self.segmenter.addressing_information()
    }

    /// Segmenter used for outgoing and incoming messages
    pub fn segmenter(&self) -> &CanSegmenter {
        &self.segmenter
    }

    /// Current configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Applies a new configuration to the following exchanges.
    ///
    /// Buffer capacity and poll interval only take effect when an interface is created.
    pub fn set_config(&mut self, config: TransportConfig) -> UdsResult<()> {
        config.validate()?;
        self.segmenter.set_dlc(config.dlc)?;
        self.segmenter
            .set_use_data_optimization(config.use_data_optimization);
        self.segmenter.set_filler_byte(config.filler_byte);
        self.config = config;
        Ok(())
    }

    /// The underlying bus
    pub fn bus(&self) -> &Arc<B> {
        &self.link.bus
    }

    fn check_sendable(&self, message: &UdsMessage) -> UdsResult<()> {
        if message.addressing_type() == AddressingType::Functional
            && message.payload().len() > self.segmenter.max_single_frame_payload()
        {
            return Err(UdsError::NotSupported(format!(
                "functionally addressed message of {} bytes does not fit into a Single Frame",
                message.payload().len()
            )));
        }
        Ok(())
    }

    fn record_confirmation(&mut self, parameter: TimingParameter, confirmation: Duration) {
        self.measured = TimingParameters::default();
        match parameter {
            TimingParameter::NAr => self.measured.n_ar = Some(confirmation),
            _ => self.measured.n_as = Some(confirmation),
        }
    }
}

/// Flow Control is sent by the receiver of a message, every other packet by its sender
fn transmit_parameter(packet: &CanPacket) -> TimingParameter {
    match packet.packet_type() {
        CanPacketType::FlowControl => TimingParameter::NAr,
        _ => TimingParameter::NAs,
    }
}

impl<B: CanBus + 'static> TransportInterface for CanTransportInterface<B> {
    fn send_packet(&mut self, packet: CanPacket) -> UdsResult<CanPacketRecord> {
        let parameter = transmit_parameter(&packet);
        let timeout = transmit_timeout(&self.config, parameter);
        let (record, confirmation) = self.link.transmit(packet, parameter, timeout)?;
        self.record_confirmation(parameter, confirmation);
        Ok(record)
    }

    fn receive_packet(&mut self, timeout: Option<Duration>) -> UdsResult<CanPacketRecord> {
        self.measured = TimingParameters::default();
        let deadline = timeout.map(|t| self.link.now() + t);
        self.link
            .next_input(&self.segmenter, deadline)
            .ok_or_else(|| receive_timeout(timeout))
    }

    fn send_message(&mut self, message: &UdsMessage) -> UdsResult<UdsMessageRecord> {
        self.measured = TimingParameters::default();
        self.check_sendable(message)?;
        let packets = self.segmenter.segmentation(message)?;
        debug!(
            "Sending {} byte message in {} packet(s)",
            message.payload().len(),
            packets.len()
        );
        let mut session = TxSession::new(&self.config, &self.segmenter, packets, self.link.now());
        let result = self.link.run(&mut session, &self.segmenter, &self.config);
        self.measured.update(session.measured());
        result
    }

    fn receive_message(&mut self, timeout: Option<Duration>) -> UdsResult<UdsMessageRecord> {
        self.measured = TimingParameters::default();
        let deadline = timeout.map(|t| self.link.now() + t);
        loop {
            let record = self
                .link
                .next_input(&self.segmenter, deadline)
                .ok_or_else(|| receive_timeout(timeout))?;
            match record.packet_type() {
                CanPacketType::SingleFrame => return self.segmenter.desegmentation(vec![record]),
                CanPacketType::FirstFrame
                    if record.addressing_type() == AddressingType::Physical =>
                {
                    let mut session = RxSession::new(
                        &self.config,
                        &self.segmenter,
                        &mut *self.flow_control_generator,
                        record,
                    );
                    let result = self.link.run(&mut session, &self.segmenter, &self.config);
                    self.measured.update(session.measured());
                    return result;
                }
                other => warn!(
                    "Ignoring {} {other} while waiting for a message",
                    record.addressing_type()
                ),
            }
        }
    }

    fn clear_frames_buffers(&mut self) {
        self.link.sync_buffer.clear();
        self.link.async_buffer.clear();
    }

    fn measured_timing(&self) -> TimingParameters {
        self.measured
    }
}

#[async_trait]
impl<B: CanBus + 'static> AsyncTransportInterface for CanTransportInterface<B> {
    async fn async_send_packet(&mut self, packet: CanPacket) -> UdsResult<CanPacketRecord> {
        let parameter = transmit_parameter(&packet);
        let timeout = transmit_timeout(&self.config, parameter);
        let (record, confirmation) = self.link.transmit_async(packet, parameter, timeout).await?;
        self.record_confirmation(parameter, confirmation);
        Ok(record)
    }

    async fn async_receive_packet(
        &mut self,
        timeout: Option<Duration>,
    ) -> UdsResult<CanPacketRecord> {
        self.measured = TimingParameters::default();
        let deadline = timeout.map(|t| self.link.now() + t);
        self.link
            .next_input_async(&self.segmenter, deadline)
            .await
            .ok_or_else(|| receive_timeout(timeout))
    }

    async fn async_send_message(&mut self, message: &UdsMessage) -> UdsResult<UdsMessageRecord> {
        self.measured = TimingParameters::default();
        self.check_sendable(message)?;
        let packets = self.segmenter.segmentation(message)?;
        debug!(
            "Sending {} byte message in {} packet(s)",
            message.payload().len(),
            packets.len()
        );
        let mut session = TxSession::new(&self.config, &self.segmenter, packets, self.link.now());
        let result = self
            .link
            .run_async(&mut session, &self.segmenter, &self.config)
            .await;
        self.measured.update(session.measured());
        result
    }

    async fn async_receive_message(
        &mut self,
        timeout: Option<Duration>,
    ) -> UdsResult<UdsMessageRecord> {
        self.measured = TimingParameters::default();
        let deadline = timeout.map(|t| self.link.now() + t);
        loop {
            let record = self
                .link
                .next_input_async(&self.segmenter, deadline)
                .await
                .ok_or_else(|| receive_timeout(timeout))?;
            match record.packet_type() {
                CanPacketType::SingleFrame => return self.segmenter.desegmentation(vec![record]),
                CanPacketType::FirstFrame
                    if record.addressing_type() == AddressingType::Physical =>
                {
                    let mut session = RxSession::new(
                        &self.config,
                        &self.segmenter,
                        &mut *self.flow_control_generator,
                        record,
                    );
                    let result = self
                        .link
                        .run_async(&mut session, &self.segmenter, &self.config)
                        .await;
                    self.measured.update(session.measured());
                    return result;
                }
                other => warn!(
                    "Ignoring {} {other} while waiting for a message",
                    record.addressing_type()
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::{
        addressing::{AddressingParams, CanAddressingFormat},
        channel::CanFrame,
        hardware::simulation::VirtualCanBus,
        packet::{FlowStatus, PacketContent},
    };

    fn ai() -> AddressingInformation {
        AddressingInformation::new(
            CanAddressingFormat::Normal,
            AddressingParams::from_can_id(0x7E8),
            AddressingParams::from_can_id(0x7E0),
            AddressingParams::from_can_id(0x7D0),
            AddressingParams::from_can_id(0x7DF),
        )
        .unwrap()
    }

    fn interface() -> (CanTransportInterface<VirtualCanBus>, VirtualCanBus) {
        let (local, remote) = VirtualCanBus::pair("tester", "ecu");
        let interface =
            CanTransportInterface::new(Arc::new(local), ai(), TransportConfig::default()).unwrap();
        (interface, remote)
    }

    #[test]
    fn rejects_invalid_config() {
        let (local, _remote) = VirtualCanBus::pair("tester", "ecu");
        let config = TransportConfig {
            dlc: 16,
            ..Default::default()
        };
        assert!(matches!(
            CanTransportInterface::new(Arc::new(local), ai(), config),
            Err(UdsError::InvalidValue(_))
        ));
    }

    #[test]
    fn functional_multi_frame_not_supported() {
        let (mut interface, remote) = interface();
        let message = UdsMessage::new(&[0x22; 8], AddressingType::Functional);
        assert!(matches!(
            interface.send_message(&message),
            Err(UdsError::NotSupported(_))
        ));
        std::thread::sleep(Duration::from_millis(20));
        assert!(remote.recv().unwrap().is_none());
    }

    #[test]
    fn send_packet_measures_n_as() {
        let (mut interface, remote) = interface();
        let packet = interface
            .segmenter()
            .build_packet(AddressingType::Physical, PacketContent::continue_to_send(0, 0))
            .unwrap();
        let record = interface.send_packet(packet).unwrap();
        assert_eq!(record.direction(), TransmissionDirection::Transmitted);
        assert_eq!(record.flow_status(), Some(FlowStatus::ContinueToSend));
        assert!(interface.n_ar_measured().is_some());
        assert!(interface.n_as_measured().is_none());
        let frame = remote.recv().unwrap().unwrap();
        assert_eq!(frame.get_address(), 0x7E0);
    }

    #[test]
    fn receive_packet_skips_foreign_and_malformed_frames() {
        let (mut interface, remote) = interface();
        remote.send(&CanFrame::new(0x123, &[0x02, 0x10, 0x03], false)).unwrap();
        remote.send(&CanFrame::new(0x7E8, &[0x02, 0x10, 0x03], true)).unwrap();
        remote.send(&CanFrame::new(0x7E8, &[0x70, 0x00], false)).unwrap();
        remote.send(&CanFrame::new(0x7E8, &[0x21, 0xAA, 0xBB], false)).unwrap();
        let record = interface
            .receive_packet(Some(Duration::from_millis(500)))
            .unwrap();
        assert_eq!(record.packet_type(), CanPacketType::ConsecutiveFrame);
        assert_eq!(record.direction(), TransmissionDirection::Received);
    }

    #[test]
    fn receive_packet_timeout() {
        let (mut interface, _remote) = interface();
        let start = Instant::now();
        let err = interface
            .receive_packet(Some(Duration::from_millis(50)))
            .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(matches!(
            err,
            UdsError::Timeout {
                parameter: TimingParameter::Receive,
                ..
            }
        ));
    }

    /// Clock running a fixed amount behind the system clock
    #[derive(Debug)]
    struct LaggingClock(Duration);

    impl TimeSource for LaggingClock {
        fn now(&self) -> Instant {
            Instant::now() - self.0
        }

        fn synchronize(&self, _driver_timestamp: Duration) -> Instant {
            self.now()
        }
    }

    #[test]
    fn receive_packet_timeout_with_lagging_clock() {
        let (local, _remote) = VirtualCanBus::pair("tester", "ecu");
        let mut interface = CanTransportInterface::with_time_source(
            Arc::new(local),
            ai(),
            TransportConfig::default(),
            Arc::new(LaggingClock(Duration::from_millis(500))),
        )
        .unwrap();
        let start = Instant::now();
        let err = interface
            .receive_packet(Some(Duration::from_millis(200)))
            .unwrap_err();
        let elapsed = start.elapsed();
        assert!(matches!(
            err,
            UdsError::Timeout {
                parameter: TimingParameter::Receive,
                ..
            }
        ));
        assert!(elapsed >= Duration::from_millis(200), "timed out after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "timed out after {elapsed:?}");
    }

    #[tokio::test]
    async fn async_receive_packet_timeout_with_lagging_clock() {
        let (local, _remote) = VirtualCanBus::pair("tester", "ecu");
        let mut interface = CanTransportInterface::with_time_source(
            Arc::new(local),
            ai(),
            TransportConfig::default(),
            Arc::new(LaggingClock(Duration::from_millis(500))),
        )
        .unwrap();
        let start = Instant::now();
        assert!(
            interface
                .async_receive_packet(Some(Duration::from_millis(200)))
                .await
                .is_err()
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200), "timed out after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "timed out after {elapsed:?}");
    }

    #[test]
    fn receive_packet_resets_measured_timing() {
        let (mut interface, remote) = interface();
        let packet = interface
            .segmenter()
            .build_packet(AddressingType::Physical, PacketContent::continue_to_send(0, 0))
            .unwrap();
        interface.send_packet(packet).unwrap();
        assert!(interface.n_ar_measured().is_some());
        remote.send(&CanFrame::new(0x7E8, &[0x02, 0x50, 0x03], false)).unwrap();
        interface
            .receive_packet(Some(Duration::from_millis(500)))
            .unwrap();
        assert_eq!(interface.measured_timing(), TimingParameters::default());
    }

    #[test]
    fn set_config_updates_segmenter() {
        let (mut interface, _remote) = interface();
        let config = TransportConfig {
            dlc: 15,
            filler_byte: 0xAA,
            ..Default::default()
        };
        interface.set_config(config).unwrap();
        assert_eq!(interface.segmenter().dlc(), 15);
        assert_eq!(interface.segmenter().filler_byte(), 0xAA);
        assert!(
            interface
                .set_config(TransportConfig {
                    n_bs_timeout: Duration::ZERO,
                    ..Default::default()
                })
                .is_err()
        );
        assert_eq!(interface.config().dlc, 15);
    }
}
