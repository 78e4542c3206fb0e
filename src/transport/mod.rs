//! Module for the transport interface
//!
//! A transport interface sends and receives packets and complete diagnostic messages over a
//! bus, enforcing the ISO 15765-2 timing:
//!
//! | Parameter | Side     | Meaning                                                     |
//! |-----------|----------|-------------------------------------------------------------|
//! | N_As      | sender   | bus confirmation of a transmitted frame                     |
//! | N_Ar      | receiver | bus confirmation of a transmitted Flow Control              |
//! | N_Bs      | sender   | waiting for Flow Control                                    |
//! | N_Br      | receiver | delay before sending Flow Control                           |
//! | N_Cs      | sender   | delay before sending the next Consecutive Frame             |
//! | N_Cr      | receiver | waiting for the next Consecutive Frame                      |
//!
//! Every operation exists in a blocking form ([TransportInterface]) and an async form
//! ([AsyncTransportInterface]).

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    UdsResult,
    message::{UdsMessage, UdsMessageRecord},
    packet::{CanPacket, CanPacketRecord},
};

mod buffer;
mod can;
mod config;
mod logged;
mod session;

pub use can::CanTransportInterface;
pub use config::{DEFAULT_TIMEOUT, TimingParameters, TransportConfig};
pub use logged::LoggedTransportInterface;

/// Blocking transport interface
pub trait TransportInterface: Send {
    /// Transmits a single packet
    fn send_packet(&mut self, packet: CanPacket) -> UdsResult<CanPacketRecord>;

    /// Waits for the next packet addressed to this node. Waits forever if `timeout` is `None`
    fn receive_packet(&mut self, timeout: Option<Duration>) -> UdsResult<CanPacketRecord>;

    /// Transmits a complete message, segmenting it if required
    fn send_message(&mut self, message: &UdsMessage) -> UdsResult<UdsMessageRecord>;

    /// Waits for the start of the next message addressed to this node and receives it
    /// completely. `timeout` only limits the wait for the first packet, once a segmented
    /// message has started N_Cr applies. Waits forever if `timeout` is `None`
    fn receive_message(&mut self, timeout: Option<Duration>) -> UdsResult<UdsMessageRecord>;

    /// Discards every received frame which was not consumed yet
    fn clear_frames_buffers(&mut self);

    /// Timing measured during the last exchange
    fn measured_timing(&self) -> TimingParameters;

    /// Last measured N_As
    fn n_as_measured(&self) -> Option<Duration> {
        self.measured_timing().n_as
    }

    /// Last measured N_Ar
    fn n_ar_measured(&self) -> Option<Duration> {
        self.measured_timing().n_ar
    }

    /// Last measured N_Bs
    fn n_bs_measured(&self) -> Option<Duration> {
        self.measured_timing().n_bs
    }

    /// Last measured N_Cr
    fn n_cr_measured(&self) -> Option<Duration> {
        self.measured_timing().n_cr
    }
}

/// Async transport interface. Dropping a returned future cancels the operation
#[async_trait]
pub trait AsyncTransportInterface: Send {
    /// Transmits a single packet
    async fn async_send_packet(&mut self, packet: CanPacket) -> UdsResult<CanPacketRecord>;

    /// Waits for the next packet addressed to this node
    async fn async_receive_packet(
        &mut self,
        timeout: Option<Duration>,
    ) -> UdsResult<CanPacketRecord>;

    /// Transmits a complete message, segmenting it if required
    async fn async_send_message(&mut self, message: &UdsMessage) -> UdsResult<UdsMessageRecord>;

    /// Waits for the start of the next message addressed to this node and receives it
    /// completely
    async fn async_receive_message(
        &mut self,
        timeout: Option<Duration>,
    ) -> UdsResult<UdsMessageRecord>;
}
