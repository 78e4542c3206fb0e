//! Transport interface wrapper which logs every operation

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use log::{Level, error, log};

use crate::{
    UdsResult,
    message::{UdsMessage, UdsMessageRecord},
    packet::{CanPacket, CanPacketRecord},
};

use super::{AsyncTransportInterface, TimingParameters, TransportInterface};

/// Wraps a transport interface and logs the arguments, results and errors of every operation.
///
/// Calls and results are logged at the configured level, errors always at [Level::Error].
#[derive(Debug)]
pub struct LoggedTransportInterface<T> {
    inner: T,
    level: Level,
}

impl<T> LoggedTransportInterface<T> {
    /// Wraps `inner`, logging at [Level::Debug]
    pub fn new(inner: T) -> Self {
        Self::with_level(inner, Level::Debug)
    }

    /// Wraps `inner`, logging at `level`
    pub fn with_level(inner: T, level: Level) -> Self {
        Self { inner, level }
    }

    /// Level calls and results are logged at
    pub fn level(&self) -> Level {
        self.level
    }

    /// Changes the level calls and results are logged at
    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// The wrapped interface
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The wrapped interface
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwraps the interface
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn log_result<R: Debug>(&self, operation: &str, result: UdsResult<R>) -> UdsResult<R> {
        match &result {
            Ok(value) => log!(self.level, "{operation} returned {value:?}"),
            Err(e) => error!("{operation} failed: {e}"),
        }
        result
    }
}

impl<T: TransportInterface> TransportInterface for LoggedTransportInterface<T> {
    fn send_packet(&mut self, packet: CanPacket) -> UdsResult<CanPacketRecord> {
        log!(self.level, "send_packet({packet:?})");
        let result = self.inner.send_packet(packet);
        self.log_result("send_packet", result)
    }

    fn receive_packet(&mut self, timeout: Option<Duration>) -> UdsResult<CanPacketRecord> {
        log!(self.level, "receive_packet(timeout: {timeout:?})");
        let result = self.inner.receive_packet(timeout);
        self.log_result("receive_packet", result)
    }

    fn send_message(&mut self, message: &UdsMessage) -> UdsResult<UdsMessageRecord> {
        log!(self.level, "send_message({message:?})");
        let result = self.inner.send_message(message);
        self.log_result("send_message", result)
    }

    fn receive_message(&mut self, timeout: Option<Duration>) -> UdsResult<UdsMessageRecord> {
        log!(self.level, "receive_message(timeout: {timeout:?})");
        let result = self.inner.receive_message(timeout);
        self.log_result("receive_message", result)
    }

    fn clear_frames_buffers(&mut self) {
        log!(self.level, "clear_frames_buffers()");
        self.inner.clear_frames_buffers()
    }

    fn measured_timing(&self) -> TimingParameters {
        self.inner.measured_timing()
    }
}

#[async_trait]
impl<T: AsyncTransportInterface> AsyncTransportInterface for LoggedTransportInterface<T> {
    async fn async_send_packet(&mut self, packet: CanPacket) -> UdsResult<CanPacketRecord> {
        log!(self.level, "async_send_packet({packet:?})");
        let result = self.inner.async_send_packet(packet).await;
        self.log_result("async_send_packet", result)
    }

    async fn async_receive_packet(
        &mut self,
        timeout: Option<Duration>,
    ) -> UdsResult<CanPacketRecord> {
        log!(self.level, "async_receive_packet(timeout: {timeout:?})");
        let result = self.inner.async_receive_packet(timeout).await;
        self.log_result("async_receive_packet", result)
    }

    async fn async_send_message(&mut self, message: &UdsMessage) -> UdsResult<UdsMessageRecord> {
        log!(self.level, "async_send_message({message:?})");
        let result = self.inner.async_send_message(message).await;
        self.log_result("async_send_message", result)
    }

    async fn async_receive_message(
        &mut self,
        timeout: Option<Duration>,
    ) -> UdsResult<UdsMessageRecord> {
        log!(self.level, "async_receive_message(timeout: {timeout:?})");
        let result = self.inner.async_receive_message(timeout).await;
        self.log_result("async_receive_message", result)
    }
}
