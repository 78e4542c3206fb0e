//! Simulated CAN bus for bench testing transport interfaces without hardware

use std::{
    sync::{Mutex, mpsc},
    time::Duration,
};

use crate::channel::{CanBus, CanFrame, ChannelError, ChannelResult};

/// One end of an in-memory point to point CAN bus.
///
/// Frames sent on one end are received on the other end in order. Every sent frame is also
/// kept in a log which tests can inspect.
#[derive(Debug)]
pub struct VirtualCanBus {
    name: String,
    tx: mpsc::Sender<CanFrame>,
    rx: Mutex<mpsc::Receiver<CanFrame>>,
    send_delay: Option<Duration>,
    sent: Mutex<Vec<CanFrame>>,
}

impl VirtualCanBus {
    /// Creates both ends of a bus
    pub fn pair(name1: &str, name2: &str) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel();
        let (tx2, rx2) = mpsc::channel();
        (Self::new(name1, tx1, rx2), Self::new(name2, tx2, rx1))
    }

    fn new(name: &str, tx: mpsc::Sender<CanFrame>, rx: mpsc::Receiver<CanFrame>) -> Self {
        Self {
            name: name.to_string(),
            tx,
            rx: Mutex::new(rx),
            send_delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Delays the confirmation of every sent frame, like a congested bus would
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Name of this end
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every frame sent on this end so far
    pub fn sent_frames(&self) -> Vec<CanFrame> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Clears the log of sent frames
    pub fn clear_sent_frames(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl CanBus for VirtualCanBus {
    fn send(&self, frame: &CanFrame) -> ChannelResult<()> {
        frame.validate()?;
        if let Some(delay) = self.send_delay {
            std::thread::sleep(delay);
        }
        self.tx
            .send(frame.clone())
            .map_err(|_| ChannelError::InterfaceNotOpen)?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(frame.clone());
        }
        log::trace!(
            "{}: {:#X} {:02X?}",
            self.name,
            frame.get_address(),
            frame.get_data()
        );
        Ok(())
    }

    fn recv(&self) -> ChannelResult<Option<CanFrame>> {
        let rx = self.rx.lock().map_err(|_| ChannelError::InterfaceNotOpen)?;
        Ok(rx.try_recv().ok())
    }
}
