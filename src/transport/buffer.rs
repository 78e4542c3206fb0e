//! Received frame buffers and the background bus listener

use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant, SystemTime},
};

use log::{debug, trace, warn};
use tokio::sync::Notify;

use crate::{channel::CanBus, channel::CanFrame, clock::TimeSource};

/// A frame taken off the bus, with its reception time
#[derive(Debug, Clone)]
pub(crate) struct ReceivedFrame {
    pub frame: CanFrame,
    pub time: Instant,
    pub wall_clock_time: SystemTime,
}

/// Bounded FIFO of received frames. Blocking consumers wait on a condition variable, async
/// consumers on a [Notify]. Deadlines are measured with the time source of the interface.
#[derive(Debug)]
pub(crate) struct FrameBuffer {
    name: &'static str,
    capacity: usize,
    time_source: Arc<dyn TimeSource>,
    frames: Mutex<VecDeque<ReceivedFrame>>,
    overflowing: AtomicBool,
    available: Condvar,
    notify: Notify,
}

impl FrameBuffer {
    pub fn new(name: &'static str, capacity: usize, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            name,
            capacity,
            time_source,
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            overflowing: AtomicBool::new(false),
            available: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Time left until `deadline`, `None` once it passed
    fn remaining(&self, deadline: Instant) -> Option<Duration> {
        deadline
            .checked_duration_since(self.time_source.now())
            .filter(|remaining| !remaining.is_zero())
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ReceivedFrame>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, frame: ReceivedFrame) {
        {
            let mut frames = self.lock();
            if frames.len() >= self.capacity {
                if let Some(dropped) = frames.pop_front() {
                    // Only the first dropped frame of an overflow is worth a warning
                    if self.overflowing.swap(true, Ordering::Relaxed) {
                        trace!(
                            "{} buffer full, dropping frame {:#X}",
                            self.name,
                            dropped.frame.get_address()
                        );
                    } else {
                        warn!(
                            "{} buffer full, dropping frame {:#X} {:02X?}",
                            self.name,
                            dropped.frame.get_address(),
                            dropped.frame.get_data()
                        );
                    }
                }
            } else {
                self.overflowing.store(false, Ordering::Relaxed);
            }
            frames.push_back(frame);
        }
        self.available.notify_all();
        self.notify.notify_one();
    }

    pub fn pop(&self) -> Option<ReceivedFrame> {
        self.lock().pop_front()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Waits for a frame until `deadline`. Waits forever without a deadline
    pub fn wait_pop(&self, deadline: Option<Instant>) -> Option<ReceivedFrame> {
        let mut frames = self.lock();
        loop {
            if let Some(frame) = frames.pop_front() {
                return Some(frame);
            }
            frames = match deadline {
                Some(deadline) => {
                    let remaining = self.remaining(deadline)?;
                    self.available
                        .wait_timeout(frames, remaining)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
                None => self
                    .available
                    .wait(frames)
                    .unwrap_or_else(|e| e.into_inner()),
            };
        }
    }

    /// Async version of [FrameBuffer::wait_pop]
    pub async fn wait_pop_async(&self, deadline: Option<Instant>) -> Option<ReceivedFrame> {
        loop {
            if let Some(frame) = self.pop() {
                return Some(frame);
            }
            let notified = self.notify.notified();
            match deadline {
                Some(deadline) => {
                    let Some(remaining) = self.remaining(deadline) else {
                        return self.pop();
                    };
                    // A timeout elapsing just re-checks the deadline
                    let _ = tokio::time::timeout(remaining, notified).await;
                }
                None => notified.await,
            }
        }
    }
}

/// Background thread copying every frame received on the bus into the frame buffers
#[derive(Debug)]
pub(crate) struct FrameListener {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameListener {
    pub fn spawn<B: CanBus + 'static>(
        bus: Arc<B>,
        buffers: Vec<Arc<FrameBuffer>>,
        time_source: Arc<dyn TimeSource>,
        poll_interval: Duration,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_c = running.clone();
        let handle = std::thread::spawn(move || {
            debug!("Frame listener started");
            while running_c.load(Ordering::Relaxed) {
                match bus.recv() {
                    Ok(Some(frame)) => {
                        let time = match frame.get_timestamp() {
                            Some(ts) => time_source.synchronize(ts),
                            None => time_source.now(),
                        };
                        let received = ReceivedFrame {
                            frame,
                            time,
                            wall_clock_time: time_source.system_time(),
                        };
                        for buffer in &buffers {
                            buffer.push(received.clone());
                        }
                    }
                    Ok(None) => std::thread::sleep(poll_interval),
                    Err(e) => {
                        warn!("Reading from bus failed: {e}");
                        std::thread::sleep(poll_interval);
                    }
                }
            }
            debug!("Frame listener stopped");
        });
        Self {
            running,
            handle: Some(handle),
        }
    }
}

impl Drop for FrameListener {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemTimeSource;

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

    fn buffer(capacity: usize) -> FrameBuffer {
        FrameBuffer::new("test", capacity, Arc::new(SystemTimeSource::new()))
    }

    fn frame(id: u32) -> ReceivedFrame {
        ReceivedFrame {
            frame: CanFrame::new(id, &[0x01, 0x3E], false),
            time: Instant::now(),
            wall_clock_time: SystemTime::now(),
        }
    }

    #[test]
    fn drops_oldest_when_full() {
        let buffer = buffer(2);
        buffer.push(frame(1));
        buffer.push(frame(2));
        buffer.push(frame(3));
        buffer.push(frame(4));
        assert!(buffer.overflowing.load(Ordering::Relaxed));
        assert_eq!(buffer.pop().unwrap().frame.get_address(), 3);
        assert_eq!(buffer.pop().unwrap().frame.get_address(), 4);
        assert!(buffer.pop().is_none());
        buffer.push(frame(5));
        assert!(!buffer.overflowing.load(Ordering::Relaxed));
    }

    #[test]
    fn wait_pop_times_out() {
        let buffer = buffer(2);
        let start = Instant::now();
        assert!(
            buffer
                .wait_pop(Some(start + Duration::from_millis(50)))
                .is_none()
        );
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn wait_pop_uses_time_source() {
        let clock = Arc::new(LaggingClock(Duration::from_millis(500)));
        let buffer = FrameBuffer::new("test", 2, clock.clone());
        let start = Instant::now();
        assert!(
            buffer
                .wait_pop(Some(clock.now() + Duration::from_millis(100)))
                .is_none()
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn wait_pop_wakes_on_push() {
        let buffer = Arc::new(buffer(2));
        let b = buffer.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            b.push(frame(0x7E8));
        });
        let f = buffer.wait_pop(Some(Instant::now() + Duration::from_secs(2)));
        assert_eq!(f.unwrap().frame.get_address(), 0x7E8);
        t.join().unwrap();
    }

    #[tokio::test]
    async fn async_wait_pop() {
        let buffer = Arc::new(buffer(2));
        let start = Instant::now();
        assert!(
            buffer
                .wait_pop_async(Some(start + Duration::from_millis(30)))
                .await
                .is_none()
        );
        assert!(start.elapsed() >= Duration::from_millis(30));

        let b = buffer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            b.push(frame(0x7E8));
        });
        let f = buffer
            .wait_pop_async(Some(Instant::now() + Duration::from_secs(2)))
            .await;
        assert!(f.is_some());
    }

    #[tokio::test]
    async fn async_wait_pop_uses_time_source() {
        let clock = Arc::new(LaggingClock(Duration::from_millis(500)));
        let buffer = FrameBuffer::new("test", 2, clock.clone());
        let start = Instant::now();
        assert!(
            buffer
                .wait_pop_async(Some(clock.now() + Duration::from_millis(100)))
                .await
                .is_none()
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(500));
    }
}
