//! Time source used to timestamp packets
//!
//! Bus drivers timestamp received frames with their own clock, usually as time since some
//! driver specific epoch. A [TimeSource] turns those timestamps into [Instant]s on the local
//! monotonic clock so they can be compared with deadlines.

use std::{
    fmt::Debug,
    sync::OnceLock,
    time::{Duration, Instant, SystemTime},
};

/// Source of the current time
pub trait TimeSource: Send + Sync + Debug {
    /// Current monotonic time
    fn now(&self) -> Instant;

    /// Current wall clock time
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    /// Converts a driver timestamp of a received frame to local monotonic time
    fn synchronize(&self, driver_timestamp: Duration) -> Instant;
}

/// Time source using the operating system clocks.
///
/// The offset between the driver clock and [Instant] is calibrated with the first timestamp
/// which is synchronized, and reused afterwards.
#[derive(Debug, Default)]
pub struct SystemTimeSource {
    offset: OnceLock<(Instant, Duration)>,
}

impl SystemTimeSource {
    /// Creates an uncalibrated time source
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn synchronize(&self, driver_timestamp: Duration) -> Instant {
        let (base, driver_base) = *self.offset.get_or_init(|| {
            log::debug!("Calibrating driver clock at {driver_timestamp:?}");
            (Instant::now(), driver_timestamp)
        });
        match driver_timestamp.checked_sub(driver_base) {
            Some(elapsed) => base + elapsed,
            None => base.checked_sub(driver_base - driver_timestamp).unwrap_or(base),
        }
    }
}
