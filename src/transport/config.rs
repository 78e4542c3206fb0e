//! Transport interface configuration and measured timing

use std::time::Duration;

use crate::{
    TimingParameter, UdsError, UdsResult,
    packet::{DEFAULT_FILLER_BYTE, dlc},
};

/// Default value of the N_As, N_Ar, N_Bs and N_Cr timeouts
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Transport interface configuration
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportConfig {
    /// DLC of full frames. 8 for classical CAN, 9-15 for CAN-FD
    pub dlc: u8,
    /// Use the shortest DLC for frames which are not full
    pub use_data_optimization: bool,
    /// Value of padding bytes
    pub filler_byte: u8,
    /// Time allowed for the bus to confirm a frame sent by the sender
    pub n_as_timeout: Duration,
    /// Time allowed for the bus to confirm a frame sent by the receiver
    pub n_ar_timeout: Duration,
    /// Time the sender waits for a Flow Control
    pub n_bs_timeout: Duration,
    /// Time the receiver waits for the next Consecutive Frame
    pub n_cr_timeout: Duration,
    /// Delay before the receiver sends a Flow Control
    pub n_br: Duration,
    /// Delay before the sender sends each Consecutive Frame. `None` only applies the STmin
    /// requested by the receiver
    pub n_cs: Option<Duration>,
    /// Number of received frames each buffer keeps. Oldest frames are dropped first
    pub buffer_capacity: usize,
    /// Time the listener sleeps when the bus has no frames pending
    pub poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dlc: dlc::MIN_BASE_UDS_DLC,
            use_data_optimization: false,
            filler_byte: DEFAULT_FILLER_BYTE,
            n_as_timeout: DEFAULT_TIMEOUT,
            n_ar_timeout: DEFAULT_TIMEOUT,
            n_bs_timeout: DEFAULT_TIMEOUT,
            n_cr_timeout: DEFAULT_TIMEOUT,
            n_br: Duration::ZERO,
            n_cs: None,
            buffer_capacity: 1024,
            poll_interval: Duration::from_millis(1),
        }
    }
}

impl TransportConfig {
    /// Checks every value is within its permitted range
    pub fn validate(&self) -> UdsResult<()> {
        if !(dlc::MIN_BASE_UDS_DLC..=dlc::MAX_DLC).contains(&self.dlc) {
            return Err(UdsError::InvalidValue(format!(
                "DLC must be in range {}-{}, got {}",
                dlc::MIN_BASE_UDS_DLC,
                dlc::MAX_DLC,
                self.dlc
            )));
        }
        for (name, value) in [
            (TimingParameter::NAs, self.n_as_timeout),
            (TimingParameter::NAr, self.n_ar_timeout),
            (TimingParameter::NBs, self.n_bs_timeout),
            (TimingParameter::NCr, self.n_cr_timeout),
        ] {
            if value.is_zero() {
                return Err(UdsError::InvalidValue(format!(
                    "{name} timeout must be greater than 0"
                )));
            }
        }
        if self.buffer_capacity == 0 {
            return Err(UdsError::InvalidValue(
                "buffer capacity must be greater than 0".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(UdsError::InvalidValue(
                "poll interval must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Upper limit for N_Br. Flow Control sent later risks an N_Bs timeout on the sender
    pub fn n_br_max(&self, n_ar_measured: Option<Duration>) -> Duration {
        (self.n_bs_timeout * 9 / 10).saturating_sub(n_ar_measured.unwrap_or_default())
    }

    /// Upper limit for N_Cs. Consecutive Frames sent later risk an N_Cr timeout on the receiver
    pub fn n_cs_max(&self, n_as_measured: Option<Duration>) -> Duration {
        (self.n_cr_timeout * 9 / 10).saturating_sub(n_as_measured.unwrap_or_default())
    }
}

/// Timing values measured during the last exchange. `None` until measured
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TimingParameters {
    /// Time the bus took to confirm the last frame sent by the sender
    pub n_as: Option<Duration>,
    /// Time the bus took to confirm the last Flow Control sent by the receiver
    pub n_ar: Option<Duration>,
    /// Time between the last First Frame or block and its Flow Control
    pub n_bs: Option<Duration>,
    /// Time between the last two received Consecutive Frames
    pub n_cr: Option<Duration>,
}

impl TimingParameters {
    /// Takes over every value measured in `other`
    pub(crate) fn update(&mut self, other: &TimingParameters) {
        self.n_as = other.n_as.or(self.n_as);
        self.n_ar = other.n_ar.or(self.n_ar);
        self.n_bs = other.n_bs.or(self.n_bs);
        self.n_cr = other.n_cr.or(self.n_cr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TransportConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.dlc, 8);
        assert_eq!(cfg.filler_byte, 0xCC);
        assert_eq!(cfg.n_bs_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn invalid_values() {
        let cfg = TransportConfig {
            dlc: 7,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(UdsError::InvalidValue(_))));
        let cfg = TransportConfig {
            n_cr_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(UdsError::InvalidValue(_))));
        let cfg = TransportConfig {
            buffer_capacity: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pacing_limits() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.n_br_max(None), Duration::from_millis(900));
        assert_eq!(
            cfg.n_br_max(Some(Duration::from_millis(100))),
            Duration::from_millis(800)
        );
        assert_eq!(
            cfg.n_cs_max(Some(Duration::from_secs(2))),
            Duration::ZERO
        );
    }
}
