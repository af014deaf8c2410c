//! Hardware capability port
//!
//! The engine drives the RF front end exclusively through this trait, so a
//! real driver binding and the in-memory simulator are interchangeable.
//! Every call is synchronous, may block for hardware I/O, and returns a
//! status; no call is atomic with any other. Sequencing is the engine's
//! responsibility.

use serde::{Deserialize, Serialize};

use trx_settings::{RxAntenna, TxAntenna};

use crate::error::HardwareError;

/// Signal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Receive path
    Rx,
    /// Transmit path
    Tx,
}

impl Direction {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rx => "Rx",
            Self::Tx => "Tx",
        }
    }
}

/// Physical channel of the dual-channel front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Channel A (index 0)
    A,
    /// Channel B (index 1)
    B,
}

impl Channel {
    /// Channel from a stream index
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Self::A
        } else {
            Self::B
        }
    }

    /// Stream index for this channel
    pub fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Analog gain stage addressed by a gain write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainStage {
    /// Low-noise amplifier (RX)
    Lna,
    /// Trans-impedance amplifier (RX)
    Tia,
    /// Programmable gain amplifier (RX)
    Pga,
    /// Power amplifier driver (TX)
    Pad,
}

/// Result of a hardware capability call
pub type HwResult = Result<(), HardwareError>;

/// Abstract interface to the RF front end
///
/// Implemented by the vendor driver binding in production and by
/// `trx-sim`'s recording port in tests.
pub trait CapabilityPort: Send {
    /// Select the reference clock source; `freq_hz` is only meaningful
    /// when `external` is set
    fn set_reference_clock(&mut self, external: bool, freq_hz: u32) -> HwResult;

    /// Program the converter sample rate. `master_clock_hz` of 0 lets the
    /// device auto-select its clock generator plan.
    fn set_sample_rate(&mut self, rate_hz: f64, master_clock_hz: f64, for_tx: bool) -> HwResult;

    /// Tune the analog LO for one direction
    fn tune(&mut self, direction: Direction, freq_hz: u64) -> HwResult;

    /// Program the NCO shift for one direction; 0 disables the stage
    fn tune_nco(&mut self, direction: Direction, freq_hz: i64) -> HwResult;

    /// Select the RX antenna input (shared by both channels)
    fn set_rx_antenna(&mut self, path: RxAntenna) -> HwResult;

    /// Select the TX antenna output (shared by both channels)
    fn set_tx_antenna(&mut self, path: TxAntenna) -> HwResult;

    /// Write one analog gain stage on one channel
    fn set_gain_stage(&mut self, channel: Channel, stage: GainStage, gain_db: f64) -> HwResult;

    /// Calibrate the analog low-pass filter bandwidth of one channel
    fn set_lpf_bandwidth(&mut self, channel: Channel, direction: Direction, bw_hz: f64)
        -> HwResult;

    /// Set the power saving profile of one channel
    fn set_power_mode(&mut self, channel: Channel, direction: Direction, mode: u8) -> HwResult;

    /// Configure DC block and IQ imbalance correction together
    fn set_corrections(&mut self, dc_block: bool, iq_correction: bool) -> HwResult;

    /// Current hardware FIFO fill levels as (rx, tx)
    fn fifo_levels(&mut self) -> Result<(u64, u64), HardwareError>;

    /// Board temperature in degrees Celsius
    fn board_temperature(&mut self) -> Result<f64, HardwareError>;

    /// Whether the on-board GPS has a position/time lock
    fn gps_locked(&mut self) -> Result<bool, HardwareError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_index_round_trip() {
        assert_eq!(Channel::from_index(0), Channel::A);
        assert_eq!(Channel::from_index(1), Channel::B);
        assert_eq!(Channel::A.index(), 0);
        assert_eq!(Channel::B.index(), 1);
    }
}
