//! Device settings snapshot

use serde::{Deserialize, Serialize};

/// RX antenna input selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RxAntenna {
    /// Low-band input (below ~1.5 GHz)
    #[default]
    Low,
    /// High-band input
    High,
    /// Wide-band input
    Wide,
}

impl RxAntenna {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::High => "High",
            Self::Wide => "Wide",
        }
    }
}

/// TX antenna output selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TxAntenna {
    /// High-band output
    High,
    /// Wide-band output
    #[default]
    Wide,
}

impl TxAntenna {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Wide => "Wide",
        }
    }
}

/// How a receive channel's gain stages are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GainMode {
    /// A single composite gain value is decomposed into LNA/TIA/PGA
    #[default]
    Auto,
    /// Each stage gain is supplied directly
    Manual,
}

impl GainMode {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Manual => "Manual",
        }
    }
}

/// TIA gain step
///
/// The trans-impedance amplifier exposes three fixed steps addressed by
/// index. The index-to-dB mapping is a hardware calibration constant:
/// step 0 is 0 dB, step 1 is 12 dB, step 2 is 9 dB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiaGain {
    /// Step 0: 0 dB
    Step0,
    /// Step 1: 12 dB
    Step1,
    /// Step 2: 9 dB
    Step2,
}

impl Default for TiaGain {
    fn default() -> Self {
        Self::Step2
    }
}

impl TiaGain {
    /// The dB value programmed at the hardware for this step
    pub fn as_db(&self) -> f64 {
        match self {
            Self::Step0 => 0.0,
            Self::Step1 => 12.0,
            Self::Step2 => 9.0,
        }
    }

    /// The raw step index
    pub fn index(&self) -> u8 {
        match self {
            Self::Step0 => 0,
            Self::Step1 => 1,
            Self::Step2 => 2,
        }
    }
}

/// Per-channel receive settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RxChannelSettings {
    /// Gain stage control mode
    pub gain_mode: GainMode,
    /// Composite gain in dB, authoritative in [`GainMode::Auto`]
    pub gain: u32,
    /// LNA gain in dB, authoritative in [`GainMode::Manual`]
    pub lna_gain: u32,
    /// TIA gain step, authoritative in [`GainMode::Manual`]
    pub tia_gain: TiaGain,
    /// PGA gain in dB, authoritative in [`GainMode::Manual`]
    pub pga_gain: u32,
    /// Analog low-pass filter bandwidth in Hz
    pub lpf_bw: f64,
    /// LMS7 power saving profile (0 = best performance, 7 = max economy)
    pub pwr_mode: u8,
}

impl Default for RxChannelSettings {
    fn default() -> Self {
        Self {
            gain_mode: GainMode::Auto,
            gain: 50,
            lna_gain: 15,
            tia_gain: TiaGain::Step2,
            pga_gain: 16,
            lpf_bw: 4.5e6,
            pwr_mode: 4,
        }
    }
}

/// Per-channel transmit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxChannelSettings {
    /// PAD gain in dB
    pub gain: u32,
    /// Analog low-pass filter bandwidth in Hz
    pub lpf_bw: f64,
    /// LMS7 power saving profile (0 = best performance, 7 = max economy)
    pub pwr_mode: u8,
}

impl Default for TxChannelSettings {
    fn default() -> Self {
        Self {
            gain: 20,
            lpf_bw: 4.5e6,
            pwr_mode: 4,
        }
    }
}

/// Receive path settings shared by both channels, plus per-channel groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RxSettings {
    /// User-facing center frequency in Hz
    pub center_frequency: u64,
    /// Hardware decimation exponent (log2)
    pub log2_hard_decim: u32,
    /// Software decimation exponent (log2), applied by the stream worker
    pub log2_soft_decim: u32,
    /// DC offset removal in the DSP chain
    pub dc_block: bool,
    /// IQ imbalance correction in the DSP chain
    pub iq_correction: bool,
    /// NCO frequency-shift stage enabled
    pub nco_enable: bool,
    /// NCO shift in Hz, meaningful only while [`Self::nco_enable`] is set
    pub nco_frequency: i32,
    /// Antenna input path, shared by both channels
    pub antenna_path: RxAntenna,
    /// Channel A
    pub ch0: RxChannelSettings,
    /// Channel B
    pub ch1: RxChannelSettings,
}

impl Default for RxSettings {
    fn default() -> Self {
        Self {
            center_frequency: 435_000_000,
            log2_hard_decim: 2,
            log2_soft_decim: 0,
            dc_block: false,
            iq_correction: false,
            nco_enable: false,
            nco_frequency: 0,
            antenna_path: RxAntenna::Low,
            ch0: RxChannelSettings::default(),
            ch1: RxChannelSettings::default(),
        }
    }
}

/// Transmit path settings shared by both channels, plus per-channel groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxSettings {
    /// User-facing center frequency in Hz
    pub center_frequency: u64,
    /// Hardware interpolation exponent (log2)
    pub log2_hard_interp: u32,
    /// Software interpolation exponent (log2), applied by the stream worker
    pub log2_soft_interp: u32,
    /// NCO frequency-shift stage enabled
    pub nco_enable: bool,
    /// NCO shift in Hz, meaningful only while [`Self::nco_enable`] is set
    pub nco_frequency: i32,
    /// Antenna output path, shared by both channels
    pub antenna_path: TxAntenna,
    /// Channel A
    pub ch0: TxChannelSettings,
    /// Channel B
    pub ch1: TxChannelSettings,
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            center_frequency: 435_000_000,
            log2_hard_interp: 2,
            log2_soft_interp: 0,
            nco_enable: false,
            nco_frequency: 0,
            antenna_path: TxAntenna::Wide,
            ch0: TxChannelSettings::default(),
            ch1: TxChannelSettings::default(),
        }
    }
}

/// Complete settings snapshot for one device instance
///
/// One snapshot is held as "current" state by the device engine and is only
/// ever replaced wholesale after a reconciliation pass, never mutated field
/// by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MimoSettings {
    /// ADC/DAC sample rate in Hz; 0 suppresses all rate-dependent
    /// hardware programming
    pub dev_sample_rate: u32,
    /// Use the external reference clock input
    pub ext_clock: bool,
    /// External reference clock frequency in Hz (0 = auto)
    pub ext_clock_freq: u32,
    /// Receive path
    pub rx: RxSettings,
    /// Transmit path
    pub tx: TxSettings,
}

impl Default for MimoSettings {
    fn default() -> Self {
        Self {
            dev_sample_rate: 5_000_000,
            ext_clock: false,
            ext_clock_freq: 0,
            rx: RxSettings::default(),
            tx: TxSettings::default(),
        }
    }
}

impl MimoSettings {
    /// Effective RX stream rate after software decimation
    pub fn rx_stream_rate(&self) -> u32 {
        self.dev_sample_rate >> self.rx.log2_soft_decim
    }

    /// Effective TX stream rate after software interpolation
    pub fn tx_stream_rate(&self) -> u32 {
        self.dev_sample_rate >> self.tx.log2_soft_interp
    }

    /// Master clock for the RX rate call, derived from the hardware
    /// decimation exponent; 0 lets the device auto-select
    pub fn rx_master_clock(&self) -> f64 {
        if self.rx.log2_hard_decim == 0 {
            0.0
        } else {
            self.dev_sample_rate as f64 * 4.0 * (1u64 << self.rx.log2_hard_decim) as f64
        }
    }

    /// Master clock for the TX rate call, derived from the hardware
    /// interpolation exponent; 0 lets the device auto-select
    pub fn tx_master_clock(&self) -> f64 {
        if self.tx.log2_hard_interp == 0 {
            0.0
        } else {
            self.dev_sample_rate as f64 * 4.0 * (1u64 << self.tx.log2_hard_interp) as f64
        }
    }

    /// Active RX NCO shift in Hz (0 while disabled)
    pub fn rx_nco_shift(&self) -> i32 {
        if self.rx.nco_enable {
            self.rx.nco_frequency
        } else {
            0
        }
    }

    /// Active TX NCO shift in Hz (0 while disabled)
    pub fn tx_nco_shift(&self) -> i32 {
        if self.tx.nco_enable {
            self.tx.nco_frequency
        } else {
            0
        }
    }

    /// Format a frequency for display
    pub fn frequency_display(hz: u64) -> String {
        format!("{:.3} MHz", hz as f64 / 1_000_000.0)
    }
}
