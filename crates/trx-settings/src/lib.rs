//! Settings value types for a dual-channel MIMO transceiver
//!
//! This crate provides the immutable settings snapshot that the control
//! plane diffs and applies, plus the pure helper functions that depend only
//! on snapshot values:
//!
//! - [`MimoSettings`]: every RF/DSP parameter for both RX and TX paths of
//!   a dual-channel device
//! - [`decompose_auto_gain`]: deterministic split of a composite RX gain
//!   into the LNA/TIA/PGA stage triple
//! - [`device_center_frequency`] / [`effective_center_frequency`]: the
//!   translation between the user-facing center frequency and the frequency
//!   the hardware tuner is actually set to
//! - [`serialize()`] / [`deserialize()`]: the versioned settings blob used
//!   for persistence
//!
//! # Example
//!
//! ```rust
//! use trx_settings::{GainMode, MimoSettings};
//!
//! let mut settings = MimoSettings::default();
//! settings.dev_sample_rate = 8_000_000;
//! settings.rx.ch0.gain_mode = GainMode::Auto;
//! settings.rx.ch0.gain = 40;
//!
//! assert_eq!(settings.rx_stream_rate(), 8_000_000);
//! ```

pub mod error;
pub mod freq;
pub mod gain;
pub mod serialize;
pub mod settings;

pub use error::SettingsError;
pub use freq::{device_center_frequency, effective_center_frequency, fc_shift, FcPosition};
pub use gain::{decompose_auto_gain, GainDecomposition, CHAIN_MAX_DB, LNA_MAX_DB, PGA_MAX_DB};
pub use serialize::{deserialize, serialize, SETTINGS_BLOB_VERSION};
pub use settings::{
    GainMode, MimoSettings, RxAntenna, RxChannelSettings, RxSettings, TiaGain, TxAntenna,
    TxChannelSettings, TxSettings,
};
