//! Versioned settings blob
//!
//! The snapshot persists as a one-byte format version tag followed by a
//! JSON payload. Decoding is strict: an unknown version or a malformed
//! payload is an error, and the caller is expected to reset to defaults
//! rather than keep a half-decoded snapshot.

use crate::error::SettingsError;
use crate::settings::MimoSettings;

/// Current blob format version
pub const SETTINGS_BLOB_VERSION: u8 = 1;

/// Encode a snapshot into the versioned blob format
pub fn serialize(settings: &MimoSettings) -> Vec<u8> {
    // Serializing a plain value struct into JSON cannot fail
    let payload = serde_json::to_vec(settings).expect("settings serialize");

    let mut blob = Vec::with_capacity(payload.len() + 1);
    blob.push(SETTINGS_BLOB_VERSION);
    blob.extend_from_slice(&payload);
    blob
}

/// Decode a versioned blob back into a snapshot
pub fn deserialize(data: &[u8]) -> Result<MimoSettings, SettingsError> {
    let (&version, payload) = data.split_first().ok_or(SettingsError::Empty)?;

    if version != SETTINGS_BLOB_VERSION {
        return Err(SettingsError::UnsupportedVersion(version));
    }

    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{GainMode, RxAntenna, TiaGain, TxAntenna};
    use proptest::prelude::*;

    #[test]
    fn test_round_trip_defaults() {
        let s = MimoSettings::default();
        let blob = serialize(&s);
        assert_eq!(blob[0], SETTINGS_BLOB_VERSION);
        assert_eq!(deserialize(&blob).unwrap(), s);
    }

    #[test]
    fn test_empty_blob_rejected() {
        assert!(matches!(deserialize(&[]), Err(SettingsError::Empty)));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut blob = serialize(&MimoSettings::default());
        blob[0] = 0x7f;
        assert!(matches!(
            deserialize(&blob),
            Err(SettingsError::UnsupportedVersion(0x7f))
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let blob = serialize(&MimoSettings::default());
        assert!(deserialize(&blob[..blob.len() / 2]).is_err());
    }

    fn arb_settings() -> impl Strategy<Value = MimoSettings> {
        (
            (
                0u32..120_000_000,
                any::<bool>(),
                0u32..40_000_000,
                0u64..4_000_000_000,
                0u32..6,
                0u32..6,
            ),
            (
                any::<bool>(),
                any::<bool>(),
                any::<bool>(),
                -2_000_000i32..2_000_000,
                prop_oneof![
                    Just(RxAntenna::Low),
                    Just(RxAntenna::High),
                    Just(RxAntenna::Wide)
                ],
                prop_oneof![Just(TxAntenna::High), Just(TxAntenna::Wide)],
            ),
            (
                prop_oneof![Just(GainMode::Auto), Just(GainMode::Manual)],
                0u32..70,
                0u32..30,
                prop_oneof![
                    Just(TiaGain::Step0),
                    Just(TiaGain::Step1),
                    Just(TiaGain::Step2)
                ],
                0u32..19,
                0u8..8,
            ),
            (0u64..4_000_000_000, 0u32..6, 0u32..6, 0u32..52, 0u8..8),
        )
            .prop_map(
                |(
                    (rate, ext_clock, ext_clock_freq, rx_freq, hard_decim, soft_decim),
                    (dc_block, iq_correction, nco_enable, nco_freq, rx_ant, tx_ant),
                    (gain_mode, gain, lna, tia, pga, pwr_mode),
                    (tx_freq, hard_interp, soft_interp, pad_gain, tx_pwr_mode),
                )| {
                    let mut s = MimoSettings::default();
                    s.dev_sample_rate = rate;
                    s.ext_clock = ext_clock;
                    s.ext_clock_freq = ext_clock_freq;
                    s.rx.center_frequency = rx_freq;
                    s.rx.log2_hard_decim = hard_decim;
                    s.rx.log2_soft_decim = soft_decim;
                    s.rx.dc_block = dc_block;
                    s.rx.iq_correction = iq_correction;
                    s.rx.nco_enable = nco_enable;
                    s.rx.nco_frequency = nco_freq;
                    s.rx.antenna_path = rx_ant;
                    s.rx.ch0.gain_mode = gain_mode;
                    s.rx.ch0.gain = gain;
                    s.rx.ch1.lna_gain = lna;
                    s.rx.ch1.tia_gain = tia;
                    s.rx.ch1.pga_gain = pga;
                    s.rx.ch0.pwr_mode = pwr_mode;
                    s.tx.center_frequency = tx_freq;
                    s.tx.log2_hard_interp = hard_interp;
                    s.tx.log2_soft_interp = soft_interp;
                    s.tx.ch0.gain = pad_gain;
                    s.tx.ch1.pwr_mode = tx_pwr_mode;
                    s
                },
            )
    }

    proptest! {
        #[test]
        fn round_trip_any_snapshot(s in arb_settings()) {
            let blob = serialize(&s);
            prop_assert_eq!(deserialize(&blob).unwrap(), s);
        }
    }
}
