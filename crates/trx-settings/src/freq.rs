//! Baseband/RF frequency translation
//!
//! The frequency programmed at the hardware tuner is not the user-facing
//! center frequency: the DSP chain can place the band of interest next to
//! the device center instead of on it, and the NCO adds a digital shift on
//! top of the analog LO. These functions are pure so the same policy can be
//! computed for either direction and verified in isolation.

/// Where the band of interest sits relative to the device center frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcPosition {
    /// Band placed below the device center
    Infra,
    /// Band placed above the device center
    Supra,
    /// Band centered on the device center (no shift)
    Center,
}

/// Shift between the user-facing and the device center frequency, in Hz
///
/// With no software decimation/interpolation (`log2_exp == 0`) there is
/// nowhere to place an offset band, so the shift is always zero. Otherwise
/// the offset placements put the band in the adjacent half of the passband:
/// `± dev_rate / 2^(log2_exp + 1)`.
pub fn fc_shift(log2_exp: u32, fc_pos: FcPosition, dev_rate: u32) -> i64 {
    if log2_exp == 0 {
        return 0;
    }

    match fc_pos {
        FcPosition::Infra => -((dev_rate >> (log2_exp + 1)) as i64),
        FcPosition::Supra => (dev_rate >> (log2_exp + 1)) as i64,
        FcPosition::Center => 0,
    }
}

/// Frequency the hardware tuner is set to for a requested center frequency
///
/// The result is clamped at 0 Hz; the tuner cannot be programmed with a
/// negative frequency no matter how the shift falls.
pub fn device_center_frequency(
    center_hz: u64,
    log2_exp: u32,
    fc_pos: FcPosition,
    dev_rate: u32,
) -> u64 {
    let shifted = center_hz as i64 - fc_shift(log2_exp, fc_pos, dev_rate);
    shifted.max(0) as u64
}

/// Center frequency the downstream stream actually observes
///
/// The NCO shift is applied digitally after the tuner, so the effective
/// stream center is the tuned frequency plus the active NCO shift.
pub fn effective_center_frequency(center_hz: u64, nco_enable: bool, nco_hz: i32) -> i64 {
    let shift = if nco_enable { nco_hz as i64 } else { 0 };
    center_hz as i64 + shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_shift_without_soft_exponent() {
        assert_eq!(fc_shift(0, FcPosition::Infra, 5_000_000), 0);
        assert_eq!(fc_shift(0, FcPosition::Supra, 5_000_000), 0);
        assert_eq!(fc_shift(0, FcPosition::Center, 5_000_000), 0);
    }

    #[test]
    fn test_center_placement_never_shifts() {
        for exp in 0..6 {
            assert_eq!(fc_shift(exp, FcPosition::Center, 5_000_000), 0);
        }
    }

    #[test]
    fn test_offset_placements_are_symmetric() {
        // 8 MS/s, decim 2^2: band offset is 8e6 / 2^3 = 1 MHz
        assert_eq!(fc_shift(2, FcPosition::Infra, 8_000_000), -1_000_000);
        assert_eq!(fc_shift(2, FcPosition::Supra, 8_000_000), 1_000_000);
    }

    #[test]
    fn test_device_frequency_clamped_at_zero() {
        // A supra shift larger than the center frequency must not wrap
        let f = device_center_frequency(100_000, 1, FcPosition::Supra, 5_000_000);
        assert_eq!(f, 0);
    }

    #[test]
    fn test_effective_frequency_tracks_nco() {
        assert_eq!(
            effective_center_frequency(435_000_000, true, 125_000),
            435_125_000
        );
        assert_eq!(
            effective_center_frequency(435_000_000, true, -125_000),
            434_875_000
        );
        assert_eq!(
            effective_center_frequency(435_000_000, false, 125_000),
            435_000_000
        );
    }

    proptest! {
        #[test]
        fn center_placement_is_identity(
            center in 0u64..4_000_000_000u64,
            exp in 0u32..6,
            rate in 100_000u32..120_000_000,
        ) {
            prop_assert_eq!(
                device_center_frequency(center, exp, FcPosition::Center, rate),
                center
            );
        }

        #[test]
        fn infra_and_supra_mirror_each_other(
            center in 100_000_000u64..4_000_000_000u64,
            exp in 1u32..6,
            rate in 100_000u32..120_000_000,
        ) {
            let lo = device_center_frequency(center, exp, FcPosition::Infra, rate) as i64;
            let hi = device_center_frequency(center, exp, FcPosition::Supra, rate) as i64;
            prop_assert_eq!(lo + hi, 2 * center as i64);
        }
    }
}
