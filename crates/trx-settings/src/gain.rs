//! Composite gain decomposition
//!
//! In [`GainMode::Auto`](crate::GainMode::Auto) the user supplies one
//! composite receive gain in dB and the control plane splits it across the
//! three analog stages. RF calibration depends on the exact split, so the
//! decomposition is a fixed deterministic derivation: fill the LNA first,
//! then the largest TIA step that fits, and put the remainder on the PGA.

use crate::settings::TiaGain;

/// Maximum LNA gain in dB
pub const LNA_MAX_DB: u32 = 30;
/// Maximum PGA gain in dB
pub const PGA_MAX_DB: u32 = 19;
/// Maximum total chain gain in dB (LNA 30 + TIA 12 + PGA 19)
pub const CHAIN_MAX_DB: u32 = 61;

/// Result of splitting a composite gain across the receive chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainDecomposition {
    /// LNA gain in dB (0..=30)
    pub lna_db: u32,
    /// TIA gain step
    pub tia: TiaGain,
    /// PGA gain in dB (0..=19)
    pub pga_db: u32,
}

impl GainDecomposition {
    /// Total gain represented by this split
    pub fn total_db(&self) -> u32 {
        self.lna_db + self.tia.as_db() as u32 + self.pga_db
    }
}

/// Split a composite gain value into the (LNA, TIA, PGA) stage triple
///
/// Values above the chain total of [`CHAIN_MAX_DB`] are clamped.
pub fn decompose_auto_gain(gain_db: u32) -> GainDecomposition {
    let mut remaining = gain_db.min(CHAIN_MAX_DB);

    let lna_db = remaining.min(LNA_MAX_DB);
    remaining -= lna_db;

    let tia = if remaining >= 12 {
        TiaGain::Step1
    } else if remaining >= 9 {
        TiaGain::Step2
    } else {
        TiaGain::Step0
    };
    remaining -= tia.as_db() as u32;

    let pga_db = remaining.min(PGA_MAX_DB);

    GainDecomposition { lna_db, tia, pga_db }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_gain() {
        let d = decompose_auto_gain(0);
        assert_eq!(d.lna_db, 0);
        assert_eq!(d.tia, TiaGain::Step0);
        assert_eq!(d.pga_db, 0);
    }

    #[test]
    fn test_gain_below_lna_range_goes_to_lna_only() {
        let d = decompose_auto_gain(24);
        assert_eq!(d.lna_db, 24);
        assert_eq!(d.tia, TiaGain::Step0);
        assert_eq!(d.pga_db, 0);
    }

    #[test]
    fn test_gain_40_split() {
        // 40 = LNA 30 + TIA step2 (9 dB) + PGA 1
        let d = decompose_auto_gain(40);
        assert_eq!(d.lna_db, 30);
        assert_eq!(d.tia, TiaGain::Step2);
        assert_eq!(d.pga_db, 1);
        assert_eq!(d.total_db(), 40);
    }

    #[test]
    fn test_gain_50_split() {
        // 50 = LNA 30 + TIA step1 (12 dB) + PGA 8
        let d = decompose_auto_gain(50);
        assert_eq!(d.lna_db, 30);
        assert_eq!(d.tia, TiaGain::Step1);
        assert_eq!(d.pga_db, 8);
        assert_eq!(d.total_db(), 50);
    }

    #[test]
    fn test_gain_clamped_to_chain_total() {
        let d = decompose_auto_gain(90);
        assert_eq!(d.lna_db, 30);
        assert_eq!(d.tia, TiaGain::Step1);
        assert_eq!(d.pga_db, 19);
        assert_eq!(d.total_db(), CHAIN_MAX_DB);
    }

    #[test]
    fn test_split_is_lossless_over_the_usable_range() {
        for g in 0..=CHAIN_MAX_DB {
            let d = decompose_auto_gain(g);
            assert_eq!(d.total_db(), g, "gain {} split lost dB", g);
            assert!(d.lna_db <= LNA_MAX_DB);
            assert!(d.pga_db <= PGA_MAX_DB);
        }
    }
}
