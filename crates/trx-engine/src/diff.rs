//! Settings diff and intent derivation
//!
//! First phase of a reconciliation pass: compare the stored snapshot with
//! the requested one field by field, then fold the changed fields into the
//! boolean intents the executor acts on. Intents are not one-to-one with
//! fields: a reference clock change invalidates both converters and both
//! tuners, either LPF bandwidth re-calibrates both channels, and the gain
//! intents depend on which gain mode is being entered.

use trx_settings::{GainMode, MimoSettings, RxChannelSettings};

/// Which gain stage writes one RX channel needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GainPlan {
    /// Decompose the composite gain and write all three stages
    pub auto: bool,
    /// Write the LNA stage from the requested value
    pub lna: bool,
    /// Write the TIA stage from the requested value
    pub tia: bool,
    /// Write the PGA stage from the requested value
    pub pga: bool,
}

impl GainPlan {
    /// Check if any stage write is required
    pub fn any(&self) -> bool {
        self.auto || self.lna || self.tia || self.pga
    }
}

/// Dependency-ordered action plan derived from one settings diff
///
/// Each flag corresponds to one step (or one small group of steps) of the
/// fixed execution order. The audit key list names every changed field for
/// external change observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Names of all changed fields, in declaration order
    pub audit_keys: Vec<&'static str>,

    /// Select reference clock source/frequency
    pub set_clock: bool,
    /// Reconfigure DC block / IQ correction (one combined call)
    pub set_corrections: bool,
    /// Select RX antenna input
    pub set_rx_antenna: bool,
    /// Select TX antenna output
    pub set_tx_antenna: bool,
    /// Per-channel power profile writes
    pub set_pwr_mode_rx0: bool,
    /// Per-channel power profile writes
    pub set_pwr_mode_rx1: bool,
    /// Per-channel power profile writes
    pub set_pwr_mode_tx0: bool,
    /// Per-channel power profile writes
    pub set_pwr_mode_tx1: bool,
    /// RX channel A gain stage writes
    pub gain_rx0: GainPlan,
    /// RX channel B gain stage writes
    pub gain_rx1: GainPlan,
    /// TX channel A PAD gain write
    pub set_pad_tx0: bool,
    /// TX channel B PAD gain write
    pub set_pad_tx1: bool,

    /// Program the RX converter rate (and master clock)
    pub rx_rate: bool,
    /// Program the TX converter rate (and master clock)
    pub tx_rate: bool,
    /// Calibrate RX LPF bandwidth, both channels
    pub rx_lpf: bool,
    /// Calibrate TX LPF bandwidth, both channels
    pub tx_lpf: bool,
    /// Retune the RX LO
    pub rx_freq: bool,
    /// Retune the TX LO
    pub tx_freq: bool,
    /// Reprogram the RX NCO
    pub rx_nco: bool,
    /// Reprogram the TX NCO
    pub tx_nco: bool,

    /// Push the new software decimation exponent to a running RX worker
    pub set_soft_decim: bool,
    /// Push the new software interpolation exponent to a running TX worker
    pub set_soft_interp: bool,
    /// Resize the TX sample FIFO for the new derived stream rate
    pub resize_tx_fifo: bool,

    /// Notify the DSP side that the RX rate/frequency chain changed
    pub forward_rx_dsp: bool,
    /// Notify the DSP side that the TX rate/frequency chain changed
    pub forward_tx_dsp: bool,
}

impl ReconcilePlan {
    /// Check whether the plan requires no action at all
    pub fn is_empty(&self) -> bool {
        self.audit_keys.is_empty()
    }
}

fn gain_plan(current: &RxChannelSettings, requested: &RxChannelSettings, force: bool) -> GainPlan {
    let mut plan = GainPlan::default();

    if current.gain_mode != requested.gain_mode || force {
        // Entering a mode (re)programs everything that mode owns
        if requested.gain_mode == GainMode::Auto {
            plan.auto = true;
        } else {
            plan.lna = true;
            plan.tia = true;
            plan.pga = true;
        }
    } else if requested.gain_mode == GainMode::Auto {
        if current.gain != requested.gain {
            plan.auto = true;
        }
    } else {
        if current.lna_gain != requested.lna_gain {
            plan.lna = true;
        }
        if current.tia_gain != requested.tia_gain {
            plan.tia = true;
        }
        if current.pga_gain != requested.pga_gain {
            plan.pga = true;
        }
    }

    plan
}

/// Derive the action plan for one reconciliation pass
///
/// Pure over the two snapshots and the force flag; whether the device is
/// actually open only matters at execution time, where hardware steps are
/// skipped wholesale.
pub fn derive_plan(current: &MimoSettings, requested: &MimoSettings, force: bool) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    macro_rules! changed {
        ($key:literal, $field:expr) => {{
            let c = $field(current) != $field(requested) || force;
            if c {
                plan.audit_keys.push($key);
            }
            c
        }};
    }

    // common

    let ext_clock = changed!("extClock", |s: &MimoSettings| s.ext_clock);
    let ext_clock_freq = changed!("extClockFreq", |s: &MimoSettings| s.ext_clock_freq);
    let dev_sample_rate = changed!("devSampleRate", |s: &MimoSettings| s.dev_sample_rate);

    // Switching the source always reprograms the clock; a frequency change
    // only matters while the external input is selected.
    plan.set_clock = ext_clock || (requested.ext_clock && ext_clock_freq);
    if plan.set_clock {
        plan.rx_rate = true;
        plan.tx_rate = true;
        plan.rx_freq = true;
        plan.tx_freq = true;
    }

    // Rx

    let dc_block = changed!("dcBlock", |s: &MimoSettings| s.rx.dc_block);
    let iq_correction = changed!("iqCorrection", |s: &MimoSettings| s.rx.iq_correction);
    plan.set_corrections = dc_block || iq_correction;

    let hard_decim = changed!("log2HardDecim", |s: &MimoSettings| s.rx.log2_hard_decim);
    if dev_sample_rate || hard_decim {
        plan.forward_rx_dsp = true;
        plan.rx_rate = true;
    }

    if changed!("log2SoftDecim", |s: &MimoSettings| s.rx.log2_soft_decim) {
        plan.forward_rx_dsp = true;
        plan.set_soft_decim = true;
    }

    let nco_freq_rx = changed!("ncoFrequencyRx", |s: &MimoSettings| s.rx.nco_frequency);
    let nco_enable_rx = changed!("ncoEnableRx", |s: &MimoSettings| s.rx.nco_enable);
    plan.rx_nco = nco_freq_rx || nco_enable_rx;

    plan.set_rx_antenna = changed!("antennaPathRx", |s: &MimoSettings| s.rx.antenna_path);

    if changed!("rxCenterFrequency", |s: &MimoSettings| s.rx.center_frequency) {
        plan.rx_freq = true;
    }

    // Rx0/1

    plan.set_pwr_mode_rx0 = changed!("pwrmodeRx0", |s: &MimoSettings| s.rx.ch0.pwr_mode);
    plan.set_pwr_mode_rx1 = changed!("pwrmodeRx1", |s: &MimoSettings| s.rx.ch1.pwr_mode);

    changed!("gainModeRx0", |s: &MimoSettings| s.rx.ch0.gain_mode);
    changed!("gainRx0", |s: &MimoSettings| s.rx.ch0.gain);
    changed!("lnaGainRx0", |s: &MimoSettings| s.rx.ch0.lna_gain);
    changed!("tiaGainRx0", |s: &MimoSettings| s.rx.ch0.tia_gain);
    changed!("pgaGainRx0", |s: &MimoSettings| s.rx.ch0.pga_gain);
    changed!("gainModeRx1", |s: &MimoSettings| s.rx.ch1.gain_mode);
    changed!("gainRx1", |s: &MimoSettings| s.rx.ch1.gain);
    changed!("lnaGainRx1", |s: &MimoSettings| s.rx.ch1.lna_gain);
    changed!("tiaGainRx1", |s: &MimoSettings| s.rx.ch1.tia_gain);
    changed!("pgaGainRx1", |s: &MimoSettings| s.rx.ch1.pga_gain);

    plan.gain_rx0 = gain_plan(&current.rx.ch0, &requested.rx.ch0, force);
    plan.gain_rx1 = gain_plan(&current.rx.ch1, &requested.rx.ch1, force);

    let lpf_rx0 = changed!("lpfBWRx0", |s: &MimoSettings| s.rx.ch0.lpf_bw);
    let lpf_rx1 = changed!("lpfBWRx1", |s: &MimoSettings| s.rx.ch1.lpf_bw);
    // Both channels are recalibrated together even if only one changed
    plan.rx_lpf = lpf_rx0 || lpf_rx1;

    // Tx

    let hard_interp = changed!("log2HardInterp", |s: &MimoSettings| s.tx.log2_hard_interp);
    if dev_sample_rate || hard_interp {
        plan.forward_tx_dsp = true;
        plan.tx_rate = true;
    }

    let soft_interp = changed!("log2SoftInterp", |s: &MimoSettings| s.tx.log2_soft_interp);
    if soft_interp {
        plan.forward_tx_dsp = true;
        plan.set_soft_interp = true;
    }
    plan.resize_tx_fifo = dev_sample_rate || soft_interp;

    let nco_freq_tx = changed!("ncoFrequencyTx", |s: &MimoSettings| s.tx.nco_frequency);
    let nco_enable_tx = changed!("ncoEnableTx", |s: &MimoSettings| s.tx.nco_enable);
    plan.tx_nco = nco_freq_tx || nco_enable_tx;

    plan.set_tx_antenna = changed!("antennaPathTx", |s: &MimoSettings| s.tx.antenna_path);

    if changed!("txCenterFrequency", |s: &MimoSettings| s.tx.center_frequency) {
        plan.tx_freq = true;
    }

    // Tx0/1

    plan.set_pwr_mode_tx0 = changed!("pwrmodeTx0", |s: &MimoSettings| s.tx.ch0.pwr_mode);
    plan.set_pwr_mode_tx1 = changed!("pwrmodeTx1", |s: &MimoSettings| s.tx.ch1.pwr_mode);
    plan.set_pad_tx0 = changed!("gainTx0", |s: &MimoSettings| s.tx.ch0.gain);
    plan.set_pad_tx1 = changed!("gainTx1", |s: &MimoSettings| s.tx.ch1.gain);

    let lpf_tx0 = changed!("lpfBWTx0", |s: &MimoSettings| s.tx.ch0.lpf_bw);
    let lpf_tx1 = changed!("lpfBWTx1", |s: &MimoSettings| s.tx.ch1.lpf_bw);
    plan.tx_lpf = lpf_tx0 || lpf_tx1;

    // An LO retune or NCO reprogram moves the effective stream center even
    // when no rate field changed
    if plan.rx_freq || plan.rx_nco {
        plan.forward_rx_dsp = true;
    }
    if plan.tx_freq || plan.tx_nco {
        plan.forward_tx_dsp = true;
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use trx_settings::TiaGain;

    #[test]
    fn test_identical_snapshots_yield_empty_plan() {
        let s = MimoSettings::default();
        let plan = derive_plan(&s, &s, false);
        assert!(plan.is_empty());
        assert_eq!(plan, ReconcilePlan::default());
    }

    #[test]
    fn test_force_marks_every_field() {
        let s = MimoSettings::default();
        let plan = derive_plan(&s, &s, true);
        // 37 snapshot fields contribute audit keys
        assert_eq!(plan.audit_keys.len(), 37);
        assert!(plan.set_clock);
        assert!(plan.rx_rate && plan.tx_rate);
        assert!(plan.rx_freq && plan.tx_freq);
        assert!(plan.rx_nco && plan.tx_nco);
        assert!(plan.rx_lpf && plan.tx_lpf);
        assert!(plan.gain_rx0.auto);
    }

    #[test]
    fn test_sample_rate_change_arms_both_directions() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.dev_sample_rate = 8_000_000;

        let plan = derive_plan(&current, &requested, false);
        assert_eq!(plan.audit_keys, vec!["devSampleRate"]);
        assert!(plan.rx_rate && plan.tx_rate);
        assert!(plan.forward_rx_dsp && plan.forward_tx_dsp);
        assert!(plan.resize_tx_fifo);
        // LO/NCO reprogramming is re-armed by a successful rate call at
        // execution time, not here
        assert!(!plan.rx_freq && !plan.rx_nco);
    }

    #[test]
    fn test_clock_change_arms_rates_and_frequencies() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.ext_clock = true;

        let plan = derive_plan(&current, &requested, false);
        assert!(plan.set_clock);
        assert!(plan.rx_rate && plan.tx_rate);
        assert!(plan.rx_freq && plan.tx_freq);
        assert!(!plan.rx_nco && !plan.tx_nco);
    }

    #[test]
    fn test_ext_clock_freq_only_matters_when_external() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.ext_clock_freq = 10_000_000;

        // Internal clock selected: frequency change recorded but no reclock
        let plan = derive_plan(&current, &requested, false);
        assert_eq!(plan.audit_keys, vec!["extClockFreq"]);
        assert!(!plan.set_clock);

        let mut current_ext = current.clone();
        current_ext.ext_clock = true;
        let mut requested_ext = requested.clone();
        requested_ext.ext_clock = true;
        let plan = derive_plan(&current_ext, &requested_ext, false);
        assert!(plan.set_clock);
    }

    #[test]
    fn test_soft_decim_change_is_dsp_only() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.rx.log2_soft_decim = 3;

        let plan = derive_plan(&current, &requested, false);
        assert!(plan.set_soft_decim);
        assert!(plan.forward_rx_dsp);
        assert!(!plan.rx_rate);
        assert!(!plan.forward_tx_dsp);
    }

    #[test]
    fn test_nco_pair_folds_into_one_intent() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.rx.nco_enable = true;
        requested.rx.nco_frequency = 100_000;

        let plan = derive_plan(&current, &requested, false);
        assert!(plan.rx_nco);
        assert!(plan.forward_rx_dsp);
        assert!(!plan.tx_nco);
        assert_eq!(plan.audit_keys, vec!["ncoFrequencyRx", "ncoEnableRx"]);
    }

    #[test]
    fn test_single_lpf_change_recalibrates_direction() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.rx.ch1.lpf_bw = 2.0e6;

        let plan = derive_plan(&current, &requested, false);
        assert!(plan.rx_lpf);
        assert!(!plan.tx_lpf);
        assert_eq!(plan.audit_keys, vec!["lpfBWRx1"]);
    }

    #[test]
    fn test_gain_mode_switch_to_auto() {
        let mut current = MimoSettings::default();
        current.rx.ch0.gain_mode = GainMode::Manual;
        let mut requested = current.clone();
        requested.rx.ch0.gain_mode = GainMode::Auto;
        requested.rx.ch0.gain = 40;

        let plan = derive_plan(&current, &requested, false);
        assert!(plan.gain_rx0.auto);
        assert!(!plan.gain_rx0.lna && !plan.gain_rx0.tia && !plan.gain_rx0.pga);
    }

    #[test]
    fn test_gain_mode_switch_to_manual_writes_all_stages() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.rx.ch0.gain_mode = GainMode::Manual;

        let plan = derive_plan(&current, &requested, false);
        assert!(!plan.gain_rx0.auto);
        assert!(plan.gain_rx0.lna && plan.gain_rx0.tia && plan.gain_rx0.pga);
    }

    #[test]
    fn test_manual_gain_writes_only_changed_stages() {
        let mut current = MimoSettings::default();
        current.rx.ch0.gain_mode = GainMode::Manual;
        let mut requested = current.clone();
        requested.rx.ch0.tia_gain = TiaGain::Step1;

        let plan = derive_plan(&current, &requested, false);
        assert_eq!(
            plan.gain_rx0,
            GainPlan {
                tia: true,
                ..GainPlan::default()
            }
        );
        // Channel B untouched
        assert!(!plan.gain_rx1.any());
    }

    #[test]
    fn test_composite_gain_change_within_auto() {
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.rx.ch0.gain = 30;

        let plan = derive_plan(&current, &requested, false);
        assert!(plan.gain_rx0.auto);
        assert!(!plan.gain_rx0.lna);
    }

    #[test]
    fn test_stage_value_change_ignored_in_auto() {
        // Stored manual stage values are not authoritative in auto mode
        let current = MimoSettings::default();
        let mut requested = current.clone();
        requested.rx.ch0.lna_gain = 7;

        let plan = derive_plan(&current, &requested, false);
        assert!(!plan.gain_rx0.any());
        assert_eq!(plan.audit_keys, vec!["lnaGainRx0"]);
    }
}
