//! Simulated capability port
//!
//! A recording fake: every call is appended to a shared log with its
//! parameters, and any operation can be made to fail once or persistently.
//! No cross-parameter hardware physics are modeled; tests assert on the
//! call sequence, not on simulated RF state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use trx_engine::{CapabilityPort, Channel, Direction, GainStage, HardwareError, HwResult};
use trx_settings::{RxAntenna, TxAntenna};

/// Status code returned by injected failures
const SIM_FAILURE_CODE: i32 = -1;

/// One recorded hardware call
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    /// Reference clock selection
    ReferenceClock {
        /// External source selected
        external: bool,
        /// External clock frequency (0 = auto)
        freq_hz: u32,
    },
    /// Converter sample rate programming
    SampleRate {
        /// Converter rate in Hz
        rate_hz: f64,
        /// Master clock in Hz (0 = auto)
        master_clock_hz: f64,
        /// TX converter if true
        for_tx: bool,
    },
    /// LO tune
    Tune {
        /// Direction tuned
        direction: Direction,
        /// Tuned frequency in Hz
        freq_hz: u64,
    },
    /// NCO programming
    TuneNco {
        /// Direction programmed
        direction: Direction,
        /// NCO shift in Hz (0 disables)
        freq_hz: i64,
    },
    /// RX antenna selection
    RxAntenna(RxAntenna),
    /// TX antenna selection
    TxAntenna(TxAntenna),
    /// Gain stage write
    Gain {
        /// Channel addressed
        channel: Channel,
        /// Stage addressed
        stage: GainStage,
        /// Gain in dB
        gain_db: f64,
    },
    /// LPF bandwidth calibration
    LpfBandwidth {
        /// Channel addressed
        channel: Channel,
        /// Direction addressed
        direction: Direction,
        /// Bandwidth in Hz
        bw_hz: f64,
    },
    /// Power profile write
    PowerMode {
        /// Channel addressed
        channel: Channel,
        /// Direction addressed
        direction: Direction,
        /// Profile value
        mode: u8,
    },
    /// DC block / IQ correction configuration
    Corrections {
        /// DC block enabled
        dc_block: bool,
        /// IQ correction enabled
        iq_correction: bool,
    },
}

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    /// `set_reference_clock`
    ReferenceClock,
    /// `set_sample_rate`
    SampleRate,
    /// `tune`
    Tune,
    /// `tune_nco`
    TuneNco,
    /// `set_rx_antenna` / `set_tx_antenna`
    Antenna,
    /// `set_gain_stage`
    Gain,
    /// `set_lpf_bandwidth`
    LpfBandwidth,
    /// `set_power_mode`
    PowerMode,
    /// `set_corrections`
    Corrections,
}

#[derive(Debug, Default)]
struct SimState {
    calls: Vec<SimCall>,
    fail_once: HashSet<SimOp>,
    fail_always: HashSet<SimOp>,
    board_temperature_c: f64,
    gps_locked: bool,
    rx_fifo_level: u64,
    tx_fifo_level: u64,
}

impl SimState {
    fn should_fail(&mut self, op: SimOp) -> bool {
        if self.fail_once.remove(&op) {
            return true;
        }
        self.fail_always.contains(&op)
    }
}

/// In-memory capability port
#[derive(Debug)]
pub struct SimPort {
    state: Arc<Mutex<SimState>>,
}

/// Test-side handle to a [`SimPort`]'s recorded state
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimPort {
    /// Create a port and its paired handle
    pub fn new() -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SimState {
            board_temperature_c: 42.0,
            ..SimState::default()
        }));

        (
            Self {
                state: state.clone(),
            },
            SimHandle { state },
        )
    }

    fn record(&self, op: SimOp, opname: &'static str, call: SimCall) -> HwResult {
        let mut state = self.state.lock().unwrap();
        if state.should_fail(op) {
            debug!("sim: injected failure for {}", opname);
            return Err(HardwareError::new(opname, SIM_FAILURE_CODE));
        }
        state.calls.push(call);
        Ok(())
    }
}

impl SimHandle {
    /// All recorded calls, in execution order
    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Discard the recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make the next call of one operation fail
    pub fn fail_next(&self, op: SimOp) {
        self.state.lock().unwrap().fail_once.insert(op);
    }

    /// Make every call of one operation fail until cleared
    pub fn fail_all(&self, op: SimOp) {
        self.state.lock().unwrap().fail_always.insert(op);
    }

    /// Remove all failure injection
    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_once.clear();
        state.fail_always.clear();
    }

    /// Set the reported board temperature
    pub fn set_board_temperature(&self, celsius: f64) {
        self.state.lock().unwrap().board_temperature_c = celsius;
    }

    /// Set the reported GPS lock status
    pub fn set_gps_locked(&self, locked: bool) {
        self.state.lock().unwrap().gps_locked = locked;
    }

    /// Set the reported hardware FIFO levels
    pub fn set_fifo_levels(&self, rx: u64, tx: u64) {
        let mut state = self.state.lock().unwrap();
        state.rx_fifo_level = rx;
        state.tx_fifo_level = tx;
    }
}

impl CapabilityPort for SimPort {
    fn set_reference_clock(&mut self, external: bool, freq_hz: u32) -> HwResult {
        self.record(
            SimOp::ReferenceClock,
            "set_reference_clock",
            SimCall::ReferenceClock { external, freq_hz },
        )
    }

    fn set_sample_rate(&mut self, rate_hz: f64, master_clock_hz: f64, for_tx: bool) -> HwResult {
        self.record(
            SimOp::SampleRate,
            "set_sample_rate",
            SimCall::SampleRate {
                rate_hz,
                master_clock_hz,
                for_tx,
            },
        )
    }

    fn tune(&mut self, direction: Direction, freq_hz: u64) -> HwResult {
        self.record(
            SimOp::Tune,
            "tune",
            SimCall::Tune { direction, freq_hz },
        )
    }

    fn tune_nco(&mut self, direction: Direction, freq_hz: i64) -> HwResult {
        self.record(
            SimOp::TuneNco,
            "tune_nco",
            SimCall::TuneNco { direction, freq_hz },
        )
    }

    fn set_rx_antenna(&mut self, path: RxAntenna) -> HwResult {
        self.record(SimOp::Antenna, "set_rx_antenna", SimCall::RxAntenna(path))
    }

    fn set_tx_antenna(&mut self, path: TxAntenna) -> HwResult {
        self.record(SimOp::Antenna, "set_tx_antenna", SimCall::TxAntenna(path))
    }

    fn set_gain_stage(&mut self, channel: Channel, stage: GainStage, gain_db: f64) -> HwResult {
        self.record(
            SimOp::Gain,
            "set_gain_stage",
            SimCall::Gain {
                channel,
                stage,
                gain_db,
            },
        )
    }

    fn set_lpf_bandwidth(
        &mut self,
        channel: Channel,
        direction: Direction,
        bw_hz: f64,
    ) -> HwResult {
        self.record(
            SimOp::LpfBandwidth,
            "set_lpf_bandwidth",
            SimCall::LpfBandwidth {
                channel,
                direction,
                bw_hz,
            },
        )
    }

    fn set_power_mode(&mut self, channel: Channel, direction: Direction, mode: u8) -> HwResult {
        self.record(
            SimOp::PowerMode,
            "set_power_mode",
            SimCall::PowerMode {
                channel,
                direction,
                mode,
            },
        )
    }

    fn set_corrections(&mut self, dc_block: bool, iq_correction: bool) -> HwResult {
        self.record(
            SimOp::Corrections,
            "set_corrections",
            SimCall::Corrections {
                dc_block,
                iq_correction,
            },
        )
    }

    fn fifo_levels(&mut self) -> Result<(u64, u64), HardwareError> {
        let state = self.state.lock().unwrap();
        Ok((state.rx_fifo_level, state.tx_fifo_level))
    }

    fn board_temperature(&mut self) -> Result<f64, HardwareError> {
        Ok(self.state.lock().unwrap().board_temperature_c)
    }

    fn gps_locked(&mut self) -> Result<bool, HardwareError> {
        Ok(self.state.lock().unwrap().gps_locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_recorded_in_order() {
        let (mut port, handle) = SimPort::new();

        port.tune(Direction::Rx, 435_000_000).unwrap();
        port.tune_nco(Direction::Rx, 100_000).unwrap();

        assert_eq!(
            handle.calls(),
            vec![
                SimCall::Tune {
                    direction: Direction::Rx,
                    freq_hz: 435_000_000
                },
                SimCall::TuneNco {
                    direction: Direction::Rx,
                    freq_hz: 100_000
                },
            ]
        );
    }

    #[test]
    fn test_fail_next_fails_once() {
        let (mut port, handle) = SimPort::new();
        handle.fail_next(SimOp::Tune);

        let err = port.tune(Direction::Rx, 1_000_000).unwrap_err();
        assert_eq!(err.op, "tune");
        assert_eq!(err.code, SIM_FAILURE_CODE);

        // Second attempt succeeds and is recorded
        port.tune(Direction::Rx, 1_000_000).unwrap();
        assert_eq!(handle.call_count(), 1);
    }

    #[test]
    fn test_fail_all_until_cleared() {
        let (mut port, handle) = SimPort::new();
        handle.fail_all(SimOp::Gain);

        assert!(port
            .set_gain_stage(Channel::A, GainStage::Lna, 10.0)
            .is_err());
        assert!(port
            .set_gain_stage(Channel::A, GainStage::Lna, 10.0)
            .is_err());

        handle.clear_failures();
        assert!(port.set_gain_stage(Channel::A, GainStage::Lna, 10.0).is_ok());
    }

    #[test]
    fn test_telemetry_knobs() {
        let (mut port, handle) = SimPort::new();
        handle.set_board_temperature(55.5);
        handle.set_gps_locked(true);
        handle.set_fifo_levels(1024, 2048);

        assert_eq!(port.board_temperature().unwrap(), 55.5);
        assert!(port.gps_locked().unwrap());
        assert_eq!(port.fifo_levels().unwrap(), (1024, 2048));
    }
}
