//! Device engine
//!
//! Owns the current settings snapshot and the capability port, and turns a
//! requested snapshot into the ordered hardware call sequence. Application
//! is best-effort by design: an individual hardware failure is logged and
//! recorded but never aborts the remaining steps, and the stored snapshot
//! is always replaced wholesale at the end. Callers that care about
//! partial failure inspect the returned [`ApplyReport`] instead of relying
//! on the stored state matching the hardware.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use trx_settings::{
    decompose_auto_gain, device_center_frequency, effective_center_frequency, serialize,
    FcPosition, MimoSettings, RxChannelSettings,
};

use crate::diff::{derive_plan, GainPlan};
use crate::error::{EngineError, HardwareError};
use crate::events::DeviceEvent;
use crate::port::{CapabilityPort, Channel, Direction, GainStage};
use crate::stream::{
    fifo_size_for_rate, spawn_worker, SampleFifo, WorkerHandle, SAMPLE_FIFO_INIT_CAPACITY,
};

/// Capacity of the hardware streaming FIFO reported in stream info
pub const HARDWARE_FIFO_CAPACITY: u32 = 65_536;

/// One failed step of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    /// Name of the step that failed
    pub action: &'static str,
    /// The underlying hardware error
    pub error: HardwareError,
}

/// Outcome of one reconciliation pass
///
/// The pass as a whole always "succeeds" (the snapshot is stored); this
/// report is how partial hardware failure is surfaced to callers that want
/// to retry or display it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Names of all changed fields, for external change observers
    pub audit_keys: Vec<&'static str>,
    /// Number of hardware calls attempted
    pub attempted: usize,
    /// Steps that failed, in execution order
    pub failures: Vec<ApplyFailure>,
    /// Notifications for the DSP side, in emission order
    pub events: Vec<DeviceEvent>,
}

impl ApplyReport {
    /// Check that every attempted hardware call succeeded
    pub fn fully_applied(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The device engine for one dual-channel transceiver instance
pub struct MimoDevice {
    settings: MimoSettings,
    port: Option<Box<dyn CapabilityPort>>,
    rx_worker: Option<WorkerHandle>,
    tx_worker: Option<WorkerHandle>,
    rx_fifo: Arc<SampleFifo>,
    tx_fifo: Arc<SampleFifo>,
    // Serializes open/close/start/stop so a running worker never observes
    // a half-closed device
    transition_lock: Mutex<()>,
    fc_pos_rx: FcPosition,
    fc_pos_tx: FcPosition,
}

impl MimoDevice {
    /// Create an engine with no capability port bound
    ///
    /// All hardware-dependent steps are skipped until a port is bound, but
    /// settings can already be stored and serialized.
    pub fn closed() -> Self {
        Self {
            settings: MimoSettings::default(),
            port: None,
            rx_worker: None,
            tx_worker: None,
            rx_fifo: Arc::new(SampleFifo::new(SAMPLE_FIFO_INIT_CAPACITY)),
            tx_fifo: Arc::new(SampleFifo::new(SAMPLE_FIFO_INIT_CAPACITY)),
            transition_lock: Mutex::new(()),
            fc_pos_rx: FcPosition::Center,
            fc_pos_tx: FcPosition::Center,
        }
    }

    /// Create an engine bound to a capability port
    pub fn with_port(port: Box<dyn CapabilityPort>) -> Self {
        let mut device = Self::closed();
        device.port = Some(port);
        device
    }

    /// Bind a capability port to a previously closed engine
    pub fn open(&mut self, port: Box<dyn CapabilityPort>) {
        let _guard = self.transition_lock.lock().unwrap();
        self.port = Some(port);
        info!("device opened");
    }

    /// Stop both workers and release the capability port
    pub fn close(&mut self) {
        let _guard = self.transition_lock.lock().unwrap();
        if let Some(worker) = self.rx_worker.take() {
            worker.stop();
        }
        if let Some(worker) = self.tx_worker.take() {
            worker.stop();
        }
        self.port = None;
        info!("device closed");
    }

    /// Check if a capability port is bound
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Current settings snapshot
    pub fn settings(&self) -> &MimoSettings {
        &self.settings
    }

    /// Check if the RX stream worker is running
    pub fn running_rx(&self) -> bool {
        self.rx_worker.is_some()
    }

    /// Check if the TX stream worker is running
    pub fn running_tx(&self) -> bool {
        self.tx_worker.is_some()
    }

    /// Effective RX stream rate for a stream index (both share the rate)
    pub fn rx_sample_rate(&self, _index: usize) -> u32 {
        self.settings.rx_stream_rate()
    }

    /// Effective TX stream rate for a stream index (both share the rate)
    pub fn tx_sample_rate(&self, _index: usize) -> u32 {
        self.settings.tx_stream_rate()
    }

    /// Override the band placement scheme per direction
    pub fn set_frequency_scheme(&mut self, rx: FcPosition, tx: FcPosition) {
        self.fc_pos_rx = rx;
        self.fc_pos_tx = tx;
    }

    /// Reconcile the stored snapshot against a requested one
    ///
    /// Computes the field diff, derives the action plan, executes it in
    /// the fixed dependency order against the capability port, stores the
    /// requested snapshot, and returns the report with the notifications
    /// the caller must forward downstream.
    pub fn apply_settings(&mut self, requested: MimoSettings, force: bool) -> ApplyReport {
        let plan = derive_plan(&self.settings, &requested, force);

        debug!(
            "apply: rate {} extClock {} force {} changed [{}]",
            requested.dev_sample_rate,
            requested.ext_clock,
            force,
            plan.audit_keys.join(", ")
        );

        let mut report = ApplyReport {
            audit_keys: plan.audit_keys.clone(),
            ..ApplyReport::default()
        };

        // DSP-side updates are independent of hardware programming
        if plan.set_soft_decim {
            if let Some(worker) = &self.rx_worker {
                worker.set_soft_exponent(requested.rx.log2_soft_decim);
                debug!(
                    "soft decimation set to {} on running worker",
                    1u32 << requested.rx.log2_soft_decim
                );
            }
        }
        if plan.set_soft_interp {
            if let Some(worker) = &self.tx_worker {
                worker.set_soft_exponent(requested.tx.log2_soft_interp);
                debug!(
                    "soft interpolation set to {} on running worker",
                    1u32 << requested.tx.log2_soft_interp
                );
            }
        }
        if plan.resize_tx_fifo {
            self.tx_fifo
                .resize(fifo_size_for_rate(requested.tx_stream_rate()));
        }

        // A successful rate call resets the tuner and NCO state, so the
        // dependent intents are re-armed below on success only
        let mut rx_freq = plan.rx_freq;
        let mut rx_nco = plan.rx_nco;
        let mut tx_freq = plan.tx_freq;
        let mut tx_nco = plan.tx_nco;

        if let Some(port) = self.port.as_mut() {
            // 1. reference clock
            if plan.set_clock {
                let freq = if requested.ext_clock {
                    requested.ext_clock_freq
                } else {
                    0
                };
                if run_call(
                    &mut report,
                    "referenceClock",
                    port.set_reference_clock(requested.ext_clock, freq),
                ) {
                    debug!(
                        "clock set to {} ({} Hz)",
                        if requested.ext_clock {
                            "external"
                        } else {
                            "internal"
                        },
                        freq
                    );
                }
            }

            // 2. simple sets with no cross-dependency
            if plan.set_corrections {
                run_call(
                    &mut report,
                    "corrections",
                    port.set_corrections(requested.rx.dc_block, requested.rx.iq_correction),
                );
            }
            if plan.set_rx_antenna {
                run_call(
                    &mut report,
                    "antennaPathRx",
                    port.set_rx_antenna(requested.rx.antenna_path),
                );
            }
            if plan.set_tx_antenna {
                run_call(
                    &mut report,
                    "antennaPathTx",
                    port.set_tx_antenna(requested.tx.antenna_path),
                );
            }
            if plan.set_pwr_mode_rx0 {
                run_call(
                    &mut report,
                    "pwrmodeRx0",
                    port.set_power_mode(Channel::A, Direction::Rx, requested.rx.ch0.pwr_mode),
                );
            }
            if plan.set_pwr_mode_rx1 {
                run_call(
                    &mut report,
                    "pwrmodeRx1",
                    port.set_power_mode(Channel::B, Direction::Rx, requested.rx.ch1.pwr_mode),
                );
            }
            if plan.set_pwr_mode_tx0 {
                run_call(
                    &mut report,
                    "pwrmodeTx0",
                    port.set_power_mode(Channel::A, Direction::Tx, requested.tx.ch0.pwr_mode),
                );
            }
            if plan.set_pwr_mode_tx1 {
                run_call(
                    &mut report,
                    "pwrmodeTx1",
                    port.set_power_mode(Channel::B, Direction::Tx, requested.tx.ch1.pwr_mode),
                );
            }

            apply_rx_gains(&mut report, port.as_mut(), Channel::A, plan.gain_rx0, &requested.rx.ch0);
            apply_rx_gains(&mut report, port.as_mut(), Channel::B, plan.gain_rx1, &requested.rx.ch1);

            if plan.set_pad_tx0 {
                run_call(
                    &mut report,
                    "gainTx0",
                    port.set_gain_stage(Channel::A, GainStage::Pad, requested.tx.ch0.gain as f64),
                );
            }
            if plan.set_pad_tx1 {
                run_call(
                    &mut report,
                    "gainTx1",
                    port.set_gain_stage(Channel::B, GainStage::Pad, requested.tx.ch1.gain as f64),
                );
            }

            // 3. RX sample rate; success implicitly resets tuner/NCO state
            if plan.rx_rate && requested.dev_sample_rate != 0 {
                if run_call(
                    &mut report,
                    "sampleRateRx",
                    port.set_sample_rate(
                        requested.dev_sample_rate as f64,
                        requested.rx_master_clock(),
                        false,
                    ),
                ) {
                    rx_freq = true;
                    rx_nco = true;
                    debug!(
                        "Rx rate set to {} with hard decimation {}",
                        requested.dev_sample_rate,
                        1u32 << requested.rx.log2_hard_decim
                    );
                }
            }

            // 4. RX LPF calibration, channel A then B
            if plan.rx_lpf {
                run_call(
                    &mut report,
                    "lpfBWRx0",
                    port.set_lpf_bandwidth(Channel::A, Direction::Rx, requested.rx.ch0.lpf_bw),
                );
                run_call(
                    &mut report,
                    "lpfBWRx1",
                    port.set_lpf_bandwidth(Channel::B, Direction::Rx, requested.rx.ch1.lpf_bw),
                );
            }

            // 5. RX LO retune
            if rx_freq && requested.dev_sample_rate != 0 {
                let freq = device_center_frequency(
                    requested.rx.center_frequency,
                    requested.rx.log2_soft_decim,
                    self.fc_pos_rx,
                    requested.dev_sample_rate,
                );
                run_call(&mut report, "rxCenterFrequency", port.tune(Direction::Rx, freq));
            }

            // 6. RX NCO
            if rx_nco {
                run_call(
                    &mut report,
                    "ncoRx",
                    port.tune_nco(Direction::Rx, requested.rx_nco_shift() as i64),
                );
            }

            // 7. TX sample rate
            if plan.tx_rate && requested.dev_sample_rate != 0 {
                if run_call(
                    &mut report,
                    "sampleRateTx",
                    port.set_sample_rate(
                        requested.dev_sample_rate as f64,
                        requested.tx_master_clock(),
                        true,
                    ),
                ) {
                    tx_freq = true;
                    tx_nco = true;
                    debug!(
                        "Tx rate set to {} with hard interpolation {}",
                        requested.dev_sample_rate,
                        1u32 << requested.tx.log2_hard_interp
                    );
                }
            }

            // 8. TX LPF calibration, channel A then B
            if plan.tx_lpf {
                run_call(
                    &mut report,
                    "lpfBWTx0",
                    port.set_lpf_bandwidth(Channel::A, Direction::Tx, requested.tx.ch0.lpf_bw),
                );
                run_call(
                    &mut report,
                    "lpfBWTx1",
                    port.set_lpf_bandwidth(Channel::B, Direction::Tx, requested.tx.ch1.lpf_bw),
                );
            }

            // 9. TX LO retune
            if tx_freq && requested.dev_sample_rate != 0 {
                let freq = device_center_frequency(
                    requested.tx.center_frequency,
                    requested.tx.log2_soft_interp,
                    self.fc_pos_tx,
                    requested.dev_sample_rate,
                );
                run_call(&mut report, "txCenterFrequency", port.tune(Direction::Tx, freq));
            }

            // 10. TX NCO
            if tx_nco {
                run_call(
                    &mut report,
                    "ncoTx",
                    port.tune_nco(Direction::Tx, requested.tx_nco_shift() as i64),
                );
            }
        } else if !plan.is_empty() {
            debug!("device not open, storing settings without hardware programming");
        }

        // 11. downstream notifications
        if plan.forward_rx_dsp || plan.forward_tx_dsp {
            report.events.push(DeviceEvent::ClockGenChanged);
        }
        if plan.forward_rx_dsp {
            let sample_rate = requested.rx_stream_rate();
            let center_frequency = effective_center_frequency(
                requested.rx.center_frequency,
                requested.rx.nco_enable,
                requested.rx.nco_frequency,
            );
            for stream_index in 0..2 {
                report.events.push(DeviceEvent::Signal {
                    sample_rate,
                    center_frequency,
                    rx: true,
                    stream_index,
                });
            }
        }
        if plan.forward_tx_dsp {
            let sample_rate = requested.tx_stream_rate();
            let center_frequency = effective_center_frequency(
                requested.tx.center_frequency,
                requested.tx.nco_enable,
                requested.tx.nco_frequency,
            );
            for stream_index in 0..2 {
                report.events.push(DeviceEvent::Signal {
                    sample_rate,
                    center_frequency,
                    rx: false,
                    stream_index,
                });
            }
        }

        // Best-effort, no rollback: the requested snapshot becomes current
        // even when steps failed above
        self.settings = requested;

        if !report.fully_applied() {
            warn!(
                "apply finished with {} failed step(s) out of {}",
                report.failures.len(),
                report.attempted
            );
        }

        report
    }

    /// Start the RX stream worker, restarting it if already running
    pub fn start_rx(&mut self) -> Result<(), EngineError> {
        if self.port.is_none() {
            return Err(EngineError::DeviceNotOpen);
        }

        let _guard = self.transition_lock.lock().unwrap();
        if let Some(worker) = self.rx_worker.take() {
            worker.stop();
        }
        self.rx_fifo.clear();
        self.rx_worker = Some(spawn_worker(Direction::Rx, self.settings.rx.log2_soft_decim));
        Ok(())
    }

    /// Start the TX stream worker, restarting it if already running
    pub fn start_tx(&mut self) -> Result<(), EngineError> {
        if self.port.is_none() {
            return Err(EngineError::DeviceNotOpen);
        }

        let _guard = self.transition_lock.lock().unwrap();
        if let Some(worker) = self.tx_worker.take() {
            worker.stop();
        }
        self.tx_fifo.clear();
        self.tx_worker = Some(spawn_worker(Direction::Tx, self.settings.tx.log2_soft_interp));
        Ok(())
    }

    /// Stop the RX stream worker if running
    pub fn stop_rx(&mut self) {
        let _guard = self.transition_lock.lock().unwrap();
        if let Some(worker) = self.rx_worker.take() {
            worker.stop();
        }
    }

    /// Stop the TX stream worker if running
    pub fn stop_tx(&mut self) {
        let _guard = self.transition_lock.lock().unwrap();
        if let Some(worker) = self.tx_worker.take() {
            worker.stop();
        }
    }

    /// Streaming state and hardware FIFO levels
    pub fn stream_info(&mut self) -> Result<DeviceEvent, EngineError> {
        let rx_active = self.running_rx();
        let tx_active = self.running_tx();
        let port = self.port.as_mut().ok_or(EngineError::DeviceNotOpen)?;
        let (rx_fifo_level, tx_fifo_level) = port.fifo_levels()?;

        Ok(DeviceEvent::StreamInfo {
            rx_active,
            tx_active,
            rx_fifo_level,
            tx_fifo_level,
            fifo_capacity: HARDWARE_FIFO_CAPACITY,
        })
    }

    /// Board telemetry; individual read failures degrade to defaults
    pub fn device_info(&mut self) -> Result<DeviceEvent, EngineError> {
        let port = self.port.as_mut().ok_or(EngineError::DeviceNotOpen)?;

        let board_temperature_c = match port.board_temperature() {
            Ok(t) => t,
            Err(e) => {
                debug!("cannot read board temperature: {}", e);
                0.0
            }
        };
        let gps_locked = match port.gps_locked() {
            Ok(locked) => locked,
            Err(e) => {
                debug!("cannot read GPS lock status: {}", e);
                false
            }
        };

        Ok(DeviceEvent::DeviceInfo {
            board_temperature_c,
            gps_locked,
        })
    }

    /// Encode the stored snapshot as a versioned blob
    pub fn serialize_settings(&self) -> Vec<u8> {
        serialize(&self.settings)
    }

    /// Replace the stored snapshot from a persisted blob
    ///
    /// A rejected blob resets the snapshot to defaults and returns false;
    /// in both cases the caller is expected to re-apply the stored snapshot
    /// with `force = true` so the hardware matches it.
    pub fn load_settings(&mut self, data: &[u8]) -> bool {
        match trx_settings::deserialize(data) {
            Ok(settings) => {
                self.settings = settings;
                true
            }
            Err(e) => {
                warn!("settings blob rejected, resetting to defaults: {}", e);
                self.settings = MimoSettings::default();
                false
            }
        }
    }
}

fn run_call(report: &mut ApplyReport, action: &'static str, result: Result<(), HardwareError>) -> bool {
    report.attempted += 1;
    match result {
        Ok(()) => true,
        Err(error) => {
            warn!("could not apply {}: {}", action, error);
            report.failures.push(ApplyFailure { action, error });
            false
        }
    }
}

fn apply_rx_gains(
    report: &mut ApplyReport,
    port: &mut dyn CapabilityPort,
    channel: Channel,
    plan: GainPlan,
    requested: &RxChannelSettings,
) {
    if plan.auto {
        let split = decompose_auto_gain(requested.gain);
        run_call(
            report,
            "gainLna",
            port.set_gain_stage(channel, GainStage::Lna, split.lna_db as f64),
        );
        run_call(
            report,
            "gainTia",
            port.set_gain_stage(channel, GainStage::Tia, split.tia.as_db()),
        );
        run_call(
            report,
            "gainPga",
            port.set_gain_stage(channel, GainStage::Pga, split.pga_db as f64),
        );
        return;
    }

    if plan.lna {
        run_call(
            report,
            "gainLna",
            port.set_gain_stage(channel, GainStage::Lna, requested.lna_gain as f64),
        );
    }
    if plan.tia {
        run_call(
            report,
            "gainTia",
            port.set_gain_stage(channel, GainStage::Tia, requested.tia_gain.as_db()),
        );
    }
    if plan.pga {
        run_call(
            report,
            "gainPga",
            port.set_gain_stage(channel, GainStage::Pga, requested.pga_gain as f64),
        );
    }
}
