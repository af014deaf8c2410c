//! Device actor
//!
//! Async actor wrapping a [`MimoDevice`]. All configuration and control
//! messages are processed here, one at a time and strictly in arrival
//! order; no message is cancellable mid-flight. Notifications and errors
//! are emitted through a single event channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use trx_engine::{run_device_actor, DeviceCommand, MimoDevice};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, mut event_rx) = mpsc::channel(64);
//!
//! tokio::spawn(run_device_actor(MimoDevice::closed(), cmd_rx, event_tx));
//!
//! // Send commands and receive events
//! ```

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use trx_settings::MimoSettings;

use crate::engine::MimoDevice;
use crate::error::EngineError;
use crate::events::DeviceEvent;
use crate::port::Direction;

/// Commands sent to the device actor
#[derive(Debug)]
pub enum DeviceCommand {
    /// Reconcile the device against a requested settings snapshot
    ConfigureSettings {
        /// Requested snapshot
        settings: MimoSettings,
        /// Apply every field regardless of the diff
        force: bool,
    },

    /// Start or stop one stream direction
    StartStop {
        /// Which direction to start or stop
        direction: Direction,
        /// Start if true, stop otherwise
        start: bool,
    },

    /// Report streaming state and FIFO levels through the event channel
    GetStreamInfo,

    /// Report board telemetry through the event channel
    GetDeviceInfo,

    /// Query the current settings snapshot
    GetSettings {
        /// Channel to send back the snapshot
        response: oneshot::Sender<MimoSettings>,
    },

    /// Encode the current snapshot as a versioned blob
    Serialize {
        /// Channel to send back the blob
        response: oneshot::Sender<Vec<u8>>,
    },

    /// Replace the snapshot from a persisted blob and re-apply it
    Deserialize {
        /// The persisted blob
        data: Vec<u8>,
        /// Receives false when the blob was rejected and defaults were
        /// restored instead
        response: oneshot::Sender<bool>,
    },

    /// Shutdown the actor
    Shutdown,
}

/// Run the device actor
///
/// Processes commands until the channel closes or [`DeviceCommand::Shutdown`]
/// arrives. Both stream workers are stopped on the way out.
pub async fn run_device_actor(
    mut device: MimoDevice,
    mut cmd_rx: mpsc::Receiver<DeviceCommand>,
    event_tx: mpsc::Sender<DeviceEvent>,
) {
    info!("device actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            DeviceCommand::ConfigureSettings { settings, force } => {
                apply_and_forward(&mut device, &event_tx, settings, force).await;
            }

            DeviceCommand::StartStop { direction, start } => {
                debug!(
                    "{} {}",
                    if start { "starting" } else { "stopping" },
                    direction.name()
                );

                let result = match (direction, start) {
                    (Direction::Rx, true) => device.start_rx(),
                    (Direction::Tx, true) => device.start_tx(),
                    (Direction::Rx, false) => {
                        device.stop_rx();
                        Ok(())
                    }
                    (Direction::Tx, false) => {
                        device.stop_tx();
                        Ok(())
                    }
                };

                if let Err(e) = result {
                    warn!("cannot {} {}: {}", if start { "start" } else { "stop" }, direction.name(), e);
                    emit_error(&event_tx, direction.name(), &e).await;
                }
            }

            DeviceCommand::GetStreamInfo => match device.stream_info() {
                Ok(event) => {
                    let _ = event_tx.send(event).await;
                }
                Err(e) => debug!("stream info unavailable: {}", e),
            },

            DeviceCommand::GetDeviceInfo => match device.device_info() {
                Ok(event) => {
                    let _ = event_tx.send(event).await;
                }
                Err(e) => debug!("device info unavailable: {}", e),
            },

            DeviceCommand::GetSettings { response } => {
                let _ = response.send(device.settings().clone());
            }

            DeviceCommand::Serialize { response } => {
                let _ = response.send(device.serialize_settings());
            }

            DeviceCommand::Deserialize { data, response } => {
                let ok = device.load_settings(&data);
                let _ = response.send(ok);

                // Whatever the snapshot ended up as (loaded or defaults),
                // push it to the hardware in full
                let settings = device.settings().clone();
                apply_and_forward(&mut device, &event_tx, settings, true).await;
            }

            DeviceCommand::Shutdown => {
                info!("device actor shutting down");
                break;
            }
        }
    }

    device.stop_rx();
    device.stop_tx();
    info!("device actor stopped");
}

async fn apply_and_forward(
    device: &mut MimoDevice,
    event_tx: &mpsc::Sender<DeviceEvent>,
    settings: MimoSettings,
    force: bool,
) {
    let report = device.apply_settings(settings, force);

    for failure in &report.failures {
        let _ = event_tx
            .send(DeviceEvent::Error {
                source: failure.action.to_string(),
                message: failure.error.to_string(),
            })
            .await;
    }

    for event in report.events {
        let _ = event_tx.send(event).await;
    }
}

async fn emit_error(event_tx: &mpsc::Sender<DeviceEvent>, source: &str, error: &EngineError) {
    let _ = event_tx
        .send(DeviceEvent::Error {
            source: source.to_string(),
            message: error.to_string(),
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_pair() -> (
        mpsc::Sender<DeviceCommand>,
        mpsc::Receiver<DeviceEvent>,
        tokio::task::JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run_device_actor(MimoDevice::closed(), cmd_rx, event_tx));
        (cmd_tx, event_rx, handle)
    }

    #[tokio::test]
    async fn test_configure_closed_device_emits_signal_events() {
        let (cmd_tx, mut event_rx, handle) = actor_pair();

        let mut settings = MimoSettings::default();
        settings.dev_sample_rate = 8_000_000;
        cmd_tx
            .send(DeviceCommand::ConfigureSettings {
                settings,
                force: false,
            })
            .await
            .unwrap();

        // Rate change: clock-gen event plus two signals per direction
        let first = event_rx.recv().await.unwrap();
        assert_eq!(first, DeviceEvent::ClockGenChanged);

        let mut signals = 0;
        for _ in 0..4 {
            let event = event_rx.recv().await.unwrap();
            assert!(event.is_signal());
            signals += 1;
        }
        assert_eq!(signals, 4);

        cmd_tx.send(DeviceCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_settings_round_trip() {
        let (cmd_tx, _event_rx, handle) = actor_pair();

        let mut settings = MimoSettings::default();
        settings.rx.center_frequency = 868_000_000;
        cmd_tx
            .send(DeviceCommand::ConfigureSettings {
                settings: settings.clone(),
                force: false,
            })
            .await
            .unwrap();

        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send(DeviceCommand::GetSettings { response: resp_tx })
            .await
            .unwrap();
        assert_eq!(resp_rx.await.unwrap(), settings);

        cmd_tx.send(DeviceCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_serialize_deserialize_through_actor() {
        let (cmd_tx, _event_rx, handle) = actor_pair();

        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send(DeviceCommand::Serialize { response: resp_tx })
            .await
            .unwrap();
        let blob = resp_rx.await.unwrap();

        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send(DeviceCommand::Deserialize {
                data: blob,
                response: resp_tx,
            })
            .await
            .unwrap();
        assert!(resp_rx.await.unwrap());

        cmd_tx.send(DeviceCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_blob_resets_to_defaults() {
        let (cmd_tx, _event_rx, handle) = actor_pair();

        // Store something that differs from the defaults first
        let mut settings = MimoSettings::default();
        settings.dev_sample_rate = 2_000_000;
        cmd_tx
            .send(DeviceCommand::ConfigureSettings {
                settings,
                force: false,
            })
            .await
            .unwrap();

        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send(DeviceCommand::Deserialize {
                data: vec![0xff, 0x00, 0x01],
                response: resp_tx,
            })
            .await
            .unwrap();
        assert!(!resp_rx.await.unwrap());

        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send(DeviceCommand::GetSettings { response: resp_tx })
            .await
            .unwrap();
        assert_eq!(resp_rx.await.unwrap(), MimoSettings::default());

        cmd_tx.send(DeviceCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_on_closed_device_reports_error() {
        let (cmd_tx, mut event_rx, handle) = actor_pair();

        cmd_tx
            .send(DeviceCommand::StartStop {
                direction: Direction::Rx,
                start: true,
            })
            .await
            .unwrap();

        let event = event_rx.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::Error { .. }));

        cmd_tx.send(DeviceCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }
}
