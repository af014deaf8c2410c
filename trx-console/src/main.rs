//! Transceiver Control Console
//!
//! A headless session against a simulated device: pushes the default
//! settings, retunes, starts the RX stream, queries telemetry, and prints
//! every event the engine emits. Useful for exercising the control plane
//! end to end without hardware.

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trx_engine::{run_device_actor, DeviceCommand, DeviceEvent, Direction, MimoDevice};
use trx_settings::MimoSettings;
use trx_sim::SimPort;

#[tokio::main]
async fn main() -> Result<()> {
    // Include all our crates in the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trx_console=info,trx_settings=info,trx_engine=info,trx_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting transceiver control console");

    let (port, sim) = SimPort::new();
    sim.set_board_temperature(38.5);
    sim.set_gps_locked(true);

    let device = MimoDevice::with_port(Box::new(port));

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let actor = tokio::spawn(run_device_actor(device, cmd_rx, event_tx));

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                DeviceEvent::Signal {
                    sample_rate,
                    center_frequency,
                    rx,
                    stream_index,
                } => info!(
                    "signal: {}{} rate {} Hz center {} Hz",
                    if rx { "Rx" } else { "Tx" },
                    stream_index,
                    sample_rate,
                    center_frequency
                ),
                DeviceEvent::ClockGenChanged => info!("clock generator plan changed"),
                DeviceEvent::StreamInfo {
                    rx_active,
                    tx_active,
                    rx_fifo_level,
                    tx_fifo_level,
                    fifo_capacity,
                } => info!(
                    "stream: rx {} tx {} fifo {}/{} of {}",
                    rx_active, tx_active, rx_fifo_level, tx_fifo_level, fifo_capacity
                ),
                DeviceEvent::DeviceInfo {
                    board_temperature_c,
                    gps_locked,
                } => info!(
                    "board: {:.1} degC, GPS {}",
                    board_temperature_c,
                    if gps_locked { "locked" } else { "unlocked" }
                ),
                DeviceEvent::Error { source, message } => {
                    info!("error from {}: {}", source, message)
                }
            }
        }
    });

    // Push the defaults to the hardware in full
    cmd_tx
        .send(DeviceCommand::ConfigureSettings {
            settings: MimoSettings::default(),
            force: true,
        })
        .await?;

    // Retune to 868 MHz with a small downward NCO shift
    let mut retuned = MimoSettings::default();
    retuned.rx.center_frequency = 868_000_000;
    retuned.rx.nco_enable = true;
    retuned.rx.nco_frequency = -125_000;
    cmd_tx
        .send(DeviceCommand::ConfigureSettings {
            settings: retuned,
            force: false,
        })
        .await?;

    // Start streaming and query telemetry
    cmd_tx
        .send(DeviceCommand::StartStop {
            direction: Direction::Rx,
            start: true,
        })
        .await?;
    sim.set_fifo_levels(1024, 0);
    cmd_tx.send(DeviceCommand::GetStreamInfo).await?;
    cmd_tx.send(DeviceCommand::GetDeviceInfo).await?;

    // Snapshot round trip through the versioned blob
    let (resp_tx, resp_rx) = oneshot::channel();
    cmd_tx
        .send(DeviceCommand::Serialize { response: resp_tx })
        .await?;
    let blob = resp_rx.await?;
    info!("settings blob: {} bytes", blob.len());

    let (resp_tx, resp_rx) = oneshot::channel();
    cmd_tx
        .send(DeviceCommand::Deserialize {
            data: blob,
            response: resp_tx,
        })
        .await?;
    info!("settings blob restored: {}", resp_rx.await?);

    cmd_tx
        .send(DeviceCommand::StartStop {
            direction: Direction::Rx,
            start: false,
        })
        .await?;
    cmd_tx.send(DeviceCommand::Shutdown).await?;

    actor.await?;
    printer.await?;

    info!("hardware calls recorded: {}", sim.call_count());
    Ok(())
}
