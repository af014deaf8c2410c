//! Simulation layer for the transceiver control plane
//!
//! Provides [`SimPort`], an in-memory implementation of the engine's
//! capability port that records every hardware call in order, supports
//! per-operation failure injection, and reports configurable telemetry.
//! The paired [`SimHandle`] keeps access to the recorded state after the
//! port has been moved into a device engine.
//!
//! # Example
//!
//! ```rust
//! use trx_engine::MimoDevice;
//! use trx_sim::{SimCall, SimPort};
//!
//! let (port, handle) = SimPort::new();
//! let mut device = MimoDevice::with_port(Box::new(port));
//!
//! let mut requested = device.settings().clone();
//! requested.rx.center_frequency = 868_000_000;
//! device.apply_settings(requested, false);
//!
//! assert!(matches!(handle.calls()[0], SimCall::Tune { .. }));
//! ```

pub mod device;

pub use device::{SimCall, SimHandle, SimOp, SimPort};
