//! MIMO Transceiver Control Engine
//!
//! This crate provides the settings reconciliation core for a dual-channel
//! MIMO transceiver: given the stored settings snapshot and a requested
//! one, it computes the minimal dependency-ordered set of hardware
//! reconfiguration actions, executes them against an abstract capability
//! port, and reports which downstream notifications the DSP side needs.
//!
//! # Architecture
//!
//! A reconciliation pass runs in three explicit phases:
//!
//! 1. **Diff**: every field compared, producing an audit key list
//! 2. **Derive**: changed fields folded into boolean intents with the
//!    cross-parameter dependencies applied (a clock change invalidates
//!    both converters and tuners, either LPF bandwidth recalibrates the
//!    whole direction, gain intents depend on the gain mode being entered)
//! 3. **Execute**: intents run in a fixed order against the port; each
//!    failure is logged and recorded but never aborts the remaining steps,
//!    and the requested snapshot is stored wholesale at the end
//!
//! # Channel-Based Architecture
//!
//! The engine itself is synchronous and single-owner. [`run_device_actor`]
//! wraps it in a tokio task that processes [`DeviceCommand`]s strictly in
//! arrival order and emits every notification through a unified
//! [`DeviceEvent`] stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use trx_engine::MimoDevice;
//! use trx_settings::MimoSettings;
//!
//! let mut device = MimoDevice::closed();
//! let mut requested = MimoSettings::default();
//! requested.dev_sample_rate = 8_000_000;
//!
//! let report = device.apply_settings(requested, false);
//! assert!(report.fully_applied());
//! ```

pub mod actor;
pub mod diff;
pub mod engine;
pub mod error;
pub mod events;
pub mod port;
pub mod stream;

// Re-export actor types
pub use actor::{run_device_actor, DeviceCommand};

// Re-export engine types
pub use engine::{ApplyFailure, ApplyReport, MimoDevice, HARDWARE_FIFO_CAPACITY};

// Re-export diff types
pub use diff::{derive_plan, GainPlan, ReconcilePlan};

// Re-export event types
pub use events::DeviceEvent;

// Re-export port vocabulary
pub use error::{EngineError, HardwareError};
pub use port::{CapabilityPort, Channel, Direction, GainStage, HwResult};
pub use stream::{fifo_size_for_rate, SampleFifo, WorkerCommand, WorkerHandle};
