//! Error types for the device engine

use thiserror::Error;

/// A failed hardware capability call, with the operation name and the
/// driver status code for log context
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("hardware call {op} failed with status {code}")]
pub struct HardwareError {
    /// Capability operation that failed
    pub op: &'static str,
    /// Driver status code
    pub code: i32,
}

impl HardwareError {
    /// Create a new hardware error
    pub fn new(op: &'static str, code: i32) -> Self {
        Self { op, code }
    }
}

/// Errors that can occur in the device engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// No capability port is bound; the operation was skipped
    #[error("device is not open")]
    DeviceNotOpen,

    /// A hardware capability call failed
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// A persisted settings blob was rejected
    #[error("settings blob rejected: {0}")]
    Deserialization(#[from] trx_settings::SettingsError),

    /// Control message not handled by this engine
    #[error("unsupported control message: {0}")]
    Unsupported(&'static str),
}
