//! Error types for settings persistence

use thiserror::Error;

/// Errors raised while decoding a persisted settings blob
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Blob too short to carry a version tag
    #[error("settings blob is empty")]
    Empty,

    /// Unknown format version
    #[error("unsupported settings blob version {0}")]
    UnsupportedVersion(u8),

    /// Payload failed to parse
    #[error("settings payload rejected: {0}")]
    Payload(#[from] serde_json::Error),
}
