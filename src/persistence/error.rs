//! Error types for persistence operations.

use thiserror::Error;

/// Errors that can occur while saving or loading trained models.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O error (file operations, disk I/O)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes do not describe a valid model
    #[error("corrupt model: {0}")]
    CorruptModel(String),

    /// On-disk format version this build cannot read
    #[error("unsupported model format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Payload bytes do not match their recorded checksum
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Manifest serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No model stored at the given location
    #[error("model not found: {0}")]
    NotFound(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
