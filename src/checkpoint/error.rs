//! Checkpoint error types.

use thiserror::Error;

/// Errors that can occur while saving or restoring a path snapshot
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Snapshot version is not supported by this version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A node names a state the provider does not know
    #[error("Snapshot references unknown state '{name}'")]
    UnknownState { name: String },

    /// Node states do not form a contiguous root-to-leaf chain
    #[error("State '{state}' does not follow '{expected}' in the snapshot path")]
    BrokenAncestry { state: String, expected: String },
}
