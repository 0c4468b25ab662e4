//! Error types for the routing control plane.

use thiserror::Error;

use crate::lsa::LsaType;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that cross component boundaries.
///
/// Malformed updates, stale sequence numbers and transport failures are
/// handled where they happen and only logged; they never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// A routing update was published before the sync channel was created.
    #[error("cannot publish routing update: sync channel does not exist")]
    SyncChannelMissing,

    /// A name did not contain the components needed to interpret it.
    #[error("malformed name {name}: {reason}")]
    MalformedName { name: String, reason: &'static str },

    /// A name component that should be an LSA type token was not one.
    #[error("unrecognized LSA type `{0}`")]
    UnknownLsaType(String),

    /// LSA content could not be decoded.
    #[error("failed to decode LSA content: {0}")]
    Decode(#[from] serde_json::Error),

    /// Sequence numbers could not be persisted or restored.
    #[error("sequence number storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A sequence number no longer fits its field of the combined vector.
    #[error("{lsa_type} LSA sequence number {seq_no} exceeds its {bits}-bit field")]
    SequenceOverflow {
        lsa_type: LsaType,
        seq_no: u64,
        bits: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}
