//! Error types for stream ingestion.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Broker connection or command failure. Transient: the drain loop
    /// logs it and retries without advancing acknowledgements.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The consumer was misconfigured (missing registry or broker URL).
    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a stream entry was dropped instead of applied.
///
/// Poison entries are acknowledged and discarded: they are malformed at
/// rest, so redelivery cannot repair them and would stall the group.
#[derive(Debug, Error)]
pub enum PoisonReason {
    #[error("data field missing")]
    MissingData,

    #[error("data field is not a UTF-8 string")]
    NonStringData,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid event: {0}")]
    InvalidEvent(#[from] readindex_core::Error),
}
