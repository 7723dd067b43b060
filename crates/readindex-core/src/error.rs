//! Error types for the read index core.
//!
//! The index itself is pure in-memory bookkeeping and cannot fail once an
//! event has been admitted; everything here is about rejecting events that
//! are malformed at rest. Callers draining a stream treat these as poison
//! pills (acknowledge and drop) since redelivery cannot repair them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("channel_id must not be empty")]
    EmptyChannelId,

    #[error("user_id must not be empty")]
    EmptyUserId,

    #[error("new_last_seq must be non-negative, got {0}")]
    NegativeSequence(i64),
}
