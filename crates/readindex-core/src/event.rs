//! Wire model for read-cursor advance events.
//!
//! The upstream application publishes one event per accepted cursor advance,
//! after persisting the authoritative cursor row. Only `channel_id`,
//! `user_id` and `new_last_seq` drive the index; the remaining fields are
//! informational.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Event `type` value emitted when a user's read cursor advances.
pub const EVENT_TYPE_READ_ADVANCED: &str = "channel_read_advanced";

/// A single read-cursor advance, as carried on the event stream.
///
/// The stream guarantees at-least-once delivery; events for the same
/// `(channel_id, user_id)` pair may arrive duplicated or out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadCursorEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_id: String,
    pub channel_id: String,
    pub user_id: String,
    /// Cursor value before the advance, as seen by the publisher. Advisory.
    #[serde(default)]
    pub prev_last_seq: i64,
    /// Authoritative target cursor value.
    pub new_last_seq: i64,
    /// Publish time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl ReadCursorEvent {
    /// Check the fields the index depends on.
    pub fn validate(&self) -> Result<()> {
        if self.channel_id.is_empty() {
            return Err(Error::EmptyChannelId);
        }
        if self.user_id.is_empty() {
            return Err(Error::EmptyUserId);
        }
        if self.new_last_seq < 0 {
            return Err(Error::NegativeSequence(self.new_last_seq));
        }
        Ok(())
    }

    /// Whether this event is a cursor advance (the stream may carry other
    /// event kinds in the future).
    pub fn is_read_advance(&self) -> bool {
        self.event_type == EVENT_TYPE_READ_ADVANCED
    }
}
