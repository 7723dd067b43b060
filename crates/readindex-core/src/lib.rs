//! Read Index Core
//!
//! This crate implements the in-memory index at the heart of the read index
//! service: for each chat channel it tracks how far every user has read and
//! answers "which users have read at least up to sequence S?" and "how many
//! users have read each of these sequences?".
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────────────────────────┐
//! │ ChannelRegistry  │ ───▶ │ ChannelState (one per channel)       │
//! │ (process-wide)   │      │  - user_cursors: user → last_seq     │
//! └──────────────────┘      │  - user_index:   user → dense slot   │
//!                           │  - segments:     [start, start+99]   │
//!                           │    each with a bitmap of reader slots│
//!                           └──────────────────────────────────────┘
//! ```
//!
//! Cursor advances arrive as [`ReadCursorEvent`]s. Each apply is idempotent
//! and monotonic: a sequence that does not move the user's cursor forward is
//! a no-op, so at-least-once delivery and reordering by the broker are safe.
//!
//! Queries compose segment bitmaps with bitwise-or, so a reader-list or
//! batch-count request touches at most `window_size / SEGMENT_SIZE` bitmaps
//! regardless of how many users the channel has.
//!
//! The index is pure memory. It is reconstructible from the event stream and
//! the upstream cursor store, so nothing here persists across restarts.

pub mod channel;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod registry;
pub mod segment;

pub use channel::{
    ApplyOutcome, ChannelState, ReadersPage, DEFAULT_READERS_LIMIT, DEFAULT_WINDOW_SIZE,
};
pub use error::{Error, Result};
pub use event::{ReadCursorEvent, EVENT_TYPE_READ_ADVANCED};
pub use lifecycle::ShutdownHandle;
pub use registry::{ChannelOverview, ChannelRegistry, INACTIVITY_TTL, SWEEP_INTERVAL};
pub use segment::{ReadSegment, SEGMENT_SIZE};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis() as i64
}
