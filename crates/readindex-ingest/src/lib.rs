//! Read Index Ingestion
//!
//! Drains the `read_cursor_events` Redis Stream with consumer-group
//! semantics and dispatches each decoded event to the channel registry.
//!
//! Delivery is at-least-once: entries are acknowledged only after the index
//! has absorbed them (or after they are classified as poison), and anything
//! left pending at a crash is redelivered to the group. The index's
//! idempotent apply makes redelivery and reordering harmless.

pub mod consumer;
pub mod error;

pub use consumer::{
    CursorEventConsumer, CursorEventConsumerBuilder, CONSUMER_GROUP, DEFAULT_CONSUMER_NAME,
    EVENT_STREAM, READ_BATCH_SIZE, READ_BLOCK_TIMEOUT,
};
pub use error::{IngestError, PoisonReason, Result};
