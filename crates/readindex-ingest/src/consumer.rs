//! Consumer-group drain loop for `read_cursor_events`.
//!
//! ## Protocol
//!
//! 1. On build, ensure the consumer group exists (`XGROUP CREATE ...
//!    MKSTREAM`, tolerating BUSYGROUP from earlier runs).
//! 2. Loop: `XREADGROUP` up to [`READ_BATCH_SIZE`] new entries, blocking up
//!    to [`READ_BLOCK_TIMEOUT`] when the stream is idle.
//! 3. Per entry: the `data` field carries a JSON-encoded
//!    [`ReadCursorEvent`]. Decodable events are applied to the registry and
//!    acknowledged; undecodable ones are acknowledged and dropped with a
//!    warning (poison-pill policy).
//! 4. On shutdown, exit without acknowledging in-flight work; the broker
//!    redelivers it and the idempotent apply absorbs the duplicates.
//!
//! No cross-user ordering is required of the broker: the monotonic cursor
//! guard in the index makes reordered entries per `(channel, user)` no-ops.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use readindex_core::{ChannelRegistry, ReadCursorEvent, ShutdownHandle};

use crate::error::{IngestError, PoisonReason, Result};

/// Stream carrying read-cursor advance events.
pub const EVENT_STREAM: &str = "read_cursor_events";

/// Consumer group owned by the read index service.
pub const CONSUMER_GROUP: &str = "read-index-service";

/// Default consumer name within the group.
pub const DEFAULT_CONSUMER_NAME: &str = "consumer-1";

/// Maximum entries fetched per read.
pub const READ_BATCH_SIZE: usize = 100;

/// How long a read blocks waiting for new entries.
pub const READ_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before retrying after a broker error.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Drains the event stream and feeds the channel registry.
pub struct CursorEventConsumer {
    redis: ConnectionManager,
    registry: Arc<ChannelRegistry>,
    consumer_name: String,
    batch_size: usize,
    block_timeout: Duration,
}

impl std::fmt::Debug for CursorEventConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorEventConsumer")
            .field("consumer_name", &self.consumer_name)
            .field("batch_size", &self.batch_size)
            .field("block_timeout", &self.block_timeout)
            .finish()
    }
}

/// Builder for [`CursorEventConsumer`].
pub struct CursorEventConsumerBuilder {
    redis_url: Option<String>,
    registry: Option<Arc<ChannelRegistry>>,
    consumer_name: String,
    batch_size: usize,
    block_timeout: Duration,
}

impl CursorEventConsumerBuilder {
    pub fn new() -> Self {
        Self {
            redis_url: None,
            registry: None,
            consumer_name: DEFAULT_CONSUMER_NAME.to_string(),
            batch_size: READ_BATCH_SIZE,
            block_timeout: READ_BLOCK_TIMEOUT,
        }
    }

    /// Broker connection URL, e.g. `redis://localhost:6379/0`.
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Registry receiving the decoded events.
    pub fn registry(mut self, registry: Arc<ChannelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Consumer name within the group. Only needs to change when several
    /// instances share the group.
    pub fn consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn block_timeout(mut self, block_timeout: Duration) -> Self {
        self.block_timeout = block_timeout;
        self
    }

    /// Connect to the broker and ensure the consumer group exists.
    pub async fn build(self) -> Result<CursorEventConsumer> {
        let redis_url = self
            .redis_url
            .ok_or_else(|| IngestError::Config("redis_url required".into()))?;
        let registry = self
            .registry
            .ok_or_else(|| IngestError::Config("registry required".into()))?;

        let client = redis::Client::open(redis_url.as_str())?;
        let mut redis = ConnectionManager::new(client).await?;
        ensure_group(&mut redis).await?;

        Ok(CursorEventConsumer {
            redis,
            registry,
            consumer_name: self.consumer_name,
            batch_size: self.batch_size,
            block_timeout: self.block_timeout,
        })
    }
}

impl Default for CursorEventConsumerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the consumer group at the stream head, creating the stream too
/// if it does not exist yet. BUSYGROUP means a previous run already did.
async fn ensure_group(redis: &mut ConnectionManager) -> Result<()> {
    let created: std::result::Result<String, redis::RedisError> = redis
        .xgroup_create_mkstream(EVENT_STREAM, CONSUMER_GROUP, "0")
        .await;
    match created {
        Ok(_) => {
            info!(
                stream = EVENT_STREAM,
                group = CONSUMER_GROUP,
                "created consumer group"
            );
            Ok(())
        }
        Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl CursorEventConsumer {
    pub fn builder() -> CursorEventConsumerBuilder {
        CursorEventConsumerBuilder::new()
    }

    /// Drain the stream until `shutdown` fires.
    pub async fn run(mut self, shutdown: ShutdownHandle) {
        info!(
            stream = EVENT_STREAM,
            group = CONSUMER_GROUP,
            consumer = %self.consumer_name,
            "cursor event consumer started"
        );

        loop {
            let batch = tokio::select! {
                _ = shutdown.wait() => break,
                batch = self.read_batch() => batch,
            };

            match batch {
                Ok(Some(reply)) => self.process_batch(reply).await,
                // Block timeout elapsed with nothing new.
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "stream read failed, retrying");
                    tokio::select! {
                        _ = shutdown.wait() => break,
                        _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                    }
                }
            }
        }

        info!("cursor event consumer stopped");
    }

    async fn read_batch(&mut self) -> Result<Option<StreamReadReply>> {
        let options = StreamReadOptions::default()
            .group(CONSUMER_GROUP, &self.consumer_name)
            .count(self.batch_size)
            .block(self.block_timeout.as_millis() as usize);

        let reply: Option<StreamReadReply> = self
            .redis
            .xread_options(&[EVENT_STREAM], &[">"], &options)
            .await?;

        Ok(reply.filter(|r| !r.keys.is_empty()))
    }

    async fn process_batch(&mut self, reply: StreamReadReply) {
        for key in reply.keys {
            for entry in key.ids {
                self.process_entry(entry).await;
            }
        }
    }

    async fn process_entry(&mut self, entry: StreamId) {
        let event = match decode_entry(&entry) {
            Ok(event) => event,
            Err(reason) => {
                warn!(
                    message_id = %entry.id,
                    reason = %reason,
                    "dropping undecodable stream entry"
                );
                self.ack(&entry.id).await;
                return;
            }
        };

        if !event.is_read_advance() {
            debug!(
                message_id = %entry.id,
                event_type = %event.event_type,
                "skipping unrelated event"
            );
            self.ack(&entry.id).await;
            return;
        }

        let outcome = self.registry.apply_event(&event).await;
        debug!(
            message_id = %entry.id,
            channel_id = %event.channel_id,
            user_id = %event.user_id,
            new_last_seq = event.new_last_seq,
            ?outcome,
            "event applied"
        );
        self.ack(&entry.id).await;
    }

    /// Acknowledge one entry. On failure the entry stays pending and gets
    /// redelivered after the broker's pending-entry timeout, which the
    /// idempotent apply absorbs.
    async fn ack(&mut self, message_id: &str) {
        let acked: std::result::Result<i64, redis::RedisError> = self
            .redis
            .xack(EVENT_STREAM, CONSUMER_GROUP, &[message_id])
            .await;
        if let Err(e) = acked {
            warn!(message_id = %message_id, error = %e, "failed to acknowledge entry");
        }
    }
}

/// Extract and validate the event carried in a stream entry's `data` field.
fn decode_entry(entry: &StreamId) -> std::result::Result<ReadCursorEvent, PoisonReason> {
    let value = entry.map.get("data").ok_or(PoisonReason::MissingData)?;
    let raw: String =
        redis::from_redis_value(value).map_err(|_| PoisonReason::NonStringData)?;
    let event: ReadCursorEvent = serde_json::from_str(&raw)?;
    event.validate()?;
    Ok(event)
}
