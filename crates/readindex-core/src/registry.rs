//! Process-wide channel registry and inactivity sweeper.
//!
//! The registry maps `channel_id` to its [`ChannelState`], creating states
//! lazily on first event. Its own lock is held only for map lookups,
//! inserts and removals; all per-channel work happens under the channel's
//! read/write lock, so one hot channel never stalls the rest.
//!
//! Channels with no accepted advance for [`INACTIVITY_TTL`] are removed by
//! a periodic sweep. Dropping a channel loses nothing durable: the state is
//! rebuilt from the stream if the channel comes back to life.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::channel::{ApplyOutcome, ChannelState, DEFAULT_WINDOW_SIZE};
use crate::event::ReadCursorEvent;
use crate::lifecycle::ShutdownHandle;
use crate::now_ms;

/// Channels with no accepted advance for this long are dropped.
pub const INACTIVITY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How often the sweeper looks for inactive channels.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Per-channel summary reported by [`ChannelRegistry::overview`].
#[derive(Debug, Clone)]
pub struct ChannelOverview {
    pub channel_id: String,
    pub max_seq: i64,
    pub users_count: usize,
    pub segments: usize,
    pub window_size: i64,
}

/// Shared handle to one channel's state.
pub type ChannelHandle = Arc<RwLock<ChannelState>>;

pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, ChannelHandle>>,
    window_size: i64,
    inactivity_ttl: Duration,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::with_window_size(DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(window_size: i64) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            window_size,
            inactivity_ttl: INACTIVITY_TTL,
        }
    }

    /// Override the inactivity TTL used by [`sweep`](Self::sweep).
    pub fn with_inactivity_ttl(mut self, ttl: Duration) -> Self {
        self.inactivity_ttl = ttl;
        self
    }

    /// The channel's state, if it is currently indexed.
    pub async fn get(&self, channel_id: &str) -> Option<ChannelHandle> {
        self.channels.read().await.get(channel_id).cloned()
    }

    /// The channel's state, creating an empty one if absent. Creation is
    /// atomic with respect to concurrent callers: both get the same handle.
    pub async fn get_or_create(&self, channel_id: &str) -> ChannelHandle {
        if let Some(state) = self.get(channel_id).await {
            return state;
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(channel_id.to_string())
            .or_insert_with(|| {
                debug!(channel_id = %channel_id, "creating channel state");
                Arc::new(RwLock::new(ChannelState::new(
                    channel_id,
                    self.window_size,
                    now_ms(),
                )))
            })
            .clone()
    }

    /// Route one advance event to its channel.
    pub async fn apply_event(&self, event: &ReadCursorEvent) -> ApplyOutcome {
        let state = self.get_or_create(&event.channel_id).await;
        let mut state = state.write().await;
        state.apply(&event.user_id, event.new_last_seq, now_ms())
    }

    pub async fn channels_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Snapshot of every channel, sorted by id for stable output.
    pub async fn overview(&self) -> Vec<ChannelOverview> {
        let handles: Vec<ChannelHandle> = self.channels.read().await.values().cloned().collect();

        let mut overviews = Vec::with_capacity(handles.len());
        for handle in handles {
            let state = handle.read().await;
            overviews.push(ChannelOverview {
                channel_id: state.channel_id().to_string(),
                max_seq: state.max_seq(),
                users_count: state.users_count(),
                segments: state.segments_count(),
                window_size: state.window_size(),
            });
        }
        overviews.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        overviews
    }

    /// Drop channels whose last accepted advance is older than the TTL.
    /// Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let cutoff = now_ms() - self.inactivity_ttl.as_millis() as i64;

        // Scan without holding the registry lock across per-channel reads.
        let snapshot: Vec<(String, ChannelHandle)> = self
            .channels
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut stale = Vec::new();
        for (channel_id, handle) in snapshot {
            if handle.read().await.last_activity_ms() < cutoff {
                stale.push(channel_id);
            }
        }
        if stale.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut channels = self.channels.write().await;
        for channel_id in stale {
            // Re-check under the registry write lock: an event may have
            // landed between the scan and now.
            let current = match channels.get(&channel_id) {
                Some(handle) => handle.clone(),
                None => continue,
            };
            if current.read().await.last_activity_ms() >= cutoff {
                continue;
            }
            channels.remove(&channel_id);
            info!(channel_id = %channel_id, "removed inactive channel");
            removed += 1;
        }
        removed
    }

    /// Spawn the periodic sweep loop. Runs until `shutdown` fires.
    pub fn start_background_sweep(
        self: Arc<Self>,
        interval: Duration,
        shutdown: ShutdownHandle,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_seconds = interval.as_secs(), "channel sweeper started");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.wait() => break,
                }
                let removed = self.sweep().await;
                if removed > 0 {
                    info!(removed, "inactivity sweep complete");
                }
            }
            info!("channel sweeper stopped");
        })
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EVENT_TYPE_READ_ADVANCED;

    fn advance(channel_id: &str, user_id: &str, new_last_seq: i64) -> ReadCursorEvent {
        ReadCursorEvent {
            event_type: EVENT_TYPE_READ_ADVANCED.to_string(),
            event_id: format!("evt-{channel_id}-{user_id}-{new_last_seq}"),
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            prev_last_seq: 0,
            new_last_seq,
            timestamp: now_ms(),
        }
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_handle() {
        let registry = ChannelRegistry::new();
        let first = registry.get_or_create("ch-1").await;
        let second = registry.get_or_create("ch-1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.channels_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_channel_is_absent_until_first_event() {
        let registry = ChannelRegistry::new();
        assert!(registry.get("ch-1").await.is_none());

        registry.apply_event(&advance("ch-1", "u1", 150)).await;
        assert!(registry.get("ch-1").await.is_some());
    }

    #[tokio::test]
    async fn apply_event_updates_channel_state() {
        let registry = ChannelRegistry::new();
        assert_eq!(
            registry.apply_event(&advance("ch-1", "u1", 150)).await,
            ApplyOutcome::Applied
        );
        assert_eq!(
            registry.apply_event(&advance("ch-1", "u1", 150)).await,
            ApplyOutcome::NoOp
        );

        let state = registry.get("ch-1").await.unwrap();
        let state = state.read().await;
        assert_eq!(state.cursor("u1"), Some(150));
        assert_eq!(state.max_seq(), 150);
    }

    #[tokio::test]
    async fn overview_is_sorted_by_channel_id() {
        let registry = ChannelRegistry::new();
        registry.apply_event(&advance("zulu", "u1", 100)).await;
        registry.apply_event(&advance("alpha", "u1", 200)).await;
        registry.apply_event(&advance("alpha", "u2", 300)).await;

        let overview = registry.overview().await;
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].channel_id, "alpha");
        assert_eq!(overview[0].users_count, 2);
        assert_eq!(overview[0].max_seq, 300);
        assert_eq!(overview[1].channel_id, "zulu");
        assert_eq!(overview[1].window_size, DEFAULT_WINDOW_SIZE);
    }

    #[tokio::test]
    async fn sweep_removes_inactive_channels() {
        let registry = ChannelRegistry::new();

        registry.apply_event(&advance("stale", "u1", 100)).await;
        registry.apply_event(&advance("fresh", "u1", 100)).await;

        // Backdate the stale channel's last activity beyond the TTL.
        let handle = registry.get("stale").await.unwrap();
        let day_and_a_bit = INACTIVITY_TTL.as_millis() as i64 + 60_000;
        handle
            .write()
            .await
            .apply("u1", 200, now_ms() - day_and_a_bit);

        assert_eq!(registry.sweep().await, 1);
        assert!(registry.get("stale").await.is_none());
        assert!(registry.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn sweep_keeps_active_channels() {
        let registry = ChannelRegistry::new();
        registry.apply_event(&advance("ch-1", "u1", 100)).await;
        assert_eq!(registry.sweep().await, 0);
        assert_eq!(registry.channels_count().await, 1);
    }

    #[tokio::test]
    async fn sweep_removes_channels_that_never_saw_an_advance() {
        let registry = ChannelRegistry::new().with_inactivity_ttl(Duration::from_millis(20));
        registry.get_or_create("idle").await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.sweep().await, 1);
        assert_eq!(registry.channels_count().await, 0);
    }

    #[tokio::test]
    async fn background_sweep_stops_on_shutdown() {
        let registry = Arc::new(ChannelRegistry::new());
        let shutdown = ShutdownHandle::new();

        let handle = Arc::clone(&registry)
            .start_background_sweep(Duration::from_millis(10), shutdown.clone());

        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn background_sweep_removes_stale_channels() {
        let registry =
            Arc::new(ChannelRegistry::new().with_inactivity_ttl(Duration::from_millis(20)));
        registry.apply_event(&advance("ch-1", "u1", 100)).await;

        let shutdown = ShutdownHandle::new();
        let handle = Arc::clone(&registry)
            .start_background_sweep(Duration::from_millis(25), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(registry.channels_count().await, 0);

        shutdown.shutdown();
        let _ = handle.await;
    }
}
