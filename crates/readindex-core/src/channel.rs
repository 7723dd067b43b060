//! Per-channel segmented reader index.
//!
//! A [`ChannelState`] holds three views of the same population of readers:
//!
//! - `user_cursors` maps each user to the last sequence they have read,
//! - `user_index` / `index_to_user` assign each user a dense `u32` slot on
//!   first sighting (two collections owning the same data, never reused),
//! - `segments` is an ordered list of fixed-width [`ReadSegment`]s whose
//!   bitmaps record which slots have read into each range.
//!
//! Writes touch at most `window_size / SEGMENT_SIZE` bitmaps; reads union a
//! suffix of the segment list. Old segments are pruned once they fall behind
//! the sliding retention window, so queries are authoritative only within
//! `[max_seq - window_size, max_seq]` and best-effort before it.

use std::collections::{BTreeMap, HashMap};

use roaring::RoaringBitmap;

use crate::segment::{ReadSegment, SEGMENT_SIZE};

/// Default retention horizon in sequence units.
pub const DEFAULT_WINDOW_SIZE: i64 = 1_000;

/// Default cap on reader lists returned by [`ChannelState::readers`].
pub const DEFAULT_READERS_LIMIT: usize = 50;

/// Result of dispatching one event to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The cursor advanced and the segment bitmaps were updated.
    Applied,
    /// The event did not advance the cursor (duplicate or out-of-order
    /// delivery). State is unchanged.
    NoOp,
}

/// Reader list for one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadersPage {
    /// Total number of users whose cursor covers the sequence.
    pub count: u64,
    /// User ids in slot-ascending order, at most `limit` of them.
    pub readers: Vec<String>,
    /// True iff `count` exceeds the requested limit.
    pub truncated: bool,
}

/// In-memory read state for one channel.
pub struct ChannelState {
    channel_id: String,
    max_seq: i64,
    user_cursors: HashMap<String, i64>,
    user_index: HashMap<String, u32>,
    index_to_user: Vec<String>,
    segments: Vec<ReadSegment>,
    window_size: i64,
    last_activity_ms: i64,
}

impl ChannelState {
    pub fn new(channel_id: impl Into<String>, window_size: i64, now_ms: i64) -> Self {
        Self {
            channel_id: channel_id.into(),
            max_seq: 0,
            user_cursors: HashMap::new(),
            user_index: HashMap::new(),
            index_to_user: Vec::new(),
            segments: Vec::new(),
            window_size,
            last_activity_ms: now_ms,
        }
    }

    /// Apply one cursor advance for `user_id`.
    ///
    /// Idempotent and monotonic: a `new_last_seq` that does not exceed the
    /// user's current cursor is a no-op, which makes duplicate and
    /// out-of-order delivery safe. `now_ms` stamps the channel's last
    /// activity when the advance is accepted.
    pub fn apply(&mut self, user_id: &str, new_last_seq: i64, now_ms: i64) -> ApplyOutcome {
        let slot = self.slot_for(user_id);

        let old = self.user_cursors.get(user_id).copied().unwrap_or(0);
        if new_last_seq <= old {
            return ApplyOutcome::NoOp;
        }

        self.user_cursors.insert(user_id.to_string(), new_last_seq);
        self.last_activity_ms = now_ms;

        if new_last_seq > self.max_seq {
            self.max_seq = new_last_seq;
            self.extend_to(new_last_seq);
        }

        for seg in &mut self.segments {
            if seg.start_seq > new_last_seq {
                break;
            }
            // Segments ending at or below `old` already contain the slot.
            if seg.end_seq > old {
                seg.readers.insert(slot);
            }
        }

        self.prune();
        ApplyOutcome::Applied
    }

    /// Users whose cursor covers `seq`, capped at `limit`.
    ///
    /// Authoritative for sequences inside the retention window; for older
    /// sequences the result reflects only the coverage still recorded in
    /// retained segments.
    pub fn readers(&self, seq: i64, limit: usize) -> ReadersPage {
        let mut merged = RoaringBitmap::new();
        for seg in &self.segments {
            if seg.end_seq >= seq {
                merged |= &seg.readers;
            }
        }

        let count = merged.len();
        let readers: Vec<String> = merged
            .iter()
            .take(limit)
            .filter_map(|slot| self.index_to_user.get(slot as usize).cloned())
            .collect();

        ReadersPage {
            count,
            readers,
            truncated: count > limit as u64,
        }
    }

    /// Reader count for each requested sequence.
    ///
    /// The qualifying segments for a sequence form a suffix of the segment
    /// list, so walking the requests highest-first lets one running union
    /// serve the whole batch, touching each bitmap once.
    pub fn read_counts(&self, seqs: &[i64]) -> BTreeMap<i64, u64> {
        let mut counts = BTreeMap::new();
        if seqs.is_empty() {
            return counts;
        }

        let mut sorted = seqs.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut merged = RoaringBitmap::new();
        let mut idx = self.segments.len();
        for &seq in sorted.iter().rev() {
            while idx > 0 && self.segments[idx - 1].end_seq >= seq {
                idx -= 1;
                merged |= &self.segments[idx].readers;
            }
            counts.insert(seq, merged.len());
        }
        counts
    }

    /// Last sequence applied for `user_id`, if any advance was accepted.
    pub fn cursor(&self, user_id: &str) -> Option<i64> {
        self.user_cursors.get(user_id).copied()
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn max_seq(&self) -> i64 {
        self.max_seq
    }

    pub fn users_count(&self) -> usize {
        self.user_cursors.len()
    }

    pub fn segments_count(&self) -> usize {
        self.segments.len()
    }

    pub fn window_size(&self) -> i64 {
        self.window_size
    }

    /// Epoch-millisecond timestamp of the last accepted advance (or channel
    /// creation). The inactivity sweeper compares this against its TTL.
    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms
    }

    /// Slot for `user_id`, assigning the next dense slot on first sighting.
    /// Slots are never reclaimed while the channel lives.
    fn slot_for(&mut self, user_id: &str) -> u32 {
        if let Some(&slot) = self.user_index.get(user_id) {
            return slot;
        }
        let slot = self.index_to_user.len() as u32;
        self.user_index.insert(user_id.to_string(), slot);
        self.index_to_user.push(user_id.to_string());
        slot
    }

    /// Append empty segments until the last one covers `max_seq`. The first
    /// segment ever created starts at 0.
    fn extend_to(&mut self, max_seq: i64) {
        if self.segments.is_empty() {
            self.segments.push(ReadSegment::starting_at(0));
        }
        let mut last_end = self.segments[self.segments.len() - 1].end_seq;
        while last_end < max_seq {
            self.segments.push(ReadSegment::starting_at(last_end + 1));
            last_end += SEGMENT_SIZE;
        }
    }

    /// Drop segments that fell behind the retention window. A window size
    /// of zero or less disables pruning.
    fn prune(&mut self) {
        if self.window_size <= 0 {
            return;
        }
        let threshold = self.max_seq - self.window_size;
        if threshold <= 0 {
            return;
        }
        self.segments.retain(|seg| seg.end_seq >= threshold);
    }
}
