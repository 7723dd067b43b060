//! End-to-end scenarios for the reader index, driven through the public
//! registry API the way the ingest and query paths use it.

use std::sync::Arc;

use readindex_core::{
    now_ms, ApplyOutcome, ChannelRegistry, ReadCursorEvent, DEFAULT_READERS_LIMIT,
    EVENT_TYPE_READ_ADVANCED,
};

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
async fn single_advance_is_visible_to_queries() {
    let registry = ChannelRegistry::new();
    registry.apply_event(&advance("C1", "U1", 150)).await;

    let state = registry.get("C1").await.unwrap();
    let state = state.read().await;

    assert_eq!(state.max_seq(), 150);
    let page = state.readers(100, DEFAULT_READERS_LIMIT);
    assert_eq!(page.count, 1);
    assert_eq!(page.readers, vec!["U1"]);
    assert_eq!(state.readers(200, DEFAULT_READERS_LIMIT).count, 0);
}

#[tokio::test]
async fn redelivered_event_counts_once() {
    let registry = ChannelRegistry::new();
    let event = advance("C1", "U1", 150);

    assert_eq!(registry.apply_event(&event).await, ApplyOutcome::Applied);
    assert_eq!(registry.apply_event(&event).await, ApplyOutcome::NoOp);

    let state = registry.get("C1").await.unwrap();
    let state = state.read().await;
    assert_eq!(state.cursor("U1"), Some(150));
    assert_eq!(state.readers(100, DEFAULT_READERS_LIMIT).count, 1);
}

#[tokio::test]
async fn stale_event_after_reorder_is_ignored() {
    let registry = ChannelRegistry::new();
    registry.apply_event(&advance("C1", "U1", 300)).await;
    assert_eq!(
        registry.apply_event(&advance("C1", "U1", 120)).await,
        ApplyOutcome::NoOp
    );

    let state = registry.get("C1").await.unwrap();
    let state = state.read().await;
    assert_eq!(state.cursor("U1"), Some(300));
    assert_eq!(state.readers(250, DEFAULT_READERS_LIMIT).count, 1);
}

#[tokio::test]
async fn batch_counts_over_mixed_cursors() {
    let registry = ChannelRegistry::new();
    registry.apply_event(&advance("C1", "U1", 150)).await;
    registry.apply_event(&advance("C1", "U2", 80)).await;
    registry.apply_event(&advance("C1", "U3", 400)).await;

    let state = registry.get("C1").await.unwrap();
    let counts = state.read().await.read_counts(&[50, 100, 200, 500]);

    assert_eq!(counts[&50], 3);
    assert_eq!(counts[&100], 2);
    assert_eq!(counts[&200], 1);
    assert_eq!(counts[&500], 0);
}

#[tokio::test]
async fn old_segments_fall_out_of_the_window() {
    let registry = ChannelRegistry::new();
    registry.apply_event(&advance("C1", "U1", 5_000)).await;

    let state = registry.get("C1").await.unwrap();
    let state = state.read().await;

    assert_eq!(state.max_seq(), 5_000);
    // window_size 1000: 11 segments remain, covering [4000, 5099].
    assert_eq!(state.segments_count(), 11);
    assert_eq!(state.readers(4_500, DEFAULT_READERS_LIMIT).count, 1);
}

#[tokio::test]
async fn reader_list_respects_caller_limit() {
    let registry = ChannelRegistry::new();
    for i in 0..10 {
        registry
            .apply_event(&advance("C1", &format!("U{i}"), 100 + i * 17))
            .await;
    }

    let state = registry.get("C1").await.unwrap();
    let page = state.read().await.readers(100, 3);

    assert_eq!(page.count, 10);
    assert_eq!(page.readers.len(), 3);
    assert!(page.truncated);
}

#[tokio::test]
async fn channels_are_isolated_from_each_other() {
    let registry = ChannelRegistry::new();
    registry.apply_event(&advance("C1", "U1", 150)).await;
    registry.apply_event(&advance("C2", "U1", 900)).await;

    let c1 = registry.get("C1").await.unwrap();
    let c2 = registry.get("C2").await.unwrap();
    assert_eq!(c1.read().await.cursor("U1"), Some(150));
    assert_eq!(c2.read().await.cursor("U1"), Some(900));
    assert_eq!(c1.read().await.readers(500, DEFAULT_READERS_LIMIT).count, 0);
    assert_eq!(c2.read().await.readers(500, DEFAULT_READERS_LIMIT).count, 1);
}

/// Shuffle the event multiset with a deterministic xorshift and verify the
/// terminal cursor map and query answers are permutation-independent.
#[tokio::test]
async fn any_delivery_order_converges_to_the_same_state() {
    let events: Vec<(&str, i64)> = vec![
        ("U1", 300),
        ("U1", 120),
        ("U2", 80),
        ("U1", 150),
        ("U2", 400),
        ("U3", 999),
        ("U3", 5),
    ];
    let probes = [0i64, 5, 80, 120, 300, 400, 999, 1_000];

    let mut baseline: Option<Vec<u64>> = None;
    for seed in [1u64, 7, 42, 1_234, 99_999] {
        let mut order: Vec<usize> = (0..events.len()).collect();
        let mut state = seed;
        for i in (1..order.len()).rev() {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            order.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let registry = ChannelRegistry::new();
        for &i in &order {
            let (user, seq) = events[i];
            registry.apply_event(&advance("C1", user, seq)).await;
        }

        let handle = registry.get("C1").await.unwrap();
        let channel = handle.read().await;
        assert_eq!(channel.cursor("U1"), Some(300));
        assert_eq!(channel.cursor("U2"), Some(400));
        assert_eq!(channel.cursor("U3"), Some(999));

        let counts: Vec<u64> = probes
            .iter()
            .map(|&s| channel.readers(s, usize::MAX).count)
            .collect();
        match &baseline {
            None => baseline = Some(counts),
            Some(expected) => assert_eq!(&counts, expected, "seed {seed} diverged"),
        }
    }
}

/// Concurrent applies to one channel serialize under its write lock and
/// keep last-write-wins-by-sequence semantics per user.
#[tokio::test]
async fn concurrent_applies_settle_on_the_max_sequence() {
    let registry = Arc::new(ChannelRegistry::new());

    let mut tasks = Vec::new();
    for seq in [100i64, 700, 300, 500, 900, 200] {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            registry.apply_event(&advance("C1", "U1", seq)).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let state = registry.get("C1").await.unwrap();
    let state = state.read().await;
    assert_eq!(state.cursor("U1"), Some(900));
    assert_eq!(state.readers(900, DEFAULT_READERS_LIMIT).count, 1);
}
