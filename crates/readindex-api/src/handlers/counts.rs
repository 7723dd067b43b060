//! Batch read-count endpoint

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;

use crate::models::ReadCountsRequest;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/read-counts",
    request_body = ReadCountsRequest,
    responses(
        (status = 200, description = "Object keyed by sequence, value is the reader count"),
        (status = 400, description = "Malformed request body")
    ),
    tag = "readers"
)]
pub async fn read_counts(
    State(state): State<AppState>,
    Json(request): Json<ReadCountsRequest>,
) -> Json<BTreeMap<i64, u64>> {
    let channel = match state.registry.get(&request.channel_id).await {
        Some(channel) => channel,
        // Unknown channel reads as zero readers everywhere.
        None => return Json(request.seqs.iter().map(|&seq| (seq, 0)).collect()),
    };

    let counts = channel.read().await.read_counts(&request.seqs);
    Json(counts)
}
