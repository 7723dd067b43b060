//! Reader-list endpoint

use axum::extract::{Path, Query, State};
use axum::Json;
use readindex_core::DEFAULT_READERS_LIMIT;

use crate::models::{ReadersParams, ReadersResponse};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/channels/{channel_id}/posts/{seq}/readers",
    params(
        ("channel_id" = String, Path, description = "Channel identifier"),
        ("seq" = i64, Path, description = "Message sequence number"),
        ReadersParams,
    ),
    responses(
        (status = 200, description = "Users whose cursor covers the sequence", body = ReadersResponse)
    ),
    tag = "readers"
)]
pub async fn get_readers(
    State(state): State<AppState>,
    Path((channel_id, seq)): Path<(String, i64)>,
    Query(params): Query<ReadersParams>,
) -> Json<ReadersResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_READERS_LIMIT);

    // A channel we have never indexed has no readers at any sequence.
    let channel = match state.registry.get(&channel_id).await {
        Some(channel) => channel,
        None => return Json(ReadersResponse::empty()),
    };

    let page = channel.read().await.readers(seq, limit);
    Json(ReadersResponse {
        count: page.count,
        readers: page.readers,
        truncated: page.truncated,
    })
}
