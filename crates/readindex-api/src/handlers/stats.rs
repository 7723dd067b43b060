//! Health and introspection endpoints

use axum::extract::State;
use axum::Json;

use crate::models::{ChannelStats, HealthResponse, StatsResponse};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "stats"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Per-channel index statistics", body = StatsResponse)
    ),
    tag = "stats"
)]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let channels: Vec<ChannelStats> = state
        .registry
        .overview()
        .await
        .into_iter()
        .map(|c| ChannelStats {
            channel_id: c.channel_id,
            max_seq: c.max_seq,
            users_count: c.users_count,
            segments: c.segments,
            window_size: c.window_size,
        })
        .collect();

    Json(StatsResponse {
        channels_count: channels.len(),
        channels,
    })
}
