//! API models for REST endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Users whose read cursor covers a message sequence.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadersResponse {
    /// Total readers at the sequence, independent of the limit.
    pub count: u64,
    /// At most `limit` user ids, in stable slot order.
    pub readers: Vec<String>,
    /// True iff `count` exceeds the requested limit.
    pub truncated: bool,
}

impl ReadersResponse {
    /// Response for a channel that has never been indexed.
    pub fn empty() -> Self {
        Self {
            count: 0,
            readers: Vec::new(),
            truncated: false,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadersParams {
    /// Maximum number of user ids to return (default 50).
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadCountsRequest {
    pub channel_id: String,
    pub seqs: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserCursorResponse {
    pub channel_id: String,
    pub user_id: String,
    /// Last sequence the user has read in the channel.
    pub last_seq: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChannelStats {
    pub channel_id: String,
    pub max_seq: i64,
    pub users_count: usize,
    pub segments: usize,
    pub window_size: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub channels_count: usize,
    pub channels: Vec<ChannelStats>,
}
