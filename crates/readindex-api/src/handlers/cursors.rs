//! Per-user cursor endpoint

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::models::UserCursorResponse;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/channels/{channel_id}/users/{user_id}/cursor",
    params(
        ("channel_id" = String, Path, description = "Channel identifier"),
        ("user_id" = String, Path, description = "User identifier"),
    ),
    responses(
        (status = 200, description = "The user's read cursor in the channel", body = UserCursorResponse),
        (status = 404, description = "Channel not indexed or user has no cursor")
    ),
    tag = "cursors"
)]
pub async fn get_user_cursor(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(String, String)>,
) -> Result<Json<UserCursorResponse>, StatusCode> {
    let channel = state
        .registry
        .get(&channel_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let last_seq = channel
        .read()
        .await
        .cursor(&user_id)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(UserCursorResponse {
        channel_id,
        user_id,
        last_seq,
    }))
}
