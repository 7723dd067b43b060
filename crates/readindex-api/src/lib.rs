//! Read Index REST API
//!
//! Stateless HTTP/JSON translation of query requests into index operations.
//! Handlers never mutate index state; everything they serve is computed
//! under a channel's shared lock.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use readindex_core::ChannelRegistry;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod models;
pub mod shutdown;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ChannelRegistry>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .route("/health", get(handlers::stats::health_check))
        .route(
            "/channels/:channel_id/posts/:seq/readers",
            get(handlers::readers::get_readers),
        )
        .route(
            "/channels/:channel_id/users/:user_id/cursor",
            get(handlers::cursors::get_user_cursor),
        )
        .route("/read-counts", post(handlers::counts::read_counts))
        .route("/stats", get(handlers::stats::get_stats))
        .merge(swagger)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::stats::health_check,
        handlers::readers::get_readers,
        handlers::cursors::get_user_cursor,
        handlers::counts::read_counts,
        handlers::stats::get_stats,
    ),
    components(schemas(
        models::HealthResponse,
        models::ReadersResponse,
        models::ReadCountsRequest,
        models::UserCursorResponse,
        models::ChannelStats,
        models::StatsResponse,
    )),
    tags(
        (name = "readers", description = "Reader lists and counts per message sequence"),
        (name = "cursors", description = "Per-user read cursors"),
        (name = "stats", description = "Health and operational introspection"),
    ),
    info(
        title = "Read Index API",
        version = "0.1.0",
        description = "Bitmap-backed read-receipt queries over a sliding window of recent messages",
    )
)]
struct ApiDoc;
