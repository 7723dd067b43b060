//! Read Index Service
//!
//! Main entry point for the read index service: an in-memory,
//! eventually-consistent index answering "which users have read up to
//! message sequence S" for chat channels.
//!
//! ## Architecture
//! Three long-lived activities share one channel registry:
//! - **Event consumer**: drains `read_cursor_events` from Redis with
//!   consumer-group semantics and applies each advance to the index.
//! - **Inactivity sweeper**: drops channels with no accepted advance for
//!   24 hours.
//! - **HTTP server**: serves reader lists, batch counts, per-user cursors
//!   and stats.
//!
//! ## Configuration
//! All configuration is done via environment variables:
//! - `REDIS_URL`: broker connection (default: redis://localhost:6379/0)
//! - `PORT`: HTTP listener port (default: 8066)
//!
//! ## Logging
//! Controlled via the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=debug cargo run -p readindex-server    # Detailed logs
//! RUST_LOG=info cargo run -p readindex-server     # Standard logs (default)
//! ```
//!
//! ## Durability
//! None, on purpose. The index is rebuilt from the stream: on restart the
//! consumer group resumes from the last acknowledged entry, and anything
//! older than broker retention is reconstructed lazily as channels see new
//! traffic.

use std::sync::Arc;

use readindex_api::shutdown::{serve_with_shutdown, shutdown_signal};
use readindex_api::{create_router, AppState};
use readindex_core::{ChannelRegistry, ShutdownHandle, SWEEP_INTERVAL};
use readindex_ingest::CursorEventConsumer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Configuration
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8066".to_string())
        .parse()?;

    let registry = Arc::new(ChannelRegistry::new());
    let shutdown = ShutdownHandle::new();

    // Event consumer
    tracing::info!(redis_url = %redis_url, "connecting event consumer");
    let consumer = CursorEventConsumer::builder()
        .redis_url(&redis_url)
        .registry(Arc::clone(&registry))
        .build()
        .await?;
    let consumer_handle = tokio::spawn(consumer.run(shutdown.clone()));

    // Inactivity sweeper
    let sweeper_handle =
        Arc::clone(&registry).start_background_sweep(SWEEP_INTERVAL, shutdown.clone());

    // Signal handler feeding the shared shutdown handle
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        tracing::info!(%signal, "initiating graceful shutdown");
        signal_shutdown.shutdown();
    });

    // HTTP server (blocks until shutdown)
    let router = create_router(AppState {
        registry: Arc::clone(&registry),
    });
    tracing::info!(port, "read index service started");
    serve_with_shutdown(router, port, shutdown.clone()).await?;

    // The server can also exit on bind/serve errors surfaced above; make
    // sure the background tasks wind down either way.
    shutdown.shutdown();
    let _ = consumer_handle.await;
    let _ = sweeper_handle.await;

    tracing::info!("read index service shut down");
    Ok(())
}
