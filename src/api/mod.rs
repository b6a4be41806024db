//! HTTP surface for the archive
//!
//! Exposes the archive mapping to external callers: message-id registration
//! and lookup, plus document download through the channel. The legacy
//! GET-based routes are kept verbatim for existing consumers.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::channel::DeliveryChannel;
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::mirror::ChannelMirror;
use crate::types::Event;

pub mod routes;

pub use routes::MessageRef;

/// OpenAPI documentation for the archive surface
#[derive(OpenApi)]
#[openapi(
    paths(
        routes::set_message_id,
        routes::get_message_id,
        routes::download,
        routes::health_check,
    ),
    components(schemas(MessageRef)),
    tags(
        (name = "archive", description = "Archived message registration and lookup")
    )
)]
pub struct ApiDoc;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Archive database
    pub db: Arc<Database>,
    /// Delivery channel (used by the download route)
    pub channel: Arc<dyn DeliveryChannel>,
    /// Service configuration
    pub config: Arc<Config>,
    /// Mirror event broadcast (served over SSE)
    pub events: tokio::sync::broadcast::Sender<Event>,
}

impl AppState {
    /// Build the API state from a mirror instance
    pub fn from_mirror(mirror: &ChannelMirror) -> Self {
        Self {
            db: Arc::clone(&mirror.db),
            channel: Arc::clone(&mirror.channel),
            config: mirror.config(),
            events: mirror.event_tx.clone(),
        }
    }
}

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Archive
/// - `GET /set_message_id/:book_id/:file_type/:message_id` - Record a mapping
/// - `GET /get_message_id/:book_id/:file_type` - Look up a mapping
/// - `GET /download/:book_id/:file_type` - Fetch the archived document bytes
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/set_message_id/:book_id/:file_type/:message_id",
            get(routes::set_message_id),
        )
        .route(
            "/get_message_id/:book_id/:file_type",
            get(routes::get_message_id),
        )
        .route("/download/:book_id/:file_type", get(routes::download))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Start the API server on the configured bind address.
///
/// Serves the router until the process stops; runs concurrently with the
/// mirror run.
pub async fn start_api_server(state: AppState) -> Result<()> {
    let host = state.config.api.host.clone();
    let port = state.config.api.port;

    tracing::info!(host = %host, port, "Starting API server");

    let app = create_router(state);

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .map_err(Error::Io)?;

    tracing::info!(host = %host, port, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
