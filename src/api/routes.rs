//! Archive surface handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::types::{BookId, FileVariant, MessageId};

use super::AppState;

/// A resolved archive mapping: the message and the channel holding it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageRef {
    /// Channel message id holding the document
    #[schema(value_type = i64)]
    pub message_id: MessageId,
    /// Channel the message lives in
    pub channel_id: i64,
}

/// GET /set_message_id/:book_id/:file_type/:message_id - Record a mapping
#[utoipa::path(
    get,
    path = "/set_message_id/{book_id}/{file_type}/{message_id}",
    tag = "archive",
    params(
        ("book_id" = i64, Path, description = "Book id"),
        ("file_type" = String, Path, description = "File variant tag"),
        ("message_id" = i64, Path, description = "Channel message id")
    ),
    responses(
        (status = 200, description = "Mapping recorded"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn set_message_id(
    State(state): State<AppState>,
    Path((book_id, file_type, message_id)): Path<(i64, String, i64)>,
) -> Response {
    let variant = FileVariant::from(file_type);
    match state
        .db
        .set_message_id(BookId(book_id), &variant, MessageId(message_id))
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(book_id, variant = %variant, error = %e, "Failed to record mapping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to record mapping"})),
            )
                .into_response()
        }
    }
}

/// GET /get_message_id/:book_id/:file_type - Look up a mapping
///
/// Answers `null` for unarchived pairs, matching the legacy surface.
#[utoipa::path(
    get,
    path = "/get_message_id/{book_id}/{file_type}",
    tag = "archive",
    params(
        ("book_id" = i64, Path, description = "Book id"),
        ("file_type" = String, Path, description = "File variant tag")
    ),
    responses(
        (status = 200, description = "The mapping, or JSON null when unarchived", body = MessageRef),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_message_id(
    State(state): State<AppState>,
    Path((book_id, file_type)): Path<(i64, String)>,
) -> Response {
    let variant = FileVariant::from(file_type);
    match state.db.get_message_id(BookId(book_id), &variant).await {
        Ok(found) => Json(found.map(|message_id| MessageRef {
            message_id,
            channel_id: state.config.channel.channel_id,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(book_id, variant = %variant, error = %e, "Failed to look up mapping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to look up mapping"})),
            )
                .into_response()
        }
    }
}

/// GET /download/:book_id/:file_type - Fetch the archived document bytes
#[utoipa::path(
    get,
    path = "/download/{book_id}/{file_type}",
    tag = "archive",
    params(
        ("book_id" = i64, Path, description = "Book id"),
        ("file_type" = String, Path, description = "File variant tag")
    ),
    responses(
        (status = 200, description = "Raw document bytes"),
        (status = 204, description = "Pair not archived or message gone"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path((book_id, file_type)): Path<(i64, String)>,
) -> Response {
    let variant = FileVariant::from(file_type);

    let message_id = match state.db.get_message_id(BookId(book_id), &variant).await {
        Ok(Some(id)) => id,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(book_id, variant = %variant, error = %e, "Failed to look up mapping");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state
        .channel
        .fetch_document(state.config.channel.channel_id, message_id)
        .await
    {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(
                book_id,
                variant = %variant,
                message_id = message_id.0,
                error = %e,
                "Failed to fetch document from channel"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "archive",
    responses((status = 200, description = "Service is alive"))
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// GET /openapi.json - OpenAPI specification
pub async fn openapi_spec() -> impl IntoResponse {
    use utoipa::OpenApi;
    Json(super::ApiDoc::openapi())
}

/// GET /events - Server-sent events stream of mirror lifecycle events
pub async fn event_stream(
    State(state): State<AppState>,
) -> axum::response::sse::Sse<
    impl futures::Stream<Item = std::result::Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::{KeepAlive, Sse};
    use futures::StreamExt;
    use tokio_stream::wrappers::BroadcastStream;

    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|event| async move {
        match event {
            Ok(event) => serde_json::to_string(&event).ok().map(|data| {
                Ok::<_, std::convert::Infallible>(
                    axum::response::sse::Event::default().data(data),
                )
            }),
            // Lagged receivers just skip what they missed.
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
