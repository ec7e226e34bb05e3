use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use utoipa::ToSchema;

use crate::{
    auth::Role,
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Push channel receivers the event was handed to. Subscriptions of other
    /// recipients are counted as well; their listeners discard it.
    pub delivered: usize,
}

/// Subscribe to the caller's notification events via Server-Sent Events
#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    responses(
        (status = 200, description = "SSE stream of delivered, unread_count and error events"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn notification_stream(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    state.listener.subscribe(&actor.id, tx);

    let stream = UnboundedReceiverStream::new(rx).filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                tracing::warn!("Dropping unencodable listener event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Tear down the caller's push subscription
#[utoipa::path(
    post,
    path = "/api/session/end",
    responses(
        (status = 204, description = "Subscription removed, or there was none"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "session",
    security(("bearer_auth" = []))
)]
pub async fn end_session(State(state): State<AppState>, AuthUser(actor): AuthUser) -> StatusCode {
    state.listener.unsubscribe(&actor.id);
    StatusCode::NO_CONTENT
}

/// Publish a raw insert event onto the push channel
#[utoipa::path(
    post,
    path = "/api/events",
    responses(
        (status = 202, description = "Event published", body = IngestResponse),
        (status = 400, description = "Event is not addressed to a recipient"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    tag = "events",
    security(("bearer_auth" = []))
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(event): Json<Value>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    if actor.role != Role::Admin {
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }
    if event.get("recipient_uid").and_then(Value::as_str).is_none() {
        return Err(AppError::BadRequest("recipient_uid is required".to_string()));
    }

    let delivered = state.push_channel.publish(event);
    tracing::debug!("Published push event to {} subscriptions", delivered);

    Ok((StatusCode::ACCEPTED, Json(IngestResponse { delivered })))
}
