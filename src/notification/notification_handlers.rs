use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{
    notification_dto::{
        BatchCreateRequest, BatchOutcome, BulkUpdateResponse, CreateNotificationRequest,
        NotificationQuery, RouteResponse, UnreadCountResponse,
    },
    notification_models::Notification,
};
use crate::{
    auth::Actor,
    error::{NotificationError, Result},
    middleware::AuthUser,
    routing,
    state::AppState,
};

/// Loads a notification only if it belongs to the caller. Someone else's
/// notification is reported as missing.
async fn owned_notification(state: &AppState, actor: &Actor, id: &str) -> Result<Notification> {
    state
        .store
        .find_by_id(id)
        .await?
        .filter(|n| n.recipient_id == actor.id)
        .ok_or_else(|| NotificationError::NotFound(format!("notification {}", id)).into())
}

/// Get the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "List of notifications", body = Vec<Notification>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>> {
    let notifications = state
        .store
        .query(&actor.id, query.unread_only.unwrap_or(false))
        .await?;

    Ok(Json(notifications))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread notifications", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<UnreadCountResponse>> {
    let unread_count = state.store.unread_count(&actor.id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// Create a notification for a single recipient
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn create_notification(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>)> {
    tracing::debug!("{} creating notification for {}", actor.id, payload.recipient_id);
    let notification = state.notification_service.create_notification(payload).await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Fan the same notification out to several recipients
#[utoipa::path(
    post,
    path = "/api/notifications/batch",
    request_body = BatchCreateRequest,
    responses(
        (status = 200, description = "Per-recipient outcome", body = BatchOutcome),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn batch_create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<BatchCreateRequest>,
) -> Result<Json<BatchOutcome>> {
    tracing::debug!(
        "{} creating batch for {} recipients",
        actor.id,
        payload.recipients.len()
    );
    Ok(Json(state.notification_service.batch_create(payload).await))
}

/// Mark notification as read
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = String, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>> {
    owned_notification(&state, &actor, &notification_id).await?;
    let notification = state.read_state_service.mark_as_read(&notification_id).await?;

    Ok(Json(notification))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Notifications marked as read", body = BulkUpdateResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<BulkUpdateResponse>> {
    let affected = state.read_state_service.mark_all_as_read(&actor.id).await?;
    Ok(Json(BulkUpdateResponse { affected }))
}

/// Remove every read notification of the caller
#[utoipa::path(
    delete,
    path = "/api/notifications/read",
    responses(
        (status = 200, description = "Read notifications removed", body = BulkUpdateResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn clear_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<BulkUpdateResponse>> {
    let affected = state.read_state_service.clear_read(&actor.id).await?;
    Ok(Json(BulkUpdateResponse { affected }))
}

/// Delete a notification
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(
        ("id" = String, Path, description = "Notification ID")
    ),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<StatusCode> {
    owned_notification(&state, &actor, &notification_id).await?;
    state.read_state_service.delete_by_id(&notification_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/notifications",
    responses(
        (status = 200, description = "All notifications removed", body = BulkUpdateResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn delete_all_notifications(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<BulkUpdateResponse>> {
    let affected = state.read_state_service.delete_all(&actor.id).await?;
    Ok(Json(BulkUpdateResponse { affected }))
}

/// Resolve where tapping the notification should navigate for the caller's role
#[utoipa::path(
    get,
    path = "/api/notifications/{id}/route",
    params(
        ("id" = String, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Navigation target, null when none applies", body = RouteResponse),
        (status = 404, description = "Notification not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn resolve_route(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<RouteResponse>> {
    let notification = owned_notification(&state, &actor, &notification_id).await?;
    let route = routing::resolve(notification.kind, actor.role, &notification.payload, &actor.id);

    Ok(Json(RouteResponse { route }))
}
