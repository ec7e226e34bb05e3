use crate::{
    auth::Role,
    middleware::auth_middleware,
    notification::{
        notification_dto::*, notification_handlers, Notification, NotificationType,
    },
    realtime::{self, handler::IngestResponse},
    routing::Route,
    state::AppState,
};
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        notification_handlers::get_notifications,
        notification_handlers::unread_count,
        notification_handlers::create_notification,
        notification_handlers::batch_create,
        notification_handlers::mark_notification_read,
        notification_handlers::mark_all_read,
        notification_handlers::clear_read,
        notification_handlers::delete_notification,
        notification_handlers::delete_all_notifications,
        notification_handlers::resolve_route,
        realtime::handler::notification_stream,
        realtime::handler::end_session,
        realtime::handler::ingest_event,
    ),
    components(
        schemas(
            Notification,
            NotificationType,
            CreateNotificationRequest,
            BatchCreateRequest,
            BatchFailure,
            BatchOutcome,
            UnreadCountResponse,
            BulkUpdateResponse,
            RouteResponse,
            Route,
            Role,
            IngestResponse,
        )
    ),
    tags(
        (name = "notifications", description = "Notification endpoints"),
        (name = "session", description = "Session lifecycle"),
        (name = "events", description = "Push channel ingress")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let notification_routes = Router::new()
        .route(
            "/",
            get(notification_handlers::get_notifications)
                .post(notification_handlers::create_notification)
                .delete(notification_handlers::delete_all_notifications),
        )
        .route("/batch", post(notification_handlers::batch_create))
        .route("/unread-count", get(notification_handlers::unread_count))
        .route("/read-all", patch(notification_handlers::mark_all_read))
        .route("/read", delete(notification_handlers::clear_read))
        .route("/stream", get(realtime::notification_stream))
        .route("/:id", delete(notification_handlers::delete_notification))
        .route("/:id/read", patch(notification_handlers::mark_notification_read))
        .route("/:id/route", get(notification_handlers::resolve_route));

    // Everything under /api requires a bearer token
    let api_routes = Router::new()
        .nest("/notifications", notification_routes)
        .route("/session/end", post(realtime::end_session))
        .route("/events", post(realtime::ingest_event))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
