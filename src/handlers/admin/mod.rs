// Admin backend handlers.
//
// REST CRUD over the plugin's two tables for the admin frontend. Responses
// use the `{"success": bool, ...}` envelope the frontend expects.

pub mod diagram_trace;
pub mod setting_property;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, put};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::config;
use crate::crud::CrudError;
use crate::plugin::DiagramTracePlugin;
use crate::storage::PersistenceError;

pub fn router(plugin: Arc<DiagramTracePlugin>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route(
            "/admin/traces",
            get(diagram_trace::list).post(diagram_trace::create),
        )
        .route(
            "/admin/traces/:id",
            get(diagram_trace::get_one)
                .put(diagram_trace::update)
                .delete(diagram_trace::delete),
        )
        .route("/admin/settings", get(setting_property::list))
        .route("/admin/settings/:id", put(setting_property::update))
        .with_state(plugin);

    if config().api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config().api.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

async fn health() -> impl IntoResponse {
    Json(json!({ "success": true }))
}

/// Map CRUD errors onto HTTP responses without leaking SQL details.
pub(crate) fn crud_error_response(error: CrudError) -> Response {
    match &error {
        CrudError::NotFound(msg) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": msg })),
        )
            .into_response(),
        CrudError::InvalidPayload { .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": error.to_string() })),
        )
            .into_response(),
        CrudError::Persistence(PersistenceError::NotFound(msg)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": msg })),
        )
            .into_response(),
        CrudError::Persistence(e) => {
            tracing::error!("persistence error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "database error" })),
            )
                .into_response()
        }
        // The mutation committed; only the downstream notification failed.
        // Callers must not retry, so the envelope says the write stuck.
        CrudError::PostCommitHook { .. } => {
            tracing::error!("post-commit hook error: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": error.to_string(),
                    "durable": true
                })),
            )
                .into_response()
        }
    }
}
