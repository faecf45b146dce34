use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use super::crud_error_response;
use crate::plugin::DiagramTracePlugin;

/// GET /admin/traces - List all configured traces
pub async fn list(State(plugin): State<Arc<DiagramTracePlugin>>) -> impl IntoResponse {
    match plugin.trace_handler().retrieve_all().await {
        Ok(tuples) => Json(json!({ "success": true, "data": tuples })).into_response(),
        Err(e) => crud_error_response(e),
    }
}

/// POST /admin/traces - Create a trace
pub async fn create(
    State(plugin): State<Arc<DiagramTracePlugin>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let Value::Object(payload) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "expected a JSON object" })),
        )
            .into_response();
    };

    match plugin.trace_handler().create(payload).await {
        Ok(tuple) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": tuple })),
        )
            .into_response(),
        Err(e) => crud_error_response(e),
    }
}

/// GET /admin/traces/:id - Get a single trace
pub async fn get_one(
    State(plugin): State<Arc<DiagramTracePlugin>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match plugin.trace_handler().retrieve_by_id(id).await {
        Ok(Some(tuple)) => Json(json!({ "success": true, "data": tuple })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": format!("trace {} not found", id) })),
        )
            .into_response(),
        Err(e) => crud_error_response(e),
    }
}

/// PUT /admin/traces/:id - Update a trace
///
/// The path key wins over whatever key the payload carries.
pub async fn update(
    State(plugin): State<Arc<DiagramTracePlugin>>,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let Value::Object(mut payload) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "expected a JSON object" })),
        )
            .into_response();
    };
    payload.insert("id".to_string(), json!(id));

    match plugin.trace_handler().update(payload).await {
        Ok(tuple) => Json(json!({ "success": true, "data": tuple })).into_response(),
        Err(e) => crud_error_response(e),
    }
}

/// DELETE /admin/traces/:id - Delete a trace
pub async fn delete(
    State(plugin): State<Arc<DiagramTracePlugin>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match plugin.trace_handler().delete(id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => crud_error_response(e),
    }
}
