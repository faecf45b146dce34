use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use super::crud_error_response;
use crate::plugin::DiagramTracePlugin;

/// GET /admin/settings - List this plugin's setting properties
pub async fn list(State(plugin): State<Arc<DiagramTracePlugin>>) -> impl IntoResponse {
    match plugin.settings_handler().retrieve_all().await {
        Ok(tuples) => Json(json!({ "success": true, "data": tuples })).into_response(),
        Err(e) => crud_error_response(e),
    }
}

/// PUT /admin/settings/:id - Update a setting property
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

    match plugin.settings_handler().update(payload).await {
        Ok(tuple) => Json(json!({ "success": true, "data": tuple })).into_response(),
        Err(e) => crud_error_response(e),
    }
}
