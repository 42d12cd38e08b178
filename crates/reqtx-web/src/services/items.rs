use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;

use crate::app_state::AppState;
use crate::context::RequestItems;
use crate::middleware::error_response;

/// Endpoint identities served by this module.
pub const ROUTES: &[&str] = &["GET /items/:key", "PUT /items/:key", "POST /items/:key/reject"];

pub async fn get_item(
    State(state): State<AppState>,
    Extension(items): Extension<RequestItems>,
    Path(key): Path<String>,
) -> Response {
    let session = match state.sessions().session(&items) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    match session.get(&key) {
        Some(value) => (StatusCode::OK, Json(json!({ "key": key, "value": value }))).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Stage a write; persisted only if the request commits.
pub async fn put_item(
    State(state): State<AppState>,
    Extension(items): Extension<RequestItems>,
    Path(key): Path<String>,
    body: String,
) -> Response {
    let staged = state
        .sessions()
        .session(&items)
        .and_then(|s| s.put(&key, &body));
    if let Err(e) = staged {
        return error_response(&e);
    }
    (StatusCode::CREATED, Json(json!({ "key": key, "value": body }))).into_response()
}

/// Stage a write, then refuse the request. The write must never persist.
pub async fn reject_item(
    State(state): State<AppState>,
    Extension(items): Extension<RequestItems>,
    Path(key): Path<String>,
    body: String,
) -> Response {
    let staged = state
        .sessions()
        .session(&items)
        .and_then(|s| s.put(&key, &body));
    if let Err(e) = staged {
        return error_response(&e);
    }
    (StatusCode::CONFLICT, "rejected").into_response()
}
