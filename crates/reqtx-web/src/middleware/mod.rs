//! HTTP edge of the transaction pipeline.
//!
//! - `transaction`: axum middleware running begin -> handler -> close
//! - `flush`: optional inner layer flushing the session right after the handler
//! - `error_response`: JSON rendering of `TxError`

pub mod flush;
pub mod transaction;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use reqtx_core::error::TxError;

pub use flush::{flush_middleware, SessionResolver};
pub use transaction::{transaction_middleware, CoordinatorProxy, CLIENT_CLOSED_REQUEST};

/// Programming, resolution and store errors surface as 500; cancellation as 503.
pub fn error_response(err: &TxError) -> Response {
    let status = if err.is_cancellation() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = json!({
        "code": err.client_code().as_str(),
        "msg": err.to_string(),
    });
    (status, Json(body)).into_response()
}
