//! Session flush middleware (route layer).
//!
//! Checks the request's session is open before the handler and flushes it
//! right after, so store errors surface while the handler's response can
//! still be replaced. Install it inside the transaction middleware; nothing
//! should touch the store after it ran.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use reqtx_core::error::TxError;
use reqtx_core::is_success_status;

use super::error_response;
use crate::container::{ResolveArgs, Resolver};
use crate::context::{CancellationToken, RequestItems};
use crate::policy::endpoint_id;
use crate::session::Session;

pub type SessionResolver = Arc<dyn Resolver<dyn Session>>;

/// Flushes only when the request was not cancelled, the status is a success
/// and the session still has an active transaction.
pub async fn flush_middleware(
    State(sessions): State<SessionResolver>,
    mut req: Request,
    next: Next,
) -> Response {
    let endpoint = match req.extensions().get::<MatchedPath>() {
        Some(path) => endpoint_id(req.method(), path.as_str()),
        None => return next.run(req).await,
    };

    let items = match req.extensions().get::<RequestItems>() {
        Some(items) => items.clone(),
        None => {
            let items = RequestItems::new();
            req.extensions_mut().insert(items.clone());
            items
        }
    };
    let cancel = req
        .extensions()
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_default();

    let session = match sessions.resolve(&ResolveArgs::new().in_scope(items)).await {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    if !session.is_open() {
        sessions.release(session);
        let e = TxError::Programming(format!("{endpoint}: current session is not open"));
        tracing::error!(endpoint = %endpoint, error = %e, "cannot run handler");
        return error_response(&e);
    }

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let result = if !cancel.is_cancelled() && is_success_status(status) && session.in_transaction() {
        tracing::info!(endpoint = %endpoint, "flush request to the store");
        session.flush(&cancel).await
    } else {
        Ok(())
    };
    sessions.release(session);

    match result {
        Ok(()) => response,
        Err(e) => {
            tracing::error!(endpoint = %endpoint, error = %e, "flush after handler failed");
            error_response(&e)
        }
    }
}
