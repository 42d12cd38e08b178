//! Transaction middleware (route layer).
//!
//! Responsibilities:
//! - Derive the endpoint identity from the matched route
//! - Install the request-scoped items and cancellation token
//! - Obtain the coordinator through its cached resolution proxy
//! - begin -> inner handler -> close, with close guaranteed to run
//!
//! Close runs on a spawned task so a client disconnect cannot interrupt it.
//! If the request future is dropped before close was scheduled, a guard
//! cancels the request and schedules close itself.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use reqtx_core::error::TxError;

use super::error_response;
use crate::container::{CachedResolutionProxy, ResolveArgs};
use crate::context::{CancellationToken, RequestItems};
use crate::policy::endpoint_id;
use crate::transaction::{BeginOutcome, TransactionCoordinator};

/// Status reported to close when the client went away before a response existed.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

pub type CoordinatorProxy = Arc<CachedResolutionProxy<TransactionCoordinator>>;

/// Runs begin, the handler, then close.
///
/// Once the handler produced a response, close no longer listens to the
/// client: a disconnect after that point lets the commit finish. Only a
/// request dropped while the handler is still running is cancelled.
pub async fn transaction_middleware(
    State(proxy): State<CoordinatorProxy>,
    mut req: Request,
    next: Next,
) -> Response {
    // No matched route: the response will be a 4xx and no transaction is needed.
    let Some(path) = req.extensions().get::<MatchedPath>().map(|p| p.as_str().to_string()) else {
        return next.run(req).await;
    };
    let endpoint = endpoint_id(req.method(), &path);

    let items = match req.extensions().get::<RequestItems>() {
        Some(items) => items.clone(),
        None => {
            let items = RequestItems::new();
            req.extensions_mut().insert(items.clone());
            items
        }
    };
    let cancel = match req.extensions().get::<CancellationToken>() {
        Some(cancel) => cancel.clone(),
        None => {
            let cancel = CancellationToken::new();
            req.extensions_mut().insert(cancel.clone());
            cancel
        }
    };

    let coordinator = match proxy.obtain(ResolveArgs::new().in_scope(items.clone())).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(endpoint = %endpoint, error = %e, "cannot obtain transaction coordinator");
            return error_response(&e);
        }
    };

    let mut guard = CloseGuard::arm(
        Arc::clone(&coordinator),
        endpoint.clone(),
        items.clone(),
        cancel.clone(),
    );

    match coordinator.begin(&endpoint, req.headers(), &items).await {
        Ok(BeginOutcome::Skipped) => {
            guard.disarm();
            return next.run(req).await;
        }
        Ok(BeginOutcome::Opened { .. }) => {}
        Err(e) => {
            guard.disarm();
            tracing::error!(endpoint = %endpoint, error = %e, "begin of request transaction failed");
            return error_response(&e);
        }
    }

    let response = next.run(req).await;
    guard.disarm();

    let status = response.status().as_u16();
    let closing = tokio::spawn(async move {
        coordinator.close(&endpoint, &items, status, &cancel).await
    });

    match closing.await {
        Ok(Ok(_)) => response,
        Ok(Err(e)) => error_response(&e),
        Err(join) => {
            tracing::error!(error = %join, "close phase of request transaction aborted");
            error_response(&TxError::Programming(format!("close phase aborted: {join}")))
        }
    }
}

struct PendingClose {
    coordinator: Arc<TransactionCoordinator>,
    endpoint: String,
    items: RequestItems,
    cancel: CancellationToken,
}

/// Schedules a cancelled close if dropped while still armed.
struct CloseGuard {
    pending: Option<PendingClose>,
}

impl CloseGuard {
    fn arm(
        coordinator: Arc<TransactionCoordinator>,
        endpoint: String,
        items: RequestItems,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pending: Some(PendingClose { coordinator, endpoint, items, cancel }),
        }
    }

    fn disarm(&mut self) {
        self.pending = None;
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        let Some(p) = self.pending.take() else {
            return;
        };
        p.cancel.cancel();

        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    if let Err(e) = p
                        .coordinator
                        .close(&p.endpoint, &p.items, CLIENT_CLOSED_REQUEST, &p.cancel)
                        .await
                    {
                        tracing::warn!(endpoint = %p.endpoint, error = %e, "close after dropped request failed");
                    }
                });
            }
            Err(_) => {
                tracing::error!(endpoint = %p.endpoint, "request dropped outside a runtime, transaction left open");
            }
        }
    }
}
