//! Axum router wiring.
//!
//! Item routes run behind the transaction middleware (as a route layer, so
//! the matched path is known). Operational routes bypass it.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    app_state::AppState,
    middleware::{flush_middleware, transaction_middleware},
    ops,
    services::items,
};

pub fn build_router(state: AppState) -> Router {
    let mut api = Router::new()
        .route("/items/:key", get(items::get_item).put(items::put_item))
        .route("/items/:key/reject", post(items::reject_item));

    // Inner layer: runs after the handler, before close.
    if state.cfg().transactions.flush_after_action {
        api = api.route_layer(middleware::from_fn_with_state(
            state.session_resolver(),
            flush_middleware,
        ));
    }

    let api = api
        .route_layer(middleware::from_fn_with_state(
            state.coordinator(),
            transaction_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
        .merge(api)
}
