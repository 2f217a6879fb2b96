//! Route table.

use crate::handlers::{assignments, mining};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mining/info", get(mining::get_mining_info))
        .route("/mining/submitnonce", post(mining::submit_nonce))
        .route("/assignments/:plot_address", get(assignments::get_assignment))
        .route(
            "/wallet/assignments/create",
            post(assignments::create_assignment),
        )
        .route(
            "/wallet/assignments/revoke",
            post(assignments::revoke_assignment),
        )
        .with_state(state)
}
