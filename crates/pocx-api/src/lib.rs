//! # pocx-api
//!
//! HTTP API for PoCX mining and assignment management.
//!
//! Endpoints:
//! - `GET /mining/info` — context for the next block (gensig, base target,
//!   height, compression bounds)
//! - `POST /mining/submitnonce` — validate and queue a nonce submission
//! - `GET /assignments/{plot}` — assignment record with derived state
//! - `POST /wallet/assignments/create` — build an assignment transaction
//! - `POST /wallet/assignments/revoke` — build a revocation transaction
//!
//! Submission validation happens here, at the boundary: format checks
//! first, then context, then the wallet-key check for the effective
//! signer, then compression bounds, and only then the expensive proof
//! recomputation.

mod error;
pub mod handlers;
mod openapi;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use openapi::ApiDoc;
pub use routes::build_router;
pub use state::AppState;
