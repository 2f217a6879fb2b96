//! Assignment handlers.

use crate::{ApiError, ApiResult, AppState};
use axum::extract::{Path, Query, State};
use axum::Json;
use pocx_assignments::{
    assignment_state, build_assignment_transaction, build_revocation_transaction, AssignmentView,
    CoinSource, OutPoint, TxOut,
};
use pocx_consensus::AccountId;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// Default fee rate in base units per virtual byte.
const DEFAULT_FEE_RATE: u64 = 2;

/// Assignment record with its derived state.
#[derive(Serialize, ToSchema)]
pub struct AssignmentInfo {
    /// Plot account id (hex, 40 chars).
    pub plot_address: String,
    /// Height the state was evaluated at.
    pub height: i32,
    /// Whether a record exists for the plot.
    pub has_assignment: bool,
    /// Derived state (UNASSIGNED/ASSIGNING/ASSIGNED/REVOKING/REVOKED).
    pub state: String,
    /// Assigned forging account (hex), empty when unassigned.
    pub forging_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_height: Option<i32>,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_effective_height: Option<i32>,
}

/// Optional height override for assignment queries.
#[derive(Deserialize, ToSchema)]
pub struct AssignmentQuery {
    /// Height to evaluate at (default: current tip).
    pub height: Option<i32>,
}

/// Request to create an assignment transaction.
#[derive(Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    /// Plot account id (hex, 40 chars).
    pub plot_address: String,
    /// Forging account id (hex, 40 chars).
    pub forging_address: String,
    /// Fee rate in base units per virtual byte.
    #[serde(default)]
    pub fee_rate: Option<u64>,
}

/// Request to create a revocation transaction.
#[derive(Deserialize, ToSchema)]
pub struct RevokeAssignmentRequest {
    /// Plot account id (hex, 40 chars).
    pub plot_address: String,
    /// Fee rate in base units per virtual byte.
    #[serde(default)]
    pub fee_rate: Option<u64>,
}

/// A built, broadcast-ready transaction.
#[derive(Serialize, ToSchema)]
pub struct BuiltTransaction {
    /// Transaction id (hex, 64 chars).
    pub txid: String,
    /// Serialized transaction (hex).
    pub tx: String,
}

struct WalletCoins(Vec<(OutPoint, TxOut)>);

impl CoinSource for WalletCoins {
    fn available_coins(&self) -> Vec<(OutPoint, TxOut)> {
        self.0.clone()
    }
}

fn parse_account(field: &str, value: &str) -> ApiResult<AccountId> {
    AccountId::from_hex(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid {}: {}", field, e)))
}

/// GET /assignments/{plot_address}
///
/// Assignment record and derived state for a plot.
#[utoipa::path(
    get,
    path = "/assignments/{plot_address}",
    tag = "assignments",
    params(
        ("plot_address" = String, Path, description = "Plot account id (hex)"),
        ("height" = Option<i32>, Query, description = "Height to evaluate at")
    ),
    responses(
        (status = 200, description = "Assignment state", body = AssignmentInfo),
        (status = 400, description = "Invalid plot address", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(plot_address): Path<String>,
    Query(query): Query<AssignmentQuery>,
) -> ApiResult<Json<AssignmentInfo>> {
    let plot = parse_account("plot_address", &plot_address)?;
    let height = query.height.unwrap_or_else(|| state.chain.height());

    let record = state.chain.assignment(&plot);
    let derived = assignment_state(&plot, height, state.chain.as_ref());

    let info = match record {
        Some(record) => AssignmentInfo {
            plot_address: plot.to_hex(),
            height,
            has_assignment: true,
            state: derived.as_str().to_string(),
            forging_address: record.forging_address.to_hex(),
            assignment_txid: Some(hex::encode(record.assignment_txid)),
            assignment_height: Some(record.assignment_height),
            activation_height: Some(record.assignment_effective_height),
            revoked: record.revoked,
            revocation_txid: record
                .revoked
                .then(|| hex::encode(record.revocation_txid)),
            revocation_height: record.revoked.then_some(record.revocation_height),
            revocation_effective_height: record
                .revoked
                .then_some(record.revocation_effective_height),
        },
        None => AssignmentInfo {
            plot_address: plot.to_hex(),
            height,
            has_assignment: false,
            state: derived.as_str().to_string(),
            forging_address: String::new(),
            assignment_txid: None,
            assignment_height: None,
            activation_height: None,
            revoked: false,
            revocation_txid: None,
            revocation_height: None,
            revocation_effective_height: None,
        },
    };
    Ok(Json(info))
}

/// POST /wallet/assignments/create
///
/// Build an assignment transaction spending a coin of the plot address.
/// The caller broadcasts the returned transaction.
#[utoipa::path(
    post,
    path = "/wallet/assignments/create",
    tag = "assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 200, description = "Built transaction", body = BuiltTransaction),
        (status = 400, description = "Invalid request or no plot coins", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    Json(request): Json<CreateAssignmentRequest>,
) -> ApiResult<Json<BuiltTransaction>> {
    let plot = parse_account("plot_address", &request.plot_address)?;
    let forge = parse_account("forging_address", &request.forging_address)?;

    let wallet = WalletCoins(state.chain.coins_of(&plot));
    let tx = build_assignment_transaction(
        &wallet,
        &plot,
        &forge,
        request.fee_rate.unwrap_or(DEFAULT_FEE_RATE),
    )?;

    info!(plot = %plot, forge = %forge, "assignment transaction built");
    Ok(Json(BuiltTransaction {
        txid: hex::encode(tx.txid()),
        tx: hex::encode(tx.serialize()),
    }))
}

/// POST /wallet/assignments/revoke
///
/// Build a revocation transaction for the plot address.
#[utoipa::path(
    post,
    path = "/wallet/assignments/revoke",
    tag = "assignments",
    request_body = RevokeAssignmentRequest,
    responses(
        (status = 200, description = "Built transaction", body = BuiltTransaction),
        (status = 400, description = "Invalid request or no plot coins", body = crate::error::ErrorResponse)
    )
)]
pub async fn revoke_assignment(
    State(state): State<AppState>,
    Json(request): Json<RevokeAssignmentRequest>,
) -> ApiResult<Json<BuiltTransaction>> {
    let plot = parse_account("plot_address", &request.plot_address)?;

    let wallet = WalletCoins(state.chain.coins_of(&plot));
    let tx = build_revocation_transaction(
        &wallet,
        &plot,
        request.fee_rate.unwrap_or(DEFAULT_FEE_RATE),
    )?;

    info!(plot = %plot, "revocation transaction built");
    Ok(Json(BuiltTransaction {
        txid: hex::encode(tx.txid()),
        tx: hex::encode(tx.serialize()),
    }))
}
