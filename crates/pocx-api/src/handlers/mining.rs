//! Mining handlers.

use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, Json};
use pocx_assignments::effective_signer;
use pocx_consensus::{parse_hex32, AccountId, PlotSeed};
use pocx_mining::NonceSubmission;
use pocx_wallet::BlockSigner;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// Current mining context.
#[derive(Serialize, ToSchema)]
pub struct MiningInfo {
    /// Generation signature for the next block (hex, 64 chars).
    #[schema(example = "9821beb3b34d9a3b30127c05f8d1e9006f8a02f565a3572145134bbe34d37a76")]
    pub generation_signature: String,
    /// Base target for the next block.
    pub base_target: u64,
    /// Height of the next block.
    pub height: i32,
    /// Hash of the current tip (hex, 64 chars).
    pub block_hash: String,
    /// Worst acceptable quality.
    pub target_quality: u64,
    /// Lowest accepted compression level.
    pub minimum_compression_level: u32,
    /// Highest accepted compression level.
    pub target_compression_level: u32,
}

/// Nonce submission request.
#[derive(Deserialize, ToSchema)]
pub struct SubmitNonceRequest {
    /// Height this nonce was mined for.
    pub height: i32,
    /// Generation signature mined against (hex, 64 chars).
    pub generation_signature: String,
    /// Plot account id (hex, 40 chars).
    pub account_id: String,
    /// Plot seed (hex, 64 chars).
    pub seed: String,
    /// Mining nonce.
    pub nonce: u64,
    /// Compression level used (1..=6).
    pub compression: u32,
    /// Claimed quality; recomputed server-side, never trusted.
    #[serde(default)]
    pub quality: Option<u64>,
}

/// Nonce submission response.
#[derive(Serialize, ToSchema)]
pub struct SubmitNonceResponse {
    /// Whether the nonce was accepted and queued.
    pub accepted: bool,
    /// Difficulty-adjusted deadline in seconds (raw quality / base target).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u64>,
    /// Time-bent deadline in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poc_time: Option<u64>,
    /// Rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitNonceResponse {
    fn rejected(error: impl Into<String>) -> Self {
        Self {
            accepted: false,
            quality: None,
            poc_time: None,
            error: Some(error.into()),
        }
    }
}

/// GET /mining/info
///
/// Context a miner needs for the next block.
#[utoipa::path(
    get,
    path = "/mining/info",
    tag = "mining",
    responses(
        (status = 200, description = "Current mining context", body = MiningInfo),
        (status = 500, description = "Chain unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_mining_info(State(state): State<AppState>) -> ApiResult<Json<MiningInfo>> {
    let ctx = state.chain.new_context()?;
    let bounds = state.params.compression_bounds(ctx.height as i64);

    Ok(Json(MiningInfo {
        generation_signature: hex::encode(ctx.generation_signature),
        base_target: ctx.base_target,
        height: ctx.height,
        block_hash: ctx.block_hash.to_hex(),
        target_quality: u64::MAX,
        minimum_compression_level: bounds.min_compression,
        target_compression_level: bounds.target_compression,
    }))
}

/// POST /mining/submitnonce
///
/// Validate a nonce submission and queue it for forging. Validation order
/// puts the cheap checks first and the full proof recomputation last.
#[utoipa::path(
    post,
    path = "/mining/submitnonce",
    tag = "mining",
    request_body = SubmitNonceRequest,
    responses(
        (status = 200, description = "Submission verdict", body = SubmitNonceResponse),
        (status = 400, description = "Malformed parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_nonce(
    State(state): State<AppState>,
    Json(request): Json<SubmitNonceRequest>,
) -> ApiResult<Json<SubmitNonceResponse>> {
    // Fast format validation, fail early.
    let account_id = match AccountId::from_hex(&request.account_id) {
        Ok(account) => account,
        Err(e) => {
            return Err(ApiError::BadRequest(format!("invalid account_id: {}", e)));
        }
    };
    let seed = match PlotSeed::from_hex(&request.seed) {
        Ok(seed) => seed,
        Err(e) => return Err(ApiError::BadRequest(format!("invalid seed: {}", e))),
    };
    let submitted_gensig = match parse_hex32("generation_signature", &request.generation_signature)
    {
        Ok(gensig) => gensig,
        Err(e) => {
            return Err(ApiError::BadRequest(format!(
                "invalid generation_signature: {}",
                e
            )));
        }
    };

    // Quick context comparisons.
    let ctx = state.chain.new_context()?;
    if request.height != ctx.height {
        return Ok(Json(SubmitNonceResponse::rejected(format!(
            "invalid height: expected {}, got {}",
            ctx.height, request.height
        ))));
    }
    if submitted_gensig != ctx.generation_signature {
        return Ok(Json(SubmitNonceResponse::rejected(
            "generation signature mismatch",
        )));
    }

    // Wallet check before the expensive proof work: without the effective
    // signer's key the block could never be signed.
    let signer_account = effective_signer(&account_id, ctx.height, state.chain.as_ref());
    if !state.keystore.has_key(&signer_account) {
        return Ok(Json(SubmitNonceResponse::rejected(format!(
            "no private key available for effective signer {} (plot: {})",
            signer_account, account_id
        ))));
    }

    let bounds = state.params.compression_bounds(ctx.height as i64);
    if let Err(e) = pocx_consensus::check_compression_bounds(request.compression, &bounds) {
        return Ok(Json(SubmitNonceResponse::rejected(e.to_string())));
    }

    // Expensive proof validation: recompute the quality from the plot
    // coordinates at the claimed compression level.
    let validation = match pocx_consensus::validate_proof(
        &ctx.generation_signature,
        ctx.base_target,
        &account_id,
        ctx.height as u64,
        request.nonce,
        &seed,
        request.compression,
        state.params.target_spacing_secs,
    ) {
        Ok(validation) => validation,
        Err(e) => {
            return Ok(Json(SubmitNonceResponse::rejected(format!(
                "proof validation failed: {}",
                e
            ))));
        }
    };

    info!(
        nonce = request.nonce,
        height = request.height,
        account = %account_id,
        raw_quality = validation.quality,
        deadline = validation.deadline,
        poc_time = validation.poc_time,
        "nonce accepted"
    );

    let queued = state.scheduler.submit_nonce(NonceSubmission::new(
        account_id,
        seed,
        request.nonce,
        validation.quality,
        request.compression,
        request.height,
        submitted_gensig,
    ));
    if !queued {
        return Ok(Json(SubmitNonceResponse::rejected(
            "submission queue is full, please try again later",
        )));
    }

    Ok(Json(SubmitNonceResponse {
        accepted: true,
        quality: Some(validation.deadline),
        poc_time: Some(validation.poc_time),
        error: None,
    }))
}
