//! OpenAPI document.

use utoipa::OpenApi;

/// OpenAPI specification for the PoCX node API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::mining::get_mining_info,
        crate::handlers::mining::submit_nonce,
        crate::handlers::assignments::get_assignment,
        crate::handlers::assignments::create_assignment,
        crate::handlers::assignments::revoke_assignment,
    ),
    components(schemas(
        crate::handlers::mining::MiningInfo,
        crate::handlers::mining::SubmitNonceRequest,
        crate::handlers::mining::SubmitNonceResponse,
        crate::handlers::assignments::AssignmentInfo,
        crate::handlers::assignments::CreateAssignmentRequest,
        crate::handlers::assignments::RevokeAssignmentRequest,
        crate::handlers::assignments::BuiltTransaction,
        crate::error::ErrorResponse,
    )),
    tags(
        (name = "mining", description = "Nonce submission and mining context"),
        (name = "assignments", description = "Forging assignment management")
    )
)]
pub struct ApiDoc;
