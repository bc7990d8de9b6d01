use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    models::receipt::{ValidateReceiptRequest, ValidateReceiptResponse},
    services::receipt_service::ReceiptSubmission,
};

use super::{extract::ValidatedJson, resolve_user_id};

/// POST /api/v1/ios/validate-receipt
#[instrument(skip(state, request))]
pub async fn validate_receipt(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ValidateReceiptRequest>,
) -> Result<Json<ValidateReceiptResponse>> {
    let user_id = resolve_user_id(
        &state,
        request.user_id.as_deref(),
        request.access_token.as_deref(),
    )
    .await?;

    let subscription = state
        .receipt_service
        .submit(ReceiptSubmission {
            user_id,
            receipt_data: request.receipt_data,
            product_id_hint: request.product_id,
        })
        .await?;

    Ok(Json(ValidateReceiptResponse {
        success: true,
        subscription,
    }))
}
