use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    models::receipt::{ValidateTransactionRequest, ValidateTransactionResponse},
    services::receipt_service::TransactionSubmission,
};

use super::{extract::ValidatedJson, resolve_user_id};

/// POST /api/v1/ios/validate-transaction
#[instrument(skip(state, request), fields(transaction_id = %request.transaction_id))]
pub async fn validate_transaction(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ValidateTransactionRequest>,
) -> Result<Json<ValidateTransactionResponse>> {
    let user_id = resolve_user_id(
        &state,
        request.user_id.as_deref(),
        request.access_token.as_deref(),
    )
    .await?;

    let subscription = state
        .receipt_service
        .submit_transaction(TransactionSubmission {
            user_id,
            transaction_id: request.transaction_id,
            product_id_hint: request.product_id,
        })
        .await?;

    Ok(Json(ValidateTransactionResponse {
        success: true,
        subscription,
    }))
}
