use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    models::receipt::{RefreshEntitlementRequest, RefreshEntitlementResponse},
};

use super::{extract::ValidatedJson, resolve_user_id};

/// POST /api/v1/subscriptions/refresh
#[instrument(skip(state, request))]
pub async fn refresh_entitlement(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshEntitlementRequest>,
) -> Result<Json<RefreshEntitlementResponse>> {
    let user_id = resolve_user_id(
        &state,
        request.user_id.as_deref(),
        request.access_token.as_deref(),
    )
    .await?;

    let entitlement = state.entitlement_resolver.resolve(user_id).await?;

    Ok(Json(RefreshEntitlementResponse {
        success: true,
        entitlement,
    }))
}
