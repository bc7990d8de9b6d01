// Route modules
pub mod extract;
pub mod receipts;
pub mod subscriptions;
pub mod transactions;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::logging_middleware,
    models::common::HealthResponse,
    services::AuthResolver,
};
use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        )))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/ios/validate-receipt", post(receipts::validate_receipt))
        .route(
            "/ios/validate-transaction",
            post(transactions::validate_transaction),
        )
        .route("/subscriptions/refresh", post(subscriptions::refresh_entitlement))
        .layer(middleware::from_fn(logging_middleware))
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// An explicit `userId` wins; otherwise the access token is resolved
pub(crate) async fn resolve_user_id(
    state: &AppState,
    user_id: Option<&str>,
    access_token: Option<&str>,
) -> Result<Uuid> {
    resolve_identity(state.auth_resolver.as_ref(), user_id, access_token).await
}

async fn resolve_identity(
    auth: &dyn AuthResolver,
    user_id: Option<&str>,
    access_token: Option<&str>,
) -> Result<Uuid> {
    let user_id = user_id.map(str::trim).filter(|id| !id.is_empty());
    let access_token = access_token.map(str::trim).filter(|t| !t.is_empty());

    match (user_id, access_token) {
        (Some(user_id), _) => Uuid::parse_str(user_id)
            .map_err(|_| ApiError::BadRequest(format!("Invalid userId: {}", user_id))),
        (None, Some(token)) => auth.resolve_user(token).await,
        (None, None) => Err(ApiError::BadRequest(
            "Either userId or accessToken is required".to_string(),
        )),
    }
}
