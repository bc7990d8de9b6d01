use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has been deserialized and passed its `validator` rules.
///
/// Every rejection, including a missing content type or unparseable JSON,
/// becomes a 400 `ApiError::BadRequest` with the usual `{error}` body.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                tracing::debug!(status = %rejection.status(), "Rejected request body");
                ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
            })?;

        value
            .validate()
            .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::{RefreshEntitlementRequest, ValidateReceiptRequest};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
        routing::post,
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/receipt",
                post(|ValidatedJson(request): ValidatedJson<ValidateReceiptRequest>| async move {
                    request.receipt_data
                }),
            )
            .route(
                "/refresh",
                post(|ValidatedJson(_): ValidatedJson<RefreshEntitlementRequest>| async { "ok" }),
            )
    }

    async fn send(uri: &str, content_type: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        app().oneshot(request).await.unwrap()
    }

    async fn error_message(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_unparseable_json_is_bad_request() {
        let response = send("/receipt", Some("application/json"), "{not json").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(response).await.starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let response = send("/refresh", None, r#"{"userId":"x"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(response).await.starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_bad_request() {
        let response = send("/receipt", Some("application/json"), r#"{"receiptData":42}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_receipt_data_reports_validation_message() {
        let response = send("/receipt", Some("application/json"), r#"{"userId":"x"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(response)
            .await
            .contains("Receipt data is required"));
    }

    #[tokio::test]
    async fn test_valid_body_reaches_handler() {
        let response = send(
            "/receipt",
            Some("application/json"),
            r#"{"receiptData":"YWJj","userId":"x"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"YWJj");
    }
}
