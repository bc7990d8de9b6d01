use crate::error::ApiError;
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::time::Instant;

/// Receipts are capped at 1MB of base64 by request validation; leave room for
/// the surrounding JSON
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Middleware that logs request metadata and a body fingerprint.
///
/// Request bodies carry receipts and bearer tokens, so only their length and
/// a SHA-256 prefix are recorded.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id = %request_id, "Failed to read request body: {}", e);
            return ApiError::BadRequest("Failed to read request body".to_string())
                .into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        body_len = bytes.len(),
        body_sha256 = %body_fingerprint(&bytes),
        "→ Request"
    );

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let status = response.status();
    let latency = start.elapsed();

    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            latency_ms = %latency.as_millis(),
            "← Response"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            latency_ms = %latency.as_millis(),
            "← Response"
        );
    }

    response
}

/// First 16 hex chars of the body's SHA-256, empty for empty bodies
fn body_fingerprint(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let digest = format!("{:x}", Sha256::digest(bytes));
    digest[..16].to_string()
}
