//! App Store `verifyReceipt` client.
//!
//! The provider asks for every receipt to be sent to production first, with a
//! redirect to the sandbox only when production answers 21007. The attempts
//! are modelled as a small forward-only state machine so one call to
//! [`ValidationClient::validate`] performs at most three requests:
//!
//! ```text
//! TryPrimary ──21007──▶ TrySecondaryNoSecret ──21004 + secret──▶ TrySecondaryWithSecret
//!     │ 0                      │ 0                                     │ 0
//!     ▼                        ▼                                       ▼
//!  Succeeded               Succeeded                               Succeeded
//! ```
//!
//! Every other status is terminal. Transport failures abort immediately and
//! are never retried here.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

use crate::config::AppStoreConfig;

use super::receipt_decoder::NormalizedReceipt;

/// Receipt is valid
pub const STATUS_OK: i64 = 0;
/// Shared secret does not match the account's shared secret
pub const STATUS_SECRET_MISMATCH: i64 = 21004;
/// Receipt is from the sandbox but was sent to production
pub const STATUS_SANDBOX_RECEIPT: i64 = 21007;

const SANDBOX_ENVIRONMENT_TAG: &str = "Sandbox";
const PRODUCTION_ENVIRONMENT_TAG: &str = "Production";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to validation service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("validation service returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointTier {
    Primary,
    Secondary,
}

impl EndpointTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointTier::Primary => "primary",
            EndpointTier::Secondary => "secondary",
        }
    }
}

/// Environment tag reported in a successful validation response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptEnvironment {
    Production,
    Sandbox,
}

impl ReceiptEnvironment {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            SANDBOX_ENVIRONMENT_TAG => Some(Self::Sandbox),
            PRODUCTION_ENVIRONMENT_TAG => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    TryPrimary,
    TrySecondaryNoSecret,
    TrySecondaryWithSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Succeeded,
    Retry(Attempt),
    Failed,
}

impl Attempt {
    pub fn tier(&self) -> EndpointTier {
        match self {
            Attempt::TryPrimary => EndpointTier::Primary,
            Attempt::TrySecondaryNoSecret | Attempt::TrySecondaryWithSecret => {
                EndpointTier::Secondary
            }
        }
    }

    pub fn sends_secret(&self) -> bool {
        !matches!(self, Attempt::TrySecondaryNoSecret)
    }

    /// Next state given the status this attempt returned
    pub fn next(self, status: i64, has_secret: bool) -> Transition {
        if status == STATUS_OK {
            return Transition::Succeeded;
        }

        match (self, status) {
            (Attempt::TryPrimary, STATUS_SANDBOX_RECEIPT) => {
                Transition::Retry(Attempt::TrySecondaryNoSecret)
            }
            (Attempt::TrySecondaryNoSecret, STATUS_SECRET_MISMATCH) if has_secret => {
                Transition::Retry(Attempt::TrySecondaryWithSecret)
            }
            _ => Transition::Failed,
        }
    }
}

/// Result of one `validate` call
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub status: i64,
    pub raw_response: Option<Value>,
    pub environment: Option<ReceiptEnvironment>,
    pub is_test_receipt: bool,
    pub attempts: u8,
}

impl ValidationOutcome {
    fn success(status: i64, raw_response: Value, attempts: u8) -> Self {
        let environment = raw_response
            .get("environment")
            .and_then(Value::as_str)
            .and_then(ReceiptEnvironment::from_tag);

        Self {
            valid: true,
            status,
            is_test_receipt: environment == Some(ReceiptEnvironment::Sandbox),
            environment,
            raw_response: Some(raw_response),
            attempts,
        }
    }

    fn failure(status: i64, raw_response: Value, attempts: u8) -> Self {
        Self {
            valid: false,
            status,
            raw_response: Some(raw_response),
            environment: None,
            is_test_receipt: false,
            attempts,
        }
    }

    /// Bundle identifier of the app the receipt was issued to
    pub fn bundle_id(&self) -> Option<&str> {
        self.raw_response
            .as_ref()?
            .get("receipt")?
            .get("bundle_id")?
            .as_str()
    }

    pub fn is_retryable(&self) -> Option<bool> {
        self.raw_response
            .as_ref()?
            .get("is-retryable")?
            .as_bool()
    }

    /// Operator-facing description of a terminal failure
    pub fn failure_details(&self) -> String {
        let mut details = format!("Apple validation failed with status: {}", self.status);
        if let Some(bundle_id) = self.bundle_id() {
            details.push_str(&format!(" (bundle_id: {})", bundle_id));
        }
        if let Some(retryable) = self.is_retryable() {
            details.push_str(&format!(" (is_retryable: {})", retryable));
        }
        details
    }
}

#[derive(Debug, Serialize)]
struct VerifyReceiptBody<'a> {
    #[serde(rename = "receipt-data")]
    receipt_data: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(rename = "exclude-old-transactions")]
    exclude_old_transactions: bool,
}

/// Single POST to a `verifyReceipt` endpoint
#[async_trait]
pub trait ReceiptTransport: Send + Sync {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, TransportError>;
}

pub struct HttpReceiptTransport {
    http_client: reqwest::Client,
}

impl HttpReceiptTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ReceiptTransport for HttpReceiptTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, TransportError> {
        let response = self
            .http_client
            .post(endpoint)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("Invalid response format: {}", e)))
    }
}

pub struct ValidationClient {
    config: AppStoreConfig,
    transport: Arc<dyn ReceiptTransport>,
}

impl ValidationClient {
    pub fn new(config: &AppStoreConfig, transport: Arc<dyn ReceiptTransport>) -> Self {
        Self {
            config: config.clone(),
            transport,
        }
    }

    /// Validate a receipt following the production-first fallback sequence
    #[instrument(skip(self, receipt), fields(receipt = %receipt.fingerprint()))]
    pub async fn validate(
        &self,
        receipt: &NormalizedReceipt,
    ) -> Result<ValidationOutcome, TransportError> {
        let secret = self.config.shared_secret();
        let mut attempt = Attempt::TryPrimary;
        let mut attempts: u8 = 0;

        loop {
            attempts += 1;
            let response = self.send(attempt, receipt, secret).await?;
            let status = response
                .get("status")
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    TransportError::InvalidResponse("response has no numeric status".to_string())
                })?;

            info!(
                attempt = attempts,
                tier = attempt.tier().as_str(),
                with_secret = attempt.sends_secret() && secret.is_some(),
                status,
                "verifyReceipt attempt completed"
            );

            match attempt.next(status, secret.is_some()) {
                Transition::Succeeded => {
                    let outcome = ValidationOutcome::success(status, response, attempts);
                    info!(
                        environment = ?outcome.environment,
                        is_test_receipt = outcome.is_test_receipt,
                        "Receipt validated"
                    );
                    return Ok(outcome);
                }
                Transition::Retry(next) => attempt = next,
                Transition::Failed => {
                    let outcome = ValidationOutcome::failure(status, response, attempts);
                    warn!(
                        status,
                        bundle_id = ?outcome.bundle_id(),
                        "Receipt validation failed"
                    );
                    return Ok(outcome);
                }
            }
        }
    }

    async fn send(
        &self,
        attempt: Attempt,
        receipt: &NormalizedReceipt,
        secret: Option<&str>,
    ) -> Result<Value, TransportError> {
        let endpoint = match attempt.tier() {
            EndpointTier::Primary => self.config.production_url.as_str(),
            EndpointTier::Secondary => self.config.sandbox_url.as_str(),
        };

        let body = VerifyReceiptBody {
            receipt_data: receipt.as_str(),
            password: secret.filter(|_| attempt.sends_secret()),
            exclude_old_transactions: false,
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        self.transport.post(endpoint, &body).await
    }
}
