use serde::{Deserialize, Deserializer};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::models::subscription::SubscriptionInfo;

use super::validation_client::ValidationOutcome;

/// The subset of a `verifyReceipt` response the extractor reads
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerifyReceiptResponse {
    receipt: Option<ReceiptBody>,
    latest_receipt_info: Vec<TransactionEntry>,
    pending_renewal_info: Vec<PendingRenewal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReceiptBody {
    in_app: Vec<TransactionEntry>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct TransactionEntry {
    transaction_id: Option<String>,
    original_transaction_id: Option<String>,
    product_id: Option<String>,
    #[serde(deserialize_with = "millis")]
    purchase_date_ms: Option<i64>,
    #[serde(deserialize_with = "millis")]
    original_purchase_date_ms: Option<i64>,
    #[serde(deserialize_with = "millis")]
    expires_date_ms: Option<i64>,
}

impl TransactionEntry {
    /// Entries without both ids cannot be stored, so they never win selection
    fn is_identified(&self) -> bool {
        self.transaction_id.is_some() && self.product_id.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PendingRenewal {
    original_transaction_id: Option<String>,
    auto_renew_status: Option<String>,
}

/// Epoch millis arrive as strings but numbers are accepted too; zero and
/// unparseable values read as absent.
fn millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
        Other(serde::de::IgnoredAny),
    }

    let parsed = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text.trim().parse::<i64>().ok(),
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Other(_)) | None => None,
    };
    Ok(parsed.filter(|ms| *ms > 0))
}

fn instant(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

pub struct SubscriptionExtractor;

impl SubscriptionExtractor {
    /// Current subscription state of a successfully validated receipt, or
    /// `None` when the receipt carries nothing with a usable expiration
    pub fn extract(outcome: &ValidationOutcome) -> Option<SubscriptionInfo> {
        let raw = outcome.raw_response.as_ref()?;
        Self::extract_at(raw, OffsetDateTime::now_utc())
    }

    pub fn extract_at(raw: &Value, now: OffsetDateTime) -> Option<SubscriptionInfo> {
        let response = match VerifyReceiptResponse::deserialize(raw) {
            Ok(response) => response,
            Err(e) => {
                warn!("Validation response has an unexpected shape: {}", e);
                return None;
            }
        };

        let latest = response
            .latest_receipt_info
            .iter()
            .filter(|entry| entry.is_identified())
            .filter_map(|entry| entry.expires_date_ms.map(|ms| (entry, ms)))
            .max_by_key(|(_, ms)| *ms);

        let (entry, expires_ms) = match latest {
            Some(found) => found,
            None => {
                let found = response
                    .receipt
                    .as_ref()?
                    .in_app
                    .iter()
                    .rev()
                    .filter(|entry| entry.is_identified())
                    .find_map(|entry| {
                        entry
                            .expires_date_ms
                            .or(entry.purchase_date_ms)
                            .map(|ms| (entry, ms))
                    })?;
                debug!("Using last in-app purchase entry");
                found
            }
        };

        let transaction_id = entry.transaction_id.clone()?;
        let product_id = entry.product_id.clone()?;
        let original_transaction_id = entry
            .original_transaction_id
            .clone()
            .unwrap_or_else(|| transaction_id.clone());

        let expires_date = instant(expires_ms)?;
        let purchase_date = entry
            .purchase_date_ms
            .or(entry.original_purchase_date_ms)
            .and_then(instant)
            .unwrap_or(expires_date);

        let auto_renew_status = response
            .pending_renewal_info
            .iter()
            .find(|renewal| {
                renewal.original_transaction_id.as_deref() == Some(original_transaction_id.as_str())
            })
            .map(|renewal| renewal.auto_renew_status.as_deref() == Some("1"))
            .unwrap_or(false);

        Some(SubscriptionInfo {
            transaction_id,
            original_transaction_id,
            product_id,
            purchase_date,
            expires_date,
            is_active: expires_date > now,
            auto_renew_status,
        })
    }
}
