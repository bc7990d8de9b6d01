//! Payment-processor side of entitlement: does this customer currently hold a
//! paid subscription billed outside the App Store?

use async_trait::async_trait;
use entity::sea_orm_active_enums::SubscriptionType;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::config::PaymentProcessorConfig;

const LIVE_SUBSCRIPTION_STATUSES: &[&str] = &["active", "trialing", "past_due"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalSubscription {
    pub tier: SubscriptionType,
    /// `None` for one-time lifetime purchases
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("payment processor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payment processor is not configured")]
    NotConfigured,

    #[error("payment processor returned an invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalSubscriptionLookup: Send + Sync {
    async fn get(&self, customer_ref: &str) -> Result<Option<ExternalSubscription>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Charge {
    refunded: bool,
    status: String,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    status: String,
    current_period_end: Option<i64>,
    #[serde(default)]
    items: ListResponse<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

/// Configured price ids for each paid tier
#[derive(Debug, Clone, Default)]
struct PriceTable {
    monthly: Option<String>,
    annual: Option<String>,
    lifetime: Option<String>,
}

impl PriceTable {
    fn recurring_tier(&self, price_id: &str) -> Option<SubscriptionType> {
        if self.monthly.as_deref() == Some(price_id) {
            Some(SubscriptionType::Monthly)
        } else if self.annual.as_deref() == Some(price_id) {
            Some(SubscriptionType::Annual)
        } else {
            None
        }
    }

    fn has_lifetime_charge(&self, charges: &[Charge]) -> bool {
        let Some(lifetime) = self.lifetime.as_deref() else {
            return false;
        };

        charges.iter().any(|charge| {
            charge.status == "succeeded"
                && !charge.refunded
                && charge.metadata.get("price_id").map(String::as_str) == Some(lifetime)
        })
    }

    fn classify(
        &self,
        charges: &[Charge],
        subscriptions: &[Subscription],
    ) -> Result<Option<ExternalSubscription>, LookupError> {
        if self.has_lifetime_charge(charges) {
            return Ok(Some(ExternalSubscription {
                tier: SubscriptionType::Lifetime,
                expires_at: None,
            }));
        }

        for subscription in subscriptions {
            if !LIVE_SUBSCRIPTION_STATUSES.contains(&subscription.status.as_str()) {
                continue;
            }

            let tier = subscription
                .items
                .data
                .first()
                .and_then(|item| self.recurring_tier(&item.price.id));

            if let Some(tier) = tier {
                let expires_at = subscription
                    .current_period_end
                    .map(|secs| {
                        OffsetDateTime::from_unix_timestamp(secs)
                            .map_err(|_| LookupError::InvalidTimestamp(secs))
                    })
                    .transpose()?;

                return Ok(Some(ExternalSubscription { tier, expires_at }));
            }
        }

        Ok(None)
    }
}

/// Stripe REST lookup keyed by customer id
pub struct StripeSubscriptionLookup {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
    prices: PriceTable,
}

impl StripeSubscriptionLookup {
    pub fn new(config: &PaymentProcessorConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone().filter(|k| !k.trim().is_empty()),
            prices: PriceTable {
                monthly: config.monthly_price_id.clone(),
                annual: config.annual_price_id.clone(),
                lifetime: config.lifetime_price_id.clone(),
            },
        })
    }

    async fn list<T>(&self, resource: &str, customer_ref: &str) -> Result<Vec<T>, LookupError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let secret_key = self.secret_key.as_deref().ok_or(LookupError::NotConfigured)?;

        let response = self
            .http_client
            .get(format!("{}/v1/{}", self.api_base, resource))
            .basic_auth(secret_key, None::<&str>)
            .query(&[("customer", customer_ref), ("limit", "100")])
            .send()
            .await?
            .error_for_status()?
            .json::<ListResponse<T>>()
            .await?;

        Ok(response.data)
    }
}

#[async_trait]
impl ExternalSubscriptionLookup for StripeSubscriptionLookup {
    #[instrument(skip(self))]
    async fn get(&self, customer_ref: &str) -> Result<Option<ExternalSubscription>, LookupError> {
        let charges: Vec<Charge> = self.list("charges", customer_ref).await?;
        let subscriptions: Vec<Subscription> = self.list("subscriptions", customer_ref).await?;

        let found = self.prices.classify(&charges, &subscriptions)?;
        debug!(found = ?found, "Payment processor lookup completed");
        Ok(found)
    }
}
