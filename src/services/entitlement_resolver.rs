//! Canonical entitlement across every subscription source.
//!
//! Each [`EntitlementSource`] reports what it believes the user holds. The
//! resolver asks all of them, keeps the candidate that
//! [`EntitlementCandidate::outranks`] the rest, and writes the winner onto the
//! profile together with its source tag. Sources are consulted in
//! registration order, so on an exact tie the earlier-registered source keeps
//! the entitlement.

use async_trait::async_trait;
use entity::{profiles, sea_orm_active_enums::SubscriptionSource};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::{
        subscription::{Entitlement, EntitlementCandidate},
        subscription_type_ext::SubscriptionTypeExt,
    },
};

use super::{
    payment_processor::ExternalSubscriptionLookup, profile_store::ProfileStore,
    subscription_store::SubscriptionStore,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    fn source(&self) -> SubscriptionSource;

    async fn current(&self, profile: &profiles::Model) -> Result<Option<EntitlementCandidate>>;
}

/// Validated App Store receipts stored in `ios_subscriptions`
pub struct AppStoreSource {
    store: Arc<dyn SubscriptionStore>,
}

impl AppStoreSource {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EntitlementSource for AppStoreSource {
    fn source(&self) -> SubscriptionSource {
        SubscriptionSource::AppStore
    }

    async fn current(&self, profile: &profiles::Model) -> Result<Option<EntitlementCandidate>> {
        self.store.purge_expired_test_records(profile.id).await?;

        let best = self.store.query_best_active(profile.id).await?;
        Ok(best.map(|record| EntitlementCandidate {
            tier: record.subscription_type,
            expires_at: Some(record.expires_date),
            source: SubscriptionSource::AppStore,
        }))
    }
}

/// Subscriptions billed by the payment processor, keyed by the profile's
/// customer id
pub struct PaymentProcessorSource {
    lookup: Arc<dyn ExternalSubscriptionLookup>,
}

impl PaymentProcessorSource {
    pub fn new(lookup: Arc<dyn ExternalSubscriptionLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl EntitlementSource for PaymentProcessorSource {
    fn source(&self) -> SubscriptionSource {
        SubscriptionSource::PaymentProcessor
    }

    async fn current(&self, profile: &profiles::Model) -> Result<Option<EntitlementCandidate>> {
        let Some(customer_id) = profile.customer_id.as_deref() else {
            return Ok(None);
        };

        match self.lookup.get(customer_id).await {
            Ok(found) => Ok(found.map(|subscription| EntitlementCandidate {
                tier: subscription.tier,
                expires_at: subscription.expires_at,
                source: SubscriptionSource::PaymentProcessor,
            })),
            Err(e) => {
                // A processor outage must not take App Store entitlements down with it
                warn!(
                    user_id = %profile.id,
                    "Payment processor lookup failed, treating as no subscription: {}",
                    e
                );
                Ok(None)
            }
        }
    }
}

pub struct EntitlementResolver {
    profiles: Arc<dyn ProfileStore>,
    sources: Vec<Arc<dyn EntitlementSource>>,
}

impl EntitlementResolver {
    pub fn new(profiles: Arc<dyn ProfileStore>, sources: Vec<Arc<dyn EntitlementSource>>) -> Self {
        Self { profiles, sources }
    }

    /// Recompute the user's entitlement and write it back onto the profile
    #[instrument(skip(self))]
    pub async fn resolve(&self, user_id: Uuid) -> Result<Entitlement> {
        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User profile not found".to_string()))?;

        let mut winner: Option<EntitlementCandidate> = None;
        for source in &self.sources {
            let Some(candidate) = source.current(&profile).await? else {
                debug!(source = ?source.source(), "No entitlement from source");
                continue;
            };
            if !candidate.tier.is_paid() {
                continue;
            }

            debug!(
                source = ?candidate.source,
                tier = candidate.tier.as_str(),
                expires_at = ?candidate.expires_at,
                "Entitlement candidate"
            );
            if winner.map_or(true, |current| candidate.outranks(&current)) {
                winner = Some(candidate);
            }
        }

        let entitlement = winner.map(Entitlement::from).unwrap_or_else(Entitlement::none);

        info!(
            tier = entitlement.subscription_type.as_str(),
            source = ?entitlement.subscription_source,
            expires_at = ?entitlement.subscription_expiration,
            "Entitlement resolved"
        );

        // Records are already durable; the next resolution retries the write
        if let Err(e) = self.profiles.update_subscription(user_id, &entitlement).await {
            error!(user_id = %user_id, "Failed to write entitlement to profile: {:?}", e);
        }

        Ok(entitlement)
    }
}
