use entity::sea_orm_active_enums::{SubscriptionType, ValidationStatus};
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::{
        receipt::{SubscriptionData, TransactionData},
        subscription::{SubscriptionInfo, SubscriptionRecord},
        subscription_type_ext::SubscriptionTypeExt,
    },
};

use super::{
    entitlement_resolver::EntitlementResolver,
    product_catalog::ProductCatalog,
    profile_store::ProfileStore,
    receipt_decoder::ReceiptDecoder,
    subscription_extractor::SubscriptionExtractor,
    subscription_store::SubscriptionStore,
    transaction_client::{TransactionClient, TransactionOutcome},
    validation_client::ValidationClient,
};

/// One inbound receipt, with identity already resolved
#[derive(Debug, Clone)]
pub struct ReceiptSubmission {
    pub user_id: Uuid,
    pub receipt_data: String,
    /// Honoured for sandbox receipts only
    pub product_id_hint: Option<String>,
}

/// One StoreKit transaction id, with identity already resolved
#[derive(Debug, Clone)]
pub struct TransactionSubmission {
    pub user_id: Uuid,
    pub transaction_id: String,
    /// Honoured for sandbox transactions only
    pub product_id_hint: Option<String>,
}

/// decode -> validate -> extract -> map -> upsert -> resolve
pub struct ReceiptService {
    validation_client: ValidationClient,
    transaction_client: Option<TransactionClient>,
    catalog: ProductCatalog,
    expected_bundle_id: Option<String>,
    store: Arc<dyn SubscriptionStore>,
    profiles: Arc<dyn ProfileStore>,
    resolver: Arc<EntitlementResolver>,
}

impl ReceiptService {
    pub fn new(
        validation_client: ValidationClient,
        catalog: ProductCatalog,
        expected_bundle_id: Option<String>,
        store: Arc<dyn SubscriptionStore>,
        profiles: Arc<dyn ProfileStore>,
        resolver: Arc<EntitlementResolver>,
    ) -> Self {
        Self {
            validation_client,
            transaction_client: None,
            catalog,
            expected_bundle_id: expected_bundle_id.filter(|id| !id.trim().is_empty()),
            store,
            profiles,
            resolver,
        }
    }

    /// Enables `submit_transaction`
    pub fn with_transaction_client(mut self, client: TransactionClient) -> Self {
        self.transaction_client = Some(client);
        self
    }

    #[instrument(skip(self, submission), fields(user_id = %submission.user_id))]
    pub async fn submit(&self, submission: ReceiptSubmission) -> Result<SubscriptionData> {
        let receipt = ReceiptDecoder::normalize(&submission.receipt_data)?;

        let outcome = self.validation_client.validate(&receipt).await?;
        if !outcome.valid {
            return Err(ApiError::ReceiptRejected(outcome.failure_details()));
        }
        self.check_bundle(outcome.bundle_id())?;

        let info = SubscriptionExtractor::extract(&outcome).ok_or_else(|| {
            warn!(status = outcome.status, "Validated receipt contains no subscription");
            ApiError::NoSubscription
        })?;

        let subscription_type = self
            .record(
                submission.user_id,
                &info,
                outcome.is_test_receipt,
                submission.product_id_hint.as_deref(),
                receipt.into_inner(),
                outcome.raw_response.clone(),
            )
            .await?;

        Ok(SubscriptionData {
            subscription_type,
            expires_date: info.expires_date,
            is_active: info.is_active,
            transaction_id: info.transaction_id,
            is_test_receipt: outcome.is_test_receipt,
        })
    }

    /// Same pipeline as [`submit`](Self::submit), fed by an App Store Server
    /// API lookup instead of a receipt
    #[instrument(skip(self, submission), fields(user_id = %submission.user_id))]
    pub async fn submit_transaction(
        &self,
        submission: TransactionSubmission,
    ) -> Result<TransactionData> {
        let client = self.transaction_client.as_ref().ok_or_else(|| {
            ApiError::TransactionRejected(
                "App Store Server API credentials are not configured".to_string(),
            )
        })?;

        let transaction_id = submission.transaction_id.trim();
        if transaction_id.is_empty() || !transaction_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::BadRequest(format!(
                "Invalid transactionId: {}",
                transaction_id
            )));
        }

        let verified = match client.lookup(transaction_id).await? {
            TransactionOutcome::Found(verified) => verified,
            TransactionOutcome::Rejected(reason) => {
                warn!(reason = %reason, "Transaction lookup rejected");
                return Err(ApiError::TransactionRejected(reason));
            }
        };
        self.check_bundle(verified.transaction.bundle_id.as_deref())?;

        let info = verified
            .transaction
            .subscription_info_at(OffsetDateTime::now_utc())
            .ok_or_else(|| {
                warn!("Signed transaction is missing its ids or dates");
                ApiError::NoSubscription
            })?;

        let subscription_type = self
            .record(
                submission.user_id,
                &info,
                verified.is_test(),
                submission.product_id_hint.as_deref(),
                transaction_id.to_string(),
                Some(verified.raw_response()),
            )
            .await?;

        Ok(TransactionData {
            subscription_type,
            expires_date: info.expires_date,
            is_active: info.is_active,
            transaction_id: info.transaction_id,
            original_transaction_id: info.original_transaction_id,
            is_test_receipt: verified.is_test(),
        })
    }

    /// map -> profile check -> upsert -> resolve
    async fn record(
        &self,
        user_id: Uuid,
        info: &SubscriptionInfo,
        is_test: bool,
        product_id_hint: Option<&str>,
        receipt_data: String,
        raw_response: Option<Value>,
    ) -> Result<SubscriptionType> {
        let subscription_type = self.map_tier(info, is_test, product_id_hint)?;

        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User profile not found".to_string()))?;

        let validation_status = if is_test {
            ValidationStatus::Test
        } else {
            ValidationStatus::Valid
        };

        let record = SubscriptionRecord::from_info(
            info,
            user_id,
            profile.id,
            subscription_type,
            validation_status,
            receipt_data,
            raw_response,
        );
        self.store.upsert(&record).await?;

        info!(
            transaction_id = %info.transaction_id,
            tier = subscription_type.as_str(),
            is_active = info.is_active,
            is_test,
            "Subscription record stored"
        );

        if let Err(e) = self.resolver.resolve(user_id).await {
            error!("Entitlement recompute failed after upsert: {:?}", e);
        }

        Ok(subscription_type)
    }

    fn check_bundle(&self, actual: Option<&str>) -> Result<()> {
        let Some(expected) = self.expected_bundle_id.as_deref() else {
            return Ok(());
        };

        match actual {
            Some(actual) if actual != expected => {
                warn!(expected, actual, "Purchase issued for a different bundle");
                Err(ApiError::BundleMismatch(format!(
                    "expected {}, got {}",
                    expected, actual
                )))
            }
            Some(_) => Ok(()),
            None => {
                warn!("Validation response carries no bundle id");
                Ok(())
            }
        }
    }

    fn map_tier(
        &self,
        info: &SubscriptionInfo,
        is_test: bool,
        product_id_hint: Option<&str>,
    ) -> Result<SubscriptionType> {
        let tier = self.catalog.map_to_tier(&info.product_id);
        if tier.is_paid() {
            return Ok(tier);
        }

        if is_test {
            if let Some(hint) = product_id_hint.filter(|hint| self.catalog.contains(hint)) {
                info!(
                    product_id = %info.product_id,
                    hint,
                    "Using product id hint for sandbox purchase"
                );
                return Ok(self.catalog.map_to_tier(hint));
            }
        }

        Err(ApiError::UnknownProduct(info.product_id.clone()))
    }
}
