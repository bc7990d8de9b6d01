use entity::sea_orm_active_enums::{SubscriptionSource, SubscriptionType, ValidationStatus};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::subscription_type_ext::SubscriptionTypeExt;

/// Current state of one purchase lineage, as read from a validation response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub product_id: String,
    pub purchase_date: OffsetDateTime,
    pub expires_date: OffsetDateTime,
    /// Snapshot at extraction time; never re-derived from the stored row
    pub is_active: bool,
    pub auto_renew_status: bool,
}

/// Row to be written to `ios_subscriptions`, keyed by `transaction_id`
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub product_id: String,
    pub subscription_type: SubscriptionType,
    pub purchase_date: OffsetDateTime,
    pub expires_date: OffsetDateTime,
    pub is_active: bool,
    pub auto_renew_status: bool,
    pub validation_status: ValidationStatus,
    pub receipt_data: String,
    pub raw_validation_response: Option<serde_json::Value>,
}

impl SubscriptionRecord {
    pub fn from_info(
        info: &SubscriptionInfo,
        user_id: Uuid,
        profile_id: Uuid,
        subscription_type: SubscriptionType,
        validation_status: ValidationStatus,
        receipt_data: String,
        raw_validation_response: Option<serde_json::Value>,
    ) -> Self {
        Self {
            user_id,
            profile_id,
            transaction_id: info.transaction_id.clone(),
            original_transaction_id: info.original_transaction_id.clone(),
            product_id: info.product_id.clone(),
            subscription_type,
            purchase_date: info.purchase_date,
            expires_date: info.expires_date,
            is_active: info.is_active,
            auto_renew_status: info.auto_renew_status,
            validation_status,
            receipt_data,
            raw_validation_response,
        }
    }
}

/// What a single source believes the user is entitled to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementCandidate {
    pub tier: SubscriptionType,
    /// `None` means the entitlement does not expire
    pub expires_at: Option<OffsetDateTime>,
    pub source: SubscriptionSource,
}

impl EntitlementCandidate {
    pub fn priority(&self) -> u8 {
        self.tier.priority()
    }

    /// True when `self` should replace `current` as the canonical entitlement.
    ///
    /// Higher tier wins; on equal tiers the later expiration wins, with a
    /// missing expiration counting as unbounded. Exact ties keep `current`.
    pub fn outranks(&self, current: &EntitlementCandidate) -> bool {
        if self.priority() != current.priority() {
            return self.priority() > current.priority();
        }

        match (self.expires_at, current.expires_at) {
            (None, Some(_)) => true,
            (Some(mine), Some(theirs)) => mine > theirs,
            _ => false,
        }
    }
}

/// Canonical entitlement written onto the user's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    #[serde(rename = "expiration", with = "time::serde::rfc3339::option")]
    pub subscription_expiration: Option<OffsetDateTime>,
    #[serde(rename = "source")]
    pub subscription_source: Option<SubscriptionSource>,
}

impl Entitlement {
    pub fn none() -> Self {
        Self {
            subscription_type: SubscriptionType::None,
            subscription_expiration: None,
            subscription_source: None,
        }
    }
}

impl From<EntitlementCandidate> for Entitlement {
    fn from(candidate: EntitlementCandidate) -> Self {
        Self {
            subscription_type: candidate.tier,
            subscription_expiration: candidate.expires_at,
            subscription_source: Some(candidate.source),
        }
    }
}
