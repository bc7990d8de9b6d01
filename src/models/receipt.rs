use entity::sea_orm_active_enums::SubscriptionType;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use super::subscription::Entitlement;

/// POST /api/v1/ios/validate-receipt request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReceiptRequest {
    /// Absent and empty both fail validation with the same message
    #[serde(default)]
    #[validate(length(min = 1, max = 1000000, message = "Receipt data is required"))]
    pub receipt_data: String,
    #[validate(length(max = 100))]
    pub user_id: Option<String>,
    #[validate(length(max = 4096))]
    pub access_token: Option<String>,
    /// Only honoured for sandbox receipts
    #[validate(length(max = 255))]
    pub product_id: Option<String>,
}

/// POST /api/v1/ios/validate-receipt response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReceiptResponse {
    pub success: bool,
    pub subscription: SubscriptionData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_date: OffsetDateTime,
    pub is_active: bool,
    pub transaction_id: String,
    pub is_test_receipt: bool,
}

/// POST /api/v1/ios/validate-transaction request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTransactionRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "Transaction ID is required"))]
    pub transaction_id: String,
    #[validate(length(max = 100))]
    pub user_id: Option<String>,
    #[validate(length(max = 4096))]
    pub access_token: Option<String>,
    #[validate(length(max = 255))]
    pub product_id: Option<String>,
}

/// POST /api/v1/ios/validate-transaction response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTransactionResponse {
    pub success: bool,
    pub subscription: TransactionData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_date: OffsetDateTime,
    pub is_active: bool,
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub is_test_receipt: bool,
}

/// POST /api/v1/subscriptions/refresh request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshEntitlementRequest {
    #[validate(length(max = 100))]
    pub user_id: Option<String>,
    #[validate(length(max = 4096))]
    pub access_token: Option<String>,
}

/// POST /api/v1/subscriptions/refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshEntitlementResponse {
    pub success: bool,
    pub entitlement: Entitlement,
}
