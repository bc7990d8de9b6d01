use async_trait::async_trait;
use entity::{ios_subscriptions, sea_orm_active_enums::ValidationStatus};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::subscription::SubscriptionRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Durable per-transaction subscription records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert, or update the mutable columns of the row with the same
    /// `transaction_id`
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), StoreError>;

    /// Latest-expiring valid, active, unexpired record for the user
    async fn query_best_active(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ios_subscriptions::Model>, StoreError>;

    /// Delete the user's test records whose expiry has passed
    async fn purge_expired_test_records(&self, user_id: Uuid) -> Result<u64, StoreError>;
}

pub struct SeaOrmSubscriptionStore {
    db: DatabaseConnection,
}

impl SeaOrmSubscriptionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStore for SeaOrmSubscriptionStore {
    #[instrument(skip(self, record), fields(transaction_id = %record.transaction_id, user_id = %record.user_id))]
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc();

        let row = ios_subscriptions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(record.user_id),
            profile_id: Set(record.profile_id),
            transaction_id: Set(record.transaction_id.clone()),
            original_transaction_id: Set(record.original_transaction_id.clone()),
            product_id: Set(record.product_id.clone()),
            subscription_type: Set(record.subscription_type),
            purchase_date: Set(record.purchase_date),
            expires_date: Set(record.expires_date),
            is_active: Set(record.is_active),
            auto_renew_status: Set(record.auto_renew_status),
            validation_status: Set(record.validation_status),
            receipt_data: Set(record.receipt_data.clone()),
            receipt_validated_at: Set(now),
            raw_validation_response: Set(record.raw_validation_response.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Single statement so concurrent submissions of one transaction cannot
        // both insert
        ios_subscriptions::Entity::insert(row)
            .on_conflict(
                OnConflict::column(ios_subscriptions::Column::TransactionId)
                    .update_columns([
                        ios_subscriptions::Column::SubscriptionType,
                        ios_subscriptions::Column::ExpiresDate,
                        ios_subscriptions::Column::ReceiptData,
                        ios_subscriptions::Column::ReceiptValidatedAt,
                        ios_subscriptions::Column::ValidationStatus,
                        ios_subscriptions::Column::RawValidationResponse,
                        ios_subscriptions::Column::IsActive,
                        ios_subscriptions::Column::AutoRenewStatus,
                        ios_subscriptions::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        debug!("Subscription record upserted");
        Ok(())
    }

    async fn query_best_active(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ios_subscriptions::Model>, StoreError> {
        let record = ios_subscriptions::Entity::find()
            .filter(ios_subscriptions::Column::UserId.eq(user_id))
            .filter(ios_subscriptions::Column::ValidationStatus.eq(ValidationStatus::Valid))
            .filter(ios_subscriptions::Column::IsActive.eq(true))
            .filter(ios_subscriptions::Column::ExpiresDate.gt(OffsetDateTime::now_utc()))
            .order_by_desc(ios_subscriptions::Column::ExpiresDate)
            .one(&self.db)
            .await?;

        Ok(record)
    }

    async fn purge_expired_test_records(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = ios_subscriptions::Entity::delete_many()
            .filter(ios_subscriptions::Column::UserId.eq(user_id))
            .filter(ios_subscriptions::Column::ValidationStatus.eq(ValidationStatus::Test))
            .filter(ios_subscriptions::Column::ExpiresDate.lte(OffsetDateTime::now_utc()))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(
                user_id = %user_id,
                deleted = result.rows_affected,
                "Purged expired test subscription records"
            );
        }

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::{collections::HashMap, sync::Mutex};

    /// `SubscriptionStore` over a map keyed by transaction id
    #[derive(Default)]
    pub struct InMemorySubscriptionStore {
        rows: Mutex<HashMap<String, ios_subscriptions::Model>>,
    }

    impl InMemorySubscriptionStore {
        pub fn rows(&self) -> Vec<ios_subscriptions::Model> {
            self.rows.lock().unwrap().values().cloned().collect()
        }

        pub fn get(&self, transaction_id: &str) -> Option<ios_subscriptions::Model> {
            self.rows.lock().unwrap().get(transaction_id).cloned()
        }
    }

    pub fn model_from_record(
        record: &SubscriptionRecord,
        now: OffsetDateTime,
    ) -> ios_subscriptions::Model {
        ios_subscriptions::Model {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            profile_id: record.profile_id,
            transaction_id: record.transaction_id.clone(),
            original_transaction_id: record.original_transaction_id.clone(),
            product_id: record.product_id.clone(),
            subscription_type: record.subscription_type,
            purchase_date: record.purchase_date,
            expires_date: record.expires_date,
            is_active: record.is_active,
            auto_renew_status: record.auto_renew_status,
            validation_status: record.validation_status,
            receipt_data: record.receipt_data.clone(),
            receipt_validated_at: now,
            raw_validation_response: record.raw_validation_response.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    #[async_trait]
    impl SubscriptionStore for InMemorySubscriptionStore {
        async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), StoreError> {
            let now = OffsetDateTime::now_utc();
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&record.transaction_id) {
                Some(existing) => {
                    existing.subscription_type = record.subscription_type;
                    existing.expires_date = record.expires_date;
                    existing.receipt_data = record.receipt_data.clone();
                    existing.receipt_validated_at = now;
                    existing.validation_status = record.validation_status;
                    existing.raw_validation_response = record.raw_validation_response.clone();
                    existing.is_active = record.is_active;
                    existing.auto_renew_status = record.auto_renew_status;
                    existing.updated_at = now;
                }
                None => {
                    rows.insert(
                        record.transaction_id.clone(),
                        model_from_record(record, now),
                    );
                }
            }
            Ok(())
        }

        async fn query_best_active(
            &self,
            user_id: Uuid,
        ) -> Result<Option<ios_subscriptions::Model>, StoreError> {
            let now = OffsetDateTime::now_utc();
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|row| {
                    row.user_id == user_id
                        && row.validation_status == ValidationStatus::Valid
                        && row.is_active
                        && row.expires_date > now
                })
                .max_by_key(|row| row.expires_date)
                .cloned())
        }

        async fn purge_expired_test_records(&self, user_id: Uuid) -> Result<u64, StoreError> {
            let now = OffsetDateTime::now_utc();
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|_, row| {
                !(row.user_id == user_id
                    && row.validation_status == ValidationStatus::Test
                    && row.expires_date <= now)
            });
            Ok((before - rows.len()) as u64)
        }
    }
}
