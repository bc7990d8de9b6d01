use async_trait::async_trait;
use entity::profiles;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::subscription::Entitlement,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<profiles::Model>>;

    /// Overwrite the profile's entitlement columns
    async fn update_subscription(&self, user_id: Uuid, entitlement: &Entitlement) -> Result<()>;
}

pub struct SeaOrmProfileStore {
    db: DatabaseConnection,
}

impl SeaOrmProfileStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for SeaOrmProfileStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<profiles::Model>> {
        profiles::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::Store(e.into()))
    }

    async fn update_subscription(&self, user_id: Uuid, entitlement: &Entitlement) -> Result<()> {
        let profile = profiles::ActiveModel {
            id: Set(user_id),
            subscription: Set(entitlement.subscription_type),
            subscription_expiration: Set(entitlement.subscription_expiration),
            subscription_source: Set(entitlement.subscription_source),
            updated_at: Set(OffsetDateTime::now_utc()),
            ..Default::default()
        };

        profile
            .update(&self.db)
            .await
            .map_err(|e| ApiError::Store(e.into()))?;

        Ok(())
    }
}
