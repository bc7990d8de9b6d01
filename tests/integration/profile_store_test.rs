//! Entitlement write-back onto `profiles`

use entity::sea_orm_active_enums::{SubscriptionSource, SubscriptionType};
use storekeep::{
    models::subscription::Entitlement,
    services::profile_store::{ProfileStore, SeaOrmProfileStore},
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{create_profile, setup_test_db};

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_update_subscription_round_trip() {
    let db = setup_test_db().await;
    let user_id = create_profile(&db, Some("cus_test")).await;
    let store = SeaOrmProfileStore::new(db);

    let expires = OffsetDateTime::now_utc() + Duration::days(365);
    let entitlement = Entitlement {
        subscription_type: SubscriptionType::Annual,
        subscription_expiration: Some(expires),
        subscription_source: Some(SubscriptionSource::AppStore),
    };
    store.update_subscription(user_id, &entitlement).await.unwrap();

    let profile = store.get(user_id).await.unwrap().unwrap();
    assert_eq!(profile.subscription, SubscriptionType::Annual);
    assert_eq!(profile.subscription_source, Some(SubscriptionSource::AppStore));
    assert_eq!(profile.customer_id.as_deref(), Some("cus_test"));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_missing_profile_reads_as_none() {
    let db = setup_test_db().await;
    let store = SeaOrmProfileStore::new(db);

    assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
}
