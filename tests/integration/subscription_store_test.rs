//! Upsert idempotence and best-active queries against Postgres

use entity::{
    ios_subscriptions,
    sea_orm_active_enums::{SubscriptionType, ValidationStatus},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use std::sync::Arc;
use storekeep::{
    models::subscription::SubscriptionRecord,
    services::subscription_store::{SeaOrmSubscriptionStore, SubscriptionStore},
};
use time::{Duration, OffsetDateTime};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::{create_profile, setup_test_db};

fn record(
    user_id: Uuid,
    transaction_id: &str,
    expires_in: Duration,
    validation_status: ValidationStatus,
) -> SubscriptionRecord {
    let now = OffsetDateTime::now_utc();
    SubscriptionRecord {
        user_id,
        profile_id: user_id,
        transaction_id: transaction_id.to_string(),
        original_transaction_id: transaction_id.to_string(),
        product_id: "com.storekeep.app.monthly.plan".to_string(),
        subscription_type: SubscriptionType::Monthly,
        purchase_date: now - Duration::days(1),
        expires_date: now + expires_in,
        is_active: expires_in > Duration::ZERO,
        auto_renew_status: true,
        validation_status,
        receipt_data: "cmVjZWlwdA==".to_string(),
        raw_validation_response: Some(json!({"status": 0})),
    }
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_concurrent_upserts_leave_one_row() {
    let db = setup_test_db().await;
    let user_id = create_profile(&db, None).await;
    let store = Arc::new(SeaOrmSubscriptionStore::new(db.clone()));
    let transaction_id = format!("txn-{}", Uuid::new_v4());
    let rec = record(user_id, &transaction_id, Duration::days(30), ValidationStatus::Valid);

    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let store = store.clone();
        let rec = rec.clone();
        tasks.spawn(async move { store.upsert(&rec).await });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("task panicked").expect("upsert failed");
    }

    let count = ios_subscriptions::Entity::find()
        .filter(ios_subscriptions::Column::TransactionId.eq(transaction_id.as_str()))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_upsert_updates_in_place() {
    let db = setup_test_db().await;
    let user_id = create_profile(&db, None).await;
    let store = SeaOrmSubscriptionStore::new(db.clone());
    let transaction_id = format!("txn-{}", Uuid::new_v4());

    let first = record(user_id, &transaction_id, Duration::days(30), ValidationStatus::Valid);
    store.upsert(&first).await.unwrap();

    let mut renewed = first.clone();
    renewed.subscription_type = SubscriptionType::Annual;
    renewed.expires_date = first.expires_date + Duration::days(365);
    store.upsert(&renewed).await.unwrap();

    let best = store.query_best_active(user_id).await.unwrap().unwrap();
    assert_eq!(best.transaction_id, transaction_id);
    assert_eq!(best.subscription_type, SubscriptionType::Annual);
    assert_eq!(best.purchase_date.unix_timestamp(), first.purchase_date.unix_timestamp());
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_query_and_purge_respect_validation_status() {
    let db = setup_test_db().await;
    let user_id = create_profile(&db, None).await;
    let store = SeaOrmSubscriptionStore::new(db.clone());

    let expired_valid = format!("expired-{}", Uuid::new_v4());
    let live_test = format!("live-test-{}", Uuid::new_v4());
    let old_test = format!("old-test-{}", Uuid::new_v4());

    let mut stale = record(user_id, &expired_valid, Duration::hours(-2), ValidationStatus::Valid);
    stale.is_active = true;
    store.upsert(&stale).await.unwrap();
    store
        .upsert(&record(user_id, &live_test, Duration::days(5), ValidationStatus::Test))
        .await
        .unwrap();
    store
        .upsert(&record(user_id, &old_test, Duration::hours(-1), ValidationStatus::Test))
        .await
        .unwrap();

    assert!(store.query_best_active(user_id).await.unwrap().is_none());

    let purged = store.purge_expired_test_records(user_id).await.unwrap();
    assert_eq!(purged, 1);

    let remaining = ios_subscriptions::Entity::find()
        .filter(ios_subscriptions::Column::UserId.eq(user_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(remaining, 2);
}
