use crate::{
    config::Config,
    services::{
        entitlement_resolver::{AppStoreSource, EntitlementSource, PaymentProcessorSource},
        payment_processor::StripeSubscriptionLookup,
        product_catalog::ProductCatalog,
        profile_store::{ProfileStore, SeaOrmProfileStore},
        subscription_store::{SeaOrmSubscriptionStore, SubscriptionStore},
        transaction_client::{HttpServerApiTransport, TransactionClient},
        validation_client::{HttpReceiptTransport, ValidationClient},
        AuthResolver, EntitlementResolver, JWTService, ReceiptService,
    },
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub receipt_service: Arc<ReceiptService>,
    pub entitlement_resolver: Arc<EntitlementResolver>,
    pub auth_resolver: Arc<dyn AuthResolver>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Storage adapters
        let store: Arc<dyn SubscriptionStore> = Arc::new(SeaOrmSubscriptionStore::new(db.clone()));
        let profiles: Arc<dyn ProfileStore> = Arc::new(SeaOrmProfileStore::new(db.clone()));

        // Entitlement sources, App Store first so it keeps exact ties
        let mut sources: Vec<Arc<dyn EntitlementSource>> =
            vec![Arc::new(AppStoreSource::new(store.clone()))];
        if config.payment_processor.secret_key.is_some() {
            let lookup = StripeSubscriptionLookup::new(&config.payment_processor)?;
            sources.push(Arc::new(PaymentProcessorSource::new(Arc::new(lookup))));
        } else {
            tracing::warn!("Payment processor secret key not set, entitlements use App Store only");
        }
        let entitlement_resolver = Arc::new(EntitlementResolver::new(profiles.clone(), sources));

        // Receipt pipeline
        let transport = HttpReceiptTransport::new(Duration::from_millis(
            config.app_store.request_timeout_ms,
        ))?;
        let validation_client = ValidationClient::new(&config.app_store, Arc::new(transport));
        let mut receipt_service = ReceiptService::new(
            validation_client,
            ProductCatalog::new(&config.catalog),
            config.app_store.bundle_id.clone(),
            store,
            profiles,
            entitlement_resolver.clone(),
        );

        // Transaction lookups need App Store Server API credentials
        if config.app_store.server_api.is_some() {
            let transport = HttpServerApiTransport::new(Duration::from_millis(
                config.app_store.request_timeout_ms,
            ))?;
            let client = TransactionClient::new(&config.app_store, Arc::new(transport))?;
            receipt_service = receipt_service.with_transaction_client(client);
        } else {
            tracing::warn!("App Store Server API not configured, transaction lookups disabled");
        }
        let receipt_service = Arc::new(receipt_service);

        let auth_resolver: Arc<dyn AuthResolver> =
            Arc::new(JWTService::new(Arc::new(config.auth.clone())));

        Ok(Self {
            db,
            receipt_service,
            entitlement_resolver,
            auth_resolver,
            config: Arc::new(config),
        })
    }
}
