// Service modules
pub mod entitlement_resolver;
pub mod jwt_service;
pub mod payment_processor;
pub mod product_catalog;
pub mod profile_store;
pub mod receipt_decoder;
pub mod receipt_service;
pub mod signed_data;
pub mod subscription_extractor;
pub mod subscription_store;
pub mod transaction_client;
pub mod validation_client;

pub use entitlement_resolver::EntitlementResolver;
pub use jwt_service::{AuthResolver, JWTService};
pub use receipt_service::ReceiptService;
