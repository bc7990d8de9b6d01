// Request/Response models
pub mod common;
pub mod receipt;
pub mod subscription;
pub mod subscription_type_ext; // Extension methods for entity::sea_orm_active_enums::SubscriptionType
