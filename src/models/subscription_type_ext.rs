/// Extension methods for the generated `SubscriptionType` enum
///
/// Ranking lives here rather than in entity/src/sea_orm_active_enums.rs so the
/// generated entity crate can be regenerated without losing it.
use entity::sea_orm_active_enums::SubscriptionType;

pub trait SubscriptionTypeExt {
    /// Ordering used when merging sources: lifetime > annual > monthly > none
    fn priority(&self) -> u8;

    /// Whether this tier grants paid access
    fn is_paid(&self) -> bool;

    fn as_str(&self) -> &'static str;
}

impl SubscriptionTypeExt for SubscriptionType {
    fn priority(&self) -> u8 {
        match self {
            SubscriptionType::None => 0,
            SubscriptionType::Monthly => 1,
            SubscriptionType::Annual => 2,
            SubscriptionType::Lifetime => 3,
        }
    }

    fn is_paid(&self) -> bool {
        self.priority() > 0
    }

    fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::None => "none",
            SubscriptionType::Monthly => "monthly",
            SubscriptionType::Annual => "annual",
            SubscriptionType::Lifetime => "lifetime",
        }
    }
}
