use entity::sea_orm_active_enums::SubscriptionType;
use std::collections::HashMap;

use crate::config::CatalogConfig;

const BUILT_IN_PRODUCTS: &[(&str, SubscriptionType)] = &[
    ("com.storekeep.app.monthly.plan", SubscriptionType::Monthly),
    ("com.storekeep.app.annual.plan", SubscriptionType::Annual),
    ("com.storekeep.app.basic", SubscriptionType::Lifetime),
    ("com.storekeep.app.lifetime", SubscriptionType::Lifetime),
];

/// Static product id -> tier table
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: HashMap<String, SubscriptionType>,
}

impl ProductCatalog {
    /// Built-in table with configured entries layered on top
    pub fn new(config: &CatalogConfig) -> Self {
        let mut products: HashMap<String, SubscriptionType> = BUILT_IN_PRODUCTS
            .iter()
            .map(|(id, tier)| (id.to_string(), *tier))
            .collect();
        products.extend(config.products.clone());

        Self { products }
    }

    /// Unknown identifiers map to `none`
    pub fn map_to_tier(&self, product_id: &str) -> SubscriptionType {
        self.products
            .get(product_id)
            .copied()
            .unwrap_or(SubscriptionType::None)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.products
            .get(product_id)
            .is_some_and(|tier| *tier != SubscriptionType::None)
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new(&CatalogConfig::default())
    }
}
