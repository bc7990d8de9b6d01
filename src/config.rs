use entity::sea_orm_active_enums::SubscriptionType;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub app_store: AppStoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub payment_processor: PaymentProcessorConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub run_migrations: bool,
}

/// App Store receipt validation settings.
///
/// Passed explicitly into `ValidationClient`; nothing below the config layer
/// reads endpoints or secrets from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppStoreConfig {
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,
    #[serde(default)]
    pub shared_secret: Option<String>,
    /// When set, receipts issued for any other bundle are rejected
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default = "default_upstream_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Transaction lookups are disabled unless this is set
    #[serde(default)]
    pub server_api: Option<ServerApiConfig>,
}

/// App Store Server API credentials from App Store Connect
#[derive(Debug, Clone, Deserialize)]
pub struct ServerApiConfig {
    pub key_id: String,
    pub issuer_id: String,
    /// Contents of the `.p8` key, with or without PEM armour
    pub private_key: String,
    #[serde(default = "default_server_api_production_url")]
    pub production_url: String,
    #[serde(default = "default_server_api_sandbox_url")]
    pub sandbox_url: String,
    /// Trust anchors for signed transactions, PEM or base64 DER. Empty
    /// disables signature verification.
    #[serde(default)]
    pub root_certificates: Vec<String>,
}

impl AppStoreConfig {
    /// Shared secret, ignoring blank values from env overrides
    pub fn shared_secret(&self) -> Option<&str> {
        self.shared_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Extra product id -> tier entries layered over the built-in catalog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub products: HashMap<String, SubscriptionType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentProcessorConfig {
    #[serde(default = "default_processor_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub monthly_price_id: Option<String>,
    #[serde(default)]
    pub annual_price_id: Option<String>,
    #[serde(default)]
    pub lifetime_price_id: Option<String>,
    #[serde(default = "default_upstream_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_production_url() -> String {
    "https://buy.itunes.apple.com/verifyReceipt".to_string()
}

fn default_sandbox_url() -> String {
    "https://sandbox.itunes.apple.com/verifyReceipt".to_string()
}

fn default_server_api_production_url() -> String {
    "https://api.storekit.itunes.apple.com".to_string()
}

fn default_server_api_sandbox_url() -> String {
    "https://api.storekit-sandbox.itunes.apple.com".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    10_000
}

fn default_processor_api_base() -> String {
    "https://api.stripe.com".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            // config.yml is required
            .add_source(config::File::with_name("config").required(true))
            // Allow environment variables to override config file
            .add_source(
                config::Environment::with_prefix("STOREKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
