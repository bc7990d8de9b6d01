use crate::{
    config::AuthConfig,
    error::{ApiError, Result},
};
use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Resolves an opaque bearer credential to the user it was issued to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthResolver: Send + Sync {
    async fn resolve_user(&self, access_token: &str) -> Result<Uuid>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// HS256 verifier for access tokens issued by the account service
pub struct JWTService {
    decoding_key: DecodingKey,
}

impl JWTService {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self { decoding_key }
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Access token has expired".to_string())
                }
                _ => ApiError::Unauthorized(format!("Invalid access token: {}", e)),
            })?;

        Ok(token_data.claims)
    }

    /// Extract user_id from claims
    pub fn user_id_from_claims(claims: &Claims) -> Result<Uuid> {
        Uuid::parse_str(&claims.sub)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid user_id in token: {}", e)))
    }
}

#[async_trait]
impl AuthResolver for JWTService {
    async fn resolve_user(&self, access_token: &str) -> Result<Uuid> {
        let claims = self.validate_token(access_token)?;
        Self::user_id_from_claims(&claims)
    }
}
