//! JWT access-token verification
//!
//! Tokens are minted by the external identity provider and verified here
//! with a shared secret. `issue_access_token` mirrors the provider's token
//! shape; the server itself only consumes tokens, but local tooling and the
//! test suite mint with it.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{AuthContext, RoleSet};

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Role names granted to the user
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Mint an access token in the identity provider's shape
pub fn issue_access_token(
    user_id: Uuid,
    email: &str,
    roles: &[&str],
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode an access token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        if e.to_string().contains("ExpiredSignature") {
            JwtError::TokenExpired
        } else {
            JwtError::InvalidToken(e.to_string())
        }
    })?;

    Ok(token_data.claims)
}

/// Build the per-request actor context from verified claims. Unknown role
/// names in the token are dropped rather than stored.
pub fn claims_to_context(claims: &Claims) -> Result<AuthContext, JwtError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|e| JwtError::InvalidToken(format!("invalid subject: {}", e)))?;

    Ok(AuthContext {
        user_id,
        email: claims.email.clone(),
        roles: RoleSet::from_names(claims.roles.iter().map(String::as_str)),
    })
}

/// Verifies bearer tokens for the extractor; holds the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthContext, JwtError> {
        let claims = verify_token(token, &self.secret)?;
        claims_to_context(&claims)
    }
}
