//! External identity provider client
//!
//! Account records (credentials, sessions) live in a managed identity
//! service; this module only provisions and deletes accounts through its
//! admin API. The trait seam lets the provisioning saga run against a test
//! double.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Identity provider errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    RequestFailed(String),

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::RequestFailed(err.to_string())
    }
}

/// Admin operations against the external identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and return its user id
    async fn provision_account(&self, email: &str, password: &str)
        -> Result<Uuid, IdentityError>;

    /// Delete an account (used as a compensating action)
    async fn delete_account(&self, user_id: Uuid) -> Result<(), IdentityError>;
}

#[derive(Debug, Deserialize)]
struct ProvisionedAccount {
    id: Uuid,
}

/// HTTP client for the identity provider admin API
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn provision_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Uuid, IdentityError> {
        let url = format!("{}/admin/users", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected(format!("{}: {}", status, body)));
        }

        let account: ProvisionedAccount = response.json().await?;
        Ok(account.id)
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<(), IdentityError> {
        let url = format!("{}/admin/users/{}", self.base_url, user_id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected(response.status().to_string()));
        }

        Ok(())
    }
}

/// Generate a temporary password for a provisioned account
pub fn generate_temporary_password() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_password_shape() {
        let password = generate_temporary_password();
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_temporary_passwords_differ() {
        assert_ne!(generate_temporary_password(), generate_temporary_password());
    }
}
