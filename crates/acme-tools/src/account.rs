//! ACME account management
//!
//! An [`AccountManager`] registers a new account with an ACME directory, or
//! restores one from an account file written by a previous registration.
//!
//! # Account file
//!
//! ```json
//! {
//!   "email": "someone@example.com",
//!   "directory": "https://acme-staging-v02.api.letsencrypt.org/directory",
//!   "credentials": { "id": "...", "key_pkcs8": "...", "directory": "..." }
//! }
//! ```

use std::path::Path;

use instant_acme::{Account, AccountBuilder, AccountCredentials, HttpClient, NewAccount};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AcmeError;
use crate::storage;

/// On-disk representation of an account
#[derive(Debug, Serialize, Deserialize)]
struct AccountFile {
    email: String,
    directory: String,
    credentials: serde_json::Value,
}

/// Creates, imports and exports an ACME account
pub struct AccountManager {
    email: String,
    directory: String,
    account: Option<Account>,
    credentials: Option<serde_json::Value>,
}

impl AccountManager {
    /// Create a manager for an account that is not registered yet
    pub fn new(email: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            directory: directory.into(),
            account: None,
            credentials: None,
        }
    }

    /// Register a new account and return its manager
    pub async fn generate_new_account(
        email: impl Into<String>,
        directory: impl Into<String>,
    ) -> Result<Self, AcmeError> {
        let mut manager = Self::new(email, directory);
        manager.create().await?;
        Ok(manager)
    }

    /// Register the account with the ACME directory
    ///
    /// The contact is `mailto:<email>` and the terms of service are agreed.
    pub async fn create(&mut self) -> Result<(), AcmeError> {
        info!(email = %self.email, directory = %self.directory, "Creating new ACME account");

        let (account, credentials) = Account::builder()
            .map_err(|e| AcmeError::AccountCreation(e.to_string()))?
            .create(
                &NewAccount {
                    contact: &[&format!("mailto:{}", self.email)],
                    terms_of_service_agreed: true,
                    only_return_existing: false,
                },
                self.directory.clone(),
                None,
            )
            .await
            .map_err(|e| AcmeError::AccountCreation(e.to_string()))?;

        let credentials = serde_json::to_value(&credentials).map_err(|e| {
            AcmeError::AccountCreation(format!("Failed to serialize credentials: {}", e))
        })?;

        self.account = Some(account);
        self.credentials = Some(credentials);
        info!("ACME account created successfully");
        Ok(())
    }

    /// The registered account
    pub fn account(&self) -> Result<&Account, AcmeError> {
        self.account.as_ref().ok_or(AcmeError::NoAccount)
    }

    /// Deactivate the account with the ACME server
    ///
    /// The account can no longer order certificates afterwards, and the
    /// manager holds no account whatever the outcome.
    pub async fn deactivate(&mut self) -> Result<(), AcmeError> {
        let account = self.account.take().ok_or(AcmeError::NoAccount)?;
        let id = self.account_id().unwrap_or_default().to_string();
        self.credentials = None;

        info!(email = %self.email, account = %id, "Deactivating ACME account");
        account
            .deactivate()
            .await
            .map_err(|e| AcmeError::AccountDeactivation(e.to_string()))?;

        info!(account = %id, "ACME account deactivated");
        Ok(())
    }

    /// Contact email of the account
    pub fn email(&self) -> &str {
        &self.email
    }

    /// ACME directory URL the account belongs to
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Account URL assigned by the ACME server, if known
    pub fn account_id(&self) -> Option<&str> {
        self.credentials.as_ref()?.get("id")?.as_str()
    }

    /// Export the account as JSON
    pub fn export_to_json(&self) -> Result<String, AcmeError> {
        let credentials = self.credentials.clone().ok_or(AcmeError::NoAccount)?;
        let file = AccountFile {
            email: self.email.clone(),
            directory: self.directory.clone(),
            credentials,
        };
        serde_json::to_string_pretty(&file).map_err(|e| AcmeError::Storage(e.into()))
    }

    /// Export the account to a file readable only by its owner
    pub fn export_to_file(
        &self,
        path: impl AsRef<Path>,
        create_parents: bool,
    ) -> Result<(), AcmeError> {
        let json = self.export_to_json()?;
        let path = storage::write_private_file(path, &json, create_parents)?;
        info!(path = %path.display(), "ACME account exported");
        Ok(())
    }

    /// Restore an account from JSON without registering it again
    pub async fn import_from_json(content: &str) -> Result<Self, AcmeError> {
        let (file, credentials) = parse_account_file(content)?;
        let builder =
            Account::builder().map_err(|e| AcmeError::AccountCreation(e.to_string()))?;
        Self::restore(file, credentials, builder).await
    }

    /// Restore an account from JSON, reaching the CA through `http`
    ///
    /// For ACME servers the default HTTPS client cannot talk to, such as a
    /// test CA served over plain HTTP.
    pub async fn import_from_json_with_http(
        content: &str,
        http: Box<dyn HttpClient>,
    ) -> Result<Self, AcmeError> {
        let (file, credentials) = parse_account_file(content)?;
        Self::restore(file, credentials, Account::builder_with_http(http)).await
    }

    async fn restore(
        file: AccountFile,
        credentials: AccountCredentials,
        builder: AccountBuilder,
    ) -> Result<Self, AcmeError> {
        let account = builder
            .from_credentials(credentials)
            .await
            .map_err(|e| AcmeError::AccountCreation(e.to_string()))?;

        debug!(email = %file.email, directory = %file.directory, "ACME account loaded");

        Ok(Self {
            email: file.email,
            directory: file.directory,
            account: Some(account),
            credentials: Some(file.credentials),
        })
    }

    /// Restore an account from a file
    pub async fn import_from_file(path: impl AsRef<Path>) -> Result<Self, AcmeError> {
        let content = storage::read_file(path)?;
        Self::import_from_json(&content).await
    }
}

fn parse_account_file(content: &str) -> Result<(AccountFile, AccountCredentials), AcmeError> {
    let file: AccountFile =
        serde_json::from_str(content).map_err(|e| AcmeError::InvalidAccountFile(e.to_string()))?;

    let credentials: AccountCredentials = serde_json::from_value(file.credentials.clone())
        .map_err(|e| {
            AcmeError::InvalidAccountFile(format!("Failed to deserialize credentials: {}", e))
        })?;

    Ok((file, credentials))
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("email", &self.email)
            .field("directory", &self.directory)
            .field("has_account", &self.account.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::LETSENCRYPT_STAGING;
    use tempfile::TempDir;

    #[test]
    fn test_unregistered_account() {
        let manager = AccountManager::new("someone@example.com", LETSENCRYPT_STAGING);

        assert!(matches!(manager.account(), Err(AcmeError::NoAccount)));
        assert!(matches!(manager.export_to_json(), Err(AcmeError::NoAccount)));
        assert_eq!(manager.email(), "someone@example.com");
        assert_eq!(manager.directory(), LETSENCRYPT_STAGING);
        assert!(manager.account_id().is_none());
    }

    #[tokio::test]
    async fn test_deactivate_requires_account() {
        let mut manager = AccountManager::new("someone@example.com", LETSENCRYPT_STAGING);
        assert!(matches!(manager.deactivate().await, Err(AcmeError::NoAccount)));
    }

    #[test]
    fn test_debug_output() {
        let manager = AccountManager::new("someone@example.com", LETSENCRYPT_STAGING);
        let debug = format!("{:?}", manager);
        assert!(debug.contains("someone@example.com"));
        assert!(debug.contains("has_account: false"));
    }

    #[tokio::test]
    async fn test_import_malformed_json() {
        let result = AccountManager::import_from_json("{not json").await;
        assert!(matches!(result, Err(AcmeError::InvalidAccountFile(_))));
    }

    #[tokio::test]
    async fn test_import_missing_fields() {
        let result = AccountManager::import_from_json(r#"{"email": "a@example.com"}"#).await;
        assert!(matches!(result, Err(AcmeError::InvalidAccountFile(_))));
    }

    #[tokio::test]
    async fn test_import_invalid_credentials() {
        let content = r#"{
            "email": "a@example.com",
            "directory": "https://acme.example.com/directory",
            "credentials": {"unexpected": true}
        }"#;
        let result = AccountManager::import_from_json(content).await;
        assert!(matches!(result, Err(AcmeError::InvalidAccountFile(_))));
    }

    #[tokio::test]
    async fn test_import_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = AccountManager::import_from_file(dir.path().join("account.json")).await;
        assert!(matches!(
            result,
            Err(AcmeError::Storage(StorageError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_export_without_account_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("account.json");
        let manager = AccountManager::new("someone@example.com", LETSENCRYPT_STAGING);

        assert!(manager.export_to_file(&path, true).is_err());
        assert!(!path.exists());
    }
}
