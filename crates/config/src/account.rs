//! ACME account settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Let's Encrypt production directory URL
pub const LETSENCRYPT_PRODUCTION: &str = "https://acme-v02.api.letsencrypt.org/directory";
/// Let's Encrypt staging directory URL
pub const LETSENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// ACME account configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
pub struct AccountSettings {
    /// Contact email registered with the CA
    #[validate(email(message = "account email must be a valid email address"))]
    pub email: Option<String>,

    /// Explicit ACME directory URL (overrides `staging`)
    #[serde(default)]
    pub directory: Option<String>,

    /// Use the Let's Encrypt staging environment
    #[serde(default)]
    pub staging: bool,

    /// Location of the account file
    #[serde(default = "default_account_file")]
    pub file: PathBuf,
}

impl AccountSettings {
    /// The ACME directory URL to use
    ///
    /// An explicit `directory` wins; otherwise Let's Encrypt staging or
    /// production depending on `staging`.
    pub fn directory_url(&self) -> &str {
        match &self.directory {
            Some(url) => url,
            None if self.staging => LETSENCRYPT_STAGING,
            None => LETSENCRYPT_PRODUCTION,
        }
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            email: None,
            directory: None,
            staging: false,
            file: default_account_file(),
        }
    }
}

fn default_account_file() -> PathBuf {
    PathBuf::from("~/.config/acme-tools/account.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_url_precedence() {
        let mut settings = AccountSettings::default();
        assert_eq!(settings.directory_url(), LETSENCRYPT_PRODUCTION);

        settings.staging = true;
        assert_eq!(settings.directory_url(), LETSENCRYPT_STAGING);

        settings.directory = Some("https://localhost:14000/dir".to_string());
        assert_eq!(settings.directory_url(), "https://localhost:14000/dir");
    }
}
