//! Credential loading for DNS providers
//!
//! Supports loading API tokens from:
//! - Inline values
//! - Plain text files (single token)
//! - JSON files (`{"token": "..."}`, `{"api_token": "..."}` or `{"api_key": "..."}`)
//! - Environment variables

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use acme_tools_config::{expand_home, DnsProviderConfig};

use super::provider::DnsProviderError;

/// Environment variable holding the DigitalOcean token
pub const DO_TOKEN_ENV_VAR: &str = "DO_AUTH_TOKEN";
/// Environment variable naming a file holding the DigitalOcean token
pub const DO_TOKEN_FILE_ENV_VAR: &str = "DO_AUTH_TOKEN_FILE";
/// Token file read when neither variable is set
pub const DO_DEFAULT_TOKEN_FILE: &str = "~/.dotoken";

/// Credential loader for DNS provider authentication
#[derive(Debug, Default)]
pub struct CredentialLoader;

impl CredentialLoader {
    /// Load a token from a file
    ///
    /// `~` is expanded. The file may hold the bare token or a JSON object.
    /// On Unix, a warning is logged when the file is readable by group or
    /// others.
    pub fn load_from_file(path: &Path) -> Result<String, DnsProviderError> {
        let path = expand_home(path);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = fs::metadata(&path).map_err(|e| {
                DnsProviderError::Credentials(format!(
                    "Failed to read credentials file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

            let file_mode = metadata.permissions().mode() & 0o777;
            if file_mode & 0o077 != 0 {
                warn!(
                    path = %path.display(),
                    mode = format!("{:o}", file_mode),
                    "Credentials file has overly permissive permissions (should be 0600 or 0400)"
                );
            }
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            DnsProviderError::Credentials(format!(
                "Failed to read credentials file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::parse_token(&content).ok_or_else(|| {
            DnsProviderError::Credentials(format!(
                "Credentials file '{}' does not contain a token",
                path.display()
            ))
        })
    }

    /// Load a token from an environment variable
    pub fn load_from_env(var_name: &str) -> Result<String, DnsProviderError> {
        let value = std::env::var(var_name).map_err(|_| {
            DnsProviderError::Credentials(format!("Environment variable '{}' not set", var_name))
        })?;

        Self::parse_token(&value).ok_or_else(|| {
            DnsProviderError::Credentials(format!(
                "Environment variable '{}' does not contain a token",
                var_name
            ))
        })
    }

    /// Load the token configured for a provider
    ///
    /// Returns `None` when the configuration names no credential source.
    pub fn load_configured(config: &DnsProviderConfig) -> Result<Option<String>, DnsProviderError> {
        if let Some(token) = &config.token {
            return Ok(Some(token.trim().to_string()));
        }
        if let Some(path) = &config.credentials_file {
            return Self::load_from_file(path).map(Some);
        }
        if let Some(var) = &config.credentials_env {
            return Self::load_from_env(var).map(Some);
        }
        Ok(None)
    }

    /// Resolve the DigitalOcean API token
    ///
    /// Order: explicit token, explicit token file, `DO_AUTH_TOKEN`, then the
    /// file named by `DO_AUTH_TOKEN_FILE` (default `~/.dotoken`).
    pub fn digitalocean_token(
        token: Option<&str>,
        token_file: Option<&Path>,
    ) -> Result<String, DnsProviderError> {
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        if let Some(path) = token_file {
            return Self::load_from_file(path);
        }

        if let Ok(value) = std::env::var(DO_TOKEN_ENV_VAR) {
            let value = value.trim();
            if !value.is_empty() {
                debug!(var = DO_TOKEN_ENV_VAR, "Using DigitalOcean token from environment");
                return Ok(value.to_string());
            }
        }

        let token_file = std::env::var(DO_TOKEN_FILE_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DO_DEFAULT_TOKEN_FILE));

        Self::load_from_file(&token_file).map_err(|_| {
            DnsProviderError::Credentials(format!(
                "Either {} or {} environment variable must be defined",
                DO_TOKEN_ENV_VAR, DO_TOKEN_FILE_ENV_VAR
            ))
        })
    }

    /// Extract a token from file or variable content
    fn parse_token(content: &str) -> Option<String> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }

        if !trimmed.starts_with('{') {
            return Some(trimmed.to_string());
        }

        #[derive(Deserialize)]
        struct TokenFormat {
            token: Option<String>,
            api_token: Option<String>,
            api_key: Option<String>,
        }

        let parsed: TokenFormat = serde_json::from_str(trimmed).ok()?;
        parsed
            .token
            .or(parsed.api_token)
            .or(parsed.api_key)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Serializes tests that change process-wide environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_load_plain_text_with_whitespace() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  token-with-spaces  \n").unwrap();

        let token = CredentialLoader::load_from_file(file.path()).unwrap();
        assert_eq!(token, "token-with-spaces");
    }

    #[test]
    fn test_load_json_variants() {
        for (json, expected) in [
            (r#"{"token": "t1"}"#, "t1"),
            (r#"{"api_token": "t2"}"#, "t2"),
            (r#"{"api_key": "t3", "extra": 1}"#, "t3"),
        ] {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(file, "{}", json).unwrap();
            assert_eq!(CredentialLoader::load_from_file(file.path()).unwrap(), expected);
        }
    }

    #[test]
    fn test_invalid_json_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"invalid": "format"}}"#).unwrap();
        assert!(CredentialLoader::load_from_file(file.path()).is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"token": "unclosed"#).unwrap();
        assert!(CredentialLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_empty_file_error() {
        let file = NamedTempFile::new().unwrap();
        assert!(CredentialLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_nonexistent_file() {
        let result = CredentialLoader::load_from_file(Path::new("/nonexistent/path/to/token"));
        assert!(matches!(result, Err(DnsProviderError::Credentials(_))));
    }

    #[test]
    fn test_load_from_env() {
        let _env = ENV_LOCK.lock();
        std::env::set_var("ACME_TOOLS_TEST_TOKEN_1", "env-token-value\n");
        assert_eq!(
            CredentialLoader::load_from_env("ACME_TOOLS_TEST_TOKEN_1").unwrap(),
            "env-token-value"
        );
        std::env::remove_var("ACME_TOOLS_TEST_TOKEN_1");

        assert!(CredentialLoader::load_from_env("ACME_TOOLS_TEST_TOKEN_UNSET").is_err());
    }

    #[test]
    fn test_load_configured() {
        let config = DnsProviderConfig {
            token: Some(" inline ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            CredentialLoader::load_configured(&config).unwrap().as_deref(),
            Some("inline")
        );

        let config = DnsProviderConfig::default();
        assert!(CredentialLoader::load_configured(&config).unwrap().is_none());
    }

    #[test]
    fn test_digitalocean_token_explicit_values_win() {
        assert_eq!(
            CredentialLoader::digitalocean_token(Some("explicit"), None).unwrap(),
            "explicit"
        );

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();
        assert_eq!(
            CredentialLoader::digitalocean_token(None, Some(file.path())).unwrap(),
            "from-file"
        );
    }

    #[test]
    fn test_digitalocean_token_from_environment() {
        let _env = ENV_LOCK.lock();
        let home = TempDir::new().unwrap();
        let saved_home = std::env::var_os("HOME");

        let mut token_file = NamedTempFile::new().unwrap();
        writeln!(token_file, "token-from-env-file").unwrap();

        std::env::set_var(DO_TOKEN_ENV_VAR, "token-from-env");
        std::env::set_var(DO_TOKEN_FILE_ENV_VAR, token_file.path());
        std::env::set_var("HOME", home.path());

        assert_eq!(
            CredentialLoader::digitalocean_token(None, None).unwrap(),
            "token-from-env"
        );

        std::env::remove_var(DO_TOKEN_ENV_VAR);
        assert_eq!(
            CredentialLoader::digitalocean_token(None, None).unwrap(),
            "token-from-env-file"
        );

        std::env::remove_var(DO_TOKEN_FILE_ENV_VAR);
        fs::write(home.path().join(".dotoken"), "token-from-home\n").unwrap();
        assert_eq!(
            CredentialLoader::digitalocean_token(None, None).unwrap(),
            "token-from-home"
        );

        fs::remove_file(home.path().join(".dotoken")).unwrap();
        let err = CredentialLoader::digitalocean_token(None, None).unwrap_err();

        match saved_home {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }

        assert!(matches!(err, DnsProviderError::Credentials(_)));
        assert!(err.to_string().contains(DO_TOKEN_ENV_VAR));
        assert!(err.to_string().contains(DO_TOKEN_FILE_ENV_VAR));
    }
}
