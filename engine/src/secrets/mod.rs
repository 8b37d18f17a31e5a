pub mod credentials;
pub mod string;

pub use credentials::Credentials;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Keychain service name under which provider keys are stored
pub const SERVICE_NAME: &str = "sahara";

/// SecretManager handles storage and retrieval of provider API keys using the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// Lookups never prompt. Interactive entry happens only in `sahara key set`.
pub struct SecretManager {
    service_name: String,
}

/// Regex patterns for detecting common secret formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9]{20,}
/// - Anthropic API keys: sk-ant-...
/// - Google API keys: AIza[0-9A-Za-z-_]{35}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
/// - `key=` query parameters (Gemini puts the key in the URL)
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"AIza[0-9A-Za-z\-_]{35}",
            r"Bearer\s+[^\s]{20,}",
            r"key=[0-9A-Za-z\-_]{16,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Scrubs secrets from text by replacing them with [REDACTED].
///
/// Used on provider error bodies and transport errors before they are logged
/// or wrapped into an error value.
///
/// # Examples
/// ```
/// use sahara_engine::secrets::scrub_secrets;
///
/// let scrubbed = scrub_secrets("My API key is sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "My API key is [REDACTED]");
/// ```
pub fn scrub_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }
    result
}

impl SecretManager {
    /// Creates a new SecretManager with the given service name.
    ///
    /// The service name is used to namespace secrets in the OS keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Retrieves a secret from the OS keychain.
    ///
    /// # Returns
    /// `Ok(None)` when no entry exists for `key`
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<Option<SecretString>, EngineError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(SecretString::new(secret)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails or the value is empty
    pub fn set_secret(&self, key: &str, value: &SecretString) -> Result<(), EngineError> {
        if value.is_blank() {
            return Err(EngineError::KeyringError(
                "Secret cannot be empty".to_string(),
            ));
        }

        self.entry(key)?
            .set_password(value.unsecure())
            .map_err(|e| {
                EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
            })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Deletes a secret from the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        self.entry(key)?.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Failed to delete secret '{}': {}", key, e))
        })?;

        tracing::info!("Deleted secret '{}' from keychain", key);
        Ok(())
    }

    /// Checks if a secret exists in the OS keychain.
    pub fn has_secret(&self, key: &str) -> bool {
        matches!(self.get_secret(key), Ok(Some(_)))
    }
}
