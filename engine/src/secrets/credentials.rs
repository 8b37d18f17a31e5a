use std::collections::HashMap;
use std::fmt;

use crate::config::LLMConfig;
use crate::llm::ProviderKind;
use crate::secrets::{SecretManager, SecretString};

/// Where a provider key was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Keychain,
    Environment(String),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Keychain => write!(f, "keychain"),
            CredentialSource::Environment(var) => write!(f, "${}", var),
        }
    }
}

/// API keys resolved once at startup and handed to provider constructors.
///
/// Nothing downstream reads the process environment; this is the only place
/// an environment variable is consulted, and only for the names the config
/// lists under `api_key_env`.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderKind, (SecretString, CredentialSource)>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and embedding
    pub fn with(mut self, kind: ProviderKind, key: impl Into<SecretString>) -> Self {
        self.keys
            .insert(kind, (key.into(), CredentialSource::Keychain));
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&SecretString> {
        self.keys.get(&kind).map(|(key, _)| key)
    }

    pub fn source(&self, kind: ProviderKind) -> Option<&CredentialSource> {
        self.keys.get(&kind).map(|(_, source)| source)
    }

    pub fn has(&self, kind: ProviderKind) -> bool {
        self.keys.contains_key(&kind)
    }

    /// Resolve keys from the OS keychain, falling back to the configured
    /// environment variables.
    pub fn resolve(config: &LLMConfig, manager: &SecretManager) -> Self {
        Self::resolve_with(
            config,
            |key| match manager.get_secret(key) {
                Ok(secret) => secret,
                Err(e) => {
                    tracing::warn!("Keychain lookup for '{}' failed: {}", key, e);
                    None
                }
            },
            |var| std::env::var(var).ok(),
        )
    }

    /// Resolution with injectable lookups
    pub fn resolve_with<K, E>(config: &LLMConfig, keychain: K, env: E) -> Self
    where
        K: Fn(&str) -> Option<SecretString>,
        E: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::new();

        for kind in ProviderKind::ALL {
            if !kind.requires_api_key() {
                continue;
            }

            if let Some(secret) = keychain(&kind.secret_key()).filter(|s| !s.is_blank()) {
                credentials
                    .keys
                    .insert(kind, (secret, CredentialSource::Keychain));
                continue;
            }

            let Some(var) = config.provider(kind).api_key_env.as_deref() else {
                continue;
            };
            if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
                credentials.keys.insert(
                    kind,
                    (
                        SecretString::new(value.trim()),
                        CredentialSource::Environment(var.to_string()),
                    ),
                );
            }
        }

        tracing::debug!(
            "Resolved credentials for: {:?}",
            credentials.keys.keys().collect::<Vec<_>>()
        );
        credentials
    }
}
