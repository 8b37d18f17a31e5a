//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for interacting with multiple LLM providers
//! (Ollama, OpenAI, Anthropic, Gemini). The LLMProvider trait defines the contract
//! that all providers must implement: a model identifier and an ordered list of
//! role/content pairs go in, generated text comes out.
//!
//! Models are addressed with a [`ModelRef`] of the form `<provider>/<model>`
//! (e.g. `gemini/gemini-1.5-flash-latest`). The [`client::LLMClient`] routes each
//! call to the provider registered for the reference's provider kind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod ollama;
pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Map a non-success HTTP status and body to an error.
    ///
    /// The body is scrubbed of anything that looks like a credential before
    /// it is stored in the error.
    pub(crate) fn from_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let body = crate::secrets::scrub_secrets(body);
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            400 | 404 | 422 => LLMError::InvalidRequest(body),
            _ => LLMError::ProviderUnavailable(format!(
                "{} API error ({}): {}",
                provider, status, body
            )),
        }
    }

    /// Map a transport-level reqwest failure.
    pub(crate) fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else if err.is_connect() {
            LLMError::ProviderUnavailable(format!("Cannot connect to {}: {}", provider, err))
        } else {
            LLMError::NetworkError(crate::secrets::scrub_secrets(&err.to_string()))
        }
    }
}

impl From<LLMError> for sdk::errors::EngineError {
    fn from(err: LLMError) -> Self {
        sdk::errors::EngineError::LLMProvider(err.to_string())
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Generation parameters shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens per call
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 4096,
        }
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAI,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Ollama,
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
    ];

    /// Prefix used in model references and config keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Keychain entry name for this provider's API key
    pub fn secret_key(&self) -> String {
        format!("{}_api_key", self.as_str())
    }

    /// Whether calls need an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown provider '{}' (expected one of: ollama, openai, anthropic, gemini)",
                    s
                )
            })
    }
}

/// A `<provider>/<model>` reference
///
/// The split happens at the first `/`, so model names may themselves
/// contain slashes (`openai/meta/llama-3.1-70b-instruct`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelRef {
    pub provider: ProviderKind,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl FromStr for ModelRef {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (provider, model) = s
            .split_once('/')
            .ok_or_else(|| format!("model reference '{}' must look like <provider>/<model>", s))?;
        let model = model.trim();
        if model.is_empty() {
            return Err(format!("model reference '{}' has an empty model name", s));
        }
        Ok(Self {
            provider: provider.parse()?,
            model: model.to_string(),
        })
    }
}

impl TryFrom<String> for ModelRef {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelRef> for String {
    fn from(value: ModelRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Backend this provider talks to
    fn kind(&self) -> ProviderKind;

    /// Returns the name of the provider (e.g., "ollama", "openai", "anthropic")
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Returns true if this is a local provider (e.g., Ollama), false for cloud providers
    fn is_local(&self) -> bool;

    /// Generate a completion
    ///
    /// # Arguments
    /// * `model` - Provider-specific model identifier
    /// * `messages` - System persona followed by the user content
    ///
    /// # Returns
    /// * `Ok(String)` - The generated text
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, model: &str, messages: &[Message]) -> Result<String>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Split a message list into the joined system prompt and the remaining turns.
///
/// Anthropic and Gemini carry the system prompt outside the turn list.
pub(crate) fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system = String::new();
    let mut turns = Vec::new();
    for msg in messages {
        if msg.role == MessageRole::System {
            if !system.is_empty() {
                system.push('\n');
            }
            system.push_str(&msg.content);
        } else {
            turns.push(msg);
        }
    }
    let system = if system.is_empty() { None } else { Some(system) };
    (system, turns)
}
