//! LLM Client
//!
//! Routes a completion request to the provider registered for the model
//! reference's provider kind. Every attempt is bounded by the configured
//! per-call timeout; when the requested model fails, the configured fallback
//! models are tried in order.

use std::collections::HashMap;
use std::time::Duration;

use super::anthropic::AnthropicProvider;
use super::gemini::GeminiProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::{LLMError, LLMProvider, Message, ModelRef, ProviderKind};
use crate::config::LLMConfig;
use crate::secrets::Credentials;

pub struct LLMClient {
    /// One provider per backend kind
    providers: HashMap<ProviderKind, Box<dyn LLMProvider>>,

    /// Models tried, in order, after the requested one fails
    fallback: Vec<ModelRef>,

    /// Upper bound for a single attempt
    timeout: Duration,
}

impl LLMClient {
    /// Create an empty client
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            fallback: Vec::new(),
            timeout,
        }
    }

    /// Register a provider, replacing any previous one of the same kind
    pub fn with_provider(mut self, provider: Box<dyn LLMProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn with_fallback(mut self, fallback: Vec<ModelRef>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Build a client with every provider that can be constructed.
    ///
    /// Ollama is always registered. Cloud providers are registered only when
    /// a key was resolved for them.
    pub fn from_config(config: &LLMConfig, credentials: &Credentials) -> Self {
        let params = config.generation_params();
        let mut client = Self::new(config.timeout()).with_fallback(config.fallback.clone());

        for kind in ProviderKind::ALL {
            let base_url = config.provider(kind).base_url.clone();
            let provider: Box<dyn LLMProvider> = match (kind, credentials.get(kind)) {
                (ProviderKind::Ollama, _) => Box::new(OllamaProvider::new(base_url, params)),
                (ProviderKind::OpenAI, Some(key)) => {
                    Box::new(OpenAIProvider::new(base_url, key.clone(), params))
                }
                (ProviderKind::Anthropic, Some(key)) => {
                    Box::new(AnthropicProvider::new(base_url, key.clone(), params))
                }
                (ProviderKind::Gemini, Some(key)) => {
                    Box::new(GeminiProvider::new(base_url, key.clone(), params))
                }
                (_, None) => {
                    if config.referenced_providers().contains(&kind) {
                        tracing::warn!(
                            "No API key for provider '{}'; calls to it will fail",
                            kind
                        );
                    }
                    continue;
                }
            };
            client = client.with_provider(provider);
        }

        client
    }

    /// Whether a provider of this kind is registered
    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate a completion with automatic failover
    ///
    /// Attempts the requested model first, then each fallback model that
    /// differs from it. Returns the first successful text.
    ///
    /// # Errors
    /// `LLMError::ProviderUnavailable` when every candidate failed. When only
    /// one candidate was tried its own error is returned unchanged.
    pub async fn complete(&self, model: &ModelRef, messages: &[Message]) -> super::Result<String> {
        let candidates: Vec<&ModelRef> = std::iter::once(model)
            .chain(self.fallback.iter().filter(|m| *m != model))
            .collect();

        let mut last_error = None;

        for candidate in &candidates {
            let Some(provider) = self.providers.get(&candidate.provider) else {
                tracing::warn!("No provider registered for {}", candidate);
                last_error = Some(LLMError::ProviderUnavailable(format!(
                    "No provider registered for '{}'",
                    candidate.provider
                )));
                continue;
            };

            tracing::debug!(
                "Attempting model: {} (timeout: {}s)",
                candidate,
                self.timeout.as_secs()
            );

            let result = tokio::time::timeout(
                self.timeout,
                provider.generate(&candidate.model, messages),
            )
            .await;

            match result {
                Ok(Ok(text)) => {
                    tracing::debug!("Model {} succeeded ({} chars)", candidate, text.chars().count());
                    return Ok(text);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Model {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Model {} timed out after {}s",
                        candidate,
                        self.timeout.as_secs()
                    );
                    last_error = Some(LLMError::Timeout);
                }
            }
        }

        match last_error {
            Some(e) if candidates.len() == 1 => Err(e),
            _ => {
                tracing::error!("All LLM providers exhausted");
                Err(LLMError::ProviderUnavailable(
                    "All LLM providers failed".to_string(),
                ))
            }
        }
    }

    /// Check the health of all registered providers
    pub async fn check_health(&self) -> Vec<ProviderHealth<'_>> {
        let mut results = Vec::new();
        for kind in ProviderKind::ALL {
            if let Some(provider) = self.providers.get(&kind) {
                results.push(ProviderHealth {
                    name: provider.name(),
                    local: provider.is_local(),
                    healthy: provider.check_health().await,
                });
            }
        }
        results
    }
}

/// Health probe result for one registered provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderHealth<'a> {
    pub name: &'a str,
    /// Runs on this machine rather than a hosted API
    pub local: bool,
    pub healthy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Mock provider for testing
    struct MockProvider {
        kind: ProviderKind,
        reply: Option<String>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn ok(kind: ProviderKind, reply: &str) -> Self {
            Self {
                kind,
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(kind: ProviderKind) -> Self {
            Self {
                kind,
                reply: None,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn is_local(&self) -> bool {
            self.kind == ProviderKind::Ollama
        }

        async fn generate(&self, model: &str, _messages: &[Message]) -> super::super::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Some(reply) => Ok(format!("{}:{}", model, reply)),
                None => Err(LLMError::ProviderUnavailable("mock failure".to_string())),
            }
        }
    }

    fn model(s: &str) -> ModelRef {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_routes_by_provider_kind() {
        let client = LLMClient::new(Duration::from_secs(5))
            .with_provider(Box::new(MockProvider::ok(ProviderKind::Gemini, "g")))
            .with_provider(Box::new(MockProvider::ok(ProviderKind::Ollama, "o")));

        let text = client
            .complete(&model("ollama/llama3.1:8b"), &[Message::user("hi")])
            .await
            .unwrap();
        assert_eq!(text, "llama3.1:8b:o");
    }

    #[tokio::test]
    async fn test_failover_to_fallback_model() {
        let primary = MockProvider::failing(ProviderKind::Gemini);
        let primary_calls = primary.calls.clone();
        let client = LLMClient::new(Duration::from_secs(5))
            .with_provider(Box::new(primary))
            .with_provider(Box::new(MockProvider::ok(ProviderKind::Ollama, "ok")))
            .with_fallback(vec![model("ollama/qwen2.5")]);

        let text = client
            .complete(&model("gemini/gemini-1.5-pro"), &[Message::user("hi")])
            .await
            .unwrap();

        assert_eq!(text, "qwen2.5:ok");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_candidate_keeps_its_error() {
        let client = LLMClient::new(Duration::from_secs(5))
            .with_provider(Box::new(MockProvider::failing(ProviderKind::Gemini)));

        let err = client
            .complete(&model("gemini/x"), &[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mock failure"));
    }

    #[tokio::test]
    async fn test_all_candidates_failing() {
        let client = LLMClient::new(Duration::from_secs(5))
            .with_provider(Box::new(MockProvider::failing(ProviderKind::Gemini)))
            .with_fallback(vec![model("anthropic/claude-3-haiku")]);

        let err = client
            .complete(&model("gemini/x"), &[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("All LLM providers failed"));
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let mut slow = MockProvider::ok(ProviderKind::Ollama, "late");
        slow.delay = Duration::from_millis(500);
        let client = LLMClient::new(Duration::from_millis(20)).with_provider(Box::new(slow));

        let err = client
            .complete(&model("ollama/m"), &[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::Timeout));
    }

    #[tokio::test]
    async fn test_fallback_equal_to_primary_is_not_retried() {
        let primary = MockProvider::failing(ProviderKind::Gemini);
        let calls = primary.calls.clone();
        let client = LLMClient::new(Duration::from_secs(5))
            .with_provider(Box::new(primary))
            .with_fallback(vec![model("gemini/x")]);

        let _ = client.complete(&model("gemini/x"), &[Message::user("hi")]).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config_registers_keyed_providers() {
        let config = LLMConfig::default();
        let credentials = Credentials::new().with(ProviderKind::Gemini, "key");
        let client = LLMClient::from_config(&config, &credentials);

        assert!(client.has_provider(ProviderKind::Ollama));
        assert!(client.has_provider(ProviderKind::Gemini));
        assert!(!client.has_provider(ProviderKind::OpenAI));
        assert_eq!(client.timeout(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_check_health_lists_registered() {
        let client = LLMClient::new(Duration::from_secs(1))
            .with_provider(Box::new(MockProvider::ok(ProviderKind::Anthropic, "x")));
        let health = client.check_health().await;
        assert_eq!(
            health,
            vec![ProviderHealth {
                name: "anthropic",
                local: false,
                healthy: true
            }]
        );
    }
}
