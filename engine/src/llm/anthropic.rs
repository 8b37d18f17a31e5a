use super::{split_system, GenerationParams, LLMError, LLMProvider, Message, ProviderKind};
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    base_url: String,
    api_key: SecretString,
    params: GenerationParams,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(base_url: impl Into<String>, api_key: SecretString, params: GenerationParams) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            params,
            client: reqwest::Client::new(),
        }
    }

    /// The system persona travels in the top-level `system` field.
    fn payload(&self, model: &str, messages: &[Message]) -> serde_json::Value {
        let (system, turns) = split_system(messages);

        let api_messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let mut payload = json!({
            "model": model,
            "messages": api_messages,
            "max_tokens": self.params.max_output_tokens,
            "temperature": self.params.temperature,
        });

        if let Some(system) = system {
            payload["system"] = json!(system);
        }

        payload
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        !self.api_key.is_blank()
    }

    async fn generate(&self, model: &str, messages: &[Message]) -> super::Result<String> {
        let url = format!("{}/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.payload(model, messages))
            .send()
            .await
            .map_err(|e| LLMError::from_transport("Anthropic", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status("Anthropic", status, &text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::ParseError("No content in response".to_string()))?;

        let text: String = content
            .iter()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect();

        if text.is_empty() {
            return Err(LLMError::ParseError("No text blocks in response".to_string()));
        }

        Ok(text)
    }
}
