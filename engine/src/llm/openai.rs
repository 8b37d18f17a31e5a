//! OpenAI-compatible chat completions provider.
//!
//! Works against any endpoint that speaks `/chat/completions` with Bearer auth,
//! so `base_url` can point at OpenAI itself or a compatible gateway.

use super::{GenerationParams, LLMError, LLMProvider, Message, ProviderKind};
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIProvider {
    base_url: String,
    api_key: SecretString,
    params: GenerationParams,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(base_url: impl Into<String>, api_key: SecretString, params: GenerationParams) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            params,
            client: reqwest::Client::new(),
        }
    }

    fn payload(&self, model: &str, messages: &[Message]) -> serde_json::Value {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        json!({
            "model": model,
            "messages": api_messages,
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_output_tokens,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        !self.api_key.is_blank()
    }

    async fn generate(&self, model: &str, messages: &[Message]) -> super::Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&self.payload(model, messages))
            .send()
            .await
            .map_err(|e| LLMError::from_transport("OpenAI", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status("OpenAI", status, &text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

        message
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))
    }
}
