use super::{split_system, GenerationParams, LLMError, LLMProvider, Message, MessageRole, ProviderKind};
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;

pub struct GeminiProvider {
    base_url: String,
    api_key: SecretString,
    params: GenerationParams,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(base_url: impl Into<String>, api_key: SecretString, params: GenerationParams) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            params,
            client: reqwest::Client::new(),
        }
    }

    fn payload(&self, messages: &[Message]) -> serde_json::Value {
        let (system, turns) = split_system(messages);

        let contents: Vec<serde_json::Value> = turns
            .iter()
            .map(|msg| {
                json!({
                    "role": if msg.role == MessageRole::Assistant { "model" } else { "user" },
                    "parts": [{"text": msg.content}]
                })
            })
            .collect();

        let mut payload = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.params.temperature,
                "maxOutputTokens": self.params.max_output_tokens,
            }
        });

        if let Some(system) = system {
            payload["systemInstruction"] = json!({ "parts": [{"text": system}] });
        }

        payload
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        !self.api_key.is_blank()
    }

    async fn generate(&self, model: &str, messages: &[Message]) -> super::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            model,
            self.api_key.unsecure()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.payload(messages))
            .send()
            .await
            .map_err(|e| LLMError::from_transport("Gemini", e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status("Gemini", status, &text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.without_url().to_string()))?;

        let candidate = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No candidates in response".to_string()))?;

        let content_item = candidate
            .get("content")
            .ok_or_else(|| LLMError::ParseError("No content in candidate".to_string()))?;

        let parts = content_item
            .get("parts")
            .and_then(|p| p.as_array())
            .ok_or_else(|| LLMError::ParseError("No parts in candidate content".to_string()))?;

        let mut full_text = String::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                full_text.push_str(text);
            }
        }

        Ok(full_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_maps_roles() {
        let provider = GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta",
            SecretString::new("test"),
            GenerationParams::default(),
        );
        let payload = provider.payload(&[
            Message::system("orchestrate"),
            Message::user("objective"),
            Message::assistant("partial"),
            Message::user("continue"),
        ]);

        assert_eq!(payload["systemInstruction"]["parts"][0]["text"], "orchestrate");
        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "continue");
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 4096);
    }
}
