// src/llm.rs
use crate::config::BriefConfig;
use crate::error::{BriefError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str = "You are a helpful financial assistant.";

/// Text in, text out. Implementations report every failure as `Err`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenRouter chat completions client.
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(config: &BriefConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.llm_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Requesting completion from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                warn!("LLM request failed: {}", e);
                BriefError::Generation(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM returned HTTP {}: {}", status, body);
            return Err(BriefError::Generation(format!("HTTP {}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BriefError::Generation(format!("Invalid response: {}", e)))?;

        completion_text(completion)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn completion_text(completion: ChatCompletionResponse) -> Result<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| BriefError::Generation("Response contained no choices".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> OpenRouterClient {
        let config = BriefConfig::new("sk-test".into()).unwrap();
        OpenRouterClient::new(&config).unwrap()
    }

    #[test]
    fn request_has_system_and_user_messages() {
        let body = serde_json::to_value(client().request_body("hello")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "mistralai/devstral-small:free",
                "messages": [
                    {"role": "system", "content": "You are a helpful financial assistant."},
                    {"role": "user", "content": "hello"}
                ]
            })
        );
    }

    #[test]
    fn first_choice_content_is_returned() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "gen-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "AAPL looks steady."}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(completion_text(response).unwrap(), "AAPL looks steady.");
    }

    #[test]
    fn empty_choices_is_a_generation_error() {
        let response: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            completion_text(response),
            Err(BriefError::Generation(_))
        ));

        let response: ChatCompletionResponse =
            serde_json::from_value(json!({"error": {"message": "rate limited"}})).unwrap();
        assert!(completion_text(response).is_err());
    }
}
