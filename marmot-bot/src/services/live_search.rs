//! Web-search-augmented context client (xAI live search).

use marmot_core::config::LiveSearchConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use super::{ServiceError, ServiceResult};

const SYSTEM_PROMPT: &str = "Provide concise, confident background context using web search \
     when helpful. Do not mention that you searched or reference the user or message directly.";

/// Client for the live-search chat completions endpoint.
#[derive(Debug, Clone)]
pub struct LiveSearchClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct LiveSearchRequest {
    model: String,
    temperature: f32,
    messages: Vec<RequestMessage>,
    tools: Vec<Value>,
    tool_choice: &'static str,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct LiveSearchResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl LiveSearchClient {
    pub fn new(config: &LiveSearchConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch background context for a piece of text.
    pub async fn fetch_context(&self, text: &str) -> ServiceResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("live search"))?;

        let request = LiveSearchRequest {
            model: self.model.clone(),
            temperature: 0.3,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                RequestMessage {
                    role: "user",
                    content: format!("What is the context around this: {text}"),
                },
            ],
            tools: vec![json!({ "type": "live_search" })],
            tool_choice: "auto",
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Live-search request failed ({}): {}", status, message);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: LiveSearchResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ServiceError::EmptyResponse)?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_fails_without_network() {
        let client = LiveSearchClient::new(&LiveSearchConfig {
            api_key: None,
            model: "grok-4-fast".to_string(),
            base_url: "https://api.x.ai/v1".to_string(),
        });
        assert!(!client.is_configured());

        let result = client.fetch_context("what happened").await;
        assert!(matches!(
            result,
            Err(ServiceError::NotConfigured("live search"))
        ));
    }
}
