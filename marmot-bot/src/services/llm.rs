//! OpenAI-compatible completion and embedding client.

use marmot_core::config::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{ServiceError, ServiceResult};

/// OpenAI-compatible API client for completions and embeddings.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
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

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> ServiceResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("LLM"))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// One-shot completion with a system and a user prompt.
    pub async fn complete(&self, system: &str, user: &str) -> ServiceResult<String> {
        let api_key = self.api_key()?;

        let request = ChatCompletionsRequest {
            model: self.model.clone(),
            temperature: 0.4,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
        };

        let response = self
            .http_client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("LLM request failed ({}): {}", status, message);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatCompletionsResponse = response.json().await?;
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

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let mut embeddings = self.embed_many(&[text.to_string()]).await?;
        if embeddings.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(embeddings.remove(0))
    }

    /// Embed a batch of texts, preserving input order.
    pub async fn embed_many(&self, texts: &[String]) -> ServiceResult<Vec<Vec<f32>>> {
        let api_key = self.api_key()?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: self.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .http_client
            .post(self.endpoint("embeddings"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Embedding request failed ({}): {}", status, message);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingsResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(ServiceError::EmptyResponse);
        }

        // The API may return entries out of order; index is authoritative.
        let mut ordered: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for entry in body.data {
            if entry.index < ordered.len() {
                ordered[entry.index] = entry.embedding;
            }
        }

        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(String::from),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = LlmClient::new(&config(Some("key")));
        assert_eq!(
            client.endpoint("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_without_network() {
        let client = LlmClient::new(&config(None));
        assert!(!client.is_configured());

        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(ServiceError::NotConfigured("LLM"))));

        let result = client.embed("text").await;
        assert!(matches!(result, Err(ServiceError::NotConfigured("LLM"))));
    }

    #[tokio::test]
    async fn test_embed_many_empty_input_short_circuits() {
        let client = LlmClient::new(&config(Some("key")));
        let embeddings = client.embed_many(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
