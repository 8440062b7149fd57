//! HTTP client for the text-understanding service
//!
//! Talks to an Ollama-compatible chat endpoint with a schema-constrained
//! response format. One blocking call per turn; the request timeout is the
//! turn's extraction budget.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AssistantError, Result};
use crate::nlu::{extraction_schema, RawExtraction, TextUnderstanding};

/// Default NLU endpoint
pub const DEFAULT_NLU_URL: &str = "http://127.0.0.1:11434";

/// Default extraction model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

const SYSTEM_PROMPT: &str = "You are an expert at parsing pet product search queries.\n\
\n\
Key patterns to recognize:\n\
- \"WITH {ingredient}\" or \"includes {ingredient}\" -> dietary_requirements (must contain)\n\
- \"{ingredient}-free\" or \"without {ingredient}\" -> dietary_exclusions (must NOT contain)\n\
- \"no chicken and beef\" -> dietary_exclusions: [\"chicken\", \"beef\"]\n\
- \"hypoallergenic\" -> dietary_requirements: [\"limited-ingredient\"]\n\
- \"under $X\" or \"less than $X\" -> price_max\n\
- \"puppy\", \"senior\", \"adult\" -> life_stage\n\
- \"large breed\", \"small breed\" -> size_category\n\
- \"cheaper\" / \"more expensive\" with no other constraints -> reference, leave prices unset\n\
- \"for cats instead\" -> target_pet plus switch_pet: true\n\
\n\
Distinguish positive requirements (WITH X) from negative exclusions (X-free, without X, no X).\n\
Extract ALL relevant information from the query. Only use values the schema allows.";

/// Text-understanding client against an Ollama-compatible endpoint
#[derive(Debug, Clone)]
pub struct NluClient {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl NluClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_NLU_URL, DEFAULT_MODEL, Duration::from_secs(15))
    }

    /// Create a client with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AssistantError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl TextUnderstanding for NluClient {
    async fn extract(&self, utterance: &str, context: Option<&str>) -> Result<RawExtraction> {
        let url = format!("{}/api/chat", self.base_url);

        let user_content = match context {
            Some(ctx) => format!(
                "Active filters from earlier turns: {}\nParse this search query: {}",
                ctx, utterance
            ),
            None => format!("Parse this search query: {}", utterance),
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content,
                },
            ],
            stream: false,
            format: extraction_schema(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::ExtractionUnavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AssistantError::ExtractionUnavailable(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ExtractionUnavailable(format!("bad response body: {}", e)))?;

        serde_json::from_str(&chat.message.content).map_err(|e| {
            AssistantError::ExtractionUnavailable(format!("unparsable extraction: {}", e))
        })
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Chat completion request with schema-constrained output
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NluClient::new();
        assert!(client.is_ok());

        let client = client.unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_NLU_URL);
    }

    #[test]
    fn test_client_with_config() {
        let client = NluClient::with_config(
            "http://localhost:11434/",
            "llama3.1:8b",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.model(), "llama3.1:8b");
        // Trailing slash is stripped so URL building stays clean
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }
}
