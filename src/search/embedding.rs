//! Embedding client for query and document text
//!
//! Fetches embeddings from the inference server's embeddings endpoint. The
//! vector dimensionality is whatever the configured model produces; the
//! collection is created to match.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AssistantError, Result};

/// Default embeddings endpoint
pub const DEFAULT_EMBED_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Embedding dimension for the default model
pub const EMBEDDING_DIM: u64 = 768;

/// Embeddings client against an Ollama-compatible endpoint
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
}

impl EmbeddingClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_EMBED_URL, DEFAULT_EMBED_MODEL, Duration::from_secs(10))
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
        })
    }

    /// Generate an embedding for a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AssistantError::RetrievalUnavailable(format!(
                "embedding endpoint returned HTTP {}",
                status
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("bad embedding body: {}", e)))?;

        Ok(body.embedding)
    }

    /// Generate embeddings for multiple texts, one request per text
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Whether the endpoint is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Get model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EmbeddingClient::new().unwrap();
        assert_eq!(client.model(), DEFAULT_EMBED_MODEL);
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let client = EmbeddingClient::with_config(
            "http://localhost:11434/",
            "nomic-embed-text",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
