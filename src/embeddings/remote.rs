//! HTTP embedding provider for OpenAI-style `/v1/embeddings` endpoints.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{EmbedError, EmbeddingProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    // A single string or an array of strings, matching the wire contract.
    input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote model endpoint.
///
/// Speaks the widely-adopted `{"model", "input"}` request /
/// `{"data": [{"embedding"}]}` response shape, so it works against OpenAI,
/// Mistral, and compatible self-hosted servers. The endpoint, model name,
/// and output dimensionality are configuration, not contract.
pub struct RemoteEmbeddingProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }

    /// Use a pre-built reqwest client (custom TLS, proxies, timeouts).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn call_api(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| EmbedError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Unavailable(format!("{status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| EmbedError::Malformed(err.to_string()))?;

        let vectors: Vec<Vec<f32>> = parsed
            .data
            .into_iter()
            .map(|data| data.embedding)
            .collect();

        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(EmbedError::Malformed(format!(
                    "expected {}-dimensional embedding, got {}",
                    self.dimensions,
                    vector.len()
                )));
            }
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.call_api(serde_json::json!(text)).await?;
        if vectors.len() != 1 {
            return Err(EmbedError::Malformed(format!(
                "expected one embedding, got {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.call_api(serde_json::json!(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(EmbedError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
