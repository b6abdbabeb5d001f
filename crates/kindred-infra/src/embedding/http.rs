//! OpenAI-compatible HTTP embedder.
//!
//! Posts `{ model, input }` to `{base_url}/embeddings` and reads the first
//! vector of the `data` array. Works against OpenAI and the many local
//! servers that mirror its embeddings endpoint.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the `Authorization` header.

use std::time::Duration;

use kindred_core::memory::embedder::Embedder;
use kindred_types::config::EmbeddingConfig;
use kindred_types::error::EmbeddingError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        dimension: usize,
        api_key: Option<SecretString>,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint_for(base_url),
            model: model.into(),
            dimension,
            api_key,
        })
    }

    /// Build from config, reading the key from the configured environment
    /// variable. A missing key is allowed for local servers.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .map(SecretString::from);
        if api_key.is_none() {
            tracing::debug!(env = %config.api_key_env, "no embedding API key set");
        }
        Self::new(&config.base_url, config.model.clone(), config.dimension, api_key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

fn parse_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::Provider(format!("invalid embedding response: {e}")))?;

    let first = response
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .ok_or(EmbeddingError::Empty)?;

    if first.embedding.is_empty() {
        return Err(EmbeddingError::Empty);
    }
    Ok(first.embedding)
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = %status, model = %self.model, "embedding request failed");
            return Err(EmbeddingError::Provider(format!("HTTP {status}: {text}")));
        }

        parse_response(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
