//! Embedding client for generating text embeddings.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ProviderError};
use crate::models::{EmbeddingConfig, ProviderConfig};
use crate::utils::retry::{RetryPolicy, with_retry};

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Length of every vector returned by `embed`.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Build the shared HTTP client for an OpenAI-compatible provider.
pub(crate) fn provider_http_client(config: &ProviderConfig) -> Result<Client, ConfigError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or(ConfigError::MissingValue("OPENAI_API_KEY"))?;

    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
        .map_err(|_| ConfigError::ValidationError("invalid OPENAI_API_KEY".to_string()))?;
    headers.insert(AUTHORIZATION, auth);

    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| ConfigError::ValidationError(format!("failed to build HTTP client: {e}")))
}

/// Send a JSON request to a provider endpoint and decode the JSON reply.
pub(crate) async fn post_json<Req, Resp>(
    client: &Client,
    url: &str,
    body: &Req,
) -> Result<Resp, ProviderError>
where
    Req: Serialize + ?Sized,
    Resp: for<'de> Deserialize<'de>,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(ProviderError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::ServerError {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(
        provider: &ProviderConfig,
        embedding: &EmbeddingConfig,
        retry: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: provider_http_client(provider)?,
            endpoint: format!("{}/embeddings", provider.base_url.trim_end_matches('/')),
            model: embedding.model.clone(),
            dimension: embedding.dimension as usize,
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbedResponse = post_json(&self.client, &self.endpoint, &request).await?;
        check_embedding(response, self.dimension)
    }
}

/// Take the single embedding out of a response, rejecting anything that is
/// not exactly one vector of the expected length.
fn check_embedding(response: EmbedResponse, dimension: usize) -> Result<Vec<f32>, ProviderError> {
    let mut data = response.data.into_iter();
    let embedding = data
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("empty embedding response".to_string()))?
        .embedding;

    if embedding.len() != dimension {
        return Err(ProviderError::InvalidResponse(format!(
            "expected {} dimensions, got {}",
            dimension,
            embedding.len()
        )));
    }

    Ok(embedding)
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        with_retry(&self.retry, "embedding request", || self.embed_once(text)).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
