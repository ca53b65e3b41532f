//! Chat completion client used for answer synthesis.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::embedding::{post_json, provider_http_client};
use crate::error::{ConfigError, ProviderError};
use crate::models::{CompletionConfig, ProviderConfig};
use crate::utils::retry::{RetryPolicy, with_retry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Produces the text of a model reply for a list of chat messages.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(
        provider: &ProviderConfig,
        completion: &CompletionConfig,
        retry: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: provider_http_client(provider)?,
            endpoint: format!(
                "{}/chat/completions",
                provider.base_url.trim_end_matches('/')
            ),
            model: completion.model.clone(),
            retry,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
        };
        let response: ChatResponse = post_json(&self.client, &self.endpoint, &request).await?;
        first_choice_text(response)
    }
}

fn first_choice_text(response: ChatResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("completion has no choices".to_string()))?
        .message
        .content
        .ok_or_else(|| ProviderError::InvalidResponse("completion has no content".to_string()))
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        with_retry(&self.retry, "completion request", || {
            self.complete_once(messages)
        })
        .await
    }
}
