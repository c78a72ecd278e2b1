//! Chat-completion transport: the OpenRouter HTTP client and the trait seam
//! the classifier talks through.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::prompt::ChatMessage;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TITLE: &str = "Patent Coating Classification";

/// One failed classification attempt. Every variant is retryable.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("no choices returned in response")]
    MissingChoices,
    #[error("empty content in model response")]
    EmptyContent,
    #[error("failed to parse JSON from response {content:?}: {source}")]
    InvalidJson {
        content: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected value for '{field}': {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Request body for `/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// Reply envelope. Every level is optional so that a malformed reply is
/// reported as a classification failure rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ReplyMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Anything that can answer a chat-completion request.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ClassifyError>;
}

/// Connection settings for [`OpenRouterClient`].
#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Sent as `HTTP-Referer` when set.
    pub app_url: Option<String>,
    /// Sent as `X-Title`.
    pub title: String,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            timeout,
            app_url: None,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// HTTP client for OpenRouter's chat-completion endpoint.
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// Build a client whose every request is bounded by `config.timeout`.
    pub fn new(mut config: OpenRouterConfig) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request(&self, body: &ChatRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("X-Title", &self.config.title)
            .json(body);
        if let Some(referer) = &self.config.app_url {
            builder = builder.header("HTTP-Referer", referer);
        }
        builder
    }
}

#[async_trait]
impl ChatTransport for OpenRouterClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ClassifyError> {
        debug!(model = %request.model, url = %self.endpoint(), "posting chat completion");
        let resp = self.request(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifyError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}
