//! HttpCompletionClient - Chat Completions over REST.
//!
//! Talks to any OpenAI-compatible `/v1/chat/completions` endpoint.
//! The API key is read from the environment variable named in the config.

use async_trait::async_trait;
use imitation_core::completion::{CompletionRequest, CompletionResponse, CompletionService};
use imitation_core::config::CompletionConfig;
use imitation_core::error::{ArenaError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Completion Service backed by an HTTP chat-completions API.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
}

impl HttpCompletionClient {
    /// Creates a client for the default endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: None,
        }
    }

    /// Builds a client from the `[completion]` section.
    ///
    /// Fails with a config error when the API key variable is unset.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            ArenaError::config(format!(
                "{} is not set; export it or switch [completion] backend to \"canned\"",
                config.api_key_env
            ))
        })?;

        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let mut client = Self::new(api_key, model)
            .with_endpoint(config.endpoint.clone())
            .with_timeout(config.timeout())?;
        if let Some(max_tokens) = config.max_tokens {
            client = client.with_max_tokens(max_tokens);
        }
        Ok(client)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Caps the reply length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Rebuilds the HTTP client with a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ArenaError::config(format!("Failed to build HTTP client: {err}")))?;
        Ok(self)
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| ArenaError::Completion {
                status_code: None,
                message: format!("Completion request failed: {err}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read completion error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            ArenaError::completion(format!("Failed to parse completion response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if request.prompt.trim().is_empty() {
            return Err(ArenaError::completion("Completion prompt is empty"));
        }

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, "Requesting completion");
        let reply = self.send_request(&body).await?;
        Ok(CompletionResponse { reply })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ArenaError::completion("Completion API returned no content in the response"))
}

fn map_http_error(status: StatusCode, body: String) -> ArenaError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    ArenaError::Completion {
        status_code: Some(status.as_u16()),
        message,
    }
}
