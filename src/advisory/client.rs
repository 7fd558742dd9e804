use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AdvisoryError;
use crate::config::AdvisoryConfig;

/// One message in a chat-completions conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Completion service abstraction (allows mocking).
///
/// Blocking; async callers go through `spawn_blocking`.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AdvisoryError>;
}

/// Pick the client for a configuration: the HTTP client when an API key is
/// set, otherwise one that fails immediately so callers fall back.
pub fn build_client(config: &AdvisoryConfig) -> Result<Arc<dyn CompletionClient>, AdvisoryError> {
    match &config.api_key {
        Some(key) => Ok(Arc::new(OpenAiClient::new(
            &config.base_url,
            key,
            config.timeout_secs,
        )?)),
        None => {
            tracing::warn!("OPENAI_API_KEY not set, advisory endpoints will use fallback content");
            Ok(Arc::new(DisabledClient))
        }
    }
}

struct DisabledClient;

impl CompletionClient for DisabledClient {
    fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::NotConfigured)
    }
}

/// HTTP client for the `/chat/completions` endpoint.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, AdvisoryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AdvisoryError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        })
    }
}

/// Request body for `/chat/completions`
#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

/// Response body from `/chat/completions`
#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AdvisoryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionBody {
            model: request.model,
            messages: request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AdvisoryError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    AdvisoryError::Timeout(self.timeout_secs)
                } else {
                    AdvisoryError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AdvisoryError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| AdvisoryError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AdvisoryError::EmptyResponse)
    }
}

/// Mock client for testing: returns a configured reply or fails.
pub struct MockCompletionClient {
    reply: Option<String>,
    seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockCompletionClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails as if the service were down.
    pub fn failing() -> Self {
        Self {
            reply: None,
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Message lists received so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AdvisoryError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.messages.to_vec());
        }
        self.reply
            .clone()
            .ok_or_else(|| AdvisoryError::Connection("mock".into()))
    }
}
