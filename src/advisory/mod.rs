//! AI advisory: symptom triage and conversational chat over an
//! OpenAI-compatible completion service.
//!
//! Every operation degrades to canned content when the service is missing,
//! slow, or returns garbage. Callers never see upstream failures.

pub mod chat;
pub mod client;
pub mod symptoms;

pub use client::{
    build_client, ChatMessage, CompletionClient, CompletionRequest, MockCompletionClient,
    OpenAiClient,
};

use std::sync::Arc;

use crate::config::AdvisoryConfig;

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("Completion service not configured")]
    NotConfigured,
    #[error("Cannot connect to completion service at {0}")]
    Connection(String),
    #[error("Completion request timed out after {0}s")]
    Timeout(u64),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Completion service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Unreadable completion response: {0}")]
    ResponseParsing(String),
    #[error("Completion response had no content")]
    EmptyResponse,
}

/// Completion client plus the model used for each advisory feature.
#[derive(Clone)]
pub struct Advisor {
    client: Arc<dyn CompletionClient>,
    symptom_model: String,
    chat_model: String,
}

impl Advisor {
    pub fn new(client: Arc<dyn CompletionClient>, symptom_model: &str, chat_model: &str) -> Self {
        Self {
            client,
            symptom_model: symptom_model.to_string(),
            chat_model: chat_model.to_string(),
        }
    }

    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        Ok(Self::new(
            build_client(config)?,
            &config.symptom_model,
            &config.chat_model,
        ))
    }

    pub fn client(&self) -> &dyn CompletionClient {
        self.client.as_ref()
    }

    pub fn symptom_model(&self) -> &str {
        &self.symptom_model
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }
}
