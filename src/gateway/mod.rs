//! # Model gateways
//!
//! A gateway is the one capability the rest of the crate needs from a model
//! provider: turn an ordered conversation into a reply, and turn a first
//! message into a chat title.
//!
//! Gateways never fail outward. Any network, authentication or decoding
//! problem is converted into text at this boundary:
//!
//! - replies become an error string (`"Error generating response: ..."`) that
//!   the caller shows and stores like any assistant message,
//! - titles fall back to [`crate::title::generate_title`].
//!
//! Each provider lives in its own submodule and exposes fallible `try_*`
//! helpers for tests and tooling. [`Gateway`] wraps the three of them so the
//! router can hold one map of providers.

pub mod gemini;
pub mod ollama;
pub mod openai;

use crate::{models::ChatMessage, title::generate_title};

pub use gemini::GeminiGateway;
pub use ollama::OllamaGateway;
pub use openai::OpenAiGateway;

/// Everything that can go wrong while talking to a provider.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Http(reqwest::Error),

    #[error("{0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("No model selected")]
    NoModelSelected,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs may carry credentials; keep them out of displayed errors.
        GatewayError::Http(err.without_url())
    }
}

/// The capability every provider implements.
#[allow(async_fn_in_trait)]
pub trait ModelGateway {
    /// Model the gateway talks to, if one has been chosen.
    fn model_name(&self) -> Option<&str>;

    /// Reply to `messages` (oldest first). Failures come back as a display string.
    async fn generate_response(&self, messages: &[ChatMessage]) -> String;

    /// Short title for a chat starting with `message`. Never empty.
    async fn get_title_from_first_message(&self, message: &str) -> String;
}

/// Format a reply failure the way every provider reports it.
pub fn response_error(err: &GatewayError) -> String {
    format!("Error generating response: {err}")
}

/// Tidy a provider title, falling back to the local heuristic when the
/// provider failed or produced nothing usable.
pub fn finish_title(result: Result<String, GatewayError>, first_message: &str) -> String {
    match result {
        Ok(raw) => {
            let title = raw.trim().trim_matches('"').trim_matches('\'').trim();
            if title.is_empty() {
                generate_title(first_message)
            } else {
                title.to_string()
            }
        }
        Err(err) => {
            tracing::warn!("Title generation failed, using local heuristic: {}", err);
            generate_title(first_message)
        }
    }
}

/// One gateway per provider, selected by tag.
#[derive(Debug, Clone)]
pub enum Gateway {
    OpenAi(OpenAiGateway),
    Ollama(OllamaGateway),
    Gemini(GeminiGateway),
}

impl Gateway {
    /// Point the gateway at a different model of the same provider.
    pub fn set_model(&mut self, model: impl Into<String>) {
        match self {
            Gateway::OpenAi(gateway) => gateway.set_model(model),
            Gateway::Ollama(gateway) => gateway.set_model(model),
            Gateway::Gemini(gateway) => gateway.set_model(model),
        }
    }
}

impl ModelGateway for Gateway {
    fn model_name(&self) -> Option<&str> {
        match self {
            Gateway::OpenAi(gateway) => gateway.model_name(),
            Gateway::Ollama(gateway) => gateway.model_name(),
            Gateway::Gemini(gateway) => gateway.model_name(),
        }
    }

    async fn generate_response(&self, messages: &[ChatMessage]) -> String {
        match self {
            Gateway::OpenAi(gateway) => gateway.generate_response(messages).await,
            Gateway::Ollama(gateway) => gateway.generate_response(messages).await,
            Gateway::Gemini(gateway) => gateway.generate_response(messages).await,
        }
    }

    async fn get_title_from_first_message(&self, message: &str) -> String {
        match self {
            Gateway::OpenAi(gateway) => gateway.get_title_from_first_message(message).await,
            Gateway::Ollama(gateway) => gateway.get_title_from_first_message(message).await,
            Gateway::Gemini(gateway) => gateway.get_title_from_first_message(message).await,
        }
    }
}
