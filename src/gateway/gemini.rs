//! Google Gemini through the `generateContent` REST endpoint.
//!
//! Gemini gets the whole transcript as one prompt, one `role: content` line per
//! turn, and answers in `candidates[0].content.parts[*].text`.

use serde_json::{Value, json};
use tracing::debug;

use super::{GatewayError, ModelGateway, finish_title, response_error};
use crate::models::ChatMessage;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// The key travels in a header so it never shows up in a request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Models offered for selection.
pub const GEMINI_MODELS: [&str; 2] = ["gemini-pro", "gemini-2.0-flash-exp"];

#[derive(Debug, Clone)]
pub struct GeminiGateway {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

/// Flatten a conversation into the single prompt Gemini receives.
pub fn flatten_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>, api_base: &str, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Generate content for a single prompt and return the concatenated text parts.
    pub async fn try_generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        debug!("Request to: {}", url);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                GatewayError::UnexpectedResponse("missing candidates[0].content.parts".to_string())
            })?;

        Ok(parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect())
    }
}

impl ModelGateway for GeminiGateway {
    fn model_name(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn generate_response(&self, messages: &[ChatMessage]) -> String {
        match self.try_generate(&flatten_transcript(messages)).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!("Gemini request failed: {}", err);
                response_error(&err)
            }
        }
    }

    async fn get_title_from_first_message(&self, message: &str) -> String {
        let prompt = format!("Generate a short 2-3 word title for this chat: {message}");
        finish_title(self.try_generate(&prompt).await, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn candidate(parts: Value) -> Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": parts } }] })
    }

    #[test]
    fn test_flatten_transcript() {
        let transcript = flatten_transcript(&[
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("Weather?"),
        ]);
        assert_eq!(transcript, "user: Hi\nassistant: Hello!\nuser: Weather?");
    }

    #[tokio::test]
    async fn test_generate_response_joins_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-pro:generateContent")
                    .header(API_KEY_HEADER, "g-key");
                then.status(200)
                    .json_body(candidate(json!([{ "text": "Sunny " }, { "text": "today." }])));
            })
            .await;

        let gateway = GeminiGateway::new("g-key", &server.url("/v1beta"), DEFAULT_GEMINI_MODEL);
        let reply = gateway
            .generate_response(&[ChatMessage::user("Weather?")])
            .await;

        mock.assert_async().await;
        assert_eq!(reply, "Sunny today.");
    }

    #[tokio::test]
    async fn test_generate_response_degrades_on_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-pro:generateContent");
                then.status(403).body("API key not valid");
            })
            .await;

        let gateway = GeminiGateway::new("bad", &server.url("/v1beta"), DEFAULT_GEMINI_MODEL);
        let reply = gateway.generate_response(&[ChatMessage::user("Hi")]).await;

        assert_eq!(reply, "Error generating response: HTTP 403 - API key not valid");
    }

    #[tokio::test]
    async fn test_title_strips_quotes_and_falls_back() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.0-flash-exp:generateContent");
                then.status(200)
                    .json_body(candidate(json!([{ "text": "\"Trip Planning\"\n" }])));
            })
            .await;

        let gateway =
            GeminiGateway::new("g-key", &server.url("/v1beta"), "gemini-2.0-flash-exp");
        assert_eq!(
            gateway.get_title_from_first_message("Plan my trip").await,
            "Trip Planning"
        );

        let offline = GeminiGateway::new("g-key", "http://127.0.0.1:9", DEFAULT_GEMINI_MODEL);
        assert_eq!(
            offline.get_title_from_first_message("Plan my trip").await,
            "Plan my trip"
        );
    }

    #[tokio::test]
    async fn test_failed_request_does_not_leak_api_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-pro:generateContent")
                    .query_param_exists("key");
                then.status(200).json_body(candidate(json!([{ "text": "leaked" }])));
            })
            .await;

        let gateway =
            GeminiGateway::new("SUPERSECRETKEY", &server.url("/v1beta"), DEFAULT_GEMINI_MODEL);
        let reply = gateway.generate_response(&[ChatMessage::user("Hi")]).await;
        assert!(!reply.contains("SUPERSECRETKEY"));
        mock.assert_hits_async(0).await;

        let offline =
            GeminiGateway::new("SUPERSECRETKEY", "http://127.0.0.1:9", DEFAULT_GEMINI_MODEL);
        let reply = offline.generate_response(&[ChatMessage::user("Hi")]).await;
        assert!(reply.starts_with("Error generating response: "));
        assert!(!reply.contains("SUPERSECRETKEY"));
    }
}
