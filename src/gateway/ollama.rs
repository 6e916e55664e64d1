//! Local Ollama server over its HTTP API.
//!
//! - `POST /api/chat` for replies (`message.content`)
//! - `POST /api/generate` for titles (`response`)
//! - `GET /api/tags` for the installed models (`models[].name`)
//!
//! Unlike the hosted providers, Ollama has no model until one is selected; a
//! gateway without a model answers with an error string instead of calling out.

use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{GatewayError, ModelGateway, finish_title, response_error};
use crate::models::ChatMessage;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

const TITLE_PROMPT: &str =
    "Generate a very short title (3-5 words) for a chat that starts with this message: ";

#[derive(Debug, Clone)]
pub struct OllamaGateway {
    http: reqwest::Client,
    base_url: String,
    model: Option<String>,
}

impl OllamaGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.set_model(model);
        self
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    fn selected_model(&self) -> Result<&str, GatewayError> {
        self.model.as_deref().ok_or(GatewayError::NoModelSelected)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Request to: {}", url);

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        debug!("Status code: {}", status);

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn try_chat(&self, messages: &[ChatMessage]) -> Result<String, GatewayError> {
        let model = self.selected_model()?;
        let reply = self
            .post(
                "/api/chat",
                json!({ "model": model, "messages": messages, "stream": false }),
            )
            .await?;

        reply
            .pointer("/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::UnexpectedResponse("missing message.content".to_string()))
    }

    pub async fn try_title(&self, message: &str) -> Result<String, GatewayError> {
        let model = self.selected_model()?;
        let reply = self
            .post(
                "/api/generate",
                json!({
                    "model": model,
                    "prompt": format!("{TITLE_PROMPT}{message}"),
                    "stream": false,
                }),
            )
            .await?;

        reply
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::UnexpectedResponse("missing response".to_string()))
    }

    /// Names of the models installed on the server.
    pub async fn try_list_models(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let tags: Value = response.json().await?;
        Ok(tags
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|model| model.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Like [`try_list_models`](Self::try_list_models) but an unreachable
    /// server simply has no models.
    pub async fn list_models(&self) -> Vec<String> {
        match self.try_list_models().await {
            Ok(models) => models,
            Err(err) => {
                warn!("Error getting available models: {}", err);
                Vec::new()
            }
        }
    }
}

impl ModelGateway for OllamaGateway {
    fn model_name(&self) -> Option<&str> {
        self.model.as_deref()
    }

    async fn generate_response(&self, messages: &[ChatMessage]) -> String {
        match self.try_chat(messages).await {
            Ok(reply) => reply,
            Err(GatewayError::NoModelSelected) => "Error: No model selected".to_string(),
            Err(GatewayError::Status { status: 404, .. }) => format!(
                "Error: Model '{}' not found. Please make sure the model is properly installed in Ollama.",
                self.model.as_deref().unwrap_or_default()
            ),
            Err(GatewayError::Status { status, body }) => format!("Error: HTTP {status} - {body}"),
            Err(err) => response_error(&err),
        }
    }

    async fn get_title_from_first_message(&self, message: &str) -> String {
        finish_title(self.try_title(message).await, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_generate_response_reads_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(200).json_body(json!({
                    "model": "llama2",
                    "message": { "role": "assistant", "content": "Hi from llama" },
                    "done": true
                }));
            })
            .await;

        let gateway = OllamaGateway::new(server.base_url()).with_model("llama2");
        let reply = gateway
            .generate_response(&[ChatMessage::user("Hello"), ChatMessage::assistant("Hey")])
            .await;

        mock.assert_async().await;
        assert_eq!(reply, "Hi from llama");
    }

    #[tokio::test]
    async fn test_missing_model_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(404).body("model not found");
            })
            .await;

        let gateway = OllamaGateway::new(server.base_url()).with_model("nope");
        let reply = gateway.generate_response(&[ChatMessage::user("Hello")]).await;

        assert_eq!(
            reply,
            "Error: Model 'nope' not found. Please make sure the model is properly installed in Ollama."
        );
    }

    #[tokio::test]
    async fn test_other_status_codes_are_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(500).body("out of memory");
            })
            .await;

        let gateway = OllamaGateway::new(server.base_url()).with_model("llama2");
        let reply = gateway.generate_response(&[ChatMessage::user("Hello")]).await;

        assert_eq!(reply, "Error: HTTP 500 - out of memory");
    }

    #[tokio::test]
    async fn test_no_model_selected() {
        let gateway = OllamaGateway::new("http://127.0.0.1:9");
        assert_eq!(
            gateway.generate_response(&[ChatMessage::user("Hello")]).await,
            "Error: No model selected"
        );
        assert_eq!(
            gateway.get_title_from_first_message("Tune my guitar").await,
            "Tune my guitar"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_degrades() {
        let gateway = OllamaGateway::new("http://127.0.0.1:9").with_model("llama2");
        let reply = gateway.generate_response(&[ChatMessage::user("Hello")]).await;
        assert!(reply.starts_with("Error generating response:"), "{reply}");
        assert!(gateway.list_models().await.is_empty());
    }

    #[tokio::test]
    async fn test_title_from_generate_endpoint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "  Garden Planning Tips \n", "done": true }));
            })
            .await;

        let gateway = OllamaGateway::new(server.base_url()).with_model("llama2");
        let title = gateway
            .get_title_from_first_message("How do I plan a vegetable garden?")
            .await;

        assert_eq!(title, "Garden Planning Tips");
    }

    #[tokio::test]
    async fn test_list_models_from_tags() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200).json_body(json!({
                    "models": [
                        { "name": "llama2:latest", "size": 1 },
                        { "name": "mistral:7b", "size": 2 }
                    ]
                }));
            })
            .await;

        let gateway = OllamaGateway::new(format!("{}/", server.base_url()));
        assert_eq!(
            gateway.list_models().await,
            vec!["llama2:latest".to_string(), "mistral:7b".to_string()]
        );
    }
}
