//! OpenAI chat completions through `async-openai`.
//!
//! Requests and responses are plain JSON (`create_byot`), so only the fields
//! this crate uses are read back: `choices[0].message.content`.

use async_openai::{Client, config::OpenAIConfig};
use serde_json::{Value, json};
use tracing::debug;

use super::{GatewayError, ModelGateway, finish_title, response_error};
use crate::models::ChatMessage;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Models offered for selection.
pub const OPENAI_MODELS: [&str; 2] = ["gpt-3.5-turbo", "gpt-4"];

const TITLE_PROMPT: &str = "Generate a short, concise title (3-5 words) for this conversation based on the user's first message.";

#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGateway {
    pub fn new(api_key: &str, api_base: &str, model: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(openai_config),
            model: model.into(),
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Send a chat completion request and return the first choice's text.
    pub async fn try_chat(&self, messages: Value) -> Result<String, GatewayError> {
        let request = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        debug!("Sending request to OpenAI: model={}", self.model);

        let response: Value = self
            .client
            .chat()
            .create_byot::<_, Value>(&request)
            .await?;

        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::UnexpectedResponse("missing choices[0].message.content".to_string())
            })
    }

    pub async fn try_title(&self, message: &str) -> Result<String, GatewayError> {
        self.try_chat(json!([
            { "role": "system", "content": TITLE_PROMPT },
            { "role": "user", "content": message },
        ]))
        .await
    }
}

impl ModelGateway for OpenAiGateway {
    fn model_name(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn generate_response(&self, messages: &[ChatMessage]) -> String {
        match self.try_chat(json!(messages)).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!("OpenAI request failed: {}", err);
                response_error(&err)
            }
        }
    }

    async fn get_title_from_first_message(&self, message: &str) -> String {
        finish_title(self.try_title(message).await, message)
    }
}
