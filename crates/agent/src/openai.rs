use std::time::Duration;

use async_trait::async_trait;
use promptgate_core::config::LlmConfig;
use promptgate_core::Message;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::{ChatModel, ModelError, StructuredRequest};

/// `ChatModel` backed by an OpenAI-compatible `/chat/completions` endpoint
/// using `json_schema` response formatting.
pub struct OpenAiChatModel {
    endpoint: String,
    api_key: SecretString,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: &'a [Message],
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    r#type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ModelError> {
        Self::new(&config.base_url, config.api_key.clone(), config.timeout_secs)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn scrub(&self, body: &str) -> String {
        let key = self.api_key.expose_secret();
        if key.is_empty() {
            return body.to_string();
        }
        body.replace(key, "[REDACTED]")
    }

    fn extract_content(response: ChatResponse) -> Result<Value, ModelError> {
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ModelError::EmptyResponse)?;

        if let Some(refusal) = message.refusal.filter(|text| !text.trim().is_empty()) {
            return Err(ModelError::Refused(refusal));
        }

        let content =
            message.content.filter(|text| !text.trim().is_empty()).ok_or(ModelError::EmptyResponse)?;

        serde_json::from_str(&content).map_err(|error| ModelError::Schema {
            schema: "json",
            message: format!("response content is not valid JSON: {error}"),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        let body = ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            messages: &request.messages,
            response_format: ResponseFormat {
                r#type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: request.schema.name,
                    schema: &request.schema.json_schema,
                    strict: true,
                },
            },
        };

        debug!(
            event_name = "llm.request.sent",
            model = %request.model,
            schema = request.schema.name,
            message_count = request.messages.len(),
            "sending structured completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            return Err(ModelError::Api { status: status.as_u16(), body: self.scrub(&text) });
        }

        let parsed: ChatResponse = response.json().await?;
        Self::extract_content(parsed)
    }
}
