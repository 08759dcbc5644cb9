//! Deterministic `ChatModel` for tests and offline runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ChatModel, ModelError, StructuredRequest};

#[derive(Clone, Debug)]
enum Reply {
    Value(Value),
    ApiError { status: u16, body: String },
}

/// Answers each request with the reply registered for its schema name and
/// records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedChatModel {
    replies: HashMap<&'static str, Reply>,
    requests: Mutex<Vec<StructuredRequest>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, schema: &'static str, value: Value) -> Self {
        self.replies.insert(schema, Reply::Value(value));
        self
    }

    pub fn fail(mut self, schema: &'static str, status: u16, body: impl Into<String>) -> Self {
        self.replies.insert(schema, Reply::ApiError { status, body: body.into() });
        self
    }

    pub fn requests(&self) -> Vec<StructuredRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        let reply = self.replies.get(request.schema.name).cloned();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match reply {
            Some(Reply::Value(value)) => Ok(value),
            Some(Reply::ApiError { status, body }) => Err(ModelError::Api { status, body }),
            None => Err(ModelError::EmptyResponse),
        }
    }
}
