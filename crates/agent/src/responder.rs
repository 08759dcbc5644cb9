use std::sync::Arc;

use promptgate_core::{ConversationState, Message, Settings};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::llm::{complete_as, ChatModel, ModelError, OutputSchema, StructuredOutput};
use crate::pipeline::InvocationOverrides;
use crate::prompts::{kind_reminder, ANSWER_INSTRUCTION, DEFAULT_VIOLATION_REASON};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
}

impl StructuredOutput for AnswerResult {
    fn schema() -> OutputSchema {
        OutputSchema {
            name: "answer_result",
            json_schema: json!({
                "type": "object",
                "properties": {
                    "answer": {"type": "string"}
                },
                "required": ["answer"],
                "additionalProperties": false
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Appends the kind-reminder message for a denied prompt. No model call.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectResponder;

impl RejectResponder {
    pub fn respond(&self, state: ConversationState) -> ConversationState {
        let reason = state
            .violation_reason()
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_VIOLATION_REASON);
        let reminder = Message::assistant(kind_reminder(reason));

        info!(event_name = "pipeline.reject.responded", reason, "prompt rejected");
        state.with_message(reminder)
    }
}

pub struct MainResponder {
    model: Arc<dyn ChatModel>,
    settings: Arc<Settings>,
}

impl MainResponder {
    pub fn new(model: Arc<dyn ChatModel>, settings: Arc<Settings>) -> Self {
        Self { model, settings }
    }

    pub async fn respond(
        &self,
        state: ConversationState,
        overrides: &InvocationOverrides,
    ) -> Result<ConversationState, ResponseError> {
        let model_id = overrides.main_model.as_deref().unwrap_or(&self.settings.llm.main_model);
        let temperature = overrides.temperature.unwrap_or(self.settings.llm.temperature);

        let mut messages = Vec::with_capacity(state.messages().len() + 1);
        messages.push(Message::system(ANSWER_INSTRUCTION));
        messages.extend(state.messages().iter().cloned());

        let result: AnswerResult =
            complete_as(self.model.as_ref(), model_id, temperature, messages).await?;

        info!(
            event_name = "pipeline.respond.answered",
            model = model_id,
            temperature,
            answer_chars = result.answer.chars().count(),
            "main model answered"
        );

        Ok(state.with_message(Message::assistant(result.answer)))
    }
}
