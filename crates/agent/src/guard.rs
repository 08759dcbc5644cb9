use std::sync::Arc;

use promptgate_core::{ConversationState, GuardVerdict, Message, Settings};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::llm::{complete_as, ChatModel, ModelError, OutputSchema, StructuredOutput};
use crate::pipeline::InvocationOverrides;
use crate::prompts::guard_instruction;

/// Gatekeeping always runs deterministically regardless of configured temperature.
pub const GUARD_TEMPERATURE: f64 = 0.0;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GuardResult {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StructuredOutput for GuardResult {
    fn schema() -> OutputSchema {
        OutputSchema {
            name: "guard_result",
            json_schema: json!({
                "type": "object",
                "properties": {
                    "allowed": {"type": "boolean"},
                    "reason": {"type": ["string", "null"]}
                },
                "required": ["allowed", "reason"],
                "additionalProperties": false
            }),
        }
    }
}

impl From<GuardResult> for GuardVerdict {
    fn from(result: GuardResult) -> Self {
        GuardVerdict::from_parts(result.allowed, result.reason)
    }
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("conversation has no user message to classify")]
    MissingUserMessage,
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub struct GuardClassifier {
    model: Arc<dyn ChatModel>,
    settings: Arc<Settings>,
}

impl GuardClassifier {
    pub fn new(model: Arc<dyn ChatModel>, settings: Arc<Settings>) -> Self {
        Self { model, settings }
    }

    /// Asks the guard model whether the latest user message satisfies the
    /// business rules and records the verdict on the returned state.
    pub async fn classify(
        &self,
        state: ConversationState,
        overrides: &InvocationOverrides,
    ) -> Result<ConversationState, ClassificationError> {
        let last_user =
            state.last_user_message().cloned().ok_or(ClassificationError::MissingUserMessage)?;
        let model_id = overrides.guard_model.as_deref().unwrap_or(&self.settings.llm.guard_model);

        let messages = vec![Message::system(guard_instruction(&self.settings.rules)), last_user];
        let result: GuardResult =
            complete_as(self.model.as_ref(), model_id, GUARD_TEMPERATURE, messages).await?;

        info!(
            event_name = "pipeline.guard.classified",
            model = model_id,
            allowed = result.allowed,
            reason = result.reason.as_deref().unwrap_or(""),
            "guard classification complete"
        );

        Ok(state.with_verdict(result.into()))
    }
}
