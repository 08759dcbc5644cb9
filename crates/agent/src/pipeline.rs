//! Guard → (reject | respond) orchestration.
//!
//! ```text
//! START ──▶ GUARD ──allowed──▶ RESPOND ──▶ END
//!             │
//!             └────denied────▶ REJECT ───▶ END
//! ```
//!
//! Stages run strictly in sequence; the guard verdict gates whether the main
//! model is ever called.

use std::sync::Arc;

use promptgate_core::{ApplicationError, ConversationState, Settings};
use thiserror::Error;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::guard::{ClassificationError, GuardClassifier};
use crate::llm::ChatModel;
use crate::responder::{MainResponder, RejectResponder, ResponseError};
use crate::router::{route, Route};

/// Per-invocation configuration. Never written back into `Settings`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvocationOverrides {
    pub guard_model: Option<String>,
    pub main_model: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("guard classification failed: {0}")]
    Classification(#[from] ClassificationError),
    #[error("main response failed: {0}")]
    Response(#[from] ResponseError),
}

impl From<PipelineError> for ApplicationError {
    fn from(value: PipelineError) -> Self {
        match value {
            PipelineError::Classification(error) => Self::Classification(error.to_string()),
            PipelineError::Response(error) => Self::Response(error.to_string()),
        }
    }
}

pub struct Pipeline {
    guard: GuardClassifier,
    reject: RejectResponder,
    responder: MainResponder,
}

impl Pipeline {
    pub fn new(model: Arc<dyn ChatModel>, settings: Arc<Settings>) -> Self {
        Self {
            guard: GuardClassifier::new(model.clone(), settings.clone()),
            reject: RejectResponder,
            responder: MainResponder::new(model, settings),
        }
    }

    /// Runs a single prompt through a fresh conversation state.
    pub async fn run_prompt(
        &self,
        prompt: &str,
        overrides: &InvocationOverrides,
    ) -> Result<ConversationState, PipelineError> {
        self.run(ConversationState::from_prompt(prompt), overrides).await
    }

    pub async fn run(
        &self,
        state: ConversationState,
        overrides: &InvocationOverrides,
    ) -> Result<ConversationState, PipelineError> {
        let correlation_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("pipeline", correlation_id = %correlation_id);

        async move {
            info!(
                event_name = "pipeline.started",
                message_count = state.messages().len(),
                "pipeline invocation started"
            );

            let state = self.guard.classify(state, overrides).await.map_err(|error| {
                warn!(event_name = "pipeline.guard.failed", error = %error, "guard stage failed");
                PipelineError::from(error)
            })?;

            let next = route(state.verdict());
            info!(event_name = "pipeline.routed", stage = next.as_str(), "guard verdict routed");

            let state = match next {
                Route::Reject => self.reject.respond(state),
                Route::Respond => {
                    self.responder.respond(state, overrides).await.map_err(|error| {
                        warn!(
                            event_name = "pipeline.respond.failed",
                            error = %error,
                            "respond stage failed"
                        );
                        PipelineError::from(error)
                    })?
                }
            };

            info!(
                event_name = "pipeline.completed",
                stage = next.as_str(),
                "pipeline invocation completed"
            );
            Ok::<_, PipelineError>(state)
        }
        .instrument(span)
        .await
    }
}
