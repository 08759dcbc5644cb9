//! Guarded prompt pipeline.
//!
//! A small, cheap model screens each prompt against the configured business
//! rules before a larger model is allowed to answer it:
//! 1. **Guard** (`guard`) - classify the latest user message as allowed/denied
//! 2. **Route** (`router`) - pick the next stage from the verdict
//! 3. **Reject** or **Respond** (`responder`) - append the final assistant message
//!
//! The hosted model is reached only through the `ChatModel` trait (`llm`), so
//! stages can be driven by `testing::ScriptedChatModel` or the HTTP-backed
//! `openai::OpenAiChatModel` interchangeably.

pub mod guard;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod prompts;
pub mod responder;
pub mod router;
pub mod testing;

pub use guard::{ClassificationError, GuardClassifier, GuardResult};
pub use llm::{ChatModel, ModelError};
pub use pipeline::{InvocationOverrides, Pipeline, PipelineError};
pub use responder::{AnswerResult, MainResponder, RejectResponder, ResponseError};
pub use router::{route, Route};
