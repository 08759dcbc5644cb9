use async_trait::async_trait;
use promptgate_core::Message;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Declared output shape a model response must conform to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputSchema {
    pub name: &'static str,
    pub json_schema: Value,
}

/// A typed structured-output target.
pub trait StructuredOutput: DeserializeOwned {
    fn schema() -> OutputSchema;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructuredRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<Message>,
    pub schema: OutputSchema,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("model returned no content")]
    EmptyResponse,
    #[error("model refused the request: {0}")]
    Refused(String),
    #[error("model output does not match `{schema}`: {message}")]
    Schema { schema: &'static str, message: String },
}

/// The hosted inference capability: given a model id, a temperature, the
/// role-tagged messages and a target shape, returns a JSON value in that
/// shape or fails.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<Value, ModelError>;
}

/// Calls `model` and decodes the result into `T`, treating decode failures as
/// schema violations.
pub async fn complete_as<T>(
    model: &dyn ChatModel,
    model_id: &str,
    temperature: f64,
    messages: Vec<Message>,
) -> Result<T, ModelError>
where
    T: StructuredOutput,
{
    let schema = T::schema();
    let schema_name = schema.name;
    let value = model
        .complete_structured(StructuredRequest {
            model: model_id.to_string(),
            temperature,
            messages,
            schema,
        })
        .await?;

    serde_json::from_value(value)
        .map_err(|error| ModelError::Schema { schema: schema_name, message: error.to_string() })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use promptgate_core::Message;
    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::{complete_as, ChatModel, ModelError, OutputSchema, StructuredOutput, StructuredRequest};

    #[derive(Debug, Deserialize)]
    struct Verdict {
        ok: bool,
    }

    impl StructuredOutput for Verdict {
        fn schema() -> OutputSchema {
            OutputSchema { name: "verdict", json_schema: json!({"type": "object"}) }
        }
    }

    struct FixedModel(Value);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete_structured(
            &self,
            request: StructuredRequest,
        ) -> Result<Value, ModelError> {
            assert_eq!(request.schema.name, "verdict");
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn decodes_conforming_output() {
        let model = FixedModel(json!({"ok": true}));
        let verdict: Verdict = complete_as(&model, "m", 0.0, vec![Message::user("hi")])
            .await
            .expect("conforming output should decode");
        assert!(verdict.ok);
    }

    #[tokio::test]
    async fn non_conforming_output_is_a_schema_error() {
        let model = FixedModel(json!({"ok": "maybe"}));
        let result: Result<Verdict, _> =
            complete_as(&model, "m", 0.0, vec![Message::user("hi")]).await;

        match result {
            Err(ModelError::Schema { schema, .. }) => assert_eq!(schema, "verdict"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
