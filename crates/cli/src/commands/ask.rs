use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use promptgate_agent::openai::OpenAiChatModel;
use promptgate_agent::{InvocationOverrides, Pipeline};
use promptgate_core::config::{LoadOptions, Settings};
use promptgate_core::ApplicationError;

use crate::commands::CommandResult;
use crate::logging;

const COMMAND: &str = "ask";

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    #[arg(long, help = "User prompt to screen and answer")]
    pub prompt: String,
    #[arg(long, help = "Guard model id for this invocation only")]
    pub guard_model: Option<String>,
    #[arg(long, help = "Main model id for this invocation only")]
    pub main_model: Option<String>,
    #[arg(
        long,
        value_parser = parse_temperature,
        help = "Main model temperature (0.0-1.0) for this invocation only"
    )]
    pub temperature: Option<f64>,
}

impl AskArgs {
    pub fn overrides(&self) -> InvocationOverrides {
        InvocationOverrides {
            guard_model: self.guard_model.clone(),
            main_model: self.main_model.clone(),
            temperature: self.temperature,
        }
    }
}

pub fn run(config_path: Option<PathBuf>, args: &AskArgs) -> CommandResult {
    let settings = match Settings::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(settings) => settings,
        Err(error) => return CommandResult::from_error(COMMAND, &ApplicationError::from(error)),
    };

    if let Err(error) = logging::init(&settings.logging) {
        return CommandResult::from_error(COMMAND, &ApplicationError::Runtime(error.to_string()));
    }

    let model = match OpenAiChatModel::from_config(&settings.llm) {
        Ok(model) => model,
        Err(error) => {
            return CommandResult::from_error(
                COMMAND,
                &ApplicationError::Runtime(format!("failed to build model client: {error}")),
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::from_error(
                COMMAND,
                &ApplicationError::Runtime(format!("failed to initialize async runtime: {error}")),
            );
        }
    };

    let pipeline = Pipeline::new(Arc::new(model), Arc::new(settings));
    runtime.block_on(execute(&pipeline, args))
}

/// Runs one prompt through `pipeline`; success output is the final assistant
/// message content and nothing else.
pub async fn execute(pipeline: &Pipeline, args: &AskArgs) -> CommandResult {
    match pipeline.run_prompt(&args.prompt, &args.overrides()).await {
        Ok(state) => CommandResult::success(
            state.final_message().map(|message| message.content.clone()).unwrap_or_default(),
        ),
        Err(error) => CommandResult::from_error(COMMAND, &ApplicationError::from(error)),
    }
}

fn parse_temperature(raw: &str) -> Result<f64, String> {
    let value = raw.trim().parse::<f64>().map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be in range 0.0..=1.0, got {value}"))
    }
}
