use thiserror::Error;

use crate::config::ConfigError;

/// Invocation-boundary error taxonomy. Every failure inside the pipeline is
/// funneled into one of these kinds before it reaches the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("guard classification failure: {0}")]
    Classification(String),
    #[error("main response failure: {0}")]
    Response(String),
    #[error("runtime failure: {0}")]
    Runtime(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config_validation",
            Self::Runtime(_) => "runtime_init",
            Self::Classification(_) => "classification",
            Self::Response(_) => "response",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Runtime(_) => 3,
            Self::Classification(_) => 4,
            Self::Response(_) => 5,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => {
                "The service is not configured correctly. Check the API key and settings."
            }
            Self::Runtime(_) => "The service could not start. Please retry.",
            Self::Classification(_) => {
                "The prompt could not be screened right now. Please retry shortly."
            }
            Self::Response(_) => "The answer could not be produced right now. Please retry shortly.",
        }
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}
