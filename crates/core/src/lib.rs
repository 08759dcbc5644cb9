pub mod config;
pub mod domain;
pub mod errors;

pub use config::{ConfigError, ConfigOverrides, LoadOptions, LogFormat, Settings};
pub use domain::conversation::{ConversationState, GuardVerdict, Message, Role};
pub use errors::ApplicationError;
