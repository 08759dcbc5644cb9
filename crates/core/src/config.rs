use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "promptgate.toml";
pub const NESTED_CONFIG_FILE: &str = "config/promptgate.toml";

/// Process-wide settings. Loaded once at startup and shared read-only
/// (behind an `Arc`) by every pipeline invocation.
#[derive(Clone, Debug)]
pub struct Settings {
    pub llm: LlmConfig,
    pub rules: RulesConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub guard_model: String,
    pub main_model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

/// Business rules the guard model is instructed to enforce.
#[derive(Clone, Debug, PartialEq)]
pub struct RulesConfig {
    pub max_length: usize,
    pub banned_words: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub guard_model: Option<String>,
    pub main_model: Option<String>,
    pub temperature: Option<f64>,
    pub max_length: Option<usize>,
    pub banned_words: Option<Vec<String>>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.openai.com/v1".to_string(),
                guard_model: "gpt-4o-mini".to_string(),
                main_model: "gpt-4o".to_string(),
                temperature: 0.0,
                timeout_secs: 60,
            },
            rules: RulesConfig {
                max_length: 500,
                banned_words: normalize_banned_words(["weather", "joke", "horoscope"]),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl RulesConfig {
    /// Banned words joined the way the guard instruction lists them.
    pub fn forbidden_terms(&self) -> String {
        self.banned_words.join(", ")
    }
}

impl Settings {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            settings.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        settings.apply_env_overrides()?;
        settings.apply_overrides(options.overrides);
        settings.validate()?;

        Ok(settings)
    }

    fn apply_patch(&mut self, patch: SettingsPatch) {
        if let Some(llm) = patch.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = api_key.into();
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(guard_model) = llm.guard_model {
                self.llm.guard_model = guard_model;
            }
            if let Some(main_model) = llm.main_model {
                self.llm.main_model = main_model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(rules) = patch.rules {
            if let Some(max_length) = rules.max_length {
                self.rules.max_length = max_length;
            }
            if let Some(banned_words) = rules.banned_words {
                self.rules.banned_words = normalize_banned_words(banned_words);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let api_key = read_env("PROMPTGATE_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = value.into();
        }
        if let Some(value) = read_env("PROMPTGATE_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("PROMPTGATE_GUARD_MODEL") {
            self.llm.guard_model = value;
        }
        if let Some(value) = read_env("PROMPTGATE_MAIN_MODEL") {
            self.llm.main_model = value;
        }
        if let Some(value) = read_env("PROMPTGATE_TEMPERATURE") {
            self.llm.temperature = parse_env("PROMPTGATE_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("PROMPTGATE_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("PROMPTGATE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PROMPTGATE_MAX_LENGTH") {
            self.rules.max_length = parse_env("PROMPTGATE_MAX_LENGTH", &value)?;
        }
        if let Some(value) = read_env("PROMPTGATE_BANNED_WORDS") {
            self.rules.banned_words = normalize_banned_words(value.split(','));
        }

        if let Some(value) = read_env("PROMPTGATE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("PROMPTGATE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.api_key {
            self.llm.api_key = api_key.into();
        }
        if let Some(base_url) = overrides.base_url {
            self.llm.base_url = base_url;
        }
        if let Some(guard_model) = overrides.guard_model {
            self.llm.guard_model = guard_model;
        }
        if let Some(main_model) = overrides.main_model {
            self.llm.main_model = main_model;
        }
        if let Some(temperature) = overrides.temperature {
            self.llm.temperature = temperature;
        }
        if let Some(max_length) = overrides.max_length {
            self.rules.max_length = max_length;
        }
        if let Some(banned_words) = overrides.banned_words {
            self.rules.banned_words = normalize_banned_words(banned_words);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_rules(&self.rules)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Trims entries, drops empties and removes duplicates while keeping the
/// first occurrence in place.
pub fn normalize_banned_words<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for word in words {
        let word = word.as_ref().trim();
        if word.is_empty() || normalized.iter().any(|existing| existing == word) {
            continue;
        }
        normalized.push(word.to_string());
    }
    normalized
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<SettingsPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<SettingsPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references against the process environment.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find('}') else {
            return Err(ConfigError::UnterminatedInterpolation);
        };

        let var = &after_open[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after_open[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.api_key is required. Set PROMPTGATE_API_KEY (or OPENAI_API_KEY) or add it to promptgate.toml".to_string(),
        ));
    }

    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.guard_model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.guard_model must not be empty".to_string()));
    }
    if llm.main_model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.main_model must not be empty".to_string()));
    }

    if !(0.0..=1.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=1.0".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_rules(rules: &RulesConfig) -> Result<(), ConfigError> {
    if rules.max_length == 0 {
        return Err(ConfigError::Validation(
            "rules.max_length must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct SettingsPatch {
    llm: Option<LlmPatch>,
    rules: Option<RulesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    guard_model: Option<String>,
    main_model: Option<String>,
    temperature: Option<f64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RulesPatch {
    max_length: Option<usize>,
    banned_words: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
