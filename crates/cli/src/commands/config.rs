use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use promptgate_core::config::{resolve_config_path, LoadOptions, Settings};
use secrecy::ExposeSecret;
use toml::Value;

struct Sources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

pub fn run(config_path: Option<PathBuf>) -> String {
    let settings =
        match Settings::load(LoadOptions { config_path: config_path.clone(), ..LoadOptions::default() })
        {
            Ok(settings) => settings,
            Err(error) => return format!("config validation failed: {error}"),
        };

    let file_path = resolve_config_path(config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());
    let sources = Sources { doc: file_doc.as_ref(), path: file_path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let api_key = redact_key(settings.llm.api_key.expose_secret());
    lines.push(render_line(
        "llm.api_key",
        &api_key,
        field_source("llm.api_key", &["PROMPTGATE_API_KEY", "OPENAI_API_KEY"], &sources),
    ));
    lines.push(render_line(
        "llm.base_url",
        &settings.llm.base_url,
        field_source("llm.base_url", &["PROMPTGATE_BASE_URL"], &sources),
    ));
    lines.push(render_line(
        "llm.guard_model",
        &settings.llm.guard_model,
        field_source("llm.guard_model", &["PROMPTGATE_GUARD_MODEL"], &sources),
    ));
    lines.push(render_line(
        "llm.main_model",
        &settings.llm.main_model,
        field_source("llm.main_model", &["PROMPTGATE_MAIN_MODEL"], &sources),
    ));
    lines.push(render_line(
        "llm.temperature",
        &settings.llm.temperature.to_string(),
        field_source("llm.temperature", &["PROMPTGATE_TEMPERATURE"], &sources),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &settings.llm.timeout_secs.to_string(),
        field_source("llm.timeout_secs", &["PROMPTGATE_TIMEOUT_SECS"], &sources),
    ));

    lines.push(render_line(
        "rules.max_length",
        &settings.rules.max_length.to_string(),
        field_source("rules.max_length", &["PROMPTGATE_MAX_LENGTH"], &sources),
    ));
    lines.push(render_line(
        "rules.banned_words",
        &format!("[{}]", settings.rules.forbidden_terms()),
        field_source("rules.banned_words", &["PROMPTGATE_BANNED_WORDS"], &sources),
    ));

    lines.push(render_line(
        "logging.level",
        &settings.logging.level,
        field_source("logging.level", &["PROMPTGATE_LOG_LEVEL"], &sources),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", settings.logging.format),
        field_source("logging.format", &["PROMPTGATE_LOG_FORMAT"], &sources),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(key_path: &str, env_keys: &[&str], sources: &Sources<'_>) -> String {
    if let Some(env_key) = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = sources.doc {
        if contains_path(doc, key_path) {
            let file_path = sources
                .path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_key};

    #[test]
    fn redaction_keeps_only_the_key_prefix() {
        assert_eq!(redact_key("sk-proj-abcdef"), "sk-***");
        assert_eq!(redact_key("plainsecret"), "<redacted>");
        assert_eq!(redact_key("  "), "<empty>");
    }

    #[test]
    fn nested_paths_are_found_in_toml_documents() {
        let doc: toml::Value = "[rules]\nmax_length = 10\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "rules.max_length"));
        assert!(!contains_path(&doc, "rules.banned_words"));
        assert!(!contains_path(&doc, "llm.api_key"));
    }
}
