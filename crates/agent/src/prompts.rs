use promptgate_core::config::RulesConfig;

pub const DEFAULT_VIOLATION_REASON: &str = "The prompt violated a business rule.";

const GUARD_INSTRUCTION_TEMPLATE: &str = "\
You are a gatekeeper for a chat assistant. Check whether a user's message complies
with the following business rules:

1) The prompt must be {max_length} characters or fewer.
2) The prompt must not contain any of these forbidden terms: {forbidden_terms}.

Return a JSON object with:
- \"allowed\" (boolean): true if the prompt adheres to all rules; false otherwise.
- \"reason\" (string or null): brief description of the violation if not allowed, or null.
";

pub const ANSWER_INSTRUCTION: &str = r#"You are a helpful assistant. Answer clearly and concisely.

You must respond with a JSON object in exactly this format:
{"answer": "your response here"}

Example:
{"answer": "Protocol ABC is a standardized cardiology guideline for patient care."}"#;

pub fn guard_instruction(rules: &RulesConfig) -> String {
    GUARD_INSTRUCTION_TEMPLATE
        .replace("{max_length}", &rules.max_length.to_string())
        .replace("{forbidden_terms}", &rules.forbidden_terms())
}

pub fn kind_reminder(reason: &str) -> String {
    format!("Kind reminder: {reason}. Please adjust and try again.")
}

#[cfg(test)]
mod tests {
    use promptgate_core::config::RulesConfig;

    use super::{guard_instruction, kind_reminder};

    #[test]
    fn guard_instruction_embeds_rules() {
        let rules = RulesConfig {
            max_length: 42,
            banned_words: vec!["weather".to_string(), "joke".to_string()],
        };

        let instruction = guard_instruction(&rules);

        assert!(instruction.contains("The prompt must be 42 characters or fewer."));
        assert!(instruction.contains("any of these forbidden terms: weather, joke."));
        assert!(!instruction.contains("{max_length}"));
        assert!(!instruction.contains("{forbidden_terms}"));
    }

    #[test]
    fn reminder_wraps_reason() {
        assert_eq!(
            kind_reminder("too long"),
            "Kind reminder: too long. Please adjust and try again."
        );
    }
}
