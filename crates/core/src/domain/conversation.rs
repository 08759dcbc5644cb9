use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    System,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Outcome of the guard stage as carried by the conversation state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GuardVerdict {
    /// Guard has not run yet. Treated as not allowed.
    #[default]
    Pending,
    Allowed,
    Denied { reason: Option<String> },
}

impl GuardVerdict {
    pub fn from_parts(allowed: bool, reason: Option<String>) -> Self {
        if allowed {
            Self::Allowed
        } else {
            Self::Denied { reason }
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Denied { reason } => reason.as_deref(),
            Self::Pending | Self::Allowed => None,
        }
    }
}

/// Per-invocation conversation. Stages consume it by value and hand back
/// the next state; nothing is shared across invocations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    verdict: GuardVerdict,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, verdict: GuardVerdict::Pending }
    }

    /// Fresh state holding a single user message and a pending verdict.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn verdict(&self) -> &GuardVerdict {
        &self.verdict
    }

    pub fn allowed(&self) -> bool {
        self.verdict.is_allowed()
    }

    pub fn violation_reason(&self) -> Option<&str> {
        self.verdict.reason()
    }

    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| message.role == Role::User)
    }

    pub fn final_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn with_verdict(self, verdict: GuardVerdict) -> Self {
        Self { verdict, ..self }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}
