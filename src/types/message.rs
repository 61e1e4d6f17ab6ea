use serde::{Deserialize, Serialize};

use super::parts::{ModelPart, SystemPart, ToolPart, UserPart};

/// The system instruction; text parts only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub parts: Vec<SystemPart>,
}

impl SystemMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            parts: vec![SystemPart::text(text)],
        }
    }

    /// All text parts, joined by blank lines.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .map(|SystemPart::Text(part)| part.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A message in the chat sequence, discriminated by `role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    User { parts: Vec<UserPart> },
    Model { parts: Vec<ModelPart> },
    Tool { parts: Vec<ToolPart> },
}

impl ChatMessage {
    /// Create a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage::User {
            parts: vec![UserPart::text(text)],
        }
    }

    /// Create a model message with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        ChatMessage::Model {
            parts: vec![ModelPart::text(text)],
        }
    }

    /// Create a tool message carrying one function result.
    pub fn tool_result(id: impl Into<String>, result: impl Into<String>) -> Self {
        ChatMessage::Tool {
            parts: vec![ToolPart::function_result(id, result)],
        }
    }

    /// Get the role of this message.
    pub fn role(&self) -> Role {
        match self {
            ChatMessage::User { .. } => Role::User,
            ChatMessage::Model { .. } => Role::Model,
            ChatMessage::Tool { .. } => Role::Tool,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChatMessage::User { parts } => parts.is_empty(),
            ChatMessage::Model { parts } => parts.is_empty(),
            ChatMessage::Tool { parts } => parts.is_empty(),
        }
    }
}

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
    Tool,
}
