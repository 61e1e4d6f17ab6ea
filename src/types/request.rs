use serde::{Deserialize, Serialize};

use super::config::{Access, Context, ModelConfig};
use super::message::{ChatMessage, SystemMessage};
use super::tools::{validate_function_name, Tool, ToolsPolicy};
use crate::Error;

/// A vendor-agnostic chat generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<SystemMessage>,
    pub chat_sequence: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_policy: Option<ToolsPolicy>,
}

impl ChatGenerateRequest {
    /// Create a new empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request with a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            system_message: Some(SystemMessage::new(content)),
            ..Self::default()
        }
    }

    /// Create a request with a single user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            chat_sequence: vec![ChatMessage::user(content)],
            ..Self::default()
        }
    }

    /// Add a user message.
    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.chat_sequence.push(ChatMessage::user(content));
        self
    }

    /// Add a model message.
    pub fn with_model(mut self, content: impl Into<String>) -> Self {
        self.chat_sequence.push(ChatMessage::model(content));
        self
    }

    /// Add any chat message.
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.chat_sequence.push(message);
        self
    }

    /// Make a tool available to the model.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    pub fn with_tools_policy(mut self, policy: ToolsPolicy) -> Self {
        self.tools_policy = Some(policy);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (index, tool) in self.tools.iter().flatten().enumerate() {
            tool.validate()
                .map_err(|e| Error::validation(format!("tools[{index}]: {e}")))?;
        }
        if let Some(ToolsPolicy::FunctionCall { function_call }) = &self.tools_policy {
            validate_function_name(&function_call.name)
                .map_err(|e| Error::validation(format!("toolsPolicy: {e}")))?;
        }
        Ok(())
    }
}

impl From<&str> for ChatGenerateRequest {
    fn from(s: &str) -> Self {
        ChatGenerateRequest::user(s)
    }
}

impl From<String> for ChatGenerateRequest {
    fn from(s: String) -> Self {
        ChatGenerateRequest::user(s)
    }
}

impl From<Vec<ChatMessage>> for ChatGenerateRequest {
    fn from(chat_sequence: Vec<ChatMessage>) -> Self {
        ChatGenerateRequest {
            chat_sequence,
            ..Self::default()
        }
    }
}

/// Transport connection options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// Log the vendor request body before dispatching it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_dispatch_request_body: Option<bool>,
}

/// Everything a transport needs to produce a particle stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub access: Access,
    pub model: ModelConfig,
    pub chat_generate: ChatGenerateRequest,
    pub context: Context,
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_options: Option<ConnectionOptions>,
}

impl DispatchRequest {
    pub fn validate(&self) -> Result<(), Error> {
        self.model.validate()?;
        self.chat_generate.validate()
    }

    pub fn debug_request_body(&self) -> bool {
        self.connection_options
            .as_ref()
            .and_then(|options| options.debug_dispatch_request_body)
            .unwrap_or(false)
    }
}
