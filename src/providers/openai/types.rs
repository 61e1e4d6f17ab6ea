//! OpenAI Chat Completions wire format.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Maximum number of stop sequences the API accepts.
pub const MAX_STOP_SEQUENCES: usize = 4;

// Content parts

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// A remote URL or a `data:` URL with the base64 payload.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Auto,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A function call predicted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCall {
    Function { id: String, function: FunctionInvocation },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub name: String,
    /// JSON text; the model may produce invalid JSON.
    pub arguments: String,
}

// Messages

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    User {
        content: UserContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant(AssistantMessage),
    Tool {
        content: String,
        tool_call_id: String,
    },
}

/// An assistant turn: content is required unless tool calls are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// Tools

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    Function { function: FunctionDefinition },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema object; omitted for an empty parameter list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Named(NamedToolChoice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    None,
    Auto,
    Required,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NamedToolChoice {
    Function { function: NamedFunction },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFunction {
    pub name: String,
}

// Request

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    /// The prompt must also ask for JSON, or the model may stall on whitespace.
    JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            parallel_tool_calls: None,
            max_tokens: None,
            temperature: None,
            stream: None,
            stream_options: None,
            response_format: None,
            seed: None,
            stop: None,
            user: None,
        }
    }

    /// Check the value ranges the API enforces.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Error::validation(format!(
                    "temperature {temperature}: must be between 0 and 2"
                )));
            }
        }
        if let Some(stop) = &self.stop {
            if stop.len() > MAX_STOP_SEQUENCES {
                return Err(Error::validation(format!(
                    "stop: at most {MAX_STOP_SEQUENCES} sequences, got {}",
                    stop.len()
                )));
            }
        }
        Ok(())
    }
}

// Responses

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    /// The role is implied; only content and tool calls matter.
    pub message: AssistantMessage,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionResponse {
    pub object: String,
    pub id: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub model: String,
    #[serde(default)]
    pub usage: Option<Usage>,
    pub created: u64,
    #[serde(default)]
    pub system_fingerprint: Option<String>,
}

// Streaming chunks

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// An incremental piece of a tool call, keyed by its position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub call_type: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCallDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Error object some servers send mid-stream instead of an HTTP error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UndocumentedError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    /// `chat.completion.chunk`, or empty from some Azure deployments.
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub system_fingerprint: Option<String>,
    #[serde(default)]
    pub error: Option<UndocumentedError>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// Body of a non-success HTTP response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: UndocumentedError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let mut request = ChatCompletionRequest::new(
            "gpt-4o-mini",
            vec![
                Message::System {
                    content: "Be brief.".to_string(),
                    name: None,
                },
                Message::Assistant(AssistantMessage {
                    content: None,
                    tool_calls: Some(vec![ToolCall::Function {
                        id: "call_1".to_string(),
                        function: FunctionInvocation {
                            name: "lookup".to_string(),
                            arguments: "{}".to_string(),
                        },
                    }]),
                    name: None,
                }),
            ],
        );
        request.tool_choice = Some(ToolChoice::Mode(ToolChoiceMode::Required));
        request.stream = Some(true);
        request.stream_options = Some(StreamOptions { include_usage: true });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0], json!({ "role": "system", "content": "Be brief." }));
        assert_eq!(value["messages"][1]["content"], json!(null));
        assert_eq!(value["messages"][1]["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_choice"], "required");
        assert_eq!(value["stream_options"], json!({ "include_usage": true }));
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_named_tool_choice_shape() {
        let choice = ToolChoice::Named(NamedToolChoice::Function {
            function: NamedFunction {
                name: "lookup".to_string(),
            },
        });
        assert_eq!(
            serde_json::to_value(&choice).unwrap(),
            json!({ "type": "function", "function": { "name": "lookup" } })
        );
    }

    #[test]
    fn test_too_many_stop_sequences() {
        let mut request = ChatCompletionRequest::new("gpt-4o", vec![]);
        request.stop = Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        assert!(request.validate().is_ok());
        request.stop.as_mut().unwrap().push("e".into());
        assert!(matches!(request.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_chunk_with_tool_call_delta() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "object": "chat.completion.chunk",
            "id": "chatcmpl-1",
            "created": 1720000000,
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "delta": {
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "lookup", "arguments": "" }
                    }]
                },
                "finish_reason": null
            }]
        }))
        .unwrap();
        let delta = &chunk.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(delta.id.as_deref(), Some("call_1"));
        assert_eq!(delta.function.as_ref().unwrap().name.as_deref(), Some("lookup"));
    }

    #[test]
    fn test_undocumented_payloads_are_tolerated() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "error": { "message": "overloaded", "type": "server_error", "param": null, "code": null }
        }))
        .unwrap();
        assert_eq!(chunk.error.unwrap().message.as_deref(), Some("overloaded"));

        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "object": "",
            "id": "x",
            "created": 0,
            "model": "gpt-4",
            "choices": [],
            "warning": "This model version is deprecated."
        }))
        .unwrap();
        assert!(chunk.warning.is_some());
    }

    #[test]
    fn test_usage_details() {
        let usage: Usage = serde_json::from_value(json!({
            "prompt_tokens": 100,
            "completion_tokens": 20,
            "total_tokens": 120,
            "prompt_tokens_details": { "cached_tokens": 64 },
            "completion_tokens_details": { "reasoning_tokens": 8 }
        }))
        .unwrap();
        assert_eq!(usage.prompt_tokens_details.unwrap().cached_tokens, Some(64));
        assert_eq!(usage.completion_tokens_details.unwrap().reasoning_tokens, Some(8));
    }
}
