//! Conversion between the canonical model and the Chat Completions format.

use std::time::Duration;

use tokio::time::Instant;

use super::types::{
    AssistantMessage, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse,
    ContentPart, FinishReason, FunctionDefinition, FunctionInvocation, ImageUrl, Message,
    NamedFunction, NamedToolChoice, ResponseFormat, StreamOptions, ToolCall, ToolChoice,
    ToolChoiceMode, ToolDefinition, Usage, UserContent,
};
use crate::metrics::ChatGenerateMetrics;
use crate::types::{
    ChatGenerateRequest, ChatMessage, IssueId, ModelConfig, ModelPart, Particle, TokenStopReason,
    Tool, ToolInvocation, ToolPart, ToolResponse, ToolsPolicy, UserPart,
};
use crate::Error;

/// Translate a canonical request into a Chat Completions request.
pub fn to_chat_completion_request(
    model: &ModelConfig,
    chat: &ChatGenerateRequest,
    streaming: bool,
    json_output: bool,
) -> Result<ChatCompletionRequest, Error> {
    let mut messages = Vec::with_capacity(chat.chat_sequence.len() + 1);

    if let Some(system) = &chat.system_message {
        messages.push(Message::System {
            content: system.text_content(),
            name: None,
        });
    }

    for message in &chat.chat_sequence {
        match message {
            ChatMessage::User { parts } => messages.push(Message::User {
                content: user_content(parts),
                name: None,
            }),
            ChatMessage::Model { parts } => messages.push(assistant_message(parts)?),
            ChatMessage::Tool { parts } => {
                for ToolPart::ToolResponse(part) in parts {
                    let ToolResponse::FunctionCall(response) = &part.response else {
                        return Err(Error::validation(
                            "openai: code execution responses are not supported",
                        ));
                    };
                    messages.push(Message::Tool {
                        content: response.result.clone(),
                        tool_call_id: part.id.clone(),
                    });
                }
            }
        }
    }

    let mut request = ChatCompletionRequest::new(model.id.clone(), messages);
    request.temperature = model.temperature;
    request.max_tokens = model.max_tokens;

    if let Some(tools) = &chat.tools {
        request.tools = Some(tools.iter().map(tool_definition).collect::<Result<_, _>>()?);
    }
    request.tool_choice = chat.tools_policy.as_ref().map(|policy| match policy {
        ToolsPolicy::Auto => ToolChoice::Mode(ToolChoiceMode::Auto),
        ToolsPolicy::Any => ToolChoice::Mode(ToolChoiceMode::Required),
        ToolsPolicy::FunctionCall { function_call } => {
            ToolChoice::Named(NamedToolChoice::Function {
                function: NamedFunction {
                    name: function_call.name.clone(),
                },
            })
        }
    });

    if streaming {
        request.stream = Some(true);
        request.stream_options = Some(StreamOptions { include_usage: true });
    }
    if json_output {
        request.response_format = Some(ResponseFormat::JsonObject);
    }

    request.validate()?;
    Ok(request)
}

fn user_content(parts: &[UserPart]) -> UserContent {
    if let [UserPart::Text(part)] = parts {
        return UserContent::Text(part.text.clone());
    }

    let parts = parts
        .iter()
        .map(|part| match part {
            UserPart::Text(part) => ContentPart::Text {
                text: part.text.clone(),
            },
            UserPart::InlineImage(image) => ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.mime_type.as_str(), image.base64),
                    detail: None,
                },
            },
            UserPart::Doc(doc) => {
                let title = doc
                    .l1_title
                    .as_deref()
                    .map(|title| format!("{title}\n"))
                    .unwrap_or_default();
                ContentPart::Text {
                    text: format!("{title}```{}\n{}\n```\n", doc.reference, doc.text()),
                }
            }
            UserPart::MetaReplyTo(reply) => ContentPart::Text {
                text: format!(
                    "<context>The user is referring to this in particular:\n{}</context>",
                    reply.reply_to
                ),
            },
        })
        .collect();
    UserContent::Parts(parts)
}

fn assistant_message(parts: &[ModelPart]) -> Result<Message, Error> {
    let mut content: Option<String> = None;
    let mut tool_calls = Vec::new();

    for part in parts {
        match part {
            ModelPart::Text(text) => content.get_or_insert_with(String::new).push_str(&text.text),
            ModelPart::InlineImage(_) => {
                return Err(Error::validation(
                    "openai: images in model messages are not supported",
                ))
            }
            ModelPart::ToolCall(invocation) => match &invocation.call {
                ToolInvocation::FunctionCall(call) => tool_calls.push(ToolCall::Function {
                    id: invocation.id.clone(),
                    function: FunctionInvocation {
                        name: call.name.clone(),
                        arguments: call.args.clone().unwrap_or_else(|| "{}".to_string()),
                    },
                }),
                ToolInvocation::CodeExecution(_) => {
                    return Err(Error::validation(
                        "openai: code execution invocations are not supported",
                    ))
                }
            },
        }
    }

    Ok(Message::Assistant(AssistantMessage {
        content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        name: None,
    }))
}

fn tool_definition(tool: &Tool) -> Result<ToolDefinition, Error> {
    match tool {
        Tool::FunctionCall { function_call } => Ok(ToolDefinition::Function {
            function: FunctionDefinition {
                name: function_call.name.clone(),
                description: Some(function_call.description.clone()),
                parameters: function_call
                    .input_schema
                    .as_ref()
                    .map(|schema| schema.to_json_schema()),
            },
        }),
        Tool::CodeExecution { .. } => Err(Error::validation(
            "openai: code execution tools are not supported",
        )),
    }
}

fn stop_reason(reason: FinishReason) -> TokenStopReason {
    match reason {
        FinishReason::Stop => TokenStopReason::Ok,
        FinishReason::Length => TokenStopReason::OutOfTokens,
        FinishReason::ToolCalls => TokenStopReason::ToolInvocations,
        FinishReason::ContentFilter => TokenStopReason::Filter,
    }
}

fn usage_metrics(usage: &Usage) -> ChatGenerateMetrics {
    let cached = usage
        .prompt_tokens_details
        .as_ref()
        .and_then(|details| details.cached_tokens)
        .filter(|&cached| cached > 0);
    ChatGenerateMetrics {
        t_in: Some(usage.prompt_tokens.saturating_sub(cached.unwrap_or(0))),
        t_cache_read: cached,
        t_out: Some(usage.completion_tokens),
        t_out_reasoning: usage
            .completion_tokens_details
            .as_ref()
            .and_then(|details| details.reasoning_tokens),
        ..Default::default()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Turns streamed chunks into particles.
#[derive(Debug)]
pub struct ChunkParser {
    started: Instant,
    first_content: Option<Duration>,
    model_reported: bool,
    tool_index: Option<u32>,
}

impl ChunkParser {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// A parser whose timings are measured from `started`.
    pub fn starting_at(started: Instant) -> Self {
        Self {
            started,
            first_content: None,
            model_reported: false,
            tool_index: None,
        }
    }

    /// Parse one `data:` payload.
    pub fn parse(&mut self, data: &str) -> Result<Vec<Particle>, Error> {
        let chunk: ChatCompletionChunk = serde_json::from_str(data)
            .map_err(|e| Error::streaming(format!("openai: malformed chunk: {e}")))?;
        Ok(self.parse_chunk(chunk))
    }

    pub fn parse_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<Particle> {
        let mut particles = Vec::new();

        if let Some(error) = chunk.error {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            tracing::error!(code = ?error.code, %message, "openai: error payload in stream");
            particles.push(Particle::Issue {
                issue: IssueId::DispatchRead,
                text: format!("OpenAI error: {message}"),
            });
            return particles;
        }
        if let Some(warning) = &chunk.warning {
            tracing::warn!(%warning, "openai: warning payload in stream");
        }

        if !self.model_reported && !chunk.model.is_empty() {
            self.model_reported = true;
            particles.push(Particle::SetModel { name: chunk.model });
        }

        for choice in chunk.choices {
            if choice.index != 0 {
                tracing::warn!(index = choice.index, "openai: ignoring extra choice");
                continue;
            }

            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.mark_content();
                particles.push(Particle::Text { delta: content });
            }

            for call in choice.delta.tool_calls.unwrap_or_default() {
                self.mark_content();
                let function = call.function.unwrap_or_default();
                let arguments = function.arguments.filter(|a| !a.is_empty());
                match call.id {
                    Some(id) => {
                        self.tool_index = Some(call.index);
                        particles.push(Particle::FunctionCallStart {
                            id,
                            name: function.name.unwrap_or_default(),
                            args: arguments,
                        });
                    }
                    None => {
                        if self.tool_index != Some(call.index) {
                            tracing::warn!(index = call.index, "openai: arguments for unknown tool call");
                        }
                        if let Some(delta) = arguments {
                            particles.push(Particle::FunctionCallArgs { delta });
                        }
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                particles.push(Particle::SetStopReason {
                    reason: stop_reason(reason),
                });
            }
        }

        if let Some(usage) = &chunk.usage {
            let mut metrics = usage_metrics(usage);
            metrics.dt_start_ms = self.first_content.map(millis);
            metrics.dt_all_ms = Some(millis(self.started.elapsed()));
            particles.push(Particle::SetMetrics { metrics });
        }

        particles
    }

    fn mark_content(&mut self) {
        if self.first_content.is_none() {
            self.first_content = Some(self.started.elapsed());
        }
    }
}

impl Default for ChunkParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a complete (non-streaming) response into particles.
pub fn parse_chat_completion(
    response: ChatCompletionResponse,
    elapsed: Duration,
) -> Result<Vec<Particle>, Error> {
    let mut particles = vec![Particle::SetModel {
        name: response.model,
    }];

    let choice = response
        .choices
        .into_iter()
        .find(|choice| choice.index == 0)
        .ok_or_else(|| Error::provider("openai", "response has no choices"))?;

    if let Some(content) = choice.message.content.filter(|c| !c.is_empty()) {
        particles.push(Particle::Text { delta: content });
    }
    for ToolCall::Function { id, function } in choice.message.tool_calls.unwrap_or_default() {
        particles.push(Particle::FunctionCallStart {
            id,
            name: function.name,
            args: Some(function.arguments).filter(|a| !a.is_empty()),
        });
    }
    particles.push(Particle::SetStopReason {
        reason: stop_reason(choice.finish_reason),
    });

    if let Some(usage) = &response.usage {
        let mut metrics = usage_metrics(usage);
        metrics.dt_all_ms = Some(millis(elapsed));
        particles.push(Particle::SetMetrics { metrics });
    }
    Ok(particles)
}
