//! The canonical result of a generation: fragments plus generator metadata.

use std::pin::Pin;

use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};

use crate::metrics::ChatGenerateMetrics;
use crate::types::{Particle, TokenStopReason, ToolInvocation, ToolInvocationPart, ToolResponsePart};
use crate::Error;

/// An ordered, cancellable sequence of particles produced by a transport.
pub type ParticleStream = Pin<Box<dyn Stream<Item = Result<Particle, Error>> + Send>>;

/// Box any particle stream.
pub fn particle_stream<S>(stream: S) -> ParticleStream
where
    S: Stream<Item = Result<Particle, Error>> + Send + 'static,
{
    Box::pin(stream)
}

/// Rendering style of an inline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Plain,
    Bold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    /// Set only on error fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

/// One element of the output content, mirroring a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pt", rename_all = "snake_case")]
pub enum Fragment {
    Text(TextFragment),
    ToolCall(ToolInvocationPart),
    ToolResponse(ToolResponsePart),
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text(TextFragment {
            text: text.into(),
            style: None,
        })
    }

    /// An inline error, rendered as `Issue: <message>`.
    pub fn error(message: &str, style: TextStyle) -> Self {
        Fragment::Text(TextFragment {
            text: format!("Issue: {message}"),
            style: Some(style),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Fragment::Text(TextFragment { style: Some(_), .. }))
    }

    /// Markdown rendering, emphasizing bold error fragments.
    pub fn to_markdown(&self) -> String {
        match self {
            Fragment::Text(TextFragment {
                text,
                style: Some(TextStyle::Bold),
            }) => format!("**{text}**"),
            Fragment::Text(TextFragment { text, .. }) => text.clone(),
            Fragment::ToolCall(part) => match &part.call {
                ToolInvocation::FunctionCall(call) => format!(
                    "`{}({})`",
                    call.name,
                    call.args.as_deref().unwrap_or_default()
                ),
                ToolInvocation::CodeExecution(exec) => format!(
                    "```{}\n{}\n```",
                    exec.language.as_deref().unwrap_or_default(),
                    exec.code
                ),
            },
            Fragment::ToolResponse(part) => match &part.response {
                crate::types::ToolResponse::FunctionCall(r) => r.result.clone(),
                crate::types::ToolResponse::CodeExecution(r) => r.result.clone(),
            },
        }
    }
}

/// Who generated the content, and how it went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generator {
    /// Initially the model id; replaced by the name the vendor reports.
    pub name: String,
    pub vendor_id: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ChatGenerateMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_stop_reason: Option<TokenStopReason>,
}

/// The single mutable result of one in-flight generation.
///
/// Exclusively owned by the active call. Observers receive it by shared
/// reference and must clone it to keep it past the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccumulator {
    pub fragments: Vec<Fragment>,
    pub generator: Generator,
    pub pending_incomplete: bool,
}

impl GenerateAccumulator {
    pub fn new(generator: Generator) -> Self {
        Self {
            fragments: Vec::new(),
            generator,
            pending_incomplete: true,
        }
    }

    /// All non-error text, concatenated.
    pub fn text_content(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::Text(TextFragment { text, style: None }) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool invocations in order.
    pub fn tool_calls(&self) -> Vec<&ToolInvocationPart> {
        self.fragments
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::ToolCall(part) => Some(part),
                _ => None,
            })
            .collect()
    }
}

/// Terminal outcome of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerateOutcome {
    Success,
    Aborted,
    Errored {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl GenerateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerateOutcome::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            GenerateOutcome::Errored { error_message } => Some(error_message),
            _ => None,
        }
    }
}
