//! The particle protocol: incremental events emitted by a generation.
//!
//! There is no explicit "done" particle. End of stream is completion.

use serde::{Deserialize, Serialize};

use crate::metrics::ChatGenerateMetrics;

/// Why the generator stopped producing tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStopReason {
    /// Natural stop or stop sequence hit.
    Ok,
    /// The model stopped to invoke tools.
    #[serde(rename = "ok-tool_invocations")]
    ToolInvocations,
    /// Max tokens or context window exceeded.
    OutOfTokens,
    /// Stopped by an upstream content filter.
    Filter,
    /// Stopped because of an internal or upstream issue.
    Issue,
}

/// Where, in the dispatch pipeline, an in-band issue was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueId {
    DispatchPrepare,
    DispatchFetch,
    DispatchRead,
    DispatchParse,
}

/// One atomic incremental event of a generation, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Particle {
    /// A piece of text for the current text fragment.
    Text { delta: String },
    /// The model started invoking a function.
    FunctionCallStart {
        id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<String>,
    },
    /// More arguments for the function call in progress.
    FunctionCallArgs { delta: String },
    /// The model emitted code to be executed.
    CodeExecutionCall {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    /// The result of a vendor-side code execution.
    CodeExecutionResponse {
        id: String,
        result: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The model name reported by the vendor.
    SetModel { name: String },
    /// Usage and timing metrics; replaces any earlier metrics.
    SetMetrics { metrics: ChatGenerateMetrics },
    SetStopReason { reason: TokenStopReason },
    /// A vendor-side issue reported in-band.
    Issue { issue: IssueId, text: String },
}

impl Particle {
    pub fn text(delta: impl Into<String>) -> Self {
        Particle::Text {
            delta: delta.into(),
        }
    }

    /// Whether this particle carries content (as opposed to metadata).
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Particle::Text { .. }
                | Particle::FunctionCallStart { .. }
                | Particle::FunctionCallArgs { .. }
                | Particle::CodeExecutionCall { .. }
                | Particle::CodeExecutionResponse { .. }
        )
    }
}
