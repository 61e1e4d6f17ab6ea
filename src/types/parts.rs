//! Content parts carried by canonical messages.
//!
//! Each role accepts a closed subset of part kinds, discriminated by `pt`.
//! Unknown `pt` values are rejected at decode time.

use serde::{Deserialize, Serialize};

/// Plain text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// Image MIME types supported by every vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMimeType::Jpeg => "image/jpeg",
            ImageMimeType::Png => "image/png",
            ImageMimeType::Webp => "image/webp",
        }
    }
}

/// An image inlined as base64 data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImagePart {
    pub mime_type: ImageMimeType,
    pub base64: String,
}

/// Document type, distinct from the underlying data MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "application/vnd.agi.ego")]
    Ego,
    #[serde(rename = "application/vnd.agi.ocr")]
    Ocr,
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "text/markdown")]
    Markdown,
    #[serde(rename = "text/plain")]
    PlainText,
}

/// Inline text payload of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineTextData {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Document data, discriminated by `idt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "idt", rename_all = "snake_case")]
pub enum DocData {
    Text(InlineTextData),
}

/// A document attached by the user. Vendors encode it differently
/// (fenced markdown, xml blocks, ...), hence a dedicated part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocPart {
    #[serde(rename = "type")]
    pub doc_type: DocType,
    /// Stable identifier of the document, used for versioning.
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_title: Option<String>,
    pub data: DocData,
}

impl DocPart {
    pub fn text(&self) -> &str {
        match &self.data {
            DocData::Text(data) => &data.text,
        }
    }
}

/// Code execution variants. Only one vendor supports this today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeExecutionVariant {
    GeminiAutoInline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallInvocation {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model (not guaranteed valid).
    pub args: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExecutionInvocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<CodeExecutionVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolInvocation {
    FunctionCall(FunctionCallInvocation),
    CodeExecution(CodeExecutionInvocation),
}

/// A tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationPart {
    pub id: String,
    pub call: ToolInvocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub result: String,
    #[serde(rename = "_name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExecutionResponse {
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResponse {
    FunctionCall(FunctionCallResponse),
    CodeExecution(CodeExecutionResponse),
}

/// Error marker on a tool response: either a message or a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponseError {
    Flag(bool),
    Message(String),
}

/// The outcome of a tool invocation, sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponsePart {
    pub id: String,
    pub response: ToolResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolResponseError>,
}

/// Marks the user message as a reply to a quoted piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaReplyToPart {
    pub reply_to: String,
}

/// Parts allowed in the system message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pt", rename_all = "snake_case")]
pub enum SystemPart {
    Text(TextPart),
}

/// Parts allowed in user messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pt", rename_all = "snake_case")]
pub enum UserPart {
    Text(TextPart),
    InlineImage(InlineImagePart),
    Doc(DocPart),
    MetaReplyTo(MetaReplyToPart),
}

/// Parts allowed in model messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pt", rename_all = "snake_case")]
pub enum ModelPart {
    Text(TextPart),
    InlineImage(InlineImagePart),
    ToolCall(ToolInvocationPart),
}

/// Parts allowed in tool messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pt", rename_all = "snake_case")]
pub enum ToolPart {
    ToolResponse(ToolResponsePart),
}

impl SystemPart {
    pub fn text(text: impl Into<String>) -> Self {
        SystemPart::Text(TextPart { text: text.into() })
    }
}

impl UserPart {
    pub fn text(text: impl Into<String>) -> Self {
        UserPart::Text(TextPart { text: text.into() })
    }

    pub fn image(mime_type: ImageMimeType, base64: impl Into<String>) -> Self {
        UserPart::InlineImage(InlineImagePart {
            mime_type,
            base64: base64.into(),
        })
    }

    pub fn doc(doc_type: DocType, reference: impl Into<String>, text: impl Into<String>) -> Self {
        UserPart::Doc(DocPart {
            doc_type,
            reference: reference.into(),
            l1_title: None,
            data: DocData::Text(InlineTextData {
                text: text.into(),
                mime_type: None,
            }),
        })
    }

    pub fn reply_to(quote: impl Into<String>) -> Self {
        UserPart::MetaReplyTo(MetaReplyToPart {
            reply_to: quote.into(),
        })
    }
}

impl ModelPart {
    pub fn text(text: impl Into<String>) -> Self {
        ModelPart::Text(TextPart { text: text.into() })
    }

    pub fn function_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: Option<String>,
    ) -> Self {
        ModelPart::ToolCall(ToolInvocationPart {
            id: id.into(),
            call: ToolInvocation::FunctionCall(FunctionCallInvocation {
                name: name.into(),
                args,
            }),
        })
    }
}

impl ToolPart {
    pub fn function_result(id: impl Into<String>, result: impl Into<String>) -> Self {
        ToolPart::ToolResponse(ToolResponsePart {
            id: id.into(),
            response: ToolResponse::FunctionCall(FunctionCallResponse {
                result: result.into(),
                name: None,
            }),
            error: None,
        })
    }
}
