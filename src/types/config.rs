use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Vendor access configuration, discriminated by `dialect`.
///
/// The OpenAI family of dialects share one credential shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dialect", rename_all = "lowercase")]
pub enum Access {
    Anthropic(AnthropicAccess),
    Gemini(GeminiAccess),
    Ollama(OllamaAccess),
    OpenAI(OpenAIAccess),
    Azure(OpenAIAccess),
    DeepSeek(OpenAIAccess),
    Groq(OpenAIAccess),
    LmStudio(OpenAIAccess),
    LocalAi(OpenAIAccess),
    Mistral(OpenAIAccess),
    OpenRouter(OpenAIAccess),
    Perplexity(OpenAIAccess),
    TogetherAi(OpenAIAccess),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnthropicAccess {
    pub anthropic_key: String,
    #[serde(default)]
    pub anthropic_host: Option<String>,
    #[serde(default)]
    pub helicone_key: Option<String>,
}

/// Minimum safety threshold requested from Gemini.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeminiBlockThreshold {
    HarmBlockThresholdUnspecified,
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiAccess {
    pub gemini_key: String,
    #[serde(default)]
    pub gemini_host: Option<String>,
    pub min_safety_level: GeminiBlockThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OllamaAccess {
    #[serde(default)]
    pub ollama_host: Option<String>,
    #[serde(default)]
    pub ollama_json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAIAccess {
    pub oai_key: String,
    #[serde(default)]
    pub oai_org: Option<String>,
    #[serde(default)]
    pub oai_host: Option<String>,
    #[serde(default)]
    pub heli_key: Option<String>,
    #[serde(default)]
    pub moderation_check: bool,
}

impl OpenAIAccess {
    pub fn new(oai_key: impl Into<String>) -> Self {
        Self {
            oai_key: oai_key.into(),
            oai_org: None,
            oai_host: None,
            heli_key: None,
            moderation_check: false,
        }
    }
}

/// The vendor wire dialect of an [`Access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Anthropic,
    Gemini,
    Ollama,
    OpenAI,
    Azure,
    DeepSeek,
    Groq,
    LmStudio,
    LocalAi,
    Mistral,
    OpenRouter,
    Perplexity,
    TogetherAi,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Anthropic => "anthropic",
            Dialect::Gemini => "gemini",
            Dialect::Ollama => "ollama",
            Dialect::OpenAI => "openai",
            Dialect::Azure => "azure",
            Dialect::DeepSeek => "deepseek",
            Dialect::Groq => "groq",
            Dialect::LmStudio => "lmstudio",
            Dialect::LocalAi => "localai",
            Dialect::Mistral => "mistral",
            Dialect::OpenRouter => "openrouter",
            Dialect::Perplexity => "perplexity",
            Dialect::TogetherAi => "togetherai",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Access {
    pub fn dialect(&self) -> Dialect {
        match self {
            Access::Anthropic(_) => Dialect::Anthropic,
            Access::Gemini(_) => Dialect::Gemini,
            Access::Ollama(_) => Dialect::Ollama,
            Access::OpenAI(_) => Dialect::OpenAI,
            Access::Azure(_) => Dialect::Azure,
            Access::DeepSeek(_) => Dialect::DeepSeek,
            Access::Groq(_) => Dialect::Groq,
            Access::LmStudio(_) => Dialect::LmStudio,
            Access::LocalAi(_) => Dialect::LocalAi,
            Access::Mistral(_) => Dialect::Mistral,
            Access::OpenRouter(_) => Dialect::OpenRouter,
            Access::Perplexity(_) => Dialect::Perplexity,
            Access::TogetherAi(_) => Dialect::TogetherAi,
        }
    }

    /// The shared credentials of any OpenAI-family dialect.
    pub fn as_openai(&self) -> Option<&OpenAIAccess> {
        match self {
            Access::OpenAI(access)
            | Access::Azure(access)
            | Access::DeepSeek(access)
            | Access::Groq(access)
            | Access::LmStudio(access)
            | Access::LocalAi(access)
            | Access::Mistral(access)
            | Access::OpenRouter(access)
            | Access::Perplexity(access)
            | Access::TogetherAi(access) => Some(access),
            _ => None,
        }
    }
}

/// Model parameters sent with a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Vendor model reference.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    pub const MAX_TOKENS_LIMIT: u32 = 1_000_000;

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Error::validation(format!(
                    "model.temperature {temperature}: must be between 0 and 2"
                )));
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            if !(1..=Self::MAX_TOKENS_LIMIT).contains(&max_tokens) {
                return Err(Error::validation(format!(
                    "model.maxTokens {max_tokens}: must be between 1 and {}",
                    Self::MAX_TOKENS_LIMIT
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextMethod {
    ChatStream,
    ChatGenerate,
}

/// What the generation is for; used for tracing and billing attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextName {
    Conversation,
    AiDiagram,
    AiFlattener,
    Call,
    BeamScatter,
    BeamGather,
    PersonaExtract,
}

/// Call context, passed through to the transport untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub method: ContextMethod,
    pub name: ContextName,
    #[serde(rename = "ref")]
    pub reference: String,
}

impl Context {
    pub fn chat_stream(name: ContextName, reference: impl Into<String>) -> Self {
        Self {
            method: ContextMethod::ChatStream,
            name,
            reference: reference.into(),
        }
    }

    pub fn chat_generate(name: ContextName, reference: impl Into<String>) -> Self {
        Self {
            method: ContextMethod::ChatGenerate,
            name,
            reference: reference.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_access_dialect_discriminator() {
        let value = json!({ "dialect": "groq", "oaiKey": "gsk-test", "oaiHost": "" });
        let access: Access = serde_json::from_value(value).unwrap();
        assert_eq!(access.dialect(), Dialect::Groq);
        assert_eq!(access.as_openai().unwrap().oai_key, "gsk-test");

        let unknown = json!({ "dialect": "cohere", "oaiKey": "k" });
        assert!(serde_json::from_value::<Access>(unknown).is_err());
    }

    #[test]
    fn test_non_openai_access() {
        let value = json!({ "dialect": "ollama", "ollamaHost": "http://localhost:11434" });
        let access: Access = serde_json::from_value(value).unwrap();
        assert_eq!(access.dialect(), Dialect::Ollama);
        assert!(access.as_openai().is_none());
        assert_eq!(access.dialect().to_string(), "ollama");
    }

    #[test]
    fn test_model_config_ranges() {
        let mut model = ModelConfig::new("gpt-4o-mini");
        assert!(model.validate().is_ok());

        model.temperature = Some(2.5);
        assert!(model.validate().is_err());

        model.temperature = Some(0.7);
        model.max_tokens = Some(0);
        assert!(model.validate().is_err());

        model.max_tokens = Some(1_000_000);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_context_wire_shape() {
        let context = Context::chat_stream(ContextName::BeamScatter, "conv-42");
        assert_eq!(
            serde_json::to_value(&context).unwrap(),
            json!({ "method": "chat-stream", "name": "beam-scatter", "ref": "conv-42" })
        );
    }
}
