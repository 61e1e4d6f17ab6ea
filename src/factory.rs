use std::env;
use std::sync::Arc;

use crate::provider::ParticleTransport;
use crate::providers::OpenAIChatTransport;
use crate::response::ParticleStream;
use crate::types::{
    Access, AnthropicAccess, Dialect, DispatchRequest, GeminiAccess, GeminiBlockThreshold,
    OllamaAccess, OpenAIAccess,
};
use crate::Error;

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSettings {
    /// Throttle level: 0 disables decimation, N dampens for N parallel generations.
    pub throttle_parallel_threads: u32,
    /// Always dispatch without streaming.
    pub dev_no_streaming: bool,
    /// Ask transports to log the vendor request body.
    pub debug_dispatch_request_body: bool,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            throttle_parallel_threads: 1,
            dev_no_streaming: false,
            debug_dispatch_request_body: false,
        }
    }
}

impl GenerateSettings {
    /// Read settings from `CHATGEN_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut settings = Self::default();
        if let Some(threads) = var("CHATGEN_THROTTLE_THREADS") {
            settings.throttle_parallel_threads = threads.trim().parse().map_err(|_| {
                Error::config(format!(
                    "CHATGEN_THROTTLE_THREADS must be a non-negative integer, got '{threads}'"
                ))
            })?;
        }
        if let Some(value) = var("CHATGEN_DEV_NO_STREAMING") {
            settings.dev_no_streaming = parse_flag("CHATGEN_DEV_NO_STREAMING", &value)?;
        }
        if let Some(value) = var("CHATGEN_DEBUG_DISPATCH_BODY") {
            settings.debug_dispatch_request_body = parse_flag("CHATGEN_DEBUG_DISPATCH_BODY", &value)?;
        }
        Ok(settings)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{name} must be a boolean, got '{value}'"))),
    }
}

impl Access {
    /// Build vendor access from environment variables.
    ///
    /// `CHATGEN_DIALECT` selects the dialect explicitly; otherwise the first
    /// credential found among OpenAI, Anthropic, Gemini and Ollama wins.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let require = |name: &str, dialect: Dialect| {
            var(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                Error::config(format!(
                    "{name} environment variable is required for the {dialect} dialect"
                ))
            })
        };

        if let Some(selector) = var("CHATGEN_DIALECT") {
            let dialect: Dialect =
                serde_json::from_value(serde_json::Value::String(selector.to_lowercase()))
                    .map_err(|_| {
                        Error::config(format!("Invalid CHATGEN_DIALECT '{selector}'"))
                    })?;

            return match dialect {
                Dialect::Anthropic => Ok(Access::Anthropic(AnthropicAccess {
                    anthropic_key: require("ANTHROPIC_API_KEY", dialect)?,
                    anthropic_host: None,
                    helicone_key: None,
                })),
                Dialect::Gemini => Ok(Access::Gemini(GeminiAccess {
                    gemini_key: require("GEMINI_API_KEY", dialect)?,
                    gemini_host: None,
                    min_safety_level: GeminiBlockThreshold::HarmBlockThresholdUnspecified,
                })),
                Dialect::Ollama => Ok(Access::Ollama(OllamaAccess {
                    ollama_host: var("OLLAMA_HOST"),
                    ollama_json: false,
                })),
                _ => {
                    // local servers run without a key
                    let key = match dialect {
                        Dialect::LmStudio | Dialect::LocalAi => {
                            var("OPENAI_API_KEY").unwrap_or_default()
                        }
                        _ => require("OPENAI_API_KEY", dialect)?,
                    };
                    Ok(openai_family(dialect, openai_access(key, &var)))
                }
            };
        }

        if let Some(key) = var("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            return Ok(Access::OpenAI(openai_access(key, &var)));
        }
        if let Some(anthropic_key) = var("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            return Ok(Access::Anthropic(AnthropicAccess {
                anthropic_key,
                anthropic_host: None,
                helicone_key: None,
            }));
        }
        if let Some(gemini_key) = var("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            return Ok(Access::Gemini(GeminiAccess {
                gemini_key,
                gemini_host: None,
                min_safety_level: GeminiBlockThreshold::HarmBlockThresholdUnspecified,
            }));
        }
        if let Some(host) = var("OLLAMA_HOST") {
            return Ok(Access::Ollama(OllamaAccess {
                ollama_host: Some(host),
                ollama_json: false,
            }));
        }

        Err(Error::config(
            "No vendor credentials found in environment. Set CHATGEN_DIALECT with the matching credentials, or OPENAI_API_KEY",
        ))
    }
}

fn openai_access(key: String, var: &impl Fn(&str) -> Option<String>) -> OpenAIAccess {
    let mut access = OpenAIAccess::new(key);
    access.oai_host = var("OPENAI_API_HOST");
    access.oai_org = var("OPENAI_ORG_ID");
    access
}

fn openai_family(dialect: Dialect, access: OpenAIAccess) -> Access {
    match dialect {
        Dialect::Azure => Access::Azure(access),
        Dialect::DeepSeek => Access::DeepSeek(access),
        Dialect::Groq => Access::Groq(access),
        Dialect::LmStudio => Access::LmStudio(access),
        Dialect::LocalAi => Access::LocalAi(access),
        Dialect::Mistral => Access::Mistral(access),
        Dialect::OpenRouter => Access::OpenRouter(access),
        Dialect::Perplexity => Access::Perplexity(access),
        Dialect::TogetherAi => Access::TogetherAi(access),
        _ => Access::OpenAI(access),
    }
}

/// Routes each dispatch to the transport serving its dialect.
pub struct TransportFactory {
    openai: Arc<OpenAIChatTransport>,
}

impl TransportFactory {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            openai: Arc::new(OpenAIChatTransport::new()?),
        })
    }

    /// The transport able to serve `access`.
    pub fn for_access(&self, access: &Access) -> Result<Arc<dyn ParticleTransport>, Error> {
        match access {
            Access::Anthropic(_) | Access::Gemini(_) => Err(Error::config(format!(
                "No transport available for the {} dialect",
                access.dialect()
            ))),
            _ => Ok(self.openai.clone()),
        }
    }
}

#[async_trait::async_trait]
impl ParticleTransport for TransportFactory {
    async fn chat_generate(&self, request: DispatchRequest) -> Result<ParticleStream, Error> {
        let transport = self.for_access(&request.access)?;
        transport.chat_generate(request).await
    }

    fn supports(&self, dialect: Dialect) -> bool {
        self.openai.supports(dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_settings_defaults_and_overrides() {
        assert_eq!(GenerateSettings::from_vars(vars(&[])).unwrap(), GenerateSettings::default());

        let settings = GenerateSettings::from_vars(vars(&[
            ("CHATGEN_THROTTLE_THREADS", "4"),
            ("CHATGEN_DEV_NO_STREAMING", "true"),
            ("CHATGEN_DEBUG_DISPATCH_BODY", "0"),
        ]))
        .unwrap();
        assert_eq!(settings.throttle_parallel_threads, 4);
        assert!(settings.dev_no_streaming);
        assert!(!settings.debug_dispatch_request_body);
    }

    #[test]
    fn test_settings_reject_garbage() {
        let err = GenerateSettings::from_vars(vars(&[("CHATGEN_THROTTLE_THREADS", "many")]))
            .unwrap_err();
        assert!(err.is_configuration());
        let err = GenerateSettings::from_vars(vars(&[("CHATGEN_DEV_NO_STREAMING", "maybe")]))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_explicit_dialect_selection() {
        let access = Access::from_vars(vars(&[
            ("CHATGEN_DIALECT", "Groq"),
            ("OPENAI_API_KEY", "gsk-test"),
            ("OPENAI_API_HOST", "https://api.groq.com/openai"),
        ]))
        .unwrap();
        assert_eq!(access.dialect(), Dialect::Groq);
        let oai = access.as_openai().unwrap();
        assert_eq!(oai.oai_key, "gsk-test");
        assert_eq!(oai.oai_host.as_deref(), Some("https://api.groq.com/openai"));

        let local = Access::from_vars(vars(&[("CHATGEN_DIALECT", "lmstudio")])).unwrap();
        assert_eq!(local.dialect(), Dialect::LmStudio);
    }

    #[test]
    fn test_explicit_dialect_missing_credentials() {
        let err = Access::from_vars(vars(&[("CHATGEN_DIALECT", "anthropic")])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = Access::from_vars(vars(&[("CHATGEN_DIALECT", "cohere")])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_credential_inference_order() {
        let access = Access::from_vars(vars(&[
            ("GEMINI_API_KEY", "g"),
            ("OPENAI_API_KEY", "sk"),
        ]))
        .unwrap();
        assert_eq!(access.dialect(), Dialect::OpenAI);

        let access = Access::from_vars(vars(&[("OLLAMA_HOST", "http://gpu-box:11434")])).unwrap();
        assert_eq!(access.dialect(), Dialect::Ollama);

        assert!(Access::from_vars(vars(&[])).unwrap_err().is_configuration());
    }

    #[test]
    fn test_factory_routes_by_dialect() {
        let factory = TransportFactory::new().unwrap();
        assert!(factory
            .for_access(&Access::Mistral(OpenAIAccess::new("key")))
            .is_ok());

        let anthropic = Access::Anthropic(AnthropicAccess {
            anthropic_key: "key".to_string(),
            anthropic_host: None,
            helicone_key: None,
        });
        assert!(matches!(factory.for_access(&anthropic), Err(e) if e.is_configuration()));
        assert!(!factory.supports(Dialect::Gemini));
    }
}
