use std::future;
use std::time::Duration;

use futures_util::{stream, StreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use tokio::time::Instant;

use super::adapter::{parse_chat_completion, to_chat_completion_request, ChunkParser};
use super::types::{ApiErrorEnvelope, ChatCompletionResponse};
use crate::provider::ParticleTransport;
use crate::response::{particle_stream, ParticleStream};
use crate::sse_stream::SseStreamExt;
use crate::types::{Access, Dialect, DispatchRequest};
use crate::Error;

const OLLAMA_DEFAULT_HOST: &str = "http://127.0.0.1:11434";
const AZURE_API_VERSION: &str = "2024-06-01";

/// Where and how to reach one OpenAI-compatible server.
#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    url: String,
    headers: Vec<(&'static str, String)>,
    json_output: bool,
}

/// Chat Completions transport for every OpenAI-compatible dialect.
pub struct OpenAIChatTransport {
    client: Client,
}

impl OpenAIChatTransport {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(Duration::from_secs(120))
    }

    /// A transport whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn endpoint(access: &Access, model_id: &str) -> Result<Endpoint, Error> {
        if let Access::Ollama(ollama) = access {
            let host = ollama.ollama_host.as_deref().unwrap_or(OLLAMA_DEFAULT_HOST);
            return Ok(Endpoint {
                url: format!("{}/v1/chat/completions", normalize_host(host)),
                headers: Vec::new(),
                json_output: ollama.ollama_json,
            });
        }

        let dialect = access.dialect();
        let oai = access.as_openai().ok_or_else(|| {
            Error::config(format!("Dialect {dialect} is not served by the OpenAI transport"))
        })?;

        let default_host = match dialect {
            Dialect::OpenAI => Some("https://api.openai.com"),
            Dialect::DeepSeek => Some("https://api.deepseek.com"),
            Dialect::Groq => Some("https://api.groq.com/openai"),
            Dialect::LmStudio => Some("http://localhost:1234"),
            Dialect::LocalAi => Some("http://127.0.0.1:8080"),
            Dialect::Mistral => Some("https://api.mistral.ai"),
            Dialect::OpenRouter => Some("https://openrouter.ai/api"),
            Dialect::Perplexity => Some("https://api.perplexity.ai"),
            Dialect::TogetherAi => Some("https://api.together.xyz"),
            _ => None,
        };
        let host = match (oai.oai_host.as_deref().filter(|h| !h.is_empty()), default_host) {
            (Some(host), _) | (None, Some(host)) => normalize_host(host),
            (None, None) => {
                return Err(Error::config(format!("Missing host for the {dialect} dialect")))
            }
        };

        let mut headers = Vec::new();
        let url = match dialect {
            Dialect::Azure => {
                headers.push(("api-key", oai.oai_key.clone()));
                format!(
                    "{host}/openai/deployments/{model_id}/chat/completions?api-version={AZURE_API_VERSION}"
                )
            }
            Dialect::Perplexity => format!("{host}/chat/completions"),
            _ => format!("{host}/v1/chat/completions"),
        };
        if dialect != Dialect::Azure && !oai.oai_key.is_empty() {
            headers.push(("Authorization", format!("Bearer {}", oai.oai_key)));
        }
        if let Some(org) = oai.oai_org.as_deref().filter(|o| !o.is_empty()) {
            headers.push(("OpenAI-Organization", org.to_string()));
        }
        if let Some(helicone) = oai.heli_key.as_deref().filter(|k| !k.is_empty()) {
            headers.push(("Helicone-Auth", format!("Bearer {helicone}")));
        }

        Ok(Endpoint {
            url,
            headers,
            json_output: false,
        })
    }

    fn post(&self, endpoint: &Endpoint) -> RequestBuilder {
        endpoint.headers.iter().fold(
            self.client
                .post(&endpoint.url)
                .header("Content-Type", "application/json"),
            |builder, (name, value)| builder.header(*name, value),
        )
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

async fn error_for_status(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED => Error::auth(message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
        _ => Error::provider("openai", format!("{status}: {message}")),
    }
}

#[async_trait::async_trait]
impl ParticleTransport for OpenAIChatTransport {
    async fn chat_generate(&self, request: DispatchRequest) -> Result<ParticleStream, Error> {
        let endpoint = Self::endpoint(&request.access, &request.model.id)?;
        let body = to_chat_completion_request(
            &request.model,
            &request.chat_generate,
            request.streaming,
            endpoint.json_output,
        )?;

        if request.debug_request_body() {
            let pretty = serde_json::to_string_pretty(&body)?;
            tracing::debug!(url = %endpoint.url, body = %pretty, "openai: dispatch request body");
        }

        let started = Instant::now();
        let response = self.post(&endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            let error = error_for_status(response).await;
            tracing::error!(%error, "openai: request rejected");
            return Err(error);
        }

        if !request.streaming {
            let completion: ChatCompletionResponse = response.json().await?;
            let particles = parse_chat_completion(completion, started.elapsed())?;
            return Ok(particle_stream(stream::iter(particles.into_iter().map(Ok))));
        }

        let mut parser = ChunkParser::starting_at(started);
        let particles = Box::pin(response.bytes_stream())
            .sse_frames()
            .take_while(|frame| future::ready(!matches!(frame, Ok(frame) if frame.is_done())))
            .map(move |frame| {
                let parsed = frame.and_then(|frame| parser.parse(&frame.data));
                let batch: Vec<_> = match parsed {
                    Ok(particles) => particles.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(batch)
            })
            .flatten();

        Ok(particle_stream(particles))
    }

    fn supports(&self, dialect: Dialect) -> bool {
        !matches!(dialect, Dialect::Anthropic | Dialect::Gemini)
    }
}
