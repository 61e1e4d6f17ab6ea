//! Model descriptors and vendor-specific pre-flight adjustments.

use serde::{Deserialize, Serialize};

use crate::metrics::ChatPricing;
use crate::types::{ChatGenerateRequest, ChatMessage, ModelConfig, SystemPart, UserPart};
use crate::Error;

/// Capability flags of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelInterface {
    Chat,
    FunctionCalling,
    Vision,
    Json,
    Reasoning,
    /// Silently rejects streaming, system instructions and tools.
    NoStreamingNoSystem,
}

/// User-tunable options stored with a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOptions {
    /// Vendor model reference sent on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_tokens: Option<u32>,
}

/// A concrete model known to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub label: String,
    pub vendor_id: String,
    pub service_id: String,
    #[serde(default)]
    pub interfaces: Vec<ModelInterface>,
    #[serde(default)]
    pub options: ModelOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ChatPricing>,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        vendor_id: impl Into<String>,
        service_id: impl Into<String>,
        model_ref: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            vendor_id: vendor_id.into(),
            service_id: service_id.into(),
            interfaces: vec![ModelInterface::Chat],
            options: ModelOptions {
                model_ref: Some(model_ref.into()),
                ..Default::default()
            },
            pricing: None,
        }
    }

    pub fn with_interface(mut self, interface: ModelInterface) -> Self {
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        self
    }

    pub fn with_pricing(mut self, pricing: ChatPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn supports(&self, interface: ModelInterface) -> bool {
        self.interfaces.contains(&interface)
    }

    /// Build the wire model configuration from the stored options.
    pub fn model_config(&self) -> Result<ModelConfig, Error> {
        let model_ref = self
            .options
            .model_ref
            .as_ref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "Error in configuration for model {}: missing model reference",
                    self.id
                ))
            })?;

        let config = ModelConfig {
            id: model_ref.clone(),
            temperature: self.options.temperature,
            max_tokens: self.options.response_tokens,
        };
        config
            .validate()
            .map_err(|e| Error::config(format!("Error in configuration for model {}: {e}", self.id)))?;
        Ok(config)
    }
}

/// Adjust a request for models with known wire limitations.
///
/// Returns the effective streaming flag. Only explicitly flagged models are
/// touched.
pub fn apply_preflight_hotfixes(
    model: &ModelDescriptor,
    request: &mut ChatGenerateRequest,
    streaming: bool,
) -> bool {
    if !model.supports(ModelInterface::NoStreamingNoSystem) {
        return streaming;
    }

    tracing::debug!(model = %model.id, "applying no-streaming/no-system hot-fix");

    if let Some(system) = request.system_message.take() {
        let system_parts = system
            .parts
            .into_iter()
            .map(|SystemPart::Text(part)| UserPart::Text(part));

        match request.chat_sequence.first_mut() {
            Some(ChatMessage::User { parts }) => {
                let mut merged: Vec<UserPart> = system_parts.collect();
                merged.append(parts);
                *parts = merged;
            }
            _ => request.chat_sequence.insert(
                0,
                ChatMessage::User {
                    parts: system_parts.collect(),
                },
            ),
        }
    }

    request.tools = None;
    request.tools_policy = None;
    false
}
