//! Tool definitions and the policy controlling their use.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parts::CodeExecutionVariant;
use crate::Error;

static FUNCTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid function name regex"));

/// Allowed data types of a parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// The subset of an OpenAPI 3.0.3 Schema Object used for function parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// float, double for numbers; int32, int64 for integers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
}

impl OpenApiSchema {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            description: None,
            nullable: None,
            enum_values: None,
            format: None,
            properties: None,
            required: None,
            items: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Parameters of a function, as an object schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionInputSchema {
    pub properties: BTreeMap<String, OpenApiSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl FunctionInputSchema {
    /// Render as a JSON Schema object, the form most vendors accept.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": self.properties,
        });
        if let Some(required) = &self.required {
            schema["required"] = serde_json::json!(required);
        }
        schema
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallDefinition {
    /// Up to 64 letters, digits, underscores or hyphens.
    pub name: String,
    /// What the tool does, when to use it, and what each parameter means.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<FunctionInputSchema>,
}

/// A tool available to the model, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    FunctionCall { function_call: FunctionCallDefinition },
    CodeExecution { variant: CodeExecutionVariant },
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Option<FunctionInputSchema>,
    ) -> Self {
        Tool::FunctionCall {
            function_call: FunctionCallDefinition {
                name: name.into(),
                description: description.into(),
                input_schema,
            },
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Tool::FunctionCall { function_call } => validate_function_name(&function_call.name),
            Tool::CodeExecution { .. } => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}

/// Whether, and which, tool the model must invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolsPolicy {
    /// The model decides (same as no policy).
    Auto,
    /// At least one tool must be used.
    Any,
    /// The named function must be used.
    FunctionCall { function_call: FunctionName },
}

impl ToolsPolicy {
    pub fn function(name: impl Into<String>) -> Self {
        ToolsPolicy::FunctionCall {
            function_call: FunctionName { name: name.into() },
        }
    }
}

pub(crate) fn validate_function_name(name: &str) -> Result<(), Error> {
    if FUNCTION_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "function_call.name '{name}': must be 1-64 characters long and contain only letters, numbers, underscores, and hyphens"
        )))
    }
}
