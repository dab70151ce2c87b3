//! Tool catalogue entries sent to the model provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-schema subset describing a tool's input parameters.
///
/// Only `type: object` with `properties` and `required` is supported —
/// enough for every provider wire format this system targets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Always `"object"` for tool parameters.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property name → schema fragment (e.g. `{"type": "string"}`).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// Property names that must be present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// Schema for a tool that takes no arguments.
    pub fn empty() -> Self {
        Self {
            schema_type: "object".into(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Schema with the given properties, all required.
    pub fn object(properties: Map<String, Value>, required: Vec<String>) -> Self {
        Self {
            schema_type: "object".into(),
            properties,
            required,
        }
    }
}

/// One catalogue entry: name, description, parameter schema.
///
/// The catalogue is constant for a session, so it is built once at startup
/// and included in every model gateway call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Globally unique tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// Input parameter schema.
    pub parameters: ParameterSchema,
}
