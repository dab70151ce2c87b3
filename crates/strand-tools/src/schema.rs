//! Argument validation against a tool's declared parameter schema.
//!
//! Arguments are checked at dispatch time so a bad call yields a typed
//! `invalid_arguments` error instead of a runtime failure deep inside the
//! handler. The supported schema subset is `type: object` with per-property
//! `type` fragments and a `required` list.

use serde_json::{Map, Value};

use strand_core::tools::ParameterSchema;

use crate::errors::ToolError;

/// Validate `arguments` against `schema`.
///
/// Checks that every `required` property is present and that each provided
/// property matches its declared `type` (when the fragment declares one).
/// Properties not named in the schema are allowed, matching JSON Schema's
/// default `additionalProperties` behavior.
pub fn validate_arguments(
    arguments: &Map<String, Value>,
    schema: &ParameterSchema,
) -> Result<(), ToolError> {
    for name in &schema.required {
        if !arguments.contains_key(name) {
            return Err(ToolError::InvalidArguments(format!(
                "missing required property `{name}`"
            )));
        }
    }

    for (name, value) in arguments {
        let Some(fragment) = schema.properties.get(name) else {
            continue;
        };
        let Some(expected) = fragment.get("type").and_then(Value::as_str) else {
            continue;
        };
        if !type_matches(value, expected) {
            return Err(ToolError::InvalidArguments(format!(
                "property `{name}` expected type `{expected}`, got `{}`",
                type_name(value)
            )));
        }
    }

    Ok(())
}

/// Whether a JSON value satisfies a JSON-schema primitive type name.
fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type names don't fail the call.
        _ => true,
    }
}

/// JSON type name for error messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
