use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde_json::{Map, Value};

/// Trait for LLM response types that support fallback behavior
///
/// Implementors build themselves from whatever JSON object the model produced,
/// validating each field on its own, and know how to produce a degraded value
/// when no object could be recovered at all.
pub trait LlmResponse: JsonSchema + Sized {
    /// Build a value from a parsed JSON object, defaulting invalid fields
    fn from_json_object(object: &Map<String, Value>) -> Self;

    /// Value returned when the reply could not be parsed as a JSON object
    fn fallback(error_message: &str) -> Self;

    /// Check if this response was successfully parsed
    fn is_success(&self) -> bool;

    /// Generate JSON schema string for use in LLM prompts
    fn json_schema_string() -> String {
        let mut gen = SchemaGenerator::default();
        let schema = gen.root_schema_for::<Self>();
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
    }
}
