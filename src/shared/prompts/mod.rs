//! Prompt template management module.
//!
//! Templates use Jinja2 syntax. Built-in templates live in `templates/prompts/`
//! and are embedded at compile time.
//!
//! # Usage
//!
//! ```ignore
//! use crate::shared::prompts::{render_document_review_prompt, PromptEngine};
//!
//! let engine = PromptEngine::default();
//! let prompt = render_document_review_prompt(&engine, &schema, "Jane Doe, Rust engineer...")?;
//! ```

pub mod engine;

pub use engine::{PromptEngine, TemplateError};

use minijinja::Value;
use std::collections::HashMap;

/// Template used to ask the model for a document review
pub const DOCUMENT_REVIEW_TEMPLATE: &str = "analysis/document_review.jinja";

/// Render the document review prompt.
///
/// # Arguments
/// * `json_schema` - JSON schema string for the expected output
/// * `document` - Extracted document text
pub fn render_document_review_prompt(
    engine: &PromptEngine,
    json_schema: &str,
    document: &str,
) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("json_schema", Value::from(json_schema));
    ctx.insert("document", Value::from(document));

    engine.render(DOCUMENT_REVIEW_TEMPLATE, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_contains_document_and_schema() {
        let engine = PromptEngine::default();
        let prompt =
            render_document_review_prompt(&engine, "{\"type\":\"object\"}", "My resume text")
                .unwrap();

        assert!(prompt.contains("ONLY a valid JSON object"));
        assert!(prompt.contains("{\"type\":\"object\"}"));
        assert!(prompt.ends_with("My resume text"));
    }
}
