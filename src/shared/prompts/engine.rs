//! Template engine for prompt management using Jinja2 syntax.
//!
//! Built-in templates are compiled into the binary. A directory of `.jinja`
//! files can be layered on top to tune prompts without a rebuild; a file with
//! the same relative name replaces the built-in template.

use minijinja::{Environment, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Templates shipped with the binary, keyed by their path under `templates/prompts/`
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[(
    "analysis/document_review.jinja",
    include_str!("../../../templates/prompts/analysis/document_review.jinja"),
)];

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

/// Owns the template environment used to build model prompts
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Build the engine from the built-in templates plus an optional override directory
    pub fn new(override_dir: Option<&Path>) -> Self {
        let mut env = Environment::new();

        for &(name, source) in BUILTIN_TEMPLATES {
            if let Err(e) = env.add_template(name, source) {
                tracing::warn!("Failed to load built-in template {}: {}", name, e);
            }
        }

        if let Some(dir) = override_dir {
            if dir.exists() {
                load_templates_recursive(&mut env, dir, dir);
            } else {
                tracing::warn!(
                    "Prompt template directory {} does not exist, using built-in templates",
                    dir.display()
                );
            }
        }

        Self { env }
    }

    /// Render a template with the given context.
    ///
    /// # Arguments
    /// * `template_name` - The template path relative to `templates/prompts/` (e.g., "analysis/document_review.jinja")
    /// * `ctx` - A HashMap of variable names to values
    pub fn render(
        &self,
        template_name: &str,
        ctx: &HashMap<&str, Value>,
    ) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(template_name)
            .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

        let render_ctx = Value::from_iter(ctx.iter().map(|(k, v)| (*k, v.clone())));

        template
            .render(render_ctx)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }

    /// Check if a template exists
    pub fn template_exists(&self, template_name: &str) -> bool {
        self.env.get_template(template_name).is_ok()
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Recursively load all .jinja templates from a directory
fn load_templates_recursive(env: &mut Environment<'static>, base_path: &Path, current_path: &Path) {
    if let Ok(entries) = std::fs::read_dir(current_path) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_templates_recursive(env, base_path, &path);
            } else if path.extension().is_some_and(|ext| ext == "jinja") {
                // Create template name from relative path
                if let Ok(relative) = path.strip_prefix(base_path) {
                    let template_name = relative.to_string_lossy().replace('\\', "/");
                    if let Ok(content) = std::fs::read_to_string(&path) {
                        // Templates live for the whole process
                        let static_name: &'static str =
                            Box::leak(template_name.clone().into_boxed_str());
                        let static_content: &'static str = Box::leak(content.into_boxed_str());
                        if let Err(e) = env.add_template(static_name, static_content) {
                            tracing::warn!("Failed to load template {}: {}", template_name, e);
                        } else {
                            tracing::debug!("Loaded template override: {}", template_name);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_template_exists() {
        let engine = PromptEngine::default();
        assert!(engine.template_exists("analysis/document_review.jinja"));
        assert!(!engine.template_exists("definitely_not_a_real_template.jinja"));
    }

    #[test]
    fn test_render_missing_template() {
        let engine = PromptEngine::default();
        let result = engine.render("nonexistent.jinja", &HashMap::new());
        assert!(matches!(result, Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_override_directory_replaces_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("analysis")).unwrap();
        std::fs::write(
            dir.path().join("analysis/document_review.jinja"),
            "Review: {{ document }}",
        )
        .unwrap();

        let engine = PromptEngine::new(Some(dir.path()));
        let mut ctx = HashMap::new();
        ctx.insert("document", Value::from("hello"));

        let rendered = engine
            .render("analysis/document_review.jinja", &ctx)
            .unwrap();
        assert_eq!(rendered, "Review: hello");
    }

    #[test]
    fn test_missing_override_directory_keeps_builtins() {
        let engine = PromptEngine::new(Some(Path::new("/definitely/not/here")));
        assert!(engine.template_exists("analysis/document_review.jinja"));
    }
}
