use async_trait::async_trait;
use thiserror::Error;

use crate::features::analysis::models::AnalysisResult;
use crate::shared::prompts::TemplateError;

/// Errors raised while asking the language model for a review
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0} environment variable is not set")]
    MissingCredential(String),

    #[error("Failed to build analysis prompt: {0}")]
    Prompt(#[from] TemplateError),

    #[error("Failed to reach analysis service: {0}")]
    Request(String),

    #[error("API Error: {0}")]
    Api(String),

    #[error("Analysis service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response from analysis service: {0}")]
    InvalidResponse(String),
}

/// Sends extracted document text to a language model and normalizes the reply
///
/// A reply that cannot be parsed is not an error: implementations return the
/// degraded [`AnalysisResult`] instead. Errors are reserved for failures to get
/// a reply at all.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalyzerError>;
}
