use std::path::Path;

use thiserror::Error;

/// Errors that can occur while extracting text from a document
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to extract text from {path}: {message}")]
    Failed { path: String, message: String },

    #[error("Text extractor crashed on {0}")]
    Panicked(String),
}

/// Turns a document on disk into plain text
///
/// Implementations are synchronous and may be CPU heavy; callers run them on
/// the blocking thread pool.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extracts text from PDF files using the `pdf-extract` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let path_label = path.display().to_string();

        // pdf-extract panics on some malformed inputs instead of returning an error
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text(path)
        }));

        match result {
            Ok(Ok(text)) => {
                tracing::debug!("Extracted {} characters from {}", text.len(), path_label);
                Ok(text)
            }
            Ok(Err(e)) => Err(ExtractionError::Failed {
                path: path_label,
                message: e.to_string(),
            }),
            Err(_) => {
                tracing::warn!("PDF extraction panicked on {}", path_label);
                Err(ExtractionError::Panicked(path_label))
            }
        }
    }
}
