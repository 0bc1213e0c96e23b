mod document_analyzer;
mod gemini_client;

pub use document_analyzer::{AnalyzerError, DocumentAnalyzer};
pub use gemini_client::GeminiClient;
