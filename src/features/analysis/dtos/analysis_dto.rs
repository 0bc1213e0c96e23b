use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::analysis::models::AnalysisResult;

/// Upload document request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadDocumentDto {
    /// The PDF document to analyze
    #[schema(format = Binary, content_media_type = "application/pdf")]
    pub file: String,
}

/// Response DTO for a completed analysis
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponseDto {
    /// Quality score between 0 and 100
    #[schema(example = 85)]
    pub score: f64,
    /// Short overall assessment
    pub summary: String,
    /// Actionable improvements, most important first
    pub suggestions: Vec<String>,
    /// Attempts left in the caller's current window
    pub remaining: u32,
}

impl AnalyzeResponseDto {
    pub fn new(result: AnalysisResult, remaining: u32) -> Self {
        Self {
            score: result.score,
            summary: result.summary,
            suggestions: result.suggestions,
            remaining,
        }
    }
}

/// A document read from the multipart body, held in memory until staged
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Uploads are accepted when their declared type mentions PDF
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("pdf")
}
