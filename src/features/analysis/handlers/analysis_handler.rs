use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::core::extractor::ClientIdentity;
use crate::features::analysis::dtos::{
    is_pdf_content_type, AnalyzeResponseDto, UploadDocumentDto, UploadedDocument,
};
use crate::features::analysis::services::AnalysisService;
use crate::shared::constants::UPLOAD_FIELD_NAME;
use crate::shared::types::ErrorResponse;

const NO_FILE_MESSAGE: &str = "No file uploaded";
const NOT_PDF_MESSAGE: &str = "File must be a PDF";
const MULTIPLE_FILES_MESSAGE: &str = "Only one file can be analyzed per request";

/// Analyze a PDF document
///
/// Accepts multipart/form-data with a single `file` field holding a PDF. Each
/// call counts against the caller's quota once admitted, whatever its outcome.
#[utoipa::path(
    post,
    path = "/api/analyze",
    tag = "analysis",
    params(
        ("x-forwarded-for" = Option<String>, Header, description = "Client address; the first entry identifies the caller")
    ),
    request_body(
        content = UploadDocumentDto,
        content_type = "multipart/form-data",
        description = "The PDF document to analyze",
    ),
    responses(
        (status = 200, description = "Document analyzed", body = AnalyzeResponseDto),
        (status = 400, description = "Missing, invalid or unreadable document", body = ErrorResponse),
        (status = 429, description = "Quota exhausted for this client", body = ErrorResponse),
        (status = 500, description = "Processing or analysis service failure", body = ErrorResponse)
    )
)]
pub async fn analyze_document(
    client: ClientIdentity,
    State(service): State<Arc<AnalysisService>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponseDto>> {
    let admission = service.admit(&client)?;

    let upload = read_upload(multipart, service.max_upload_size()).await?;

    let response = service.analyze_upload(upload, admission).await?;

    Ok(Json(response))
}

/// Pull the single document out of the multipart body and validate it
async fn read_upload(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    max_upload_size: usize,
) -> Result<UploadedDocument> {
    // A body that is not multipart at all carries no file
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Request body is not multipart: {}", rejection);
        AppError::BadRequest(NO_FILE_MESSAGE.to_string())
    })?;

    let mut upload: Option<UploadedDocument> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name != UPLOAD_FIELD_NAME {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        if upload.is_some() {
            return Err(AppError::BadRequest(MULTIPLE_FILES_MESSAGE.to_string()));
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_default();

        if !is_pdf_content_type(&content_type) {
            debug!("Rejecting upload with content type '{}'", content_type);
            return Err(AppError::BadRequest(NOT_PDF_MESSAGE.to_string()));
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".to_string());

        let bytes = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        if bytes.len() > max_upload_size {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {} MB",
                max_upload_size / 1024 / 1024
            )));
        }

        upload = Some(UploadedDocument {
            file_name,
            content_type,
            bytes,
        });
    }

    upload.ok_or_else(|| AppError::BadRequest(NO_FILE_MESSAGE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::analysis::models::{AnalysisResult, DEGRADED_SUMMARY};
    use crate::features::analysis::routes;
    use crate::shared::test_helpers::{sample_result, StubAnalyzer, StubExtractor, TestPipeline};
    use axum::http::{header, HeaderName, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server(pipeline: &TestPipeline) -> TestServer {
        TestServer::new(routes(Arc::clone(&pipeline.service))).unwrap()
    }

    fn happy_pipeline() -> TestPipeline {
        TestPipeline::new(
            StubExtractor::returning("Jane Doe\nSenior Rust Engineer"),
            StubAnalyzer::returning(sample_result()),
        )
    }

    fn pdf_form() -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(b"%PDF-1.4 fake".as_slice())
                .file_name("resume.pdf")
                .mime_type("application/pdf"),
        )
    }

    fn forwarded_for() -> HeaderName {
        HeaderName::from_static("x-forwarded-for")
    }

    fn from(ip: &'static str) -> HeaderValue {
        HeaderValue::from_static(ip)
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let response = server
            .post("/api/analyze")
            .add_header(forwarded_for(), from("203.0.113.7"))
            .multipart(pdf_form())
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["score"], 85.0);
        assert_eq!(body["summary"], "Clear and well structured");
        assert_eq!(body["suggestions"], json!(["Fix typo in the second paragraph"]));
        assert_eq!(body["remaining"], 2);

        assert_eq!(pipeline.extractor.observed_files(), vec![true]);
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_degraded_result_is_returned_with_200() {
        let pipeline = TestPipeline::new(
            StubExtractor::returning("text"),
            StubAnalyzer::returning(AnalysisResult::degraded()),
        );
        let server = server(&pipeline);

        let response = server.post("/api/analyze").multipart(pdf_form()).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["score"], 0.0);
        assert_eq!(body["summary"], DEGRADED_SUMMARY);
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let form = MultipartForm::new().add_text("note", "please review");
        let response = server.post("/api/analyze").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No file uploaded" }));
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_non_multipart_body_counts_as_missing_file() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let response = server
            .post("/api/analyze")
            .json(&json!({ "file": "resume.pdf" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No file uploaded" }));
    }

    #[tokio::test]
    async fn test_wrong_content_type() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"\x89PNG".as_slice())
                .file_name("photo.png")
                .mime_type("image/png"),
        );
        let response = server.post("/api/analyze").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "File must be a PDF" }));
        assert_eq!(pipeline.extractor.observed_files().len(), 0);
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_multiple_files_rejected() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let form = pdf_form().add_part(
            "file",
            Part::bytes(b"%PDF-1.4 second".as_slice())
                .file_name("cover.pdf")
                .mime_type("application/pdf"),
        );
        let response = server.post("/api/analyze").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": MULTIPLE_FILES_MESSAGE }));
        assert_eq!(pipeline.analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let oversized = vec![b'a'; TestPipeline::MAX_UPLOAD_SIZE + 1];
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(oversized)
                .file_name("huge.pdf")
                .mime_type("application/pdf"),
        );
        let response = server.post("/api/analyze").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("File too large"));
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_is_bad_request() {
        let pipeline = TestPipeline::new(
            StubExtractor::returning("   "),
            StubAnalyzer::returning(sample_result()),
        );
        let server = server(&pipeline);

        let response = server.post("/api/analyze").multipart(pdf_form()).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Could not extract text from PDF" }));
        assert_eq!(pipeline.analyzer.calls(), 0);
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_generic_500() {
        let pipeline = TestPipeline::new(
            StubExtractor::failing("invalid xref"),
            StubAnalyzer::returning(sample_result()),
        );
        let server = server(&pipeline);

        let response = server.post("/api/analyze").multipart(pdf_form()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Error processing PDF file" }));
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_analyzer_failure_is_500_with_message() {
        let pipeline = TestPipeline::new(
            StubExtractor::returning("text"),
            StubAnalyzer::failing("API key not valid"),
        );
        let server = server(&pipeline);

        let response = server.post("/api/analyze").multipart(pdf_form()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "API Error: API key not valid" }));
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_500_and_cleans_up() {
        let pipeline = TestPipeline::with_timeout(
            StubExtractor::returning("text"),
            StubAnalyzer::returning(sample_result())
                .with_delay(std::time::Duration::from_secs(5)),
            std::time::Duration::from_millis(50),
        );
        let server = server(&pipeline);

        let response = server.post("/api/analyze").multipart(pdf_form()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_fourth_request_is_rate_limited() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        for expected_remaining in [2, 1, 0] {
            let response = server
                .post("/api/analyze")
                .add_header(forwarded_for(), from("198.51.100.1"))
                .multipart(pdf_form())
                .await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["remaining"], expected_remaining);
        }

        let response = server
            .post("/api/analyze")
            .add_header(forwarded_for(), from("198.51.100.1"))
            .multipart(pdf_form())
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: Value = response.json();
        assert_eq!(body["remaining"], 0);
        assert!(body["error"].as_str().unwrap().contains("try again after"));
        let retry_after: u64 = response
            .header(header::RETRY_AFTER)
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(retry_after, 24 * 60 * 60);

        assert_eq!(pipeline.analyzer.calls(), 3);
        assert_eq!(pipeline.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_quota_is_charged_for_rejected_input() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let form = MultipartForm::new().add_text("note", "no file here");
        server
            .post("/api/analyze")
            .add_header(forwarded_for(), from("192.0.2.10"))
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let status: Value = server
            .get("/api/analyze/quota")
            .add_header(forwarded_for(), from("192.0.2.10"))
            .await
            .json();
        assert_eq!(status["remaining"], 2);
    }

    #[tokio::test]
    async fn test_identities_are_tracked_separately() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        for _ in 0..3 {
            server
                .post("/api/analyze")
                .add_header(forwarded_for(), from("203.0.113.1, 10.0.0.1"))
                .multipart(pdf_form())
                .await
                .assert_status_ok();
        }

        // Same first hop behind a different proxy chain is the same client
        server
            .post("/api/analyze")
            .add_header(forwarded_for(), from("203.0.113.1, 10.9.9.9"))
            .multipart(pdf_form())
            .await
            .assert_status(StatusCode::TOO_MANY_REQUESTS);

        let response = server
            .post("/api/analyze")
            .add_header(forwarded_for(), from("203.0.113.2"))
            .multipart(pdf_form())
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["remaining"], 2);
    }

    #[tokio::test]
    async fn test_quota_window_resets() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        for _ in 0..3 {
            server
                .post("/api/analyze")
                .multipart(pdf_form())
                .await
                .assert_status_ok();
        }
        server
            .post("/api/analyze")
            .multipart(pdf_form())
            .await
            .assert_status(StatusCode::TOO_MANY_REQUESTS);

        pipeline.clock.advance(chrono::Duration::hours(24) + chrono::Duration::seconds(1));

        let response = server.post("/api/analyze").multipart(pdf_form()).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["remaining"], 2);
    }

    #[tokio::test]
    async fn test_quota_status_endpoint() {
        let pipeline = happy_pipeline();
        let server = server(&pipeline);

        let fresh: Value = server.get("/api/analyze/quota").await.json();
        assert_eq!(fresh["remaining"], 3);
        assert_eq!(fresh["limit"], 3);
        assert_eq!(fresh["can_analyze"], true);

        server
            .post("/api/analyze")
            .multipart(pdf_form())
            .await
            .assert_status_ok();

        let after: Value = server.get("/api/analyze/quota").await.json();
        assert_eq!(after["remaining"], 2);

        // Reading the status never consumes an attempt
        let again: Value = server.get("/api/analyze/quota").await.json();
        assert_eq!(again["remaining"], 2);
    }
}
