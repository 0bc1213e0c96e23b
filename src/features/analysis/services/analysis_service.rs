use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::error::{AppError, Result};
use crate::core::extractor::ClientIdentity;
use crate::features::analysis::clients::DocumentAnalyzer;
use crate::features::analysis::dtos::{AnalyzeResponseDto, UploadedDocument};
use crate::features::analysis::models::AnalysisResult;
use crate::features::quota::dtos::QuotaStatusDto;
use crate::features::quota::models::QuotaDecision;
use crate::features::quota::QuotaService;
use crate::modules::extraction::TextExtractor;
use crate::modules::staging::StagingArea;

/// Returned when the document yields no usable text
pub const EMPTY_TEXT_MESSAGE: &str = "Could not extract text from PDF";

/// Returned when the whole pipeline overruns its time budget
pub const TIMEOUT_MESSAGE: &str = "Analysis took too long. Please try again.";

/// Human readable length of a quota window
fn describe_window(window: chrono::Duration) -> String {
    let secs = window.num_seconds();
    match secs {
        86_400 => "day".to_string(),
        s if s % 3600 == 0 => format!("{} hours", s / 3600),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}

fn quota_exceeded_message(limit: u32, window: chrono::Duration, reset: DateTime<Utc>) -> String {
    format!(
        "You've reached the limit of {} analyses per {}. Please try again after {}",
        limit,
        describe_window(window),
        reset.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Runs one upload through quota, staging, extraction and analysis
///
/// The staged copy of the upload is owned by a guard for the whole pipeline,
/// so it is gone by the time a response (or error) leaves this service.
pub struct AnalysisService {
    quota_service: Arc<QuotaService>,
    staging: StagingArea,
    extractor: Arc<dyn TextExtractor>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    max_upload_size: usize,
    processing_timeout: Option<Duration>,
}

impl AnalysisService {
    pub fn new(
        quota_service: Arc<QuotaService>,
        staging: StagingArea,
        extractor: Arc<dyn TextExtractor>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        max_upload_size: usize,
        processing_timeout: Option<Duration>,
    ) -> Self {
        Self {
            quota_service,
            staging,
            extractor,
            analyzer,
            max_upload_size,
            processing_timeout,
        }
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// Charge one attempt to `client`, or fail with a quota error
    pub fn admit(&self, client: &ClientIdentity) -> Result<QuotaDecision> {
        let decision = self.quota_service.check(client.as_str());

        if !decision.allowed {
            tracing::info!("Quota exceeded for client {}", client);

            let retry_after_secs = (decision.reset_time - self.quota_service.now())
                .num_seconds()
                .max(1) as u64;

            return Err(AppError::QuotaExceeded {
                message: quota_exceeded_message(
                    self.quota_service.limit(),
                    self.quota_service.window(),
                    decision.reset_time,
                ),
                retry_after_secs,
            });
        }

        tracing::debug!(
            "Admitted client {} ({} attempts remaining)",
            client,
            decision.remaining
        );

        Ok(decision)
    }

    /// Current quota for `client`, without consuming an attempt
    pub fn quota_status(&self, client: &ClientIdentity) -> QuotaStatusDto {
        let decision = self.quota_service.status(client.as_str());
        QuotaStatusDto::from_decision(decision, self.quota_service.limit())
    }

    /// Analyze an already admitted and validated upload
    pub async fn analyze_upload(
        &self,
        upload: UploadedDocument,
        admission: QuotaDecision,
    ) -> Result<AnalyzeResponseDto> {
        tracing::info!(
            "Analyzing '{}' ({} bytes, {})",
            upload.file_name,
            upload.bytes.len(),
            upload.content_type
        );

        let result = match self.processing_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_pipeline(&upload))
                .await
                .map_err(|_| {
                    tracing::warn!(
                        "Analysis of '{}' exceeded {}s, abandoning",
                        upload.file_name,
                        limit.as_secs_f64()
                    );
                    AppError::Timeout(TIMEOUT_MESSAGE.to_string())
                })??,
            None => self.run_pipeline(&upload).await?,
        };

        tracing::info!(
            "Analysis of '{}' finished with score {}",
            upload.file_name,
            result.score
        );

        Ok(AnalyzeResponseDto::new(result, admission.remaining))
    }

    async fn run_pipeline(&self, upload: &UploadedDocument) -> Result<AnalysisResult> {
        let artifact = self.staging.stage(&upload.bytes).await?;

        let outcome = self.extract_and_analyze(artifact.path()).await;
        artifact.release().await;

        outcome
    }

    async fn extract_and_analyze(&self, path: &Path) -> Result<AnalysisResult> {
        let text = self.extract_text(path).await?;

        if text.trim().is_empty() {
            tracing::info!("No text extracted from {}", path.display());
            return Err(AppError::BadRequest(EMPTY_TEXT_MESSAGE.to_string()));
        }

        tracing::debug!("Extracted {} characters, requesting analysis", text.len());

        let result = self.analyzer.analyze(&text).await?;
        Ok(result)
    }

    /// PDF parsing is CPU bound, so it runs on the blocking pool
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();

        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&path))
            .await
            .map_err(|e| AppError::Internal(format!("Text extraction task failed: {}", e)))??;

        Ok(text)
    }
}
