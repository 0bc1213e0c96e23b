#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use chrono::{DateTime, Utc};

#[cfg(test)]
use crate::features::analysis::clients::{AnalyzerError, DocumentAnalyzer};
#[cfg(test)]
use crate::features::analysis::models::AnalysisResult;
#[cfg(test)]
use crate::modules::extraction::{ExtractionError, TextExtractor};
#[cfg(test)]
use crate::shared::clock::Clock;

/// Clock that only moves when told to
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Extractor returning canned text, recording whether the staged file existed
#[cfg(test)]
pub struct StubExtractor {
    outcome: Result<String, String>,
    saw_staged_file: Mutex<Vec<bool>>,
}

#[cfg(test)]
#[allow(dead_code)]
impl StubExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            saw_staged_file: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            saw_staged_file: Mutex::new(Vec::new()),
        }
    }

    /// One entry per call: whether the file was on disk when extraction ran
    pub fn observed_files(&self) -> Vec<bool> {
        self.saw_staged_file.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl TextExtractor for StubExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        self.saw_staged_file.lock().unwrap().push(path.is_file());

        self.outcome
            .clone()
            .map_err(|message| ExtractionError::Failed {
                path: path.display().to_string(),
                message,
            })
    }
}

/// Analyzer returning a canned result or error, optionally after a delay
#[cfg(test)]
pub struct StubAnalyzer {
    outcome: Result<AnalysisResult, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

#[cfg(test)]
#[allow(dead_code)]
impl StubAnalyzer {
    pub fn returning(result: AnalysisResult) -> Self {
        Self {
            outcome: Ok(result),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentAnalyzer for StubAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<AnalysisResult, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.outcome.clone().map_err(AnalyzerError::Api)
    }
}

/// A well-formed review used by tests that only care about the happy path
#[cfg(test)]
pub fn sample_result() -> AnalysisResult {
    AnalysisResult::new(
        85.0,
        "Clear and well structured",
        vec!["Fix typo in the second paragraph".to_string()],
    )
}

/// An `AnalysisService` wired to stubs, a manual clock and a throwaway staging dir
#[cfg(test)]
pub struct TestPipeline {
    pub service: std::sync::Arc<crate::features::analysis::AnalysisService>,
    pub extractor: std::sync::Arc<StubExtractor>,
    pub analyzer: std::sync::Arc<StubAnalyzer>,
    pub clock: std::sync::Arc<ManualClock>,
    staging_dir: tempfile::TempDir,
}

#[cfg(test)]
#[allow(dead_code)]
impl TestPipeline {
    pub const MAX_UPLOAD_SIZE: usize = 1024 * 1024;

    pub fn new(extractor: StubExtractor, analyzer: StubAnalyzer) -> Self {
        Self::build(extractor, analyzer, None)
    }

    pub fn with_timeout(extractor: StubExtractor, analyzer: StubAnalyzer, timeout: Duration) -> Self {
        Self::build(extractor, analyzer, Some(timeout))
    }

    fn build(extractor: StubExtractor, analyzer: StubAnalyzer, timeout: Option<Duration>) -> Self {
        use crate::core::config::QuotaConfig;
        use crate::features::analysis::AnalysisService;
        use crate::features::quota::QuotaService;
        use crate::modules::staging::StagingArea;
        use std::sync::Arc;

        let staging_dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let quota_config = QuotaConfig {
            limit: 3,
            window_secs: 24 * 60 * 60,
            max_tracked_clients: 1000,
            sweep_interval_secs: 3600,
        };
        let quota_service = Arc::new(QuotaService::new(&quota_config, clock.clone()));

        let extractor = Arc::new(extractor);
        let analyzer = Arc::new(analyzer);
        let extractor_dyn: Arc<dyn TextExtractor> = extractor.clone();
        let analyzer_dyn: Arc<dyn DocumentAnalyzer> = analyzer.clone();

        let service = Arc::new(AnalysisService::new(
            quota_service,
            StagingArea::new(staging_dir.path()),
            extractor_dyn,
            analyzer_dyn,
            Self::MAX_UPLOAD_SIZE,
            timeout,
        ));

        Self {
            service,
            extractor,
            analyzer,
            clock,
            staging_dir,
        }
    }

    /// Files currently left in the staging directory
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path()).unwrap().count()
    }
}
