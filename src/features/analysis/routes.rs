use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::analysis::handlers::{analyze_document, get_quota_status};
use crate::features::analysis::services::AnalysisService;
use crate::shared::constants::MULTIPART_OVERHEAD;

/// Create routes for the analysis feature
pub fn routes(analysis_service: Arc<AnalysisService>) -> Router {
    let body_limit = analysis_service.max_upload_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/api/analyze",
            post(analyze_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/analyze/quota", get(get_quota_status))
        .with_state(analysis_service)
}
