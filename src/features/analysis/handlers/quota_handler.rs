use axum::{extract::State, Json};
use std::sync::Arc;

use crate::core::extractor::ClientIdentity;
use crate::features::analysis::services::AnalysisService;
use crate::features::quota::dtos::QuotaStatusDto;

/// Get the caller's quota
///
/// Reports remaining attempts and the reset time without consuming an attempt.
#[utoipa::path(
    get,
    path = "/api/analyze/quota",
    tag = "quota",
    params(
        ("x-forwarded-for" = Option<String>, Header, description = "Client address; the first entry identifies the caller")
    ),
    responses(
        (status = 200, description = "Current quota for the caller", body = QuotaStatusDto)
    )
)]
pub async fn get_quota_status(
    client: ClientIdentity,
    State(service): State<Arc<AnalysisService>>,
) -> Json<QuotaStatusDto> {
    Json(service.quota_status(&client))
}
