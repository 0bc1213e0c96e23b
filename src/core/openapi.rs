use utoipa::{Modify, OpenApi};

use crate::features::analysis::{dtos as analysis_dtos, handlers as analysis_handlers};
use crate::features::quota::dtos as quota_dtos;
use crate::shared::types::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Analysis
        analysis_handlers::analysis_handler::analyze_document,
        analysis_handlers::quota_handler::get_quota_status,
    ),
    components(
        schemas(
            // Shared
            ErrorResponse,
            // Analysis
            analysis_dtos::UploadDocumentDto,
            analysis_dtos::AnalyzeResponseDto,
            // Quota
            quota_dtos::QuotaStatusDto,
        )
    ),
    tags(
        (name = "analysis", description = "PDF document analysis"),
        (name = "quota", description = "Per-client usage quota"),
    ),
    info(
        title = "Document Review API",
        version = "0.1.0",
        description = "AI-assisted review of uploaded PDF documents",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
