use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::services::export_service::ExportService;
use crate::{error::Result, AppState};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Finalized attempts of one assessment as XLSX, best score first.
#[axum::debug_handler]
pub async fn export_results(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let assessment = state.assessment_service.get_managed(id, &user).await?;
    let attempts = state.report_service.finalized_attempts(assessment.id).await?;

    let buffer = ExportService::generate_results_xlsx(&assessment, &attempts)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        ExportService::results_filename(&assessment)
    );
    tracing::info!(assessment_id = %assessment.id, rows = attempts.len(), "Exported assessment results");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
