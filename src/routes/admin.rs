use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        assessment_dto::{AssessmentListQuery, CreateAssessmentPayload, UpdateAssessmentPayload},
        attempt_dto::SubmissionView,
        report_dto::AttemptListQuery,
        ApiResponse,
    },
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

#[axum::debug_handler]
pub async fn create_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateAssessmentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let detail = state.assessment_service.create(&user.id, payload).await?;
    tracing::info!(assessment_id = %detail.assessment.id, admin = %user.id, "Assessment created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(detail, "Assessment created")),
    ))
}

#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AssessmentListQuery>,
) -> Result<impl IntoResponse> {
    let list = state.assessment_service.list_for_admin(&user, query).await?;
    Ok(Json(ApiResponse::ok(list)))
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.assessment_service.get_managed(id, &user).await?;
    let detail = state.assessment_service.get_detail(id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

#[axum::debug_handler]
pub async fn update_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssessmentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let detail = state.assessment_service.update(id, &user, payload).await?;
    Ok(Json(ApiResponse::with_message(detail, "Assessment updated")))
}

#[axum::debug_handler]
pub async fn delete_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.assessment_service.delete(id, &user).await?;
    tracing::info!(assessment_id = %id, admin = %user.id, "Assessment deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<AttemptListQuery>,
) -> Result<impl IntoResponse> {
    let assessment = state.assessment_service.get_managed(id, &user).await?;
    let list = state.report_service.list_attempts(assessment.id, query).await?;
    Ok(Json(ApiResponse::ok(list)))
}

#[axum::debug_handler]
pub async fn analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let assessment = state.assessment_service.get_managed(id, &user).await?;
    let report = state.report_service.analytics(&assessment).await?;
    Ok(Json(ApiResponse::ok(report)))
}

#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get(id).await?;
    let assessment = state
        .assessment_service
        .get_managed(attempt.assessment_id, &user)
        .await?;
    let breakdown = state.report_service.breakdown(&attempt, &assessment).await?;
    Ok(Json(ApiResponse::ok(breakdown)))
}

#[axum::debug_handler]
pub async fn get_submission(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submission = state.submission_service.get(id).await?;
    let attempt = state.attempt_service.get(submission.attempt_id).await?;
    state
        .assessment_service
        .get_managed(attempt.assessment_id, &user)
        .await?;

    #[derive(serde::Serialize)]
    struct AdminSubmission {
        #[serde(flatten)]
        view: SubmissionView,
        student_id: String,
        source_code: String,
    }

    Ok(Json(ApiResponse::ok(AdminSubmission {
        view: SubmissionView::for_admin(&submission),
        student_id: attempt.student_id,
        source_code: submission.source_code,
    })))
}
