use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        attempt_dto::{
            AttemptView, CodePayload, ProblemSubmissionsResponse, SaveAnswerPayload,
            SubmitAttemptPayload, SubmissionView,
        },
        ApiResponse,
    },
    error::Result,
    middleware::auth::AuthUser,
    models::attempt::StudentAttempt,
    utils::time::now,
    AppState,
};

#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let items = state.assessment_service.list_for_student(&user).await?;
    Ok(Json(ApiResponse::ok(items)))
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.assessment_service.get_for_student(id, &user).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// Returns the open attempt when there is one (200), otherwise opens a new
/// attempt (201).
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let started = state.attempt_service.start(id, &user).await?;
    let status = if started.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiResponse::ok(started))))
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let items = state.attempt_service.list_for_student(&user).await?;
    Ok(Json(ApiResponse::ok(items)))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaveAnswerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let saved = state.attempt_service.record_answer(id, &user, payload).await?;
    Ok(Json(ApiResponse::ok(saved)))
}

#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<SubmitAttemptPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;
    let attempt = state.attempt_service.submit_quiz(id, &user, payload.into()).await?;
    let view = submitted_view(&state, &attempt).await?;
    Ok(Json(ApiResponse::with_message(view, "Quiz submitted")))
}

#[axum::debug_handler]
pub async fn submit_coding(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<SubmitAttemptPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;
    let attempt = state.attempt_service.submit_coding(id, &user, payload.into()).await?;
    let view = submitted_view(&state, &attempt).await?;
    Ok(Json(ApiResponse::with_message(view, "Coding assessment submitted")))
}

#[axum::debug_handler]
pub async fn tab_switch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.attempt_service.record_tab_switch(id, &user).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

#[axum::debug_handler]
pub async fn fullscreen_exit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.attempt_service.record_fullscreen_exit(id, &user).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

#[axum::debug_handler]
pub async fn results(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get(id).await?;
    let result = state.report_service.student_result(&attempt, &user).await?;
    Ok(Json(ApiResponse::ok(result)))
}

#[axum::debug_handler]
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get_owned(id, &user).await?;
    let submissions = state.submission_service.list_for_attempt(attempt.id).await?;
    let views: Vec<SubmissionView> = submissions.iter().map(SubmissionView::for_student).collect();
    Ok(Json(ApiResponse::ok(views)))
}

/// Runs the visible sample cases only; nothing is stored.
#[axum::debug_handler]
pub async fn run_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, problem_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CodePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ctx = state
        .attempt_service
        .problem_context(id, problem_id, &user, &payload.language)
        .await?;
    let outcome = state
        .judging_service
        .run_samples(&ctx.problem, &ctx.test_cases, &payload.source_code, ctx.language)
        .await;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// Queues a graded submission; judging continues after the response.
#[axum::debug_handler]
pub async fn submit_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, problem_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CodePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (submission, job) = state
        .attempt_service
        .submit_code(id, problem_id, &user, payload)
        .await?;
    tracing::info!(
        submission_id = %submission.id,
        attempt_id = %submission.attempt_id,
        cases = job.test_cases.len(),
        "Submission queued for judging"
    );
    state.judging_service.spawn(job);

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::with_message(
            SubmissionView::for_student(&submission),
            "Submission received",
        )),
    ))
}

#[axum::debug_handler]
pub async fn problem_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, problem_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get_owned(id, &user).await?;
    let submissions = state
        .submission_service
        .list_for_problem(attempt.id, problem_id)
        .await?;
    let best = state.submission_service.best_for(attempt.id, problem_id).await?;

    Ok(Json(ApiResponse::ok(ProblemSubmissionsResponse {
        best: best.as_ref().map(SubmissionView::for_student),
        submissions: submissions.iter().map(SubmissionView::for_student).collect(),
    })))
}

#[axum::debug_handler]
pub async fn get_submission(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submission = state.submission_service.get(id).await?;
    state.attempt_service.get_owned(submission.attempt_id, &user).await?;
    Ok(Json(ApiResponse::ok(SubmissionView::for_student(&submission))))
}

async fn submitted_view(state: &AppState, attempt: &StudentAttempt) -> Result<AttemptView> {
    let assessment = state.assessment_service.get(attempt.assessment_id).await?;
    let view = AttemptView::from(attempt);
    Ok(if assessment.results_visible_at(now()) {
        view
    } else {
        view.without_score()
    })
}
