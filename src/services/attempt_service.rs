use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::attempt_dto::{
    AttemptView, CodePayload, FullscreenExitResponse, SaveAnswerPayload, SaveAnswerResponse,
    StartAttemptResponse, StudentAttemptSummary, TabSwitchResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::answer::StudentAnswer;
use crate::models::assessment::{Assessment, AssessmentStatus, AssessmentType};
use crate::models::attempt::{AttemptStatus, IntegrityCounters, StudentAttempt};
use crate::models::question::{CodingProblem, TestCase};
use crate::models::submission::CodeSubmission;
use crate::services::assessment_service::{ensure_visible, AssessmentService};
use crate::services::grading_service::GradingService;
use crate::services::judge_service::Language;
use crate::services::judging_service::JudgeJob;
use crate::services::submission_service::SubmissionService;
use crate::utils::time::now;

/// Owns every transition of a `StudentAttempt`. Writes lock the attempt row
/// (`FOR UPDATE`) for the length of one transaction.
#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    assessments: AssessmentService,
    submissions: SubmissionService,
}

/// Everything needed to execute code against one problem of an open attempt.
pub struct ProblemContext {
    pub attempt: StudentAttempt,
    pub problem: CodingProblem,
    pub test_cases: Vec<TestCase>,
    pub language: Language,
}

impl AttemptService {
    pub fn new(pool: PgPool, assessments: AssessmentService, submissions: SubmissionService) -> Self {
        Self {
            pool,
            assessments,
            submissions,
        }
    }

    pub async fn start(&self, assessment_id: Uuid, user: &AuthUser) -> Result<StartAttemptResponse> {
        let assessment = self.assessments.get(assessment_id).await?;
        ensure_visible(&assessment, user)?;
        if assessment.status() != AssessmentStatus::Active {
            return Err(Error::invalid_state(
                "assessment_not_active",
                "This assessment is not currently open",
            ));
        }

        let (attempt, resumed) = match self.find_in_progress(&user.id, assessment_id).await? {
            Some(existing) => (existing, true),
            None => self.create_attempt(&assessment, &user.id).await?,
        };

        if resumed {
            tracing::info!(attempt_id = %attempt.id, student_id = %user.id, "Attempt resumed");
        } else {
            tracing::info!(
                attempt_id = %attempt.id,
                student_id = %user.id,
                assessment_id = %assessment_id,
                attempt_number = attempt.attempt_number,
                "Attempt started"
            );
        }

        let (questions, problems) = self.assessments.student_content(&assessment, attempt.id).await?;
        let saved_answers = self
            .answers(attempt.id)
            .await?
            .into_iter()
            .map(|a| SaveAnswerResponse {
                question_id: a.question_id,
                selected_option: a.selected_option,
                answered_at: a.answered_at,
            })
            .collect();

        Ok(StartAttemptResponse {
            attempt: AttemptView::from(&attempt),
            resumed,
            assessment_type: assessment.assessment_type,
            end_time: assessment.end_time,
            questions,
            problems,
            saved_answers,
        })
    }

    async fn find_in_progress(&self, student_id: &str, assessment_id: Uuid) -> Result<Option<StudentAttempt>> {
        let attempt = sqlx::query_as::<_, StudentAttempt>(
            r#"
            SELECT * FROM student_attempts
            WHERE student_id = $1 AND assessment_id = $2 AND status = 'in_progress'
            "#,
        )
        .bind(student_id)
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    /// Inserts a fresh attempt. A concurrent start for the same pair loses on
    /// the single-in-progress index and resumes the winner instead.
    async fn create_attempt(&self, assessment: &Assessment, student_id: &str) -> Result<(StudentAttempt, bool)> {
        let (finalized, last_number): (i64, i32) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status <> 'in_progress'),
                   COALESCE(MAX(attempt_number), 0)
            FROM student_attempts
            WHERE student_id = $1 AND assessment_id = $2
            "#,
        )
        .bind(student_id)
        .bind(assessment.id)
        .fetch_one(&self.pool)
        .await?;

        if finalized >= assessment.max_attempts as i64 {
            return Err(Error::invalid_state(
                "max_attempts_reached",
                format!(
                    "You have used all {} attempt(s) for this assessment",
                    assessment.max_attempts
                ),
            ));
        }

        let total_marks = self.assessments.total_marks(assessment).await?;

        let inserted = sqlx::query_as::<_, StudentAttempt>(
            r#"
            INSERT INTO student_attempts (
                assessment_id, student_id, attempt_number, status, start_time, total_marks
            ) VALUES ($1, $2, $3, 'in_progress', $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(assessment.id)
        .bind(student_id)
        .bind(last_number + 1)
        .bind(now())
        .bind(total_marks)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(attempt) = inserted {
            return Ok((attempt, false));
        }

        match self.find_in_progress(student_id, assessment.id).await? {
            Some(existing) => Ok((existing, true)),
            None => Err(Error::invalid_state(
                "attempt_conflict",
                "Another attempt was started concurrently, please retry",
            )),
        }
    }

    pub async fn get(&self, attempt_id: Uuid) -> Result<StudentAttempt> {
        sqlx::query_as::<_, StudentAttempt>("SELECT * FROM student_attempts WHERE id = $1")
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    pub async fn get_owned(&self, attempt_id: Uuid, user: &AuthUser) -> Result<StudentAttempt> {
        let attempt = self.get(attempt_id).await?;
        attempt.ensure_owned_by(&user.id)?;
        Ok(attempt)
    }

    pub async fn list_for_student(&self, user: &AuthUser) -> Result<Vec<StudentAttemptSummary>> {
        let attempts = sqlx::query_as::<_, StudentAttempt>(
            "SELECT * FROM student_attempts WHERE student_id = $1 ORDER BY start_time DESC",
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = attempts.iter().map(|a| a.assessment_id).collect();
        let assessments: HashMap<Uuid, Assessment> =
            sqlx::query_as::<_, Assessment>("SELECT * FROM assessments WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|a| (a.id, a))
                .collect();

        let now = now();
        Ok(attempts
            .iter()
            .filter_map(|attempt| {
                let assessment = assessments.get(&attempt.assessment_id)?;
                let results_available =
                    attempt.status.is_terminal() && assessment.results_visible_at(now);
                let view = AttemptView::from(attempt);
                Some(StudentAttemptSummary {
                    attempt: if results_available { view } else { view.without_score() },
                    assessment_title: assessment.title.clone(),
                    assessment_type: assessment.assessment_type,
                    results_available,
                })
            })
            .collect())
    }

    pub async fn answers(&self, attempt_id: Uuid) -> Result<Vec<StudentAnswer>> {
        let rows = sqlx::query_as::<_, StudentAnswer>(
            "SELECT * FROM student_answers WHERE attempt_id = $1 ORDER BY answered_at",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn record_answer(
        &self,
        attempt_id: Uuid,
        user: &AuthUser,
        payload: SaveAnswerPayload,
    ) -> Result<SaveAnswerResponse> {
        let mut tx = self.pool.begin().await?;
        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.ensure_owned_by(&user.id)?;
        attempt.ensure_in_progress()?;

        let assessment = self.assessments.get(attempt.assessment_id).await?;
        ensure_type(&assessment, AssessmentType::Quiz)?;
        if assessment.window_closed_at(now()) {
            expire_locked(&mut tx, &attempt, &assessment).await?;
            tx.commit().await?;
            return Err(window_closed());
        }

        let question = self.assessments.question(assessment.id, payload.question_id).await?;
        if !question.options.0.contains(&payload.selected_option) {
            return Err(Error::BadRequest(
                "selected_option is not one of the question's options".to_string(),
            ));
        }
        let (is_correct, marks_awarded) =
            GradingService::grade_quiz_answer(&question, &payload.selected_option);

        let answer = sqlx::query_as::<_, StudentAnswer>(
            r#"
            INSERT INTO student_answers (attempt_id, question_id, selected_option, is_correct, marks_awarded, answered_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                selected_option = EXCLUDED.selected_option,
                is_correct = EXCLUDED.is_correct,
                marks_awarded = EXCLUDED.marks_awarded,
                answered_at = EXCLUDED.answered_at
            RETURNING *
            "#,
        )
        .bind(attempt.id)
        .bind(question.id)
        .bind(&payload.selected_option)
        .bind(is_correct)
        .bind(marks_awarded)
        .bind(now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SaveAnswerResponse {
            question_id: answer.question_id,
            selected_option: answer.selected_option,
            answered_at: answer.answered_at,
        })
    }

    /// Counts one tab switch and, when the policy is exceeded, force-submits
    /// in the same row update.
    pub async fn record_tab_switch(&self, attempt_id: Uuid, user: &AuthUser) -> Result<TabSwitchResponse> {
        let mut tx = self.pool.begin().await?;
        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.ensure_owned_by(&user.id)?;
        attempt.ensure_in_progress()?;

        let assessment = self.assessments.get(attempt.assessment_id).await?;
        let at = now();
        if assessment.window_closed_at(at) {
            expire_locked(&mut tx, &attempt, &assessment).await?;
            tx.commit().await?;
            return Err(window_closed());
        }

        let tab_switches = attempt.tab_switches + 1;
        let mut log = attempt.tab_switch_log.0.clone();
        log.push(at);

        let policy = assessment.integrity_policy();
        let auto_submit = policy.is_violated_by(tab_switches);

        let updated = if auto_submit {
            let score = derive_score(&mut tx, &attempt, &assessment).await?;
            sqlx::query_as::<_, StudentAttempt>(
                r#"
                UPDATE student_attempts SET
                    tab_switches = $2,
                    tab_switch_log = $3,
                    status = 'auto_submitted',
                    end_time = $4,
                    submit_time = $4,
                    score = $5,
                    percentage = $6,
                    updated_at = $4
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(attempt.id)
            .bind(tab_switches)
            .bind(Json(&log))
            .bind(at)
            .bind(score)
            .bind(GradingService::percentage(score, attempt.total_marks))
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, StudentAttempt>(
                r#"
                UPDATE student_attempts SET
                    tab_switches = $2,
                    tab_switch_log = $3,
                    updated_at = $4
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(attempt.id)
            .bind(tab_switches)
            .bind(Json(&log))
            .bind(at)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        if auto_submit {
            tracing::warn!(
                attempt_id = %attempt.id,
                student_id = %user.id,
                tab_switches,
                max_tab_switches = policy.max_tab_switches,
                "Attempt auto-submitted after tab switch limit"
            );
        } else {
            tracing::info!(attempt_id = %attempt.id, tab_switches, "Tab switch recorded");
        }

        Ok(TabSwitchResponse {
            tab_switches: updated.tab_switches,
            max_tab_switches: policy.max_tab_switches,
            allow_tab_switch: policy.allow_tab_switch,
            auto_submitted: auto_submit,
            status: updated.status,
        })
    }

    pub async fn record_fullscreen_exit(&self, attempt_id: Uuid, user: &AuthUser) -> Result<FullscreenExitResponse> {
        let mut tx = self.pool.begin().await?;
        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.ensure_owned_by(&user.id)?;
        attempt.ensure_in_progress()?;

        let updated = sqlx::query_as::<_, StudentAttempt>(
            r#"
            UPDATE student_attempts
            SET fullscreen_exits = fullscreen_exits + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt.id,
            fullscreen_exits = updated.fullscreen_exits,
            "Fullscreen exit recorded"
        );

        Ok(FullscreenExitResponse {
            fullscreen_exits: updated.fullscreen_exits,
            status: updated.status,
        })
    }

    pub async fn submit_quiz(&self, attempt_id: Uuid, user: &AuthUser, counters: IntegrityCounters) -> Result<StudentAttempt> {
        self.submit(attempt_id, user, AssessmentType::Quiz, counters).await
    }

    pub async fn submit_coding(&self, attempt_id: Uuid, user: &AuthUser, counters: IntegrityCounters) -> Result<StudentAttempt> {
        self.submit(attempt_id, user, AssessmentType::Coding, counters).await
    }

    async fn submit(
        &self,
        attempt_id: Uuid,
        user: &AuthUser,
        expected: AssessmentType,
        counters: IntegrityCounters,
    ) -> Result<StudentAttempt> {
        let mut tx = self.pool.begin().await?;
        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        attempt.ensure_owned_by(&user.id)?;
        attempt.ensure_can_become(AttemptStatus::Submitted)?;

        let assessment = self.assessments.get(attempt.assessment_id).await?;
        ensure_type(&assessment, expected)?;

        let at = now();
        let score = derive_score(&mut tx, &attempt, &assessment).await?;
        let submitted = finalize_locked(
            &mut tx,
            &attempt,
            AttemptStatus::Submitted,
            at,
            score,
            counters,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = %submitted.id,
            student_id = %user.id,
            score = submitted.score,
            total_marks = submitted.total_marks,
            "Attempt submitted"
        );

        Ok(submitted)
    }

    /// Validates that `problem_id` can be executed inside this attempt right now.
    pub async fn problem_context(
        &self,
        attempt_id: Uuid,
        problem_id: Uuid,
        user: &AuthUser,
        language: &str,
    ) -> Result<ProblemContext> {
        let language = Language::parse(language)?;
        let attempt = self.get_owned(attempt_id, user).await?;
        attempt.ensure_in_progress()?;

        let assessment = self.assessments.get(attempt.assessment_id).await?;
        ensure_type(&assessment, AssessmentType::Coding)?;
        if assessment.window_closed_at(now()) {
            self.expire(&attempt, &assessment).await?;
            return Err(window_closed());
        }

        let problem = self.assessments.problem(assessment.id, problem_id).await?;
        let test_cases = self.assessments.test_cases(problem.id).await?;

        Ok(ProblemContext {
            attempt,
            problem,
            test_cases,
            language,
        })
    }

    /// Records a pending submission and returns the job that judges it.
    pub async fn submit_code(
        &self,
        attempt_id: Uuid,
        problem_id: Uuid,
        user: &AuthUser,
        payload: CodePayload,
    ) -> Result<(CodeSubmission, JudgeJob)> {
        let ctx = self
            .problem_context(attempt_id, problem_id, user, &payload.language)
            .await?;

        let submission = self
            .submissions
            .record(
                ctx.attempt.id,
                ctx.problem.id,
                &payload.source_code,
                ctx.language,
                ctx.test_cases.len() as i32,
            )
            .await?;

        let job = JudgeJob {
            submission_id: submission.id,
            attempt_id: ctx.attempt.id,
            problem: ctx.problem,
            test_cases: ctx.test_cases,
            source_code: payload.source_code,
            language: ctx.language,
        };

        Ok((submission, job))
    }

    /// Re-derives the coding score from the current best submissions.
    ///
    /// Open attempts count every submission. A finalized attempt keeps its
    /// status but still picks up submissions made before it closed, so code
    /// judged after the final submit is counted. Returns the score written.
    pub async fn recompute_coding_score(&self, attempt_id: Uuid) -> Result<Option<i32>> {
        let mut tx = self.pool.begin().await?;
        let attempt = lock_attempt(&mut tx, attempt_id).await?;
        let assessment = self.assessments.get(attempt.assessment_id).await?;
        if assessment.assessment_type != AssessmentType::Coding {
            tracing::debug!(attempt_id = %attempt_id, "Skipping score recompute for quiz attempt");
            return Ok(None);
        }

        let cutoff = match attempt.status {
            AttemptStatus::InProgress => None,
            _ => match attempt.end_time {
                Some(end) => Some(end),
                None => {
                    tracing::warn!(attempt_id = %attempt_id, status = %attempt.status, "Finalized attempt has no end time");
                    return Ok(None);
                }
            },
        };
        let score = coding_score_until(&mut tx, &attempt, &assessment, cutoff).await?;

        sqlx::query(
            r#"
            UPDATE student_attempts
            SET score = $2, percentage = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(attempt.id)
        .bind(score)
        .bind(GradingService::percentage(score, attempt.total_marks))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(attempt_id = %attempt_id, status = %attempt.status, score, "Coding score recomputed");
        Ok(Some(score))
    }

    async fn expire(&self, attempt: &StudentAttempt, assessment: &Assessment) -> Result<Option<StudentAttempt>> {
        let mut tx = self.pool.begin().await?;
        let locked = lock_attempt(&mut tx, attempt.id).await?;
        if locked.status != AttemptStatus::InProgress {
            return Ok(None);
        }
        let expired = expire_locked(&mut tx, &locked, assessment).await?;
        tx.commit().await?;
        Ok(Some(expired))
    }

    /// Moves every open attempt whose window has ended to `expired`.
    pub async fn expire_overdue(&self) -> Result<u64> {
        let overdue: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT sa.id, sa.assessment_id
            FROM student_attempts sa
            JOIN assessments a ON a.id = sa.assessment_id
            WHERE sa.status = 'in_progress' AND a.end_time < $1
            "#,
        )
        .bind(now())
        .fetch_all(&self.pool)
        .await?;

        let mut cache: HashMap<Uuid, Assessment> = HashMap::new();
        let mut expired = 0;
        for (attempt_id, assessment_id) in overdue {
            if !cache.contains_key(&assessment_id) {
                match self.assessments.get(assessment_id).await {
                    Ok(assessment) => {
                        cache.insert(assessment_id, assessment);
                    }
                    Err(e) => {
                        tracing::error!(assessment_id = %assessment_id, error = %e, "Failed to load assessment for expiry");
                        continue;
                    }
                }
            }
            let Some(assessment) = cache.get(&assessment_id) else {
                continue;
            };
            let attempt = match self.get(attempt_id).await {
                Ok(attempt) => attempt,
                Err(e) => {
                    tracing::error!(attempt_id = %attempt_id, error = %e, "Failed to load attempt for expiry");
                    continue;
                }
            };
            match self.expire(&attempt, assessment).await {
                Ok(Some(_)) => expired += 1,
                Ok(None) => {}
                Err(e) => tracing::error!(attempt_id = %attempt_id, error = %e, "Failed to expire attempt"),
            }
        }

        if expired > 0 {
            tracing::info!(expired, "Expired overdue attempts");
        }
        Ok(expired)
    }
}

fn ensure_type(assessment: &Assessment, expected: AssessmentType) -> Result<()> {
    if assessment.assessment_type != expected {
        return Err(Error::invalid_state(
            "wrong_assessment_type",
            format!(
                "This action requires a {} assessment",
                expected.as_str()
            ),
        ));
    }
    Ok(())
}

fn window_closed() -> Error {
    Error::invalid_state(
        "assessment_window_closed",
        "The assessment window has closed; the attempt has expired",
    )
}

async fn lock_attempt(conn: &mut PgConnection, attempt_id: Uuid) -> Result<StudentAttempt> {
    sqlx::query_as::<_, StudentAttempt>("SELECT * FROM student_attempts WHERE id = $1 FOR UPDATE")
        .bind(attempt_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
}

/// Score from scratch: quiz answers, or the best submission per problem.
async fn derive_score(conn: &mut PgConnection, attempt: &StudentAttempt, assessment: &Assessment) -> Result<i32> {
    match assessment.assessment_type {
        AssessmentType::Quiz => {
            let answers = sqlx::query_as::<_, StudentAnswer>(
                "SELECT * FROM student_answers WHERE attempt_id = $1",
            )
            .bind(attempt.id)
            .fetch_all(&mut *conn)
            .await?;
            Ok(GradingService::quiz_score(&answers))
        }
        AssessmentType::Coding => coding_score_until(conn, attempt, assessment, None).await,
    }
}

/// Sum of best submission scores, counting only submissions created at or
/// before `cutoff` when one is given.
async fn coding_score_until(
    conn: &mut PgConnection,
    attempt: &StudentAttempt,
    assessment: &Assessment,
    cutoff: Option<DateTime<Utc>>,
) -> Result<i32> {
    let problems = sqlx::query_as::<_, CodingProblem>(
        "SELECT * FROM coding_problems WHERE assessment_id = $1",
    )
    .bind(assessment.id)
    .fetch_all(&mut *conn)
    .await?;
    let mut submissions = SubmissionService::list_for_attempt_with(&mut *conn, attempt.id).await?;
    if let Some(cutoff) = cutoff {
        submissions.retain(|s| s.created_at <= cutoff);
    }
    Ok(GradingService::coding_score(&problems, &submissions))
}

async fn expire_locked(conn: &mut PgConnection, attempt: &StudentAttempt, assessment: &Assessment) -> Result<StudentAttempt> {
    let score = derive_score(conn, attempt, assessment).await?;
    let expired = finalize_locked(
        conn,
        attempt,
        AttemptStatus::Expired,
        assessment.end_time,
        score,
        IntegrityCounters::default(),
    )
    .await?;
    tracing::info!(attempt_id = %attempt.id, score, "Attempt expired at window close");
    Ok(expired)
}

/// Applies a terminal transition to a row already locked by the caller.
async fn finalize_locked(
    conn: &mut PgConnection,
    attempt: &StudentAttempt,
    status: AttemptStatus,
    at: DateTime<Utc>,
    score: i32,
    counters: IntegrityCounters,
) -> Result<StudentAttempt> {
    attempt.ensure_can_become(status)?;
    let updated = sqlx::query_as::<_, StudentAttempt>(
        r#"
        UPDATE student_attempts SET
            status = $2,
            end_time = $3,
            submit_time = $3,
            score = $4,
            percentage = $5,
            tab_switches = COALESCE($6, tab_switches),
            fullscreen_exits = COALESCE($7, fullscreen_exits),
            updated_at = NOW()
        WHERE id = $1 AND status = 'in_progress'
        RETURNING *
        "#,
    )
    .bind(attempt.id)
    .bind(status.as_str())
    .bind(at)
    .bind(score)
    .bind(GradingService::percentage(score, attempt.total_marks))
    .bind(counters.tab_switches)
    .bind(counters.fullscreen_exits)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        Error::invalid_state("attempt_not_in_progress", "Attempt is no longer in progress")
    })?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(kind: AssessmentType) -> Assessment {
        let now = Utc::now();
        Assessment {
            id: Uuid::new_v4(),
            title: "Mid-term".into(),
            description: None,
            instructions: None,
            assessment_type: kind,
            college: "GEC".into(),
            branch: "CSE".into(),
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
            allow_tab_switch: true,
            max_tab_switches: 3,
            shuffle_questions: false,
            show_results_immediately: true,
            max_attempts: 1,
            is_active: true,
            created_by: "admin".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn type_guard_names_the_reason() {
        assert!(ensure_type(&assessment(AssessmentType::Quiz), AssessmentType::Quiz).is_ok());
        let err = ensure_type(&assessment(AssessmentType::Quiz), AssessmentType::Coding).unwrap_err();
        assert!(matches!(err, Error::InvalidState { reason: "wrong_assessment_type", .. }));
    }

    #[test]
    fn window_closed_error_is_invalid_state() {
        assert!(matches!(
            window_closed(),
            Error::InvalidState { reason: "assessment_window_closed", .. }
        ));
    }
}
