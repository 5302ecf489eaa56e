use crate::error::{Error, Result};
use crate::models::submission::CodeSubmission;
use crate::services::grading_service::GradingService;
use crate::services::judge_service::Language;
use crate::services::runner_service::RunOutcome;
use crate::utils::time::now;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Durable ledger of code submissions. Rows are only ever inserted or moved
/// forward out of `pending`/`processing`; nothing here deletes.
#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
}

impl SubmissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        attempt_id: Uuid,
        problem_id: Uuid,
        source_code: &str,
        language: Language,
        total_test_cases: i32,
    ) -> Result<CodeSubmission> {
        let submission = sqlx::query_as::<_, CodeSubmission>(
            r#"
            INSERT INTO code_submissions (
                attempt_id, problem_id, source_code, language, language_id,
                status, test_results, passed_test_cases, total_test_cases, score,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, 'pending', '[]'::jsonb, 0, $6, 0, $7, $7)
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(problem_id)
        .bind(source_code)
        .bind(language.as_str())
        .bind(language.judge_id())
        .bind(total_test_cases)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            submission_id = %submission.id,
            attempt_id = %attempt_id,
            problem_id = %problem_id,
            language = language.as_str(),
            "Code submission recorded"
        );

        Ok(submission)
    }

    /// pending -> processing. Returns false when the row had already moved on.
    pub async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE code_submissions
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Persists a run outcome. `None` means the submission was no longer open
    /// and the outcome was discarded.
    pub async fn apply_results(
        &self,
        id: Uuid,
        outcome: &RunOutcome,
        problem_marks: i32,
    ) -> Result<Option<CodeSubmission>> {
        let total = outcome.total();
        let status = GradingService::submission_status(outcome.passed_count, total);
        let score = GradingService::submission_score(outcome.passed_count, total, problem_marks);
        let promoted = &outcome.promoted;

        let updated = sqlx::query_as::<_, CodeSubmission>(
            r#"
            UPDATE code_submissions
            SET status = $2,
                test_results = $3,
                passed_test_cases = $4,
                total_test_cases = $5,
                score = $6,
                stdout = $7,
                stderr = $8,
                compile_output = $9,
                message = $10,
                execution_time = $11,
                memory = $12,
                updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Json(&outcome.results))
        .bind(outcome.passed_count)
        .bind(total)
        .bind(score)
        .bind(&promoted.stdout)
        .bind(&promoted.stderr)
        .bind(&promoted.compile_output)
        .bind(&promoted.message)
        .bind(promoted.execution_time)
        .bind(promoted.memory)
        .fetch_optional(&self.pool)
        .await?;

        match &updated {
            Some(s) => tracing::info!(
                submission_id = %id,
                status = s.status.as_str(),
                passed = s.passed_test_cases,
                total = s.total_test_cases,
                score = s.score,
                "Judge results applied"
            ),
            None => tracing::warn!(submission_id = %id, "Discarding stale judge results"),
        }

        Ok(updated)
    }

    pub async fn mark_failed(&self, id: Uuid, message: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE code_submissions
            SET status = 'runtime_error', message = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get(&self, id: Uuid) -> Result<CodeSubmission> {
        sqlx::query_as::<_, CodeSubmission>("SELECT * FROM code_submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Submission not found".to_string()))
    }

    pub async fn list_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<CodeSubmission>> {
        Self::list_for_attempt_with(&self.pool, attempt_id).await
    }

    /// Same as `list_for_attempt`, on any executor (used inside attempt transactions).
    pub async fn list_for_attempt_with<'e, E>(executor: E, attempt_id: Uuid) -> Result<Vec<CodeSubmission>>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, CodeSubmission>(
            r#"
            SELECT * FROM code_submissions
            WHERE attempt_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(attempt_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_problem(&self, attempt_id: Uuid, problem_id: Uuid) -> Result<Vec<CodeSubmission>> {
        let rows = sqlx::query_as::<_, CodeSubmission>(
            r#"
            SELECT * FROM code_submissions
            WHERE attempt_id = $1 AND problem_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(attempt_id)
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn best_for(&self, attempt_id: Uuid, problem_id: Uuid) -> Result<Option<CodeSubmission>> {
        let submissions = self.list_for_problem(attempt_id, problem_id).await?;
        Ok(GradingService::best_submission(&submissions).cloned())
    }
}
