use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::models::question::{CodingProblem, TestCase};
use crate::models::submission::CodeSubmission;
use crate::services::attempt_service::AttemptService;
use crate::services::judge_service::{ExecutionLimits, Language};
use crate::services::runner_service::{RunOutcome, TestCaseRunner};
use crate::services::submission_service::SubmissionService;

/// One submission waiting to be judged.
#[derive(Debug, Clone)]
pub struct JudgeJob {
    pub submission_id: Uuid,
    pub attempt_id: Uuid,
    pub problem: CodingProblem,
    pub test_cases: Vec<TestCase>,
    pub source_code: String,
    pub language: Language,
}

pub fn limits_for(problem: &CodingProblem) -> ExecutionLimits {
    ExecutionLimits {
        cpu_time_limit: problem.time_limit_seconds,
        memory_limit_kb: problem.memory_limit_kb,
    }
}

/// Background pipeline: pending -> processing -> judged, then score recompute.
#[derive(Clone)]
pub struct JudgingService {
    runner: TestCaseRunner,
    submissions: SubmissionService,
    attempts: AttemptService,
}

impl JudgingService {
    pub fn new(runner: TestCaseRunner, submissions: SubmissionService, attempts: AttemptService) -> Self {
        Self {
            runner,
            submissions,
            attempts,
        }
    }

    /// Detaches judging from the request. Failures end as `runtime_error`.
    pub fn spawn(&self, job: JudgeJob) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let submission_id = job.submission_id;
            let attempt_id = job.attempt_id;
            if let Err(e) = this.process(&job).await {
                tracing::error!(submission_id = %submission_id, error = %e, "Judging failed");
                match this.submissions.mark_failed(submission_id, &e.to_string()).await {
                    Ok(true) => {
                        if let Err(e) = this.attempts.recompute_coding_score(attempt_id).await {
                            tracing::error!(attempt_id = %attempt_id, error = %e, "Score recompute failed");
                        }
                    }
                    Ok(false) => {}
                    Err(e) => tracing::error!(submission_id = %submission_id, error = %e, "Could not mark submission failed"),
                }
            }
        })
    }

    pub async fn process(&self, job: &JudgeJob) -> Result<Option<CodeSubmission>> {
        if !self.submissions.mark_processing(job.submission_id).await? {
            tracing::warn!(submission_id = %job.submission_id, "Submission already picked up, skipping");
            return Ok(None);
        }

        let outcome = self
            .runner
            .run(
                Some(job.submission_id),
                &job.source_code,
                job.language,
                limits_for(&job.problem),
                &job.test_cases,
            )
            .await;

        let applied = self
            .submissions
            .apply_results(job.submission_id, &outcome, job.problem.marks)
            .await?;

        if applied.is_some() {
            self.attempts.recompute_coding_score(job.attempt_id).await?;
        }

        Ok(applied)
    }

    pub async fn run_samples(
        &self,
        problem: &CodingProblem,
        test_cases: &[TestCase],
        source_code: &str,
        language: Language,
    ) -> RunOutcome {
        self.runner
            .run_samples(source_code, language, limits_for(problem), test_cases)
            .await
    }
}
