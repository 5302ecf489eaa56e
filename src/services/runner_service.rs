use crate::models::question::TestCase;
use crate::models::submission::TestCaseResult;
use crate::services::judge_service::{
    ExecutionLimits, ExecutionRequest, Judge, Language, Verdict, VerdictStatus,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Submission-level display fields, taken from the first test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromotedOutput {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub execution_time: Option<f64>,
    pub memory: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutcome {
    pub results: Vec<TestCaseResult>,
    pub passed_count: i32,
    pub promoted: PromotedOutput,
}

impl RunOutcome {
    pub fn total(&self) -> i32 {
        self.results.len() as i32
    }
}

/// Result of one case before reduction: the stored row plus, for case 1, the
/// raw streams that get promoted to the submission.
struct CaseRun {
    result: TestCaseResult,
    promoted: PromotedOutput,
}

#[derive(Clone)]
pub struct TestCaseRunner {
    judge: Arc<dyn Judge>,
    case_timeout: Duration,
}

impl TestCaseRunner {
    pub fn new(judge: Arc<dyn Judge>, case_timeout: Duration) -> Self {
        Self {
            judge,
            case_timeout,
        }
    }

    /// Executes every test case concurrently and reduces them to a pass count.
    ///
    /// A failing case (judge error or runner deadline) becomes an `"Error"`
    /// result for that case only. Results are ordered by `case_number`
    /// regardless of completion order.
    pub async fn run(
        &self,
        submission_id: Option<Uuid>,
        source_code: &str,
        language: Language,
        limits: ExecutionLimits,
        test_cases: &[TestCase],
    ) -> RunOutcome {
        let mut cases: Vec<&TestCase> = test_cases.iter().collect();
        cases.sort_by_key(|tc| tc.case_number);

        tracing::info!(
            submission_id = ?submission_id,
            language = language.as_str(),
            cases = cases.len(),
            "Dispatching test cases to judge"
        );

        let runs = join_all(cases.iter().enumerate().map(|(idx, tc)| {
            let request = ExecutionRequest {
                source_code: source_code.to_string(),
                language,
                stdin: tc.input.clone(),
                expected_output: tc.expected_output.clone(),
                limits,
            };
            self.run_case((idx + 1) as i32, tc, request)
        }))
        .await;

        let passed_count = runs.iter().filter(|r| r.result.passed).count() as i32;
        let promoted = runs
            .first()
            .map(|r| r.promoted.clone())
            .unwrap_or_default();

        tracing::info!(
            submission_id = ?submission_id,
            passed = passed_count,
            total = runs.len(),
            "Test cases finished"
        );

        RunOutcome {
            results: runs.into_iter().map(|r| r.result).collect(),
            passed_count,
            promoted,
        }
    }

    /// "Run code": only the visible cases, nothing persisted.
    pub async fn run_samples(
        &self,
        source_code: &str,
        language: Language,
        limits: ExecutionLimits,
        test_cases: &[TestCase],
    ) -> RunOutcome {
        let samples: Vec<TestCase> = test_cases.iter().filter(|tc| !tc.is_hidden).cloned().collect();
        self.run(None, source_code, language, limits, &samples).await
    }

    async fn run_case(&self, case_number: i32, tc: &TestCase, request: ExecutionRequest) -> CaseRun {
        match tokio::time::timeout(self.case_timeout, self.judge.execute(&request)).await {
            Ok(Ok(verdict)) => CaseRun::from_verdict(case_number, tc, verdict),
            Ok(Err(e)) => {
                tracing::warn!(case_number, error = %e, "Test case execution failed");
                CaseRun::errored(case_number, tc, e.to_string())
            }
            Err(_) => {
                let message = format!(
                    "Test case timed out after {}s",
                    self.case_timeout.as_secs_f64()
                );
                tracing::warn!(case_number, "{}", message);
                CaseRun::errored(case_number, tc, message)
            }
        }
    }
}

impl CaseRun {
    fn from_verdict(case_number: i32, tc: &TestCase, verdict: Verdict) -> Self {
        if let Some(message) = unreached_judge_message(&verdict) {
            tracing::warn!(case_number, %message, "Judge could not execute test case");
            return CaseRun::errored(case_number, tc, message);
        }

        let actual_output = non_empty(&verdict.stdout)
            .or_else(|| non_empty(&verdict.stderr))
            .or_else(|| non_empty(&verdict.compile_output))
            .unwrap_or_default();

        CaseRun {
            result: TestCaseResult {
                case_number,
                status: verdict.description.clone(),
                passed: verdict.is_accepted(),
                expected_output: tc.expected_output.clone(),
                actual_output,
                execution_time: verdict.execution_time,
                memory: verdict.memory,
                is_hidden: tc.is_hidden,
            },
            promoted: PromotedOutput {
                stdout: verdict.stdout,
                stderr: verdict.stderr,
                compile_output: verdict.compile_output,
                message: verdict.message,
                execution_time: verdict.execution_time,
                memory: verdict.memory,
            },
        }
    }

    fn errored(case_number: i32, tc: &TestCase, message: String) -> Self {
        CaseRun {
            result: TestCaseResult {
                case_number,
                status: "Error".to_string(),
                passed: false,
                expected_output: tc.expected_output.clone(),
                actual_output: message.clone(),
                execution_time: None,
                memory: None,
                is_hidden: tc.is_hidden,
            },
            promoted: PromotedOutput {
                message: Some(message),
                ..Default::default()
            },
        }
    }
}

/// An internal-error verdict with no program output never reached the
/// sandbox: the client gave up on transport, status or decoding.
fn unreached_judge_message(verdict: &Verdict) -> Option<String> {
    if verdict.status != VerdictStatus::InternalError {
        return None;
    }
    if non_empty(&verdict.stdout).is_some()
        || non_empty(&verdict.stderr).is_some()
        || non_empty(&verdict.compile_output).is_some()
    {
        return None;
    }
    Some(
        non_empty(&verdict.message)
            .unwrap_or_else(|| verdict.description.clone()),
    )
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}
