use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dto::assessment_dto::{StudentCodingProblem, StudentQuizQuestion};
use crate::models::assessment::AssessmentType;
use crate::models::attempt::{AttemptStatus, IntegrityCounters, StudentAttempt};
use crate::models::submission::{CodeSubmission, SubmissionStatus, TestCaseResult};
use crate::utils::time::format_time_spent;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAnswerPayload {
    pub question_id: Uuid,
    #[validate(length(min = 1))]
    pub selected_option: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveAnswerResponse {
    pub question_id: Uuid,
    pub selected_option: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SubmitAttemptPayload {
    #[validate(range(min = 0))]
    pub tab_switches: Option<i32>,
    #[validate(range(min = 0))]
    pub fullscreen_exits: Option<i32>,
}

impl From<SubmitAttemptPayload> for IntegrityCounters {
    fn from(p: SubmitAttemptPayload) -> Self {
        IntegrityCounters {
            tab_switches: p.tab_switches,
            fullscreen_exits: p.fullscreen_exits,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CodePayload {
    #[validate(length(min = 1, max = 65536))]
    pub source_code: String,
    #[validate(length(min = 1))]
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub submit_time: Option<DateTime<Utc>>,
    /// Absent while results are withheld.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub total_marks: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i32>,
    pub tab_switches: i32,
    pub fullscreen_exits: i32,
    pub time_spent_seconds: Option<i64>,
    pub time_spent: Option<String>,
}

impl From<&StudentAttempt> for AttemptView {
    fn from(a: &StudentAttempt) -> Self {
        let spent = a.time_spent_seconds();
        Self {
            id: a.id,
            assessment_id: a.assessment_id,
            attempt_number: a.attempt_number,
            status: a.status,
            start_time: a.start_time,
            end_time: a.end_time,
            submit_time: a.submit_time,
            score: Some(a.score),
            total_marks: a.total_marks,
            percentage: Some(a.percentage),
            tab_switches: a.tab_switches,
            fullscreen_exits: a.fullscreen_exits,
            time_spent_seconds: spent,
            time_spent: spent.map(format_time_spent),
        }
    }
}

impl AttemptView {
    /// Strips score fields when results are not yet released.
    pub fn without_score(mut self) -> Self {
        self.score = None;
        self.percentage = None;
        self
    }
}

/// Row in the student's own attempt history.
#[derive(Debug, Clone, Serialize)]
pub struct StudentAttemptSummary {
    #[serde(flatten)]
    pub attempt: AttemptView,
    pub assessment_title: String,
    pub assessment_type: AssessmentType,
    pub results_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartAttemptResponse {
    pub attempt: AttemptView,
    pub resumed: bool,
    pub assessment_type: AssessmentType,
    pub end_time: DateTime<Utc>,
    pub questions: Vec<StudentQuizQuestion>,
    pub problems: Vec<StudentCodingProblem>,
    /// Answers already recorded on a resumed quiz attempt.
    pub saved_answers: Vec<SaveAnswerResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabSwitchResponse {
    pub tab_switches: i32,
    pub max_tab_switches: i32,
    pub allow_tab_switch: bool,
    pub auto_submitted: bool,
    pub status: AttemptStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullscreenExitResponse {
    pub fullscreen_exits: i32,
    pub status: AttemptStatus,
}

/// Student-facing submission; hidden test cases keep only their verdict.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub problem_id: Uuid,
    pub language: String,
    pub status: SubmissionStatus,
    pub passed_test_cases: i32,
    pub total_test_cases: i32,
    pub score: i32,
    pub test_results: Vec<TestCaseResult>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub execution_time: Option<f64>,
    pub memory: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl SubmissionView {
    pub fn for_student(s: &CodeSubmission) -> Self {
        let mut view = Self::for_admin(s);
        for result in view.test_results.iter_mut().filter(|r| r.is_hidden) {
            result.expected_output.clear();
            result.actual_output.clear();
        }
        view
    }

    pub fn for_admin(s: &CodeSubmission) -> Self {
        Self {
            id: s.id,
            attempt_id: s.attempt_id,
            problem_id: s.problem_id,
            language: s.language.clone(),
            status: s.status,
            passed_test_cases: s.passed_test_cases,
            total_test_cases: s.total_test_cases,
            score: s.score,
            test_results: s.test_results.0.clone(),
            stdout: s.stdout.clone(),
            stderr: s.stderr.clone(),
            compile_output: s.compile_output.clone(),
            message: s.message.clone(),
            execution_time: s.execution_time,
            memory: s.memory,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemSubmissionsResponse {
    pub best: Option<SubmissionView>,
    pub submissions: Vec<SubmissionView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn result(case_number: i32, is_hidden: bool) -> TestCaseResult {
        TestCaseResult {
            case_number,
            status: "Accepted".into(),
            passed: true,
            expected_output: "42".into(),
            actual_output: "42".into(),
            execution_time: Some(0.01),
            memory: Some(512),
            is_hidden,
        }
    }

    #[test]
    fn student_view_masks_hidden_case_io() {
        let now = Utc::now();
        let submission = CodeSubmission {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            problem_id: Uuid::new_v4(),
            source_code: "print(42)".into(),
            language: "python".into(),
            language_id: 71,
            status: SubmissionStatus::Accepted,
            test_results: Json(vec![result(1, false), result(2, true)]),
            passed_test_cases: 2,
            total_test_cases: 2,
            score: 10,
            stdout: Some("42".into()),
            stderr: None,
            compile_output: None,
            message: None,
            execution_time: Some(0.01),
            memory: Some(512),
            created_at: now,
            updated_at: now,
        };

        let student = SubmissionView::for_student(&submission);
        assert_eq!(student.test_results[0].actual_output, "42");
        assert!(student.test_results[1].actual_output.is_empty());
        assert!(student.test_results[1].expected_output.is_empty());
        assert!(student.test_results[1].passed);

        let admin = SubmissionView::for_admin(&submission);
        assert_eq!(admin.test_results[1].expected_output, "42");
    }

    #[test]
    fn submit_payload_accepts_empty_body() {
        let payload: SubmitAttemptPayload = serde_json::from_str("{}").unwrap();
        let counters: IntegrityCounters = payload.into();
        assert!(counters.tab_switches.is_none());
        assert!(counters.fullscreen_exits.is_none());
    }

    #[test]
    fn withheld_view_omits_score_fields() {
        let now = Utc::now();
        let attempt = StudentAttempt {
            id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            student_id: "student-1".into(),
            attempt_number: 1,
            status: AttemptStatus::Submitted,
            start_time: now - chrono::Duration::minutes(3),
            end_time: Some(now),
            submit_time: Some(now),
            score: 0,
            total_marks: 6,
            percentage: 0,
            tab_switches: 0,
            tab_switch_log: Json(Vec::new()),
            fullscreen_exits: 0,
            created_at: now,
            updated_at: now,
        };

        let released = serde_json::to_value(AttemptView::from(&attempt)).unwrap();
        assert_eq!(released["score"], 0);
        assert_eq!(released["percentage"], 0);

        let withheld = serde_json::to_value(AttemptView::from(&attempt).without_score()).unwrap();
        assert!(withheld.get("score").is_none());
        assert!(withheld.get("percentage").is_none());
        assert_eq!(withheld["total_marks"], 6);
    }
}
