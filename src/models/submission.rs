use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Accepted,
    WrongAnswer,
    RuntimeError,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 5] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Processing,
        SubmissionStatus::Accepted,
        SubmissionStatus::WrongAnswer,
        SubmissionStatus::RuntimeError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::WrongAnswer => "wrong_answer",
            SubmissionStatus::RuntimeError => "runtime_error",
        }
    }

    /// Judge results may only be written while the submission is still open.
    pub fn accepts_results(&self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Processing)
    }
}

impl TryFrom<String> for SubmissionStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubmissionStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| ParseEnumError::new("submission status", value))
    }
}

/// Outcome of one test case, stored in `code_submissions.test_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub case_number: i32,
    pub status: String,
    pub passed: bool,
    pub expected_output: String,
    pub actual_output: String,
    pub execution_time: Option<f64>,
    pub memory: Option<i64>,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CodeSubmission {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub problem_id: Uuid,
    pub source_code: String,
    pub language: String,
    pub language_id: i32,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub test_results: Json<Vec<TestCaseResult>>,
    pub passed_test_cases: i32,
    pub total_test_cases: i32,
    pub score: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub execution_time: Option<f64>,
    pub memory: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
