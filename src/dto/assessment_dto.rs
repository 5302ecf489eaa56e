use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::assessment::{Assessment, AssessmentStatus, AssessmentType};
use crate::models::question::{CodingProblem, QuizQuestion, TestCase};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizQuestionPayload {
    pub question_number: Option<i32>,
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 2, message = "A question needs at least two options"))]
    pub options: Vec<String>,
    #[validate(length(min = 1))]
    pub correct_option: String,
    #[validate(range(min = 1))]
    pub marks: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestCasePayload {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CodingProblemPayload {
    pub problem_number: Option<i32>,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub constraints: Option<String>,
    #[validate(range(min = 1))]
    pub marks: i32,
    #[validate(range(min = 0.1, max = 30.0))]
    pub time_limit_seconds: Option<f64>,
    #[validate(range(min = 1024, max = 1_048_576))]
    pub memory_limit_kb: Option<i32>,
    #[validate(length(min = 1, message = "A problem needs at least one test case"), nested)]
    pub test_cases: Vec<TestCasePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAssessmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub assessment_type: AssessmentType,
    #[validate(length(min = 1))]
    pub college: String,
    #[validate(length(min = 1))]
    pub branch: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub allow_tab_switch: Option<bool>,
    #[validate(range(min = 0))]
    pub max_tab_switches: Option<i32>,
    pub shuffle_questions: Option<bool>,
    pub show_results_immediately: Option<bool>,
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<QuizQuestionPayload>,
    #[serde(default)]
    #[validate(nested)]
    pub problems: Vec<CodingProblemPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAssessmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    /// Accepted only when it matches the stored type.
    pub assessment_type: Option<AssessmentType>,
    #[validate(length(min = 1))]
    pub college: Option<String>,
    #[validate(length(min = 1))]
    pub branch: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub allow_tab_switch: Option<bool>,
    #[validate(range(min = 0))]
    pub max_tab_switches: Option<i32>,
    pub shuffle_questions: Option<bool>,
    pub show_results_immediately: Option<bool>,
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: Option<i32>,
    pub is_active: Option<bool>,
    #[validate(nested)]
    pub questions: Option<Vec<QuizQuestionPayload>>,
    #[validate(nested)]
    pub problems: Option<Vec<CodingProblemPayload>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssessmentListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub assessment_type: Option<AssessmentType>,
    pub college: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSummary {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub status: AssessmentStatus,
    pub item_count: i64,
    pub total_marks: i64,
    pub attempt_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentListResponse {
    pub items: Vec<AssessmentSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemWithCases {
    #[serde(flatten)]
    pub problem: CodingProblem,
    pub test_cases: Vec<TestCase>,
}

/// Full admin view, answers and hidden cases included.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub status: AssessmentStatus,
    pub total_marks: i32,
    pub questions: Vec<QuizQuestion>,
    pub problems: Vec<ProblemWithCases>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentQuizQuestion {
    pub id: Uuid,
    pub question_number: i32,
    pub question: String,
    pub options: Vec<String>,
    pub marks: i32,
}

impl From<&QuizQuestion> for StudentQuizQuestion {
    fn from(q: &QuizQuestion) -> Self {
        Self {
            id: q.id,
            question_number: q.question_number,
            question: q.question.clone(),
            options: q.options.0.clone(),
            marks: q.marks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleCase {
    pub case_number: i32,
    pub input: String,
    pub expected_output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentCodingProblem {
    pub id: Uuid,
    pub problem_number: i32,
    pub title: String,
    pub description: String,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub constraints: Option<String>,
    pub marks: i32,
    pub time_limit_seconds: f64,
    pub memory_limit_kb: i32,
    pub sample_cases: Vec<SampleCase>,
    pub total_test_cases: usize,
}

impl StudentCodingProblem {
    pub fn from_problem(problem: &CodingProblem, test_cases: &[TestCase]) -> Self {
        Self {
            id: problem.id,
            problem_number: problem.problem_number,
            title: problem.title.clone(),
            description: problem.description.clone(),
            input_format: problem.input_format.clone(),
            output_format: problem.output_format.clone(),
            constraints: problem.constraints.clone(),
            marks: problem.marks,
            time_limit_seconds: problem.time_limit_seconds,
            memory_limit_kb: problem.memory_limit_kb,
            sample_cases: test_cases
                .iter()
                .filter(|tc| !tc.is_hidden)
                .map(|tc| SampleCase {
                    case_number: tc.case_number,
                    input: tc.input.clone(),
                    expected_output: tc.expected_output.clone(),
                })
                .collect(),
            total_test_cases: test_cases.len(),
        }
    }
}

/// Assessment card in the student's catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct StudentAssessmentSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub assessment_type: AssessmentType,
    pub college: String,
    pub branch: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AssessmentStatus,
    pub allow_tab_switch: bool,
    pub max_tab_switches: i32,
    pub max_attempts: i32,
    pub total_marks: i64,
    pub item_count: i64,
    pub attempts_used: i64,
    pub in_progress_attempt_id: Option<Uuid>,
}
