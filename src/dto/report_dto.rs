use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::attempt_dto::AttemptView;
use crate::models::assessment::AssessmentType;
use crate::models::attempt::AttemptStatus;
use crate::models::submission::SubmissionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AttemptListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<AttemptStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub in_progress: i64,
    pub submitted: i64,
    pub auto_submitted: i64,
    pub expired: i64,
}

impl StatusCounts {
    pub fn finalized(&self) -> i64 {
        self.submitted + self.auto_submitted + self.expired
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub finalized: i64,
    pub average_score: f64,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub average_percentage: f64,
    pub total_tab_switches: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStat {
    pub question_id: Uuid,
    pub question_number: i32,
    pub question: String,
    pub answered: i64,
    pub correct: i64,
    /// Correct answers over finalized attempts, 0..=100.
    pub correctness_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemStat {
    pub problem_id: Uuid,
    pub problem_number: i32,
    pub title: String,
    pub marks: i32,
    pub attempted: i64,
    pub average_passed: f64,
    pub full_solves: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentAnalytics {
    pub assessment_id: Uuid,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub total_marks: i32,
    pub attempts: StatusCounts,
    pub scores: ScoreSummary,
    pub questions: Vec<QuestionStat>,
    pub problems: Vec<ProblemStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptListItem {
    pub student_id: String,
    #[serde(flatten)]
    pub attempt: AttemptView,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptListResponse {
    pub items: Vec<AttemptListItem>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionBreakdown {
    pub question_id: Uuid,
    pub question_number: i32,
    pub question: String,
    pub selected_option: Option<String>,
    pub correct_option: String,
    pub is_correct: bool,
    pub marks_awarded: i32,
    pub marks: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSubmissionSummary {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    pub language: String,
    pub passed_test_cases: i32,
    pub total_test_cases: i32,
    pub score: i32,
    pub execution_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemBreakdown {
    pub problem_id: Uuid,
    pub problem_number: i32,
    pub title: String,
    pub marks: i32,
    pub best: Option<BestSubmissionSummary>,
    pub submission_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptBreakdown {
    pub student_id: String,
    pub assessment_id: Uuid,
    pub assessment_title: String,
    pub assessment_type: AssessmentType,
    pub attempt: AttemptView,
    pub questions: Vec<QuestionBreakdown>,
    pub problems: Vec<ProblemBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentResult {
    pub results_available: bool,
    pub attempt: AttemptView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<AttemptBreakdown>,
}
