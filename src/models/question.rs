use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub question_number: i32,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub correct_option: String,
    pub marks: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CodingProblem {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub problem_number: i32,
    pub title: String,
    pub description: String,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub constraints: Option<String>,
    pub marks: i32,
    pub time_limit_seconds: f64,
    pub memory_limit_kb: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub case_number: i32,
    pub input: String,
    pub expected_output: String,
    pub is_hidden: bool,
}
