use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::dto::assessment_dto::{
    AssessmentDetail, AssessmentListQuery, AssessmentListResponse, AssessmentSummary,
    CodingProblemPayload, CreateAssessmentPayload, ProblemWithCases, QuizQuestionPayload,
    StudentAssessmentSummary, StudentCodingProblem, StudentQuizQuestion, UpdateAssessmentPayload,
};
use crate::dto::{page_bounds, total_pages};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::assessment::{Assessment, AssessmentType};
use crate::models::question::{CodingProblem, QuizQuestion, TestCase};
use crate::services::grading_service::GradingService;

/// Judge limits applied to problems that do not set their own.
#[derive(Debug, Clone, Copy)]
pub struct ProblemDefaults {
    pub time_limit_seconds: f64,
    pub memory_limit_kb: i32,
}

#[derive(Clone)]
pub struct AssessmentService {
    pool: PgPool,
    defaults: ProblemDefaults,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    assessment: Assessment,
    item_count: i64,
    total_marks: i64,
    attempt_count: i64,
}

#[derive(Debug, FromRow)]
struct StudentSummaryRow {
    #[sqlx(flatten)]
    assessment: Assessment,
    item_count: i64,
    total_marks: i64,
    attempts_used: i64,
    in_progress_attempt_id: Option<Uuid>,
}

const SUMMARY_COLUMNS: &str = r#"
    (SELECT COUNT(*) FROM quiz_questions q WHERE q.assessment_id = a.id)
        + (SELECT COUNT(*) FROM coding_problems p WHERE p.assessment_id = a.id) AS item_count,
    COALESCE((SELECT SUM(q.marks) FROM quiz_questions q WHERE q.assessment_id = a.id), 0)
        + COALESCE((SELECT SUM(p.marks) FROM coding_problems p WHERE p.assessment_id = a.id), 0) AS total_marks
"#;

impl AssessmentService {
    pub fn new(pool: PgPool, defaults: ProblemDefaults) -> Self {
        Self { pool, defaults }
    }

    pub async fn create(&self, admin_id: &str, payload: CreateAssessmentPayload) -> Result<AssessmentDetail> {
        validate_window(payload.start_time, payload.end_time)?;
        validate_content(payload.assessment_type, &payload.questions, &payload.problems)?;

        let mut tx = self.pool.begin().await?;

        let assessment = sqlx::query_as::<_, Assessment>(
            r#"
            INSERT INTO assessments (
                title, description, instructions, assessment_type, college, branch,
                start_time, end_time, allow_tab_switch, max_tab_switches, shuffle_questions,
                show_results_immediately, max_attempts, is_active, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.instructions)
        .bind(payload.assessment_type.as_str())
        .bind(payload.college.trim())
        .bind(payload.branch.trim())
        .bind(payload.start_time)
        .bind(payload.end_time)
        .bind(payload.allow_tab_switch.unwrap_or(true))
        .bind(payload.max_tab_switches.unwrap_or(3))
        .bind(payload.shuffle_questions.unwrap_or(false))
        .bind(payload.show_results_immediately.unwrap_or(true))
        .bind(payload.max_attempts.unwrap_or(1))
        .bind(payload.is_active.unwrap_or(true))
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        self.insert_content(&mut tx, assessment.id, &payload.questions, &payload.problems)
            .await?;

        tx.commit().await?;

        tracing::info!(
            assessment_id = %assessment.id,
            assessment_type = assessment.assessment_type.as_str(),
            created_by = admin_id,
            "Assessment created"
        );

        self.get_detail(assessment.id).await
    }

    async fn insert_content(
        &self,
        conn: &mut PgConnection,
        assessment_id: Uuid,
        questions: &[QuizQuestionPayload],
        problems: &[CodingProblemPayload],
    ) -> Result<()> {
        for (idx, q) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions (
                    assessment_id, question_number, question, options, correct_option, marks, explanation
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(assessment_id)
            .bind(q.question_number.unwrap_or(idx as i32 + 1))
            .bind(&q.question)
            .bind(Json(&q.options))
            .bind(&q.correct_option)
            .bind(q.marks)
            .bind(&q.explanation)
            .execute(&mut *conn)
            .await?;
        }

        for (idx, p) in problems.iter().enumerate() {
            let problem_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO coding_problems (
                    assessment_id, problem_number, title, description, input_format,
                    output_format, constraints, marks, time_limit_seconds, memory_limit_kb
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id
                "#,
            )
            .bind(assessment_id)
            .bind(p.problem_number.unwrap_or(idx as i32 + 1))
            .bind(&p.title)
            .bind(&p.description)
            .bind(&p.input_format)
            .bind(&p.output_format)
            .bind(&p.constraints)
            .bind(p.marks)
            .bind(p.time_limit_seconds.unwrap_or(self.defaults.time_limit_seconds))
            .bind(p.memory_limit_kb.unwrap_or(self.defaults.memory_limit_kb))
            .fetch_one(&mut *conn)
            .await?;

            for (case_idx, tc) in p.test_cases.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO test_cases (problem_id, case_number, input, expected_output, is_hidden)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(problem_id)
                .bind(case_idx as i32 + 1)
                .bind(&tc.input)
                .bind(&tc.expected_output)
                .bind(tc.is_hidden)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Assessment> {
        sqlx::query_as::<_, Assessment>("SELECT * FROM assessments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))
    }

    /// Fetches an assessment the caller is allowed to administer.
    pub async fn get_managed(&self, id: Uuid, user: &AuthUser) -> Result<Assessment> {
        let assessment = self.get(id).await?;
        user.ensure_can_manage(&assessment.created_by)?;
        Ok(assessment)
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<AssessmentDetail> {
        let assessment = self.get(id).await?;
        let questions = self.questions(id).await?;
        let problems = self.problems(id).await?;
        let mut cases = self.test_cases_by_problem(id).await?;

        let total_marks = GradingService::quiz_total_marks(&questions)
            + GradingService::coding_total_marks(&problems);
        let problems = problems
            .into_iter()
            .map(|problem| {
                let test_cases = cases.remove(&problem.id).unwrap_or_default();
                ProblemWithCases { problem, test_cases }
            })
            .collect();

        Ok(AssessmentDetail {
            status: assessment.status(),
            assessment,
            total_marks,
            questions,
            problems,
        })
    }

    pub async fn list_for_admin(&self, user: &AuthUser, query: AssessmentListQuery) -> Result<AssessmentListResponse> {
        let (page, per_page, offset) = page_bounds(query.page, query.per_page);
        let owner = user.scope_filter().map(str::to_string);
        let kind = query.assessment_type.map(|t| t.as_str().to_string());

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            r#"
            SELECT a.*, {SUMMARY_COLUMNS},
                (SELECT COUNT(*) FROM student_attempts s WHERE s.assessment_id = a.id) AS attempt_count
            FROM assessments a
            WHERE ($1::text IS NULL OR a.created_by = $1)
              AND ($2::text IS NULL OR a.assessment_type = $2)
              AND ($3::text IS NULL OR LOWER(a.college) = LOWER($3))
              AND ($4::text IS NULL OR LOWER(a.branch) = LOWER($4))
            ORDER BY a.start_time DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(&owner)
        .bind(&kind)
        .bind(&query.college)
        .bind(&query.branch)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM assessments a
            WHERE ($1::text IS NULL OR a.created_by = $1)
              AND ($2::text IS NULL OR a.assessment_type = $2)
              AND ($3::text IS NULL OR LOWER(a.college) = LOWER($3))
              AND ($4::text IS NULL OR LOWER(a.branch) = LOWER($4))
            "#,
        )
        .bind(&owner)
        .bind(&kind)
        .bind(&query.college)
        .bind(&query.branch)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| AssessmentSummary {
                status: row.assessment.status(),
                assessment: row.assessment,
                item_count: row.item_count,
                total_marks: row.total_marks,
                attempt_count: row.attempt_count,
            })
            .collect();

        Ok(AssessmentListResponse {
            items,
            total,
            page,
            per_page,
            total_pages: total_pages(total, per_page),
        })
    }

    /// Active assessments in the student's college/branch, soonest first.
    pub async fn list_for_student(&self, user: &AuthUser) -> Result<Vec<StudentAssessmentSummary>> {
        let rows = sqlx::query_as::<_, StudentSummaryRow>(&format!(
            r#"
            SELECT a.*, {SUMMARY_COLUMNS},
                (SELECT COUNT(*) FROM student_attempts s
                    WHERE s.assessment_id = a.id AND s.student_id = $1) AS attempts_used,
                (SELECT s.id FROM student_attempts s
                    WHERE s.assessment_id = a.id AND s.student_id = $1 AND s.status = 'in_progress'
                    LIMIT 1) AS in_progress_attempt_id
            FROM assessments a
            WHERE a.is_active = TRUE
              AND ($2::text IS NULL OR LOWER(a.college) = LOWER($2))
              AND ($3::text IS NULL OR LOWER(a.branch) = LOWER($3))
            ORDER BY a.start_time ASC
            "#
        ))
        .bind(&user.id)
        .bind(&user.college)
        .bind(&user.branch)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(student_summary).collect())
    }

    pub async fn get_for_student(&self, id: Uuid, user: &AuthUser) -> Result<StudentAssessmentSummary> {
        let row = sqlx::query_as::<_, StudentSummaryRow>(&format!(
            r#"
            SELECT a.*, {SUMMARY_COLUMNS},
                (SELECT COUNT(*) FROM student_attempts s
                    WHERE s.assessment_id = a.id AND s.student_id = $2) AS attempts_used,
                (SELECT s.id FROM student_attempts s
                    WHERE s.assessment_id = a.id AND s.student_id = $2 AND s.status = 'in_progress'
                    LIMIT 1) AS in_progress_attempt_id
            FROM assessments a
            WHERE a.id = $1
            "#
        ))
        .bind(id)
        .bind(&user.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))?;

        if !row.assessment.is_active {
            return Err(Error::NotFound("Assessment not found".to_string()));
        }
        ensure_visible(&row.assessment, user)?;
        Ok(student_summary(row))
    }

    pub async fn update(&self, id: Uuid, user: &AuthUser, payload: UpdateAssessmentPayload) -> Result<AssessmentDetail> {
        let current = self.get_managed(id, user).await?;

        if let Some(kind) = payload.assessment_type {
            if kind != current.assessment_type {
                return Err(Error::invalid_state(
                    "immutable_assessment_type",
                    "The assessment type cannot be changed after creation",
                ));
            }
        }

        let start_time = payload.start_time.unwrap_or(current.start_time);
        let end_time = payload.end_time.unwrap_or(current.end_time);
        validate_window(start_time, end_time)?;

        let replaces_content = payload.questions.is_some() || payload.problems.is_some();
        if replaces_content {
            if self.attempt_count(id).await? > 0 {
                return Err(Error::invalid_state(
                    "assessment_has_attempts",
                    "Questions and problems cannot be replaced once students have attempted the assessment",
                ));
            }
            validate_content(
                current.assessment_type,
                payload.questions.as_deref().unwrap_or_default(),
                payload.problems.as_deref().unwrap_or_default(),
            )?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE assessments SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                instructions = COALESCE($4, instructions),
                college = COALESCE($5, college),
                branch = COALESCE($6, branch),
                start_time = $7,
                end_time = $8,
                allow_tab_switch = COALESCE($9, allow_tab_switch),
                max_tab_switches = COALESCE($10, max_tab_switches),
                shuffle_questions = COALESCE($11, shuffle_questions),
                show_results_immediately = COALESCE($12, show_results_immediately),
                max_attempts = COALESCE($13, max_attempts),
                is_active = COALESCE($14, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.instructions)
        .bind(payload.college.as_deref().map(str::trim))
        .bind(payload.branch.as_deref().map(str::trim))
        .bind(start_time)
        .bind(end_time)
        .bind(payload.allow_tab_switch)
        .bind(payload.max_tab_switches)
        .bind(payload.shuffle_questions)
        .bind(payload.show_results_immediately)
        .bind(payload.max_attempts)
        .bind(payload.is_active)
        .execute(&mut *tx)
        .await?;

        if replaces_content {
            sqlx::query("DELETE FROM quiz_questions WHERE assessment_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM coding_problems WHERE assessment_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            self.insert_content(
                &mut tx,
                id,
                payload.questions.as_deref().unwrap_or_default(),
                payload.problems.as_deref().unwrap_or_default(),
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(assessment_id = %id, replaced_content = replaces_content, "Assessment updated");

        self.get_detail(id).await
    }

    pub async fn delete(&self, id: Uuid, user: &AuthUser) -> Result<()> {
        self.get_managed(id, user).await?;
        if self.attempt_count(id).await? > 0 {
            return Err(Error::invalid_state(
                "assessment_has_attempts",
                "An assessment with student attempts cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM assessments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(assessment_id = %id, deleted_by = %user.id, "Assessment deleted");
        Ok(())
    }

    async fn attempt_count(&self, id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_attempts WHERE assessment_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn questions(&self, assessment_id: Uuid) -> Result<Vec<QuizQuestion>> {
        let rows = sqlx::query_as::<_, QuizQuestion>(
            "SELECT * FROM quiz_questions WHERE assessment_id = $1 ORDER BY question_number",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn question(&self, assessment_id: Uuid, question_id: Uuid) -> Result<QuizQuestion> {
        sqlx::query_as::<_, QuizQuestion>(
            "SELECT * FROM quiz_questions WHERE id = $1 AND assessment_id = $2",
        )
        .bind(question_id)
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Question not found in this assessment".to_string()))
    }

    pub async fn problems(&self, assessment_id: Uuid) -> Result<Vec<CodingProblem>> {
        let rows = sqlx::query_as::<_, CodingProblem>(
            "SELECT * FROM coding_problems WHERE assessment_id = $1 ORDER BY problem_number",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn problem(&self, assessment_id: Uuid, problem_id: Uuid) -> Result<CodingProblem> {
        sqlx::query_as::<_, CodingProblem>(
            "SELECT * FROM coding_problems WHERE id = $1 AND assessment_id = $2",
        )
        .bind(problem_id)
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Problem not found in this assessment".to_string()))
    }

    pub async fn test_cases(&self, problem_id: Uuid) -> Result<Vec<TestCase>> {
        let rows = sqlx::query_as::<_, TestCase>(
            "SELECT * FROM test_cases WHERE problem_id = $1 ORDER BY case_number",
        )
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn test_cases_by_problem(&self, assessment_id: Uuid) -> Result<HashMap<Uuid, Vec<TestCase>>> {
        let rows = sqlx::query_as::<_, TestCase>(
            r#"
            SELECT tc.* FROM test_cases tc
            JOIN coding_problems p ON p.id = tc.problem_id
            WHERE p.assessment_id = $1
            ORDER BY tc.problem_id, tc.case_number
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<TestCase>> = HashMap::new();
        for tc in rows {
            grouped.entry(tc.problem_id).or_default().push(tc);
        }
        Ok(grouped)
    }

    pub async fn total_marks(&self, assessment: &Assessment) -> Result<i32> {
        Ok(match assessment.assessment_type {
            AssessmentType::Quiz => GradingService::quiz_total_marks(&self.questions(assessment.id).await?),
            AssessmentType::Coding => GradingService::coding_total_marks(&self.problems(assessment.id).await?),
        })
    }

    /// Questions/problems as a student sees them inside `attempt_id`.
    pub async fn student_content(
        &self,
        assessment: &Assessment,
        attempt_id: Uuid,
    ) -> Result<(Vec<StudentQuizQuestion>, Vec<StudentCodingProblem>)> {
        match assessment.assessment_type {
            AssessmentType::Quiz => {
                let mut questions: Vec<StudentQuizQuestion> =
                    self.questions(assessment.id).await?.iter().map(Into::into).collect();
                if assessment.shuffle_questions {
                    shuffle_for_attempt(&mut questions, attempt_id);
                }
                Ok((questions, Vec::new()))
            }
            AssessmentType::Coding => {
                let cases = self.test_cases_by_problem(assessment.id).await?;
                let mut problems: Vec<StudentCodingProblem> = self
                    .problems(assessment.id)
                    .await?
                    .iter()
                    .map(|p| {
                        let tcs = cases.get(&p.id).map(Vec::as_slice).unwrap_or_default();
                        StudentCodingProblem::from_problem(p, tcs)
                    })
                    .collect();
                if assessment.shuffle_questions {
                    shuffle_for_attempt(&mut problems, attempt_id);
                }
                Ok((Vec::new(), problems))
            }
        }
    }
}

fn student_summary(row: StudentSummaryRow) -> StudentAssessmentSummary {
    let a = row.assessment;
    StudentAssessmentSummary {
        status: a.status(),
        id: a.id,
        title: a.title,
        description: a.description,
        instructions: a.instructions,
        assessment_type: a.assessment_type,
        college: a.college,
        branch: a.branch,
        start_time: a.start_time,
        end_time: a.end_time,
        allow_tab_switch: a.allow_tab_switch,
        max_tab_switches: a.max_tab_switches,
        max_attempts: a.max_attempts,
        total_marks: row.total_marks,
        item_count: row.item_count,
        attempts_used: row.attempts_used,
        in_progress_attempt_id: row.in_progress_attempt_id,
    }
}

pub fn ensure_visible(assessment: &Assessment, user: &AuthUser) -> Result<()> {
    if !assessment.is_visible_to(user.college.as_deref(), user.branch.as_deref()) {
        return Err(Error::Forbidden(
            "This assessment is not available for your college or branch".to_string(),
        ));
    }
    Ok(())
}

fn validate_window(start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> Result<()> {
    if end <= start {
        return Err(Error::BadRequest("end_time must be after start_time".to_string()));
    }
    Ok(())
}

/// Cross-field checks the derive validators cannot express.
pub fn validate_content(
    kind: AssessmentType,
    questions: &[QuizQuestionPayload],
    problems: &[CodingProblemPayload],
) -> Result<()> {
    match kind {
        AssessmentType::Quiz => {
            if questions.is_empty() {
                return Err(Error::BadRequest("A quiz needs at least one question".to_string()));
            }
            if !problems.is_empty() {
                return Err(Error::BadRequest("A quiz cannot contain coding problems".to_string()));
            }
        }
        AssessmentType::Coding => {
            if problems.is_empty() {
                return Err(Error::BadRequest("A coding assessment needs at least one problem".to_string()));
            }
            if !questions.is_empty() {
                return Err(Error::BadRequest(
                    "A coding assessment cannot contain quiz questions".to_string(),
                ));
            }
        }
    }

    for (idx, q) in questions.iter().enumerate() {
        if !q.options.contains(&q.correct_option) {
            return Err(Error::BadRequest(format!(
                "Question {}: correct_option must be one of the options",
                idx + 1
            )));
        }
    }

    let question_numbers = questions
        .iter()
        .enumerate()
        .map(|(idx, q)| q.question_number.unwrap_or(idx as i32 + 1));
    ensure_unique(question_numbers, "question_number")?;
    let problem_numbers = problems
        .iter()
        .enumerate()
        .map(|(idx, p)| p.problem_number.unwrap_or(idx as i32 + 1));
    ensure_unique(problem_numbers, "problem_number")?;

    Ok(())
}

fn ensure_unique(numbers: impl Iterator<Item = i32>, field: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for n in numbers {
        if !seen.insert(n) {
            return Err(Error::BadRequest(format!("Duplicate {} {}", field, n)));
        }
    }
    Ok(())
}

/// Order is a pure function of the attempt id, so a resumed attempt sees the
/// same sequence.
pub fn shuffle_for_attempt<T>(items: &mut [T], attempt_id: Uuid) {
    let mut rng = StdRng::seed_from_u64(attempt_id.as_u128() as u64);
    items.shuffle(&mut rng);
}
