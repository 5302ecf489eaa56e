use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::attempt_dto::AttemptView;
use crate::dto::report_dto::{
    AssessmentAnalytics, AttemptBreakdown, AttemptListItem, AttemptListQuery, AttemptListResponse,
    BestSubmissionSummary, ProblemBreakdown, ProblemStat, QuestionBreakdown, QuestionStat,
    ScoreSummary, StatusCounts, StudentResult,
};
use crate::dto::{page_bounds, total_pages};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::answer::StudentAnswer;
use crate::models::assessment::{Assessment, AssessmentType};
use crate::models::attempt::{AttemptStatus, StudentAttempt};
use crate::models::question::{CodingProblem, QuizQuestion};
use crate::models::submission::CodeSubmission;
use crate::services::assessment_service::AssessmentService;
use crate::services::grading_service::GradingService;
use crate::utils::time::now;

/// Read-only reporting over attempts; nothing here writes.
#[derive(Clone)]
pub struct ReportService {
    pool: PgPool,
    assessments: AssessmentService,
}

impl ReportService {
    pub fn new(pool: PgPool, assessments: AssessmentService) -> Self {
        Self { pool, assessments }
    }

    pub async fn analytics(&self, assessment: &Assessment) -> Result<AssessmentAnalytics> {
        let attempts = self.attempts_for(assessment.id).await?;
        let finalized: Vec<StudentAttempt> = attempts
            .iter()
            .filter(|a| a.status.is_terminal())
            .cloned()
            .collect();
        let finalized_ids: Vec<Uuid> = finalized.iter().map(|a| a.id).collect();

        let (questions, problems, total_marks) = match assessment.assessment_type {
            AssessmentType::Quiz => {
                let questions = self.assessments.questions(assessment.id).await?;
                let answers = self.answers_for(&finalized_ids).await?;
                let total = GradingService::quiz_total_marks(&questions);
                (question_stats(&questions, &answers, finalized.len()), Vec::new(), total)
            }
            AssessmentType::Coding => {
                let problems = self.assessments.problems(assessment.id).await?;
                let submissions = self.submissions_for(&finalized_ids).await?;
                let total = GradingService::coding_total_marks(&problems);
                (Vec::new(), problem_stats(&problems, &finalized_ids, &submissions), total)
            }
        };

        Ok(AssessmentAnalytics {
            assessment_id: assessment.id,
            title: assessment.title.clone(),
            assessment_type: assessment.assessment_type,
            total_marks,
            attempts: status_counts(&attempts),
            scores: score_summary(&finalized),
            questions,
            problems,
        })
    }

    pub async fn list_attempts(&self, assessment_id: Uuid, query: AttemptListQuery) -> Result<AttemptListResponse> {
        let (page, per_page, offset) = page_bounds(query.page, query.per_page);
        let status = query.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, StudentAttempt>(
            r#"
            SELECT * FROM student_attempts
            WHERE assessment_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY start_time DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(assessment_id)
        .bind(status)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM student_attempts
            WHERE assessment_id = $1
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(assessment_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(|a| AttemptListItem {
                student_id: a.student_id.clone(),
                attempt: AttemptView::from(a),
            })
            .collect();

        Ok(AttemptListResponse {
            items,
            total,
            page,
            per_page,
            total_pages: total_pages(total, per_page),
        })
    }

    pub async fn breakdown(&self, attempt: &StudentAttempt, assessment: &Assessment) -> Result<AttemptBreakdown> {
        let (questions, problems) = match assessment.assessment_type {
            AssessmentType::Quiz => {
                let questions = self.assessments.questions(assessment.id).await?;
                let answers = self.answers_for(&[attempt.id]).await?;
                (quiz_breakdown(&questions, &answers), Vec::new())
            }
            AssessmentType::Coding => {
                let problems = self.assessments.problems(assessment.id).await?;
                let submissions = self.submissions_for(&[attempt.id]).await?;
                (Vec::new(), coding_breakdown(&problems, &submissions))
            }
        };

        Ok(AttemptBreakdown {
            student_id: attempt.student_id.clone(),
            assessment_id: assessment.id,
            assessment_title: assessment.title.clone(),
            assessment_type: assessment.assessment_type,
            attempt: AttemptView::from(attempt),
            questions,
            problems,
        })
    }

    /// The caller's own finalized attempt, with the score withheld until the
    /// assessment releases results.
    pub async fn student_result(&self, attempt: &StudentAttempt, user: &AuthUser) -> Result<StudentResult> {
        attempt.ensure_owned_by(&user.id)?;
        if !attempt.status.is_terminal() {
            return Err(Error::invalid_state(
                "attempt_not_finalized",
                "Results are available after the attempt is submitted",
            ));
        }

        let assessment = self.assessments.get(attempt.assessment_id).await?;
        if !assessment.results_visible_at(now()) {
            return Ok(StudentResult {
                results_available: false,
                attempt: AttemptView::from(attempt).without_score(),
                breakdown: None,
            });
        }

        let breakdown = self.breakdown(attempt, &assessment).await?;
        Ok(StudentResult {
            results_available: true,
            attempt: AttemptView::from(attempt),
            breakdown: Some(breakdown),
        })
    }

    pub async fn finalized_attempts(&self, assessment_id: Uuid) -> Result<Vec<StudentAttempt>> {
        let rows = sqlx::query_as::<_, StudentAttempt>(
            r#"
            SELECT * FROM student_attempts
            WHERE assessment_id = $1 AND status <> 'in_progress'
            ORDER BY score DESC, submit_time ASC
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn attempts_for(&self, assessment_id: Uuid) -> Result<Vec<StudentAttempt>> {
        let rows = sqlx::query_as::<_, StudentAttempt>(
            "SELECT * FROM student_attempts WHERE assessment_id = $1",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn answers_for(&self, attempt_ids: &[Uuid]) -> Result<Vec<StudentAnswer>> {
        let rows = sqlx::query_as::<_, StudentAnswer>(
            "SELECT * FROM student_answers WHERE attempt_id = ANY($1)",
        )
        .bind(attempt_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn submissions_for(&self, attempt_ids: &[Uuid]) -> Result<Vec<CodeSubmission>> {
        let rows = sqlx::query_as::<_, CodeSubmission>(
            "SELECT * FROM code_submissions WHERE attempt_id = ANY($1) ORDER BY created_at",
        )
        .bind(attempt_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

pub fn status_counts(attempts: &[StudentAttempt]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for a in attempts {
        match a.status {
            AttemptStatus::InProgress => counts.in_progress += 1,
            AttemptStatus::Submitted => counts.submitted += 1,
            AttemptStatus::AutoSubmitted => counts.auto_submitted += 1,
            AttemptStatus::Expired => counts.expired += 1,
        }
    }
    counts
}

pub fn score_summary(finalized: &[StudentAttempt]) -> ScoreSummary {
    if finalized.is_empty() {
        return ScoreSummary::default();
    }
    let n = finalized.len() as f64;
    let scores = finalized.iter().map(|a| a.score);
    ScoreSummary {
        finalized: finalized.len() as i64,
        average_score: round2(finalized.iter().map(|a| a.score as f64).sum::<f64>() / n),
        min_score: scores.clone().min(),
        max_score: scores.max(),
        average_percentage: round2(finalized.iter().map(|a| a.percentage as f64).sum::<f64>() / n),
        total_tab_switches: finalized.iter().map(|a| a.tab_switches as i64).sum(),
    }
}

pub fn question_stats(questions: &[QuizQuestion], answers: &[StudentAnswer], finalized: usize) -> Vec<QuestionStat> {
    questions
        .iter()
        .map(|q| {
            let for_question = answers.iter().filter(|a| a.question_id == q.id);
            let answered = for_question.clone().count() as i64;
            let correct = for_question.filter(|a| a.is_correct).count() as i64;
            QuestionStat {
                question_id: q.id,
                question_number: q.question_number,
                question: q.question.clone(),
                answered,
                correct,
                correctness_rate: if finalized == 0 {
                    0.0
                } else {
                    round2(correct as f64 / finalized as f64 * 100.0)
                },
            }
        })
        .collect()
}

/// Per problem: how many finalized attempts tried it, their mean best pass
/// count, and how many solved every case.
pub fn problem_stats(problems: &[CodingProblem], attempt_ids: &[Uuid], submissions: &[CodeSubmission]) -> Vec<ProblemStat> {
    let mut by_attempt: HashMap<Uuid, Vec<&CodeSubmission>> = HashMap::new();
    for s in submissions {
        by_attempt.entry(s.attempt_id).or_default().push(s);
    }
    let finalized: HashSet<&Uuid> = attempt_ids.iter().collect();

    problems
        .iter()
        .map(|p| {
            let bests: Vec<&CodeSubmission> = by_attempt
                .iter()
                .filter(|(attempt_id, _)| finalized.contains(attempt_id))
                .filter_map(|(_, subs)| {
                    GradingService::best_submission(subs.iter().copied().filter(|s| s.problem_id == p.id))
                })
                .collect();
            let attempted = bests.len() as i64;
            let average_passed = if attempted == 0 {
                0.0
            } else {
                round2(bests.iter().map(|s| s.passed_test_cases as f64).sum::<f64>() / attempted as f64)
            };
            let full_solves = bests
                .iter()
                .filter(|s| s.total_test_cases > 0 && s.passed_test_cases == s.total_test_cases)
                .count() as i64;
            ProblemStat {
                problem_id: p.id,
                problem_number: p.problem_number,
                title: p.title.clone(),
                marks: p.marks,
                attempted,
                average_passed,
                full_solves,
            }
        })
        .collect()
}

pub fn quiz_breakdown(questions: &[QuizQuestion], answers: &[StudentAnswer]) -> Vec<QuestionBreakdown> {
    questions
        .iter()
        .map(|q| {
            let answer = answers.iter().find(|a| a.question_id == q.id);
            QuestionBreakdown {
                question_id: q.id,
                question_number: q.question_number,
                question: q.question.clone(),
                selected_option: answer.map(|a| a.selected_option.clone()),
                correct_option: q.correct_option.clone(),
                is_correct: answer.map(|a| a.is_correct).unwrap_or(false),
                marks_awarded: answer.map(|a| a.marks_awarded).unwrap_or(0),
                marks: q.marks,
                explanation: q.explanation.clone(),
            }
        })
        .collect()
}

pub fn coding_breakdown(problems: &[CodingProblem], submissions: &[CodeSubmission]) -> Vec<ProblemBreakdown> {
    problems
        .iter()
        .map(|p| {
            let best = GradingService::best_for_problem(submissions, p.id).map(|s| BestSubmissionSummary {
                submission_id: s.id,
                status: s.status,
                language: s.language.clone(),
                passed_test_cases: s.passed_test_cases,
                total_test_cases: s.total_test_cases,
                score: s.score,
                execution_time: s.execution_time,
            });
            ProblemBreakdown {
                problem_id: p.id,
                problem_number: p.problem_number,
                title: p.title.clone(),
                marks: p.marks,
                best,
                submission_count: submissions.iter().filter(|s| s.problem_id == p.id).count(),
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::grading_service::fixtures::{answer, problem, question, submission};
    use chrono::Utc;
    use sqlx::types::Json;

    fn attempt(status: AttemptStatus, score: i32, total: i32, tab_switches: i32) -> StudentAttempt {
        let now = Utc::now();
        StudentAttempt {
            id: Uuid::new_v4(),
            assessment_id: Uuid::nil(),
            student_id: "s".into(),
            attempt_number: 1,
            status,
            start_time: now,
            end_time: Some(now),
            submit_time: Some(now),
            score,
            total_marks: total,
            percentage: GradingService::percentage(score, total),
            tab_switches,
            tab_switch_log: Json(vec![]),
            fullscreen_exits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counts_and_summarises_finalized_attempts() {
        let attempts = vec![
            attempt(AttemptStatus::Submitted, 6, 6, 0),
            attempt(AttemptStatus::AutoSubmitted, 3, 6, 4),
            attempt(AttemptStatus::Expired, 0, 6, 1),
            attempt(AttemptStatus::InProgress, 2, 6, 0),
        ];
        let counts = status_counts(&attempts);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.finalized(), 3);

        let finalized: Vec<StudentAttempt> =
            attempts.into_iter().filter(|a| a.status.is_terminal()).collect();
        let summary = score_summary(&finalized);
        assert_eq!(summary.finalized, 3);
        assert_eq!(summary.average_score, 3.0);
        assert_eq!(summary.min_score, Some(0));
        assert_eq!(summary.max_score, Some(6));
        assert_eq!(summary.average_percentage, 50.0);
        assert_eq!(summary.total_tab_switches, 5);

        assert_eq!(score_summary(&[]), ScoreSummary::default());
    }

    #[test]
    fn question_correctness_is_over_finalized_attempts() {
        let q1 = question(1, "A", 1);
        let q2 = question(2, "B", 1);
        let answers = vec![answer(&q1, "A"), answer(&q1, "C"), answer(&q2, "B")];
        let stats = question_stats(&[q1, q2], &answers, 4);
        assert_eq!(stats[0].answered, 2);
        assert_eq!(stats[0].correct, 1);
        assert_eq!(stats[0].correctness_rate, 25.0);
        assert_eq!(stats[1].correctness_rate, 25.0);
    }

    #[test]
    fn problem_stats_use_best_submission_per_attempt() {
        let p = problem(1, 10);
        let attempt_a = Uuid::new_v4();
        let attempt_b = Uuid::new_v4();
        let open_attempt = Uuid::new_v4();

        let mut a1 = submission(&p, 1, 4, Some(0.1), 0);
        a1.attempt_id = attempt_a;
        let mut a2 = submission(&p, 4, 4, Some(0.2), 10);
        a2.attempt_id = attempt_a;
        let mut b1 = submission(&p, 2, 4, Some(0.1), 5);
        b1.attempt_id = attempt_b;
        let mut open = submission(&p, 4, 4, Some(0.1), 5);
        open.attempt_id = open_attempt;

        let stats = problem_stats(&[p], &[attempt_a, attempt_b], &[a1, a2, b1, open]);
        assert_eq!(stats[0].attempted, 2);
        assert_eq!(stats[0].average_passed, 3.0);
        assert_eq!(stats[0].full_solves, 1);
    }

    #[test]
    fn breakdowns_cover_unanswered_and_unsubmitted_items() {
        let q1 = question(1, "A", 2);
        let q2 = question(2, "B", 3);
        let rows = quiz_breakdown(&[q1.clone(), q2], &[answer(&q1, "A")]);
        assert!(rows[0].is_correct);
        assert_eq!(rows[0].marks_awarded, 2);
        assert_eq!(rows[1].selected_option, None);
        assert_eq!(rows[1].marks_awarded, 0);

        let p1 = problem(1, 10);
        let p2 = problem(2, 10);
        let subs = vec![submission(&p1, 1, 2, Some(0.3), 0), submission(&p1, 2, 2, Some(0.5), 9)];
        let rows = coding_breakdown(&[p1, p2], &subs);
        assert_eq!(rows[0].submission_count, 2);
        assert_eq!(rows[0].best.as_ref().map(|b| b.passed_test_cases), Some(2));
        assert_eq!(rows[0].best.as_ref().map(|b| b.score), Some(10));
        assert!(rows[1].best.is_none());
    }
}
