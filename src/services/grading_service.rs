use crate::models::answer::StudentAnswer;
use crate::models::question::{CodingProblem, QuizQuestion};
use crate::models::submission::{CodeSubmission, SubmissionStatus};
use std::cmp::Ordering;
use uuid::Uuid;

/// Pure scoring rules shared by the attempt lifecycle and reporting.
pub struct GradingService;

impl GradingService {
    /// `round(score / total_marks * 100)`, or 0 when there is nothing to score.
    pub fn percentage(score: i32, total_marks: i32) -> i32 {
        if total_marks <= 0 {
            return 0;
        }
        ((score as f64 / total_marks as f64) * 100.0).round() as i32
    }

    /// Exact-match grading: full marks or nothing.
    pub fn grade_quiz_answer(question: &QuizQuestion, selected_option: &str) -> (bool, i32) {
        let is_correct = question.correct_option == selected_option;
        (is_correct, if is_correct { question.marks } else { 0 })
    }

    pub fn quiz_score(answers: &[StudentAnswer]) -> i32 {
        answers
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.marks_awarded)
            .sum()
    }

    pub fn quiz_total_marks(questions: &[QuizQuestion]) -> i32 {
        questions.iter().map(|q| q.marks).sum()
    }

    pub fn coding_total_marks(problems: &[CodingProblem]) -> i32 {
        problems.iter().map(|p| p.marks).sum()
    }

    /// `round(passed / total * marks)`, 0 when the problem has no test cases.
    pub fn submission_score(passed: i32, total: i32, marks: i32) -> i32 {
        if total <= 0 {
            return 0;
        }
        ((passed as f64 / total as f64) * marks as f64).round() as i32
    }

    pub fn submission_status(passed: i32, total: i32) -> SubmissionStatus {
        if total > 0 && passed == total {
            SubmissionStatus::Accepted
        } else {
            SubmissionStatus::WrongAnswer
        }
    }

    /// Orders two submissions so that the better one compares `Greater`:
    /// more passed cases, then faster (missing time is slowest), then earlier.
    pub fn compare_submissions(a: &CodeSubmission, b: &CodeSubmission) -> Ordering {
        a.passed_test_cases
            .cmp(&b.passed_test_cases)
            .then_with(|| match (a.execution_time, b.execution_time) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
    }

    pub fn best_submission<'a, I>(submissions: I) -> Option<&'a CodeSubmission>
    where
        I: IntoIterator<Item = &'a CodeSubmission>,
    {
        submissions
            .into_iter()
            .max_by(|a, b| Self::compare_submissions(a, b))
    }

    pub fn best_for_problem(
        submissions: &[CodeSubmission],
        problem_id: Uuid,
    ) -> Option<&CodeSubmission> {
        Self::best_submission(submissions.iter().filter(|s| s.problem_id == problem_id))
    }

    /// Sum over problems of the best submission's score. Derived from scratch
    /// every time, so repeated calls over the same rows agree.
    pub fn coding_score(problems: &[CodingProblem], submissions: &[CodeSubmission]) -> i32 {
        problems
            .iter()
            .map(|p| {
                Self::best_for_problem(submissions, p.id)
                    .map(|s| s.score)
                    .unwrap_or(0)
            })
            .sum()
    }
}
