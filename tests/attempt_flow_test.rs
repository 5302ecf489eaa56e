mod common;

use assessment_backend::dto::assessment_dto::{
    CodingProblemPayload, CreateAssessmentPayload, QuizQuestionPayload, TestCasePayload,
};
use assessment_backend::dto::attempt_dto::{CodePayload, SaveAnswerPayload};
use assessment_backend::error::Error;
use assessment_backend::middleware::auth::{AuthUser, Role};
use assessment_backend::models::assessment::AssessmentType;
use assessment_backend::models::attempt::{AttemptStatus, IntegrityCounters};
use assessment_backend::models::submission::SubmissionStatus;
use assessment_backend::AppState;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

async fn state() -> AppState {
    let config = common::config();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("pool");
    assessment_backend::database::pool::run_migrations(&pool)
        .await
        .expect("migrations");
    AppState::with_judge(pool, Arc::new(common::EchoJudge), config)
}

fn new_admin() -> AuthUser {
    AuthUser {
        id: format!("admin-{}", Uuid::new_v4()),
        role: Role::Admin,
        college: None,
        branch: None,
    }
}

fn new_student() -> AuthUser {
    AuthUser {
        id: format!("student-{}", Uuid::new_v4()),
        role: Role::Student,
        college: Some("GEC".into()),
        branch: Some("CSE".into()),
    }
}

fn question(text: &str, correct: &str, marks: i32) -> QuizQuestionPayload {
    QuizQuestionPayload {
        question_number: None,
        question: text.into(),
        options: vec!["A".into(), "B".into(), "C".into()],
        correct_option: correct.into(),
        marks,
        explanation: None,
    }
}

fn payload(kind: AssessmentType) -> CreateAssessmentPayload {
    let now = Utc::now();
    CreateAssessmentPayload {
        title: "Flow".into(),
        description: None,
        instructions: None,
        assessment_type: kind,
        college: "GEC".into(),
        branch: "CSE".into(),
        start_time: now - Duration::minutes(5),
        end_time: now + Duration::hours(1),
        allow_tab_switch: Some(true),
        max_tab_switches: Some(1),
        shuffle_questions: Some(false),
        show_results_immediately: Some(true),
        max_attempts: Some(1),
        is_active: Some(true),
        questions: Vec::new(),
        problems: Vec::new(),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn quiz_attempt_scores_and_resumes() {
    let state = state().await;
    let admin = new_admin();
    let student = new_student();

    let mut create = payload(AssessmentType::Quiz);
    create.questions = vec![
        question("q1", "A", 2),
        question("q2", "B", 3),
        question("q3", "C", 1),
    ];
    let detail = state.assessment_service.create(&admin.id, create).await.unwrap();
    let assessment_id = detail.assessment.id;

    let first = state.attempt_service.start(assessment_id, &student).await.unwrap();
    let again = state.attempt_service.start(assessment_id, &student).await.unwrap();
    assert!(!first.resumed);
    assert!(again.resumed);
    assert_eq!(first.attempt.id, again.attempt.id);

    let attempt_id = first.attempt.id;
    let answers = [("A", 0), ("C", 1), ("C", 2)];
    for (selected, idx) in answers {
        state
            .attempt_service
            .record_answer(
                attempt_id,
                &student,
                SaveAnswerPayload {
                    question_id: detail.questions[idx].id,
                    selected_option: selected.into(),
                },
            )
            .await
            .unwrap();
    }

    let bad = state
        .attempt_service
        .record_answer(
            attempt_id,
            &student,
            SaveAnswerPayload {
                question_id: detail.questions[0].id,
                selected_option: "Z".into(),
            },
        )
        .await;
    assert!(matches!(bad, Err(Error::BadRequest(_))));

    let submitted = state
        .attempt_service
        .submit_quiz(attempt_id, &student, IntegrityCounters::default())
        .await
        .unwrap();
    assert_eq!(submitted.status, AttemptStatus::Submitted);
    assert_eq!(submitted.score, 3);
    assert_eq!(submitted.total_marks, 6);
    assert_eq!(submitted.percentage, 50);

    let twice = state
        .attempt_service
        .submit_quiz(attempt_id, &student, IntegrityCounters::default())
        .await;
    assert!(matches!(
        twice,
        Err(Error::InvalidState { reason: "attempt_not_in_progress", .. })
    ));

    let limit = state.attempt_service.start(assessment_id, &student).await;
    assert!(matches!(
        limit,
        Err(Error::InvalidState { reason: "max_attempts_reached", .. })
    ));

    let attempt = state.attempt_service.get(attempt_id).await.unwrap();
    let result = state.report_service.student_result(&attempt, &student).await.unwrap();
    assert!(result.results_available);
    let breakdown = result.breakdown.unwrap();
    assert_eq!(breakdown.questions.len(), 3);
    assert!(breakdown.questions[0].is_correct);
    assert!(!breakdown.questions[1].is_correct);

    let assessment = state.assessment_service.get(assessment_id).await.unwrap();
    let analytics = state.report_service.analytics(&assessment).await.unwrap();
    assert_eq!(analytics.attempts.submitted, 1);
    assert_eq!(analytics.scores.max_score, Some(3));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn tab_switch_past_limit_auto_submits_once() {
    let state = state().await;
    let admin = new_admin();
    let student = new_student();

    let mut create = payload(AssessmentType::Quiz);
    create.questions = vec![question("q1", "A", 1)];
    let detail = state.assessment_service.create(&admin.id, create).await.unwrap();
    let started = state
        .attempt_service
        .start(detail.assessment.id, &student)
        .await
        .unwrap();
    let attempt_id = started.attempt.id;

    let first = state.attempt_service.record_tab_switch(attempt_id, &student).await.unwrap();
    assert!(!first.auto_submitted);
    assert_eq!(first.status, AttemptStatus::InProgress);

    let second = state.attempt_service.record_tab_switch(attempt_id, &student).await.unwrap();
    assert!(second.auto_submitted);
    assert_eq!(second.status, AttemptStatus::AutoSubmitted);

    let third = state.attempt_service.record_tab_switch(attempt_id, &student).await;
    assert!(matches!(third, Err(Error::InvalidState { .. })));

    let other = new_student();
    let foreign = state.attempt_service.record_tab_switch(attempt_id, &other).await;
    assert!(matches!(foreign, Err(Error::Forbidden(_))));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn coding_attempt_keeps_best_submission() {
    let state = state().await;
    let admin = new_admin();
    let student = new_student();

    let mut create = payload(AssessmentType::Coding);
    create.problems = vec![CodingProblemPayload {
        problem_number: None,
        title: "Sum".into(),
        description: "Add two numbers".into(),
        input_format: None,
        output_format: None,
        constraints: None,
        marks: 10,
        time_limit_seconds: None,
        memory_limit_kb: None,
        test_cases: vec![
            TestCasePayload {
                input: "1 2".into(),
                expected_output: "3".into(),
                is_hidden: false,
            },
            TestCasePayload {
                input: "5 5".into(),
                expected_output: "10".into(),
                is_hidden: true,
            },
        ],
    }];
    let detail = state.assessment_service.create(&admin.id, create).await.unwrap();
    let problem_id = detail.problems[0].problem.id;
    let started = state
        .attempt_service
        .start(detail.assessment.id, &student)
        .await
        .unwrap();
    let attempt_id = started.attempt.id;

    let quiz_write = state
        .attempt_service
        .record_answer(
            attempt_id,
            &student,
            SaveAnswerPayload {
                question_id: Uuid::new_v4(),
                selected_option: "A".into(),
            },
        )
        .await;
    assert!(matches!(
        quiz_write,
        Err(Error::InvalidState { reason: "wrong_assessment_type", .. })
    ));

    let (wrong, job) = state
        .attempt_service
        .submit_code(
            attempt_id,
            problem_id,
            &student,
            CodePayload {
                source_code: "print('guess')".into(),
                language: "python".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(wrong.status, SubmissionStatus::Pending);
    let judged = state.judging_service.process(&job).await.unwrap().unwrap();
    assert_eq!(judged.status, SubmissionStatus::WrongAnswer);
    assert_eq!(judged.passed_test_cases, 0);

    // A stale job for an already judged submission changes nothing.
    assert!(state.judging_service.process(&job).await.unwrap().is_none());

    let (_, job) = state
        .attempt_service
        .submit_code(
            attempt_id,
            problem_id,
            &student,
            CodePayload {
                source_code: "def solve(): pass".into(),
                language: "python".into(),
            },
        )
        .await
        .unwrap();
    let judged = state.judging_service.process(&job).await.unwrap().unwrap();
    assert_eq!(judged.status, SubmissionStatus::Accepted);
    assert_eq!(judged.score, 10);

    let best = state
        .submission_service
        .best_for(attempt_id, problem_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(best.id, judged.id);

    let once = state.attempt_service.recompute_coding_score(attempt_id).await.unwrap();
    let twice = state.attempt_service.recompute_coding_score(attempt_id).await.unwrap();
    assert_eq!(once, Some(10));
    assert_eq!(once, twice);

    let submitted = state
        .attempt_service
        .submit_coding(
            attempt_id,
            &student,
            IntegrityCounters {
                tab_switches: Some(0),
                fullscreen_exits: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(submitted.status, AttemptStatus::Submitted);
    assert_eq!(submitted.score, 10);
    assert_eq!(submitted.percentage, 100);
    assert_eq!(submitted.fullscreen_exits, 2);

    // Re-deriving a finalized attempt leaves its score and status alone.
    assert_eq!(
        state.attempt_service.recompute_coding_score(attempt_id).await.unwrap(),
        Some(10)
    );
    let after = state.attempt_service.get(attempt_id).await.unwrap();
    assert_eq!(after.status, AttemptStatus::Submitted);
    assert_eq!(after.score, 10);
}

fn sum_problem(marks: i32) -> CodingProblemPayload {
    CodingProblemPayload {
        problem_number: None,
        title: "Sum".into(),
        description: "Add two numbers".into(),
        input_format: None,
        output_format: None,
        constraints: None,
        marks,
        time_limit_seconds: None,
        memory_limit_kb: None,
        test_cases: vec![TestCasePayload {
            input: "1 2".into(),
            expected_output: "3".into(),
            is_hidden: false,
        }],
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn submission_judged_after_final_submit_still_counts() {
    let state = state().await;
    let admin = new_admin();
    let student = new_student();

    let mut create = payload(AssessmentType::Coding);
    create.problems = vec![sum_problem(10)];
    let detail = state.assessment_service.create(&admin.id, create).await.unwrap();
    let problem_id = detail.problems[0].problem.id;
    let attempt_id = state
        .attempt_service
        .start(detail.assessment.id, &student)
        .await
        .unwrap()
        .attempt
        .id;

    let (_, job) = state
        .attempt_service
        .submit_code(
            attempt_id,
            problem_id,
            &student,
            CodePayload {
                source_code: "def solve(): pass".into(),
                language: "python".into(),
            },
        )
        .await
        .unwrap();

    let submitted = state
        .attempt_service
        .submit_coding(attempt_id, &student, IntegrityCounters::default())
        .await
        .unwrap();
    assert_eq!(submitted.score, 0);

    let judged = state.judging_service.process(&job).await.unwrap().unwrap();
    assert_eq!(judged.status, SubmissionStatus::Accepted);

    let attempt = state.attempt_service.get(attempt_id).await.unwrap();
    assert_eq!(attempt.status, AttemptStatus::Submitted);
    assert_eq!(attempt.score, 10);
    assert_eq!(attempt.percentage, 100);
    assert_eq!(attempt.submit_time, submitted.submit_time);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn expiry_sweep_closes_overdue_attempts() {
    let state = state().await;
    let admin = new_admin();
    let student = new_student();

    let mut create = payload(AssessmentType::Quiz);
    create.end_time = Utc::now() + Duration::seconds(2);
    create.questions = vec![question("q1", "A", 2)];
    let detail = state.assessment_service.create(&admin.id, create).await.unwrap();
    let attempt_id = state
        .attempt_service
        .start(detail.assessment.id, &student)
        .await
        .unwrap()
        .attempt
        .id;
    state
        .attempt_service
        .record_answer(
            attempt_id,
            &student,
            SaveAnswerPayload {
                question_id: detail.questions[0].id,
                selected_option: "A".into(),
            },
        )
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    let expired = state.attempt_service.expire_overdue().await.unwrap();
    assert!(expired >= 1);

    let attempt = state.attempt_service.get(attempt_id).await.unwrap();
    assert_eq!(attempt.status, AttemptStatus::Expired);
    assert_eq!(attempt.score, 2);
    assert_eq!(attempt.end_time, Some(detail.assessment.end_time));
}
