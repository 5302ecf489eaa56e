pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    assessment_service::{AssessmentService, ProblemDefaults},
    attempt_service::AttemptService,
    judge_service::{Judge, Judge0Client},
    judging_service::JudgingService,
    report_service::ReportService,
    runner_service::TestCaseRunner,
    submission_service::SubmissionService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub assessment_service: AssessmentService,
    pub attempt_service: AttemptService,
    pub submission_service: SubmissionService,
    pub judging_service: JudgingService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let judge = Judge0Client::from_config(config)?;
        Ok(Self::with_judge(pool, Arc::new(judge), config))
    }

    /// Wires every service around the given judge.
    pub fn with_judge(pool: PgPool, judge: Arc<dyn Judge>, config: &Config) -> Self {
        let defaults = ProblemDefaults {
            time_limit_seconds: config.default_cpu_time_limit,
            memory_limit_kb: config.default_memory_limit_kb,
        };

        let assessment_service = AssessmentService::new(pool.clone(), defaults);
        let submission_service = SubmissionService::new(pool.clone());
        let attempt_service = AttemptService::new(
            pool.clone(),
            assessment_service.clone(),
            submission_service.clone(),
        );
        let runner = TestCaseRunner::new(
            judge,
            Duration::from_secs(config.judge_case_timeout_secs),
        );
        let judging_service = JudgingService::new(
            runner,
            submission_service.clone(),
            attempt_service.clone(),
        );
        let report_service = ReportService::new(pool.clone(), assessment_service.clone());

        Self {
            pool,
            assessment_service,
            attempt_service,
            submission_service,
            judging_service,
            report_service,
        }
    }
}
