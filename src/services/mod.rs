pub mod assessment_service;
pub mod attempt_service;
pub mod export_service;
pub mod grading_service;
pub mod judge_service;
pub mod judging_service;
pub mod report_service;
pub mod runner_service;
pub mod submission_service;
