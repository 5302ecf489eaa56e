use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::ParseEnumError;
use crate::error::{Error, Result};

/// Lifecycle of one student's run through one assessment.
///
/// `InProgress` is the only non-terminal state; every other state is reached
/// from it exactly once and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    AutoSubmitted,
    Expired,
}

impl AttemptStatus {
    pub const ALL: [AttemptStatus; 4] = [
        AttemptStatus::InProgress,
        AttemptStatus::Submitted,
        AttemptStatus::AutoSubmitted,
        AttemptStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::AutoSubmitted => "auto_submitted",
            AttemptStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }

    pub fn can_transition_to(&self, next: AttemptStatus) -> bool {
        matches!(
            (self, next),
            (
                AttemptStatus::InProgress,
                AttemptStatus::Submitted | AttemptStatus::AutoSubmitted | AttemptStatus::Expired
            )
        )
    }
}

impl TryFrom<String> for AttemptStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        AttemptStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| ParseEnumError::new("attempt status", value))
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentAttempt {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub student_id: String,
    pub attempt_number: i32,
    #[sqlx(try_from = "String")]
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub submit_time: Option<DateTime<Utc>>,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: i32,
    pub tab_switches: i32,
    pub tab_switch_log: Json<Vec<DateTime<Utc>>>,
    pub fullscreen_exits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentAttempt {
    pub fn ensure_owned_by(&self, student_id: &str) -> Result<()> {
        if self.student_id != student_id {
            return Err(Error::Forbidden(
                "You do not have access to this attempt".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_in_progress(&self) -> Result<()> {
        if self.status != AttemptStatus::InProgress {
            return Err(Error::invalid_state(
                "attempt_not_in_progress",
                format!("Attempt is already {}", self.status),
            ));
        }
        Ok(())
    }

    /// Validates `next` against the transition table.
    pub fn ensure_can_become(&self, next: AttemptStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::invalid_state(
                "attempt_not_in_progress",
                format!("Cannot move attempt from {} to {}", self.status, next),
            ));
        }
        Ok(())
    }

    /// Whole seconds between start and end; `None` while the attempt is open.
    pub fn time_spent_seconds(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds().max(0))
    }
}

/// Client-reported integrity counters that replace the running ones at submit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IntegrityCounters {
    pub tab_switches: Option<i32>,
    pub fullscreen_exits: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(status: AttemptStatus) -> StudentAttempt {
        let now = Utc::now();
        StudentAttempt {
            id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            student_id: "student-1".into(),
            attempt_number: 1,
            status,
            start_time: now - chrono::Duration::seconds(125),
            end_time: None,
            submit_time: None,
            score: 0,
            total_marks: 10,
            percentage: 0,
            tab_switches: 0,
            tab_switch_log: Json(vec![]),
            fullscreen_exits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn transition_table_is_one_directional() {
        use AttemptStatus::*;
        for next in [Submitted, AutoSubmitted, Expired] {
            assert!(InProgress.can_transition_to(next));
        }
        assert!(!InProgress.can_transition_to(InProgress));
        for terminal in [Submitted, AutoSubmitted, Expired] {
            assert!(terminal.is_terminal());
            for next in AttemptStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in AttemptStatus::ALL {
            assert_eq!(AttemptStatus::try_from(status.as_str().to_string()).unwrap(), status);
        }
        assert!(AttemptStatus::try_from("completed".to_string()).is_err());
    }

    #[test]
    fn ownership_and_state_guards() {
        let open = attempt(AttemptStatus::InProgress);
        assert!(open.ensure_owned_by("student-1").is_ok());
        assert!(matches!(open.ensure_owned_by("student-2"), Err(Error::Forbidden(_))));
        assert!(open.ensure_in_progress().is_ok());

        let done = attempt(AttemptStatus::AutoSubmitted);
        assert!(matches!(
            done.ensure_in_progress(),
            Err(Error::InvalidState { reason: "attempt_not_in_progress", .. })
        ));
        assert!(done.ensure_can_become(AttemptStatus::Submitted).is_err());
    }

    #[test]
    fn time_spent_requires_end() {
        let mut a = attempt(AttemptStatus::InProgress);
        assert_eq!(a.time_spent_seconds(), None);
        a.end_time = Some(a.start_time + chrono::Duration::seconds(125));
        assert_eq!(a.time_spent_seconds(), Some(125));
    }
}
