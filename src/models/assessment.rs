use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    Quiz,
    Coding,
}

impl AssessmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentType::Quiz => "quiz",
            AssessmentType::Coding => "coding",
        }
    }
}

impl TryFrom<String> for AssessmentType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "quiz" => Ok(AssessmentType::Quiz),
            "coding" => Ok(AssessmentType::Coding),
            _ => Err(ParseEnumError::new("assessment type", value)),
        }
    }
}

/// Derived from `is_active` and the start/end window; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Inactive,
    Upcoming,
    Active,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    #[sqlx(try_from = "String")]
    pub assessment_type: AssessmentType,
    pub college: String,
    pub branch: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub allow_tab_switch: bool,
    pub max_tab_switches: i32,
    pub shuffle_questions: bool,
    pub show_results_immediately: bool,
    pub max_attempts: i32,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn status_at(&self, now: DateTime<Utc>) -> AssessmentStatus {
        if !self.is_active {
            AssessmentStatus::Inactive
        } else if now < self.start_time {
            AssessmentStatus::Upcoming
        } else if now > self.end_time {
            AssessmentStatus::Expired
        } else {
            AssessmentStatus::Active
        }
    }

    pub fn status(&self) -> AssessmentStatus {
        self.status_at(Utc::now())
    }

    pub fn window_closed_at(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    /// Scores are shown once the window closes, or right away when configured.
    pub fn results_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.show_results_immediately || self.window_closed_at(now)
    }

    pub fn integrity_policy(&self) -> IntegrityPolicy {
        IntegrityPolicy {
            allow_tab_switch: self.allow_tab_switch,
            max_tab_switches: self.max_tab_switches,
        }
    }

    /// Students whose token carries no college/branch are not scoped.
    pub fn is_visible_to(&self, college: Option<&str>, branch: Option<&str>) -> bool {
        college.map_or(true, |c| c.eq_ignore_ascii_case(&self.college))
            && branch.map_or(true, |b| b.eq_ignore_ascii_case(&self.branch))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityPolicy {
    pub allow_tab_switch: bool,
    pub max_tab_switches: i32,
}

impl IntegrityPolicy {
    /// Whether an attempt that has reached `tab_switches` must be force-submitted.
    pub fn is_violated_by(&self, tab_switches: i32) -> bool {
        !self.allow_tab_switch || tab_switches > self.max_tab_switches
    }
}
