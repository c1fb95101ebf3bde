//! Release schedules, rules and per-student overrides.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use lms_core::availability::{ReleaseRuleData, RuleCondition, RuleTarget, ScheduleSettings};
use lms_core::release::RuleFields;
use lms_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// A row from the `release_schedules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReleaseSchedule {
    pub id: DbId,
    pub course_id: DbId,
    pub strategy: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub unlock_all: bool,
    pub days_between_releases: Option<i32>,
    pub release_time: NaiveTime,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ReleaseSchedule {
    pub fn settings(&self) -> ScheduleSettings<'_> {
        ScheduleSettings {
            strategy: &self.strategy,
            unlock_all: self.unlock_all,
        }
    }
}

/// DTO for creating a release schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReleaseSchedule {
    pub course_id: DbId,
    pub strategy: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub unlock_all: bool,
    pub days_between_releases: Option<i32>,
    pub release_time: Option<NaiveTime>,
}

/// DTO for updating a release schedule. All fields optional.
///
/// The nullable settings use `Option<Option<T>>`: an absent field keeps the
/// stored value, an explicit `null` clears it.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReleaseSchedule {
    pub strategy: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub unlock_all: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub days_between_releases: Option<Option<i32>>,
    pub release_time: Option<NaiveTime>,
}

impl UpdateReleaseSchedule {
    /// The schedule settings after applying this patch to `existing`.
    pub fn merged_with(&self, existing: &ReleaseSchedule) -> ReleaseSchedule {
        ReleaseSchedule {
            strategy: self.strategy.clone().unwrap_or_else(|| existing.strategy.clone()),
            start_date: self.start_date.unwrap_or(existing.start_date),
            end_date: self.end_date.unwrap_or(existing.end_date),
            unlock_all: self.unlock_all.unwrap_or(existing.unlock_all),
            days_between_releases: self
                .days_between_releases
                .unwrap_or(existing.days_between_releases),
            release_time: self.release_time.unwrap_or(existing.release_time),
            ..existing.clone()
        }
    }
}

/// Deserialize a present field (including `null`) as `Some`, so that a
/// missing field stays `None` through `#[serde(default)]`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A row from the `release_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReleaseRule {
    pub id: DbId,
    pub schedule_id: DbId,
    pub section_id: Option<DbId>,
    pub lecture_id: Option<DbId>,
    pub quiz_id: Option<DbId>,
    pub trigger_kind: String,
    pub offset_days: Option<i32>,
    pub release_date: Option<Timestamp>,
    pub is_manually_unlocked: bool,
    pub required_progress_percentage: Option<f64>,
    pub required_completion_item: Option<String>,
    pub required_quiz_id: Option<DbId>,
    pub required_quiz_score: Option<f64>,
    pub calendar_event_id: Option<DbId>,
    pub is_released: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ReleaseRule {
    /// Trigger-relevant fields for validation.
    pub fn fields(&self) -> RuleFields<'_> {
        RuleFields {
            section_id: self.section_id,
            lecture_id: self.lecture_id,
            quiz_id: self.quiz_id,
            offset_days: self.offset_days,
            release_date: self.release_date,
            required_progress_percentage: self.required_progress_percentage,
            required_completion_item: self.required_completion_item.as_deref(),
            required_quiz_id: self.required_quiz_id,
            required_quiz_score: self.required_quiz_score,
        }
    }
}

impl RuleTarget for ReleaseRule {
    fn section_id(&self) -> Option<DbId> {
        self.section_id
    }

    fn lecture_id(&self) -> Option<DbId> {
        self.lecture_id
    }

    fn quiz_id(&self) -> Option<DbId> {
        self.quiz_id
    }
}

impl ReleaseRuleData for ReleaseRule {
    fn condition(&self) -> RuleCondition<'_> {
        RuleCondition {
            rule_id: self.id,
            trigger: &self.trigger_kind,
            offset_days: self.offset_days,
            release_date: self.release_date,
            is_manually_unlocked: self.is_manually_unlocked,
            required_progress_percentage: self.required_progress_percentage,
            required_quiz_id: self.required_quiz_id,
            required_quiz_score: self.required_quiz_score,
        }
    }
}

/// DTO for creating a rule. `schedule_id` comes from the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReleaseRule {
    pub section_id: Option<DbId>,
    pub lecture_id: Option<DbId>,
    pub quiz_id: Option<DbId>,
    pub trigger_kind: String,
    pub offset_days: Option<i32>,
    pub release_date: Option<Timestamp>,
    #[serde(default)]
    pub is_manually_unlocked: bool,
    pub required_progress_percentage: Option<f64>,
    pub required_completion_item: Option<String>,
    pub required_quiz_id: Option<DbId>,
    pub required_quiz_score: Option<f64>,
}

impl CreateReleaseRule {
    /// Trigger-relevant fields for validation.
    pub fn fields(&self) -> RuleFields<'_> {
        RuleFields {
            section_id: self.section_id,
            lecture_id: self.lecture_id,
            quiz_id: self.quiz_id,
            offset_days: self.offset_days,
            release_date: self.release_date,
            required_progress_percentage: self.required_progress_percentage,
            required_completion_item: self.required_completion_item.as_deref(),
            required_quiz_id: self.required_quiz_id,
            required_quiz_score: self.required_quiz_score,
        }
    }
}

/// DTO for replacing a rule's trigger configuration.
///
/// The target is immutable; the full trigger configuration is resubmitted so
/// fields belonging to a previous trigger are cleared rather than merged.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReleaseRule {
    pub trigger_kind: String,
    pub offset_days: Option<i32>,
    pub release_date: Option<Timestamp>,
    #[serde(default)]
    pub is_manually_unlocked: bool,
    pub required_progress_percentage: Option<f64>,
    pub required_completion_item: Option<String>,
    pub required_quiz_id: Option<DbId>,
    pub required_quiz_score: Option<f64>,
}

impl UpdateReleaseRule {
    /// Fields for validation, combined with the existing rule's target.
    pub fn fields_for<'a>(&'a self, existing: &ReleaseRule) -> RuleFields<'a> {
        RuleFields {
            section_id: existing.section_id,
            lecture_id: existing.lecture_id,
            quiz_id: existing.quiz_id,
            offset_days: self.offset_days,
            release_date: self.release_date,
            required_progress_percentage: self.required_progress_percentage,
            required_completion_item: self.required_completion_item.as_deref(),
            required_quiz_id: self.required_quiz_id,
            required_quiz_score: self.required_quiz_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Student overrides
// ---------------------------------------------------------------------------

/// A row from the `student_progress_overrides` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentProgressOverride {
    pub id: DbId,
    pub rule_id: DbId,
    pub student_id: DbId,
    pub override_release_date: Option<Timestamp>,
    pub is_released: bool,
    pub notes: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or replacing a student's override on a rule.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertProgressOverride {
    pub override_release_date: Option<Timestamp>,
    pub is_released: bool,
    #[serde(default)]
    pub notes: String,
}
