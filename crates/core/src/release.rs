//! Content release configuration: strategies, trigger kinds and validation.
//!
//! Schedules and rules are persisted with their strategy / trigger stored as
//! snake_case strings. This module owns the canonical string values and the
//! checks that keep a rule's populated fields consistent with its trigger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STRATEGY_FIXED_DATES: &str = "fixed_dates";
pub const STRATEGY_RELATIVE_TO_ENROLLMENT: &str = "relative_to_enrollment";
pub const STRATEGY_SELF_PACED: &str = "self_paced";
pub const STRATEGY_DRIP: &str = "drip";

/// All valid release strategy strings.
pub const VALID_STRATEGIES: &[&str] = &[
    STRATEGY_FIXED_DATES,
    STRATEGY_RELATIVE_TO_ENROLLMENT,
    STRATEGY_SELF_PACED,
    STRATEGY_DRIP,
];

pub const TRIGGER_ENROLLMENT_OFFSET: &str = "enrollment_offset";
pub const TRIGGER_SPECIFIC_DATE: &str = "specific_date";
pub const TRIGGER_AFTER_COMPLETION: &str = "after_completion";
pub const TRIGGER_PROGRESS_THRESHOLD: &str = "progress_threshold";
pub const TRIGGER_MANUAL: &str = "manual";
pub const TRIGGER_QUIZ_COMPLETION: &str = "quiz_completion";
pub const TRIGGER_QUIZ_SCORE: &str = "quiz_score";

/// All valid trigger kind strings.
pub const VALID_TRIGGERS: &[&str] = &[
    TRIGGER_ENROLLMENT_OFFSET,
    TRIGGER_SPECIFIC_DATE,
    TRIGGER_AFTER_COMPLETION,
    TRIGGER_PROGRESS_THRESHOLD,
    TRIGGER_MANUAL,
    TRIGGER_QUIZ_COMPLETION,
    TRIGGER_QUIZ_SCORE,
];

/// Maximum offset accepted for enrollment-relative rules (ten years).
pub const MAX_OFFSET_DAYS: i32 = 3650;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a course releases its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStrategy {
    FixedDates,
    RelativeToEnrollment,
    SelfPaced,
    Drip,
}

impl ReleaseStrategy {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            STRATEGY_FIXED_DATES => Ok(Self::FixedDates),
            STRATEGY_RELATIVE_TO_ENROLLMENT => Ok(Self::RelativeToEnrollment),
            STRATEGY_SELF_PACED => Ok(Self::SelfPaced),
            STRATEGY_DRIP => Ok(Self::Drip),
            _ => Err(format!(
                "Invalid release strategy '{s}'. Must be one of: {}",
                VALID_STRATEGIES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedDates => STRATEGY_FIXED_DATES,
            Self::RelativeToEnrollment => STRATEGY_RELATIVE_TO_ENROLLMENT,
            Self::SelfPaced => STRATEGY_SELF_PACED,
            Self::Drip => STRATEGY_DRIP,
        }
    }
}

/// The condition that drives a rule's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    EnrollmentOffset,
    SpecificDate,
    AfterCompletion,
    ProgressThreshold,
    Manual,
    QuizCompletion,
    QuizScore,
}

impl TriggerKind {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            TRIGGER_ENROLLMENT_OFFSET => Ok(Self::EnrollmentOffset),
            TRIGGER_SPECIFIC_DATE => Ok(Self::SpecificDate),
            TRIGGER_AFTER_COMPLETION => Ok(Self::AfterCompletion),
            TRIGGER_PROGRESS_THRESHOLD => Ok(Self::ProgressThreshold),
            TRIGGER_MANUAL => Ok(Self::Manual),
            TRIGGER_QUIZ_COMPLETION => Ok(Self::QuizCompletion),
            TRIGGER_QUIZ_SCORE => Ok(Self::QuizScore),
            _ => Err(format!(
                "Invalid trigger '{s}'. Must be one of: {}",
                VALID_TRIGGERS.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnrollmentOffset => TRIGGER_ENROLLMENT_OFFSET,
            Self::SpecificDate => TRIGGER_SPECIFIC_DATE,
            Self::AfterCompletion => TRIGGER_AFTER_COMPLETION,
            Self::ProgressThreshold => TRIGGER_PROGRESS_THRESHOLD,
            Self::Manual => TRIGGER_MANUAL,
            Self::QuizCompletion => TRIGGER_QUIZ_COMPLETION,
            Self::QuizScore => TRIGGER_QUIZ_SCORE,
        }
    }

    /// Whether the trigger depends on a prerequisite quiz.
    pub fn is_quiz_based(&self) -> bool {
        matches!(self, Self::QuizCompletion | Self::QuizScore)
    }
}

// ---------------------------------------------------------------------------
// Rule configuration
// ---------------------------------------------------------------------------

/// The trigger-relevant fields of a rule, as submitted or stored.
///
/// Borrowed view so both create DTOs and persisted rows can be validated
/// without cloning.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleFields<'a> {
    pub section_id: Option<DbId>,
    pub lecture_id: Option<DbId>,
    pub quiz_id: Option<DbId>,
    pub offset_days: Option<i32>,
    pub release_date: Option<Timestamp>,
    pub required_progress_percentage: Option<f64>,
    pub required_completion_item: Option<&'a str>,
    pub required_quiz_id: Option<DbId>,
    pub required_quiz_score: Option<f64>,
}

/// Validate that a rule targets exactly one of section, lecture or quiz.
pub fn validate_rule_target(fields: &RuleFields<'_>) -> Result<(), String> {
    let targets = [fields.section_id, fields.lecture_id, fields.quiz_id]
        .iter()
        .filter(|t| t.is_some())
        .count();
    match targets {
        1 => Ok(()),
        0 => Err("A release rule must target a section, a lecture or a quiz".to_string()),
        _ => Err(
            "A release rule must target exactly one of section, lecture or quiz".to_string(),
        ),
    }
}

/// Validate that the populated fields of a rule match its trigger kind.
///
/// Fields belonging to another trigger must be left empty; a combination
/// that would be silently ignored at evaluation time is rejected here.
pub fn validate_rule_config(trigger: TriggerKind, fields: &RuleFields<'_>) -> Result<(), String> {
    validate_rule_target(fields)?;

    let has_offset = fields.offset_days.is_some();
    let has_date = fields.release_date.is_some();
    let has_progress = fields.required_progress_percentage.is_some();
    let has_item = fields.required_completion_item.is_some();
    let has_quiz = fields.required_quiz_id.is_some() || fields.required_quiz_score.is_some();

    let name = trigger.as_str();
    let reject_extra = |present: bool, field: &str| -> Result<(), String> {
        if present {
            Err(format!("'{field}' must not be set for trigger '{name}'"))
        } else {
            Ok(())
        }
    };

    match trigger {
        TriggerKind::EnrollmentOffset => {
            let days = fields
                .offset_days
                .ok_or_else(|| format!("'offset_days' is required for trigger '{name}'"))?;
            if !(0..=MAX_OFFSET_DAYS).contains(&days) {
                return Err(format!(
                    "'offset_days' must be between 0 and {MAX_OFFSET_DAYS}, got {days}"
                ));
            }
            reject_extra(has_date, "release_date")?;
            reject_extra(has_progress, "required_progress_percentage")?;
            reject_extra(has_item, "required_completion_item")?;
            reject_extra(has_quiz, "required_quiz_id")?;
        }
        TriggerKind::SpecificDate => {
            if !has_date {
                return Err(format!("'release_date' is required for trigger '{name}'"));
            }
            reject_extra(has_offset, "offset_days")?;
            reject_extra(has_progress, "required_progress_percentage")?;
            reject_extra(has_item, "required_completion_item")?;
            reject_extra(has_quiz, "required_quiz_id")?;
        }
        TriggerKind::ProgressThreshold => {
            let pct = fields.required_progress_percentage.ok_or_else(|| {
                format!("'required_progress_percentage' is required for trigger '{name}'")
            })?;
            validate_percentage("required_progress_percentage", pct)?;
            reject_extra(has_offset, "offset_days")?;
            reject_extra(has_date, "release_date")?;
            reject_extra(has_item, "required_completion_item")?;
            reject_extra(has_quiz, "required_quiz_id")?;
        }
        TriggerKind::AfterCompletion => {
            match fields.required_completion_item {
                Some(item) if !item.trim().is_empty() => {}
                _ => {
                    return Err(format!(
                        "'required_completion_item' is required for trigger '{name}'"
                    ))
                }
            }
            reject_extra(has_offset, "offset_days")?;
            reject_extra(has_date, "release_date")?;
            reject_extra(has_progress, "required_progress_percentage")?;
            reject_extra(has_quiz, "required_quiz_id")?;
        }
        TriggerKind::QuizCompletion | TriggerKind::QuizScore => {
            if fields.required_quiz_id.is_none() {
                return Err(format!("'required_quiz_id' is required for trigger '{name}'"));
            }
            if trigger == TriggerKind::QuizScore {
                let score = fields.required_quiz_score.ok_or_else(|| {
                    format!("'required_quiz_score' is required for trigger '{name}'")
                })?;
                validate_percentage("required_quiz_score", score)?;
            } else {
                reject_extra(fields.required_quiz_score.is_some(), "required_quiz_score")?;
            }
            reject_extra(has_offset, "offset_days")?;
            reject_extra(has_date, "release_date")?;
            reject_extra(has_progress, "required_progress_percentage")?;
            reject_extra(has_item, "required_completion_item")?;
        }
        TriggerKind::Manual => {
            reject_extra(has_offset, "offset_days")?;
            reject_extra(has_date, "release_date")?;
            reject_extra(has_progress, "required_progress_percentage")?;
            reject_extra(has_item, "required_completion_item")?;
            reject_extra(has_quiz, "required_quiz_id")?;
        }
    }

    Ok(())
}

fn validate_percentage(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("'{field}' must be between 0 and 100, got {value}"))
    }
}

// ---------------------------------------------------------------------------
// Schedule configuration
// ---------------------------------------------------------------------------

/// Validate schedule-level settings for a strategy.
pub fn validate_schedule_config(
    strategy: ReleaseStrategy,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    days_between_releases: Option<i32>,
) -> Result<(), String> {
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(format!(
                "'start_date' ({start}) must not be after 'end_date' ({end})"
            ));
        }
    }

    if let Some(days) = days_between_releases {
        if days < 0 {
            return Err(format!(
                "'days_between_releases' must not be negative, got {days}"
            ));
        }
    }

    if strategy == ReleaseStrategy::Drip {
        match days_between_releases {
            Some(days) if days > 0 => {}
            _ => {
                return Err(
                    "'days_between_releases' must be greater than 0 for the drip strategy"
                        .to_string(),
                )
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn lecture_fields() -> RuleFields<'static> {
        RuleFields {
            lecture_id: Some(1),
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // String round-trips
    // -----------------------------------------------------------------------

    #[test]
    fn every_trigger_string_parses() {
        for s in VALID_TRIGGERS {
            assert_eq!(TriggerKind::from_str_value(s).unwrap().as_str(), *s);
        }
    }

    #[test]
    fn every_strategy_string_parses() {
        for s in VALID_STRATEGIES {
            assert_eq!(ReleaseStrategy::from_str_value(s).unwrap().as_str(), *s);
        }
    }

    #[test]
    fn unknown_trigger_lists_valid_values() {
        let err = TriggerKind::from_str_value("lunar_phase").unwrap_err();
        assert!(err.contains("lunar_phase"));
        assert!(err.contains("quiz_score"));
    }

    // -----------------------------------------------------------------------
    // Target exclusivity
    // -----------------------------------------------------------------------

    #[test]
    fn rule_without_target_rejected() {
        let fields = RuleFields {
            offset_days: Some(3),
            ..Default::default()
        };
        assert!(validate_rule_target(&fields).is_err());
    }

    #[test]
    fn rule_with_two_targets_rejected() {
        let fields = RuleFields {
            section_id: Some(1),
            lecture_id: Some(2),
            ..Default::default()
        };
        let err = validate_rule_target(&fields).unwrap_err();
        assert!(err.contains("exactly one"));
    }

    // -----------------------------------------------------------------------
    // Trigger / field consistency
    // -----------------------------------------------------------------------

    #[test]
    fn offset_rule_requires_days() {
        let err = validate_rule_config(TriggerKind::EnrollmentOffset, &lecture_fields()).unwrap_err();
        assert!(err.contains("offset_days"));
    }

    #[test]
    fn offset_rule_rejects_negative_days() {
        let fields = RuleFields {
            offset_days: Some(-1),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::EnrollmentOffset, &fields).is_err());
    }

    #[test]
    fn offset_rule_valid() {
        let fields = RuleFields {
            offset_days: Some(7),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::EnrollmentOffset, &fields).is_ok());
    }

    #[test]
    fn date_rule_requires_date() {
        let err = validate_rule_config(TriggerKind::SpecificDate, &lecture_fields()).unwrap_err();
        assert!(err.contains("release_date"));
    }

    #[test]
    fn date_rule_rejects_offset() {
        let fields = RuleFields {
            release_date: Some(Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()),
            offset_days: Some(2),
            ..lecture_fields()
        };
        let err = validate_rule_config(TriggerKind::SpecificDate, &fields).unwrap_err();
        assert!(err.contains("offset_days"));
    }

    #[test]
    fn progress_rule_range_checked() {
        let fields = RuleFields {
            required_progress_percentage: Some(120.0),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::ProgressThreshold, &fields).is_err());

        let fields = RuleFields {
            required_progress_percentage: Some(50.0),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::ProgressThreshold, &fields).is_ok());
    }

    #[test]
    fn completion_rule_rejects_blank_item() {
        let fields = RuleFields {
            required_completion_item: Some("   "),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::AfterCompletion, &fields).is_err());
    }

    #[test]
    fn quiz_rule_requires_quiz_reference() {
        let err = validate_rule_config(TriggerKind::QuizCompletion, &lecture_fields()).unwrap_err();
        assert!(err.contains("required_quiz_id"));
    }

    #[test]
    fn quiz_score_rule_requires_score() {
        let fields = RuleFields {
            required_quiz_id: Some(4),
            ..lecture_fields()
        };
        let err = validate_rule_config(TriggerKind::QuizScore, &fields).unwrap_err();
        assert!(err.contains("required_quiz_score"));
    }

    #[test]
    fn quiz_completion_rejects_score() {
        let fields = RuleFields {
            required_quiz_id: Some(4),
            required_quiz_score: Some(80.0),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::QuizCompletion, &fields).is_err());
    }

    #[test]
    fn manual_rule_rejects_any_trigger_field() {
        let fields = RuleFields {
            required_progress_percentage: Some(10.0),
            ..lecture_fields()
        };
        assert!(validate_rule_config(TriggerKind::Manual, &fields).is_err());
        assert!(validate_rule_config(TriggerKind::Manual, &lecture_fields()).is_ok());
    }

    // -----------------------------------------------------------------------
    // Schedule configuration
    // -----------------------------------------------------------------------

    #[test]
    fn schedule_dates_must_be_ordered() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1);
        let end = NaiveDate::from_ymd_opt(2026, 2, 1);
        assert!(validate_schedule_config(ReleaseStrategy::FixedDates, start, end, None).is_err());
    }

    #[test]
    fn drip_requires_positive_interval() {
        assert!(validate_schedule_config(ReleaseStrategy::Drip, None, None, None).is_err());
        assert!(validate_schedule_config(ReleaseStrategy::Drip, None, None, Some(0)).is_err());
        assert!(validate_schedule_config(ReleaseStrategy::Drip, None, None, Some(7)).is_ok());
    }

    #[test]
    fn self_paced_accepts_no_settings() {
        assert!(validate_schedule_config(ReleaseStrategy::SelfPaced, None, None, None).is_ok());
    }
}
