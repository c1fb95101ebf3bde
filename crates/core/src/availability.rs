//! Content availability evaluation.
//!
//! Two layers:
//!
//! - [`is_content_available`] decides a single rule for a single student.
//!   A per-student override short-circuits everything; otherwise the
//!   trigger kind is evaluated. Missing data (no enrollment, no progress,
//!   no quiz attempt, unset trigger field, unknown trigger) is *unavailable*.
//! - [`get_content_availability`] resolves one piece of content under a
//!   schedule. Content with no matching rule is *available*.
//!
//! The two defaults are deliberately opposite. Unconfigured content is
//! visible; a configured rule with a missing or unknown trigger field hides
//! the content. Do not make them consistent.
//!
//! Like the rest of `core`, nothing here touches the database: the caller
//! loads the schedule, its rules and the [`StudentContext`] up front.

use std::collections::HashMap;

use chrono::Duration;
use serde::Serialize;

use crate::release::{ReleaseStrategy, TriggerKind};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The evaluation-relevant fields of one release rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleCondition<'a> {
    pub rule_id: DbId,
    /// Raw trigger string as stored. Unknown values evaluate to unavailable.
    pub trigger: &'a str,
    pub offset_days: Option<i32>,
    pub release_date: Option<Timestamp>,
    pub is_manually_unlocked: bool,
    pub required_progress_percentage: Option<f64>,
    pub required_quiz_id: Option<DbId>,
    pub required_quiz_score: Option<f64>,
}

/// Which content a rule is bound to.
pub trait RuleTarget {
    fn section_id(&self) -> Option<DbId>;
    fn lecture_id(&self) -> Option<DbId>;
    fn quiz_id(&self) -> Option<DbId>;
}

/// A rule that can be both matched against content and evaluated.
pub trait ReleaseRuleData: RuleTarget {
    fn condition(&self) -> RuleCondition<'_>;
}

/// The content object whose visibility is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentRef {
    Lecture { id: DbId, section_id: Option<DbId> },
    Section { id: DbId },
    Quiz { id: DbId },
}

/// Schedule-level switches consulted before any rule lookup.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleSettings<'a> {
    /// Raw strategy string as stored.
    pub strategy: &'a str,
    pub unlock_all: bool,
}

/// Everything known about one student relevant to one course.
#[derive(Debug, Clone, Default)]
pub struct StudentContext {
    /// When the student enrolled in the course, if enrolled.
    pub enrolled_at: Option<Timestamp>,
    /// Overall progress percentage, if a progress record exists.
    pub progress_percentage: Option<f64>,
    /// Per-rule overrides for this student, keyed by rule id.
    pub overrides: HashMap<DbId, bool>,
    /// Best completed-attempt score per quiz. A quiz is present only if the
    /// student has at least one completed attempt.
    pub best_quiz_scores: HashMap<DbId, f64>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// What decided a content item's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// `unlock_all` set or self-paced strategy.
    ScheduleUnlocked,
    /// No rule targets the content.
    NoRule,
    /// A per-student override.
    Override,
    /// The rule's trigger evaluation.
    Rule,
}

/// The resolved availability of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub available: bool,
    pub source: DecisionSource,
    pub rule_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Rule evaluation
// ---------------------------------------------------------------------------

/// Decide whether a single rule releases its content to a student at `now`.
///
/// Never fails: every lookup miss resolves to `false`.
pub fn is_content_available(
    rule: &RuleCondition<'_>,
    student: &StudentContext,
    now: Timestamp,
) -> bool {
    if let Some(&released) = student.overrides.get(&rule.rule_id) {
        return released;
    }
    evaluate_trigger(rule, student, now)
}

fn evaluate_trigger(rule: &RuleCondition<'_>, student: &StudentContext, now: Timestamp) -> bool {
    let Ok(trigger) = TriggerKind::from_str_value(rule.trigger) else {
        return false;
    };

    match trigger {
        TriggerKind::SpecificDate => rule.release_date.is_some_and(|date| now >= date),
        TriggerKind::ProgressThreshold => {
            match (student.progress_percentage, rule.required_progress_percentage) {
                (Some(progress), Some(required)) => progress >= required,
                _ => false,
            }
        }
        // Prerequisite item lookup is not implemented; the trigger never releases.
        TriggerKind::AfterCompletion => false,
        TriggerKind::EnrollmentOffset => {
            unlocks_at(rule, student.enrolled_at).is_some_and(|unlock| now >= unlock)
        }
        TriggerKind::Manual => rule.is_manually_unlocked,
        TriggerKind::QuizCompletion => rule
            .required_quiz_id
            .is_some_and(|quiz_id| student.best_quiz_scores.contains_key(&quiz_id)),
        TriggerKind::QuizScore => match (rule.required_quiz_id, rule.required_quiz_score) {
            (Some(quiz_id), Some(required)) => student
                .best_quiz_scores
                .get(&quiz_id)
                .is_some_and(|&best| best >= required),
            _ => false,
        },
    }
}

/// The instant a time-based rule releases its content, if it is time-based
/// and has the data to compute it.
pub fn unlocks_at(rule: &RuleCondition<'_>, enrolled_at: Option<Timestamp>) -> Option<Timestamp> {
    match TriggerKind::from_str_value(rule.trigger).ok()? {
        TriggerKind::SpecificDate => rule.release_date,
        TriggerKind::EnrollmentOffset => {
            let days = rule.offset_days?;
            enrolled_at?.checked_add_signed(Duration::days(i64::from(days)))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Schedule resolution
// ---------------------------------------------------------------------------

/// Whether the schedule releases everything without consulting rules.
pub fn schedule_bypasses_rules(schedule: &ScheduleSettings<'_>) -> bool {
    schedule.unlock_all
        || ReleaseStrategy::from_str_value(schedule.strategy)
            .is_ok_and(|s| s == ReleaseStrategy::SelfPaced)
}

/// Pick the single rule that governs `content`.
///
/// A lecture prefers a rule bound to the lecture itself, then falls back to
/// a rule bound to its parent section with no lecture set. Sections and
/// quizzes only match rules bound directly to them.
pub fn select_rule<'r, R: RuleTarget>(rules: &'r [R], content: &ContentRef) -> Option<&'r R> {
    match *content {
        ContentRef::Lecture { id, section_id } => rules
            .iter()
            .find(|r| r.lecture_id() == Some(id))
            .or_else(|| {
                let section_id = section_id?;
                rules.iter().find(|r| is_section_rule(*r, section_id))
            }),
        ContentRef::Section { id } => rules.iter().find(|r| is_section_rule(*r, id)),
        ContentRef::Quiz { id } => rules.iter().find(|r| r.quiz_id() == Some(id)),
    }
}

fn is_section_rule<R: RuleTarget>(rule: &R, section_id: DbId) -> bool {
    rule.section_id() == Some(section_id) && rule.lecture_id().is_none() && rule.quiz_id().is_none()
}

/// Resolve a content item's availability for a student, with the source of
/// the decision.
pub fn resolve_content<R: ReleaseRuleData>(
    schedule: &ScheduleSettings<'_>,
    rules: &[R],
    content: &ContentRef,
    student: &StudentContext,
    now: Timestamp,
) -> Resolution {
    if schedule_bypasses_rules(schedule) {
        return Resolution {
            available: true,
            source: DecisionSource::ScheduleUnlocked,
            rule_id: None,
        };
    }

    let Some(rule) = select_rule(rules, content) else {
        // Unconfigured content is visible.
        return Resolution {
            available: true,
            source: DecisionSource::NoRule,
            rule_id: None,
        };
    };

    let condition = rule.condition();
    let source = if student.overrides.contains_key(&condition.rule_id) {
        DecisionSource::Override
    } else {
        DecisionSource::Rule
    };

    Resolution {
        available: is_content_available(&condition, student, now),
        source,
        rule_id: Some(condition.rule_id),
    }
}

/// Whether `content` is visible to the student under `schedule` at `now`.
pub fn get_content_availability<R: ReleaseRuleData>(
    schedule: &ScheduleSettings<'_>,
    rules: &[R],
    content: &ContentRef,
    student: &StudentContext,
    now: Timestamp,
) -> bool {
    resolve_content(schedule, rules, content, student, now).available
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::release::*;

    // -----------------------------------------------------------------------
    // Fixtures
    // -----------------------------------------------------------------------

    #[derive(Debug, Clone)]
    struct TestRule {
        id: DbId,
        section_id: Option<DbId>,
        lecture_id: Option<DbId>,
        quiz_id: Option<DbId>,
        trigger: &'static str,
        offset_days: Option<i32>,
        release_date: Option<Timestamp>,
        is_manually_unlocked: bool,
        required_progress_percentage: Option<f64>,
        required_quiz_id: Option<DbId>,
        required_quiz_score: Option<f64>,
    }

    impl TestRule {
        fn new(id: DbId, trigger: &'static str) -> Self {
            Self {
                id,
                section_id: None,
                lecture_id: None,
                quiz_id: None,
                trigger,
                offset_days: None,
                release_date: None,
                is_manually_unlocked: false,
                required_progress_percentage: None,
                required_quiz_id: None,
                required_quiz_score: None,
            }
        }

        fn on_lecture(mut self, id: DbId) -> Self {
            self.lecture_id = Some(id);
            self
        }

        fn on_section(mut self, id: DbId) -> Self {
            self.section_id = Some(id);
            self
        }

        fn on_quiz(mut self, id: DbId) -> Self {
            self.quiz_id = Some(id);
            self
        }
    }

    impl RuleTarget for TestRule {
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

    impl ReleaseRuleData for TestRule {
        fn condition(&self) -> RuleCondition<'_> {
            RuleCondition {
                rule_id: self.id,
                trigger: self.trigger,
                offset_days: self.offset_days,
                release_date: self.release_date,
                is_manually_unlocked: self.is_manually_unlocked,
                required_progress_percentage: self.required_progress_percentage,
                required_quiz_id: self.required_quiz_id,
                required_quiz_score: self.required_quiz_score,
            }
        }
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
    }

    fn gated() -> ScheduleSettings<'static> {
        ScheduleSettings {
            strategy: STRATEGY_FIXED_DATES,
            unlock_all: false,
        }
    }

    fn available(rule: &TestRule, student: &StudentContext, now: Timestamp) -> bool {
        is_content_available(&rule.condition(), student, now)
    }

    // -----------------------------------------------------------------------
    // Overrides
    // -----------------------------------------------------------------------

    #[test]
    fn override_release_beats_failing_rule() {
        let rule = TestRule::new(1, TRIGGER_SPECIFIC_DATE);
        let mut student = StudentContext::default();
        student.overrides.insert(1, true);
        assert!(available(&rule, &student, t0()));
    }

    #[test]
    fn override_lock_beats_passing_rule() {
        let mut rule = TestRule::new(1, TRIGGER_MANUAL);
        rule.is_manually_unlocked = true;
        let mut student = StudentContext::default();
        student.overrides.insert(1, false);
        assert!(!available(&rule, &student, t0()));
    }

    #[test]
    fn override_applies_even_to_unknown_trigger() {
        let rule = TestRule::new(1, "bogus");
        let mut student = StudentContext::default();
        student.overrides.insert(1, true);
        assert!(available(&rule, &student, t0()));
    }

    #[test]
    fn override_for_other_rule_ignored() {
        let rule = TestRule::new(1, TRIGGER_MANUAL);
        let mut student = StudentContext::default();
        student.overrides.insert(2, true);
        assert!(!available(&rule, &student, t0()));
    }

    // -----------------------------------------------------------------------
    // Specific date
    // -----------------------------------------------------------------------

    #[test]
    fn date_rule_without_date_is_closed() {
        let rule = TestRule::new(1, TRIGGER_SPECIFIC_DATE);
        assert!(!available(&rule, &StudentContext::default(), t0()));
    }

    #[test]
    fn date_rule_opens_at_release_instant() {
        let mut rule = TestRule::new(1, TRIGGER_SPECIFIC_DATE);
        rule.release_date = Some(t0());
        let student = StudentContext::default();
        assert!(!available(&rule, &student, t0() - Duration::seconds(1)));
        assert!(available(&rule, &student, t0()));
    }

    // -----------------------------------------------------------------------
    // Enrollment offset
    // -----------------------------------------------------------------------

    #[test]
    fn offset_rule_opens_after_offset_days() {
        let mut rule = TestRule::new(1, TRIGGER_ENROLLMENT_OFFSET);
        rule.offset_days = Some(7);
        let student = StudentContext {
            enrolled_at: Some(t0()),
            ..Default::default()
        };
        assert!(!available(&rule, &student, t0() + Duration::days(6)));
        assert!(available(&rule, &student, t0() + Duration::days(7)));
    }

    #[test]
    fn offset_rule_closed_without_enrollment() {
        let mut rule = TestRule::new(1, TRIGGER_ENROLLMENT_OFFSET);
        rule.offset_days = Some(0);
        assert!(!available(&rule, &StudentContext::default(), t0()));
    }

    #[test]
    fn offset_rule_closed_without_days() {
        let rule = TestRule::new(1, TRIGGER_ENROLLMENT_OFFSET);
        let student = StudentContext {
            enrolled_at: Some(t0()),
            ..Default::default()
        };
        assert!(!available(&rule, &student, t0() + Duration::days(365)));
    }

    // -----------------------------------------------------------------------
    // Progress threshold
    // -----------------------------------------------------------------------

    #[test]
    fn progress_rule_compares_percentage() {
        let mut rule = TestRule::new(1, TRIGGER_PROGRESS_THRESHOLD);
        rule.required_progress_percentage = Some(50.0);
        let below = StudentContext {
            progress_percentage: Some(49.99),
            ..Default::default()
        };
        let at = StudentContext {
            progress_percentage: Some(50.0),
            ..Default::default()
        };
        assert!(!available(&rule, &below, t0()));
        assert!(available(&rule, &at, t0()));
    }

    #[test]
    fn progress_rule_closed_without_progress_record() {
        let mut rule = TestRule::new(1, TRIGGER_PROGRESS_THRESHOLD);
        rule.required_progress_percentage = Some(0.0);
        assert!(!available(&rule, &StudentContext::default(), t0()));
    }

    #[test]
    fn progress_rule_closed_without_threshold() {
        let rule = TestRule::new(1, TRIGGER_PROGRESS_THRESHOLD);
        let student = StudentContext {
            progress_percentage: Some(100.0),
            ..Default::default()
        };
        assert!(!available(&rule, &student, t0()));
    }

    // -----------------------------------------------------------------------
    // Remaining triggers
    // -----------------------------------------------------------------------

    #[test]
    fn after_completion_never_releases() {
        let rule = TestRule::new(1, TRIGGER_AFTER_COMPLETION);
        let student = StudentContext {
            enrolled_at: Some(t0()),
            progress_percentage: Some(100.0),
            ..Default::default()
        };
        assert!(!available(&rule, &student, t0()));
    }

    #[test]
    fn manual_rule_follows_flag() {
        let mut rule = TestRule::new(1, TRIGGER_MANUAL);
        assert!(!available(&rule, &StudentContext::default(), t0()));
        rule.is_manually_unlocked = true;
        assert!(available(&rule, &StudentContext::default(), t0()));
    }

    #[test]
    fn quiz_completion_needs_completed_attempt() {
        let mut rule = TestRule::new(1, TRIGGER_QUIZ_COMPLETION);
        rule.required_quiz_id = Some(9);
        let mut student = StudentContext::default();
        assert!(!available(&rule, &student, t0()));
        student.best_quiz_scores.insert(9, 12.5);
        assert!(available(&rule, &student, t0()));
    }

    #[test]
    fn quiz_score_uses_best_attempt() {
        let mut rule = TestRule::new(1, TRIGGER_QUIZ_SCORE);
        rule.required_quiz_id = Some(9);
        rule.required_quiz_score = Some(80.0);
        let mut student = StudentContext::default();
        student.best_quiz_scores.insert(9, 79.0);
        assert!(!available(&rule, &student, t0()));
        student.best_quiz_scores.insert(9, 85.0);
        assert!(available(&rule, &student, t0()));
    }

    #[test]
    fn unknown_trigger_is_closed() {
        let mut rule = TestRule::new(1, "lunar_phase");
        rule.is_manually_unlocked = true;
        assert!(!available(&rule, &StudentContext::default(), t0()));
    }

    // -----------------------------------------------------------------------
    // unlocks_at
    // -----------------------------------------------------------------------

    #[test]
    fn unlocks_at_for_time_based_triggers() {
        let mut offset = TestRule::new(1, TRIGGER_ENROLLMENT_OFFSET);
        offset.offset_days = Some(3);
        assert_eq!(
            unlocks_at(&offset.condition(), Some(t0())),
            Some(t0() + Duration::days(3))
        );
        assert_eq!(unlocks_at(&offset.condition(), None), None);

        let manual = TestRule::new(2, TRIGGER_MANUAL);
        assert_eq!(unlocks_at(&manual.condition(), Some(t0())), None);
    }

    // -----------------------------------------------------------------------
    // Rule selection
    // -----------------------------------------------------------------------

    #[test]
    fn lecture_prefers_direct_rule_over_section_rule() {
        let rules = vec![
            TestRule::new(1, TRIGGER_MANUAL).on_section(10),
            TestRule::new(2, TRIGGER_MANUAL).on_lecture(100),
        ];
        let content = ContentRef::Lecture {
            id: 100,
            section_id: Some(10),
        };
        assert_eq!(select_rule(&rules, &content).map(|r| r.id), Some(2));
    }

    #[test]
    fn lecture_falls_back_to_section_rule() {
        let rules = vec![TestRule::new(1, TRIGGER_MANUAL).on_section(10)];
        let content = ContentRef::Lecture {
            id: 100,
            section_id: Some(10),
        };
        assert_eq!(select_rule(&rules, &content).map(|r| r.id), Some(1));
    }

    #[test]
    fn lecture_without_section_has_no_fallback() {
        let rules = vec![TestRule::new(1, TRIGGER_MANUAL).on_section(10)];
        let content = ContentRef::Lecture {
            id: 100,
            section_id: None,
        };
        assert!(select_rule(&rules, &content).is_none());
    }

    #[test]
    fn section_ignores_lecture_rules() {
        let mut lecture_rule = TestRule::new(1, TRIGGER_MANUAL).on_lecture(100);
        lecture_rule.section_id = Some(10);
        let rules = vec![lecture_rule];
        assert!(select_rule(&rules, &ContentRef::Section { id: 10 }).is_none());
    }

    #[test]
    fn quiz_matches_only_quiz_rules() {
        let rules = vec![
            TestRule::new(1, TRIGGER_MANUAL).on_section(10),
            TestRule::new(2, TRIGGER_MANUAL).on_quiz(5),
        ];
        assert_eq!(
            select_rule(&rules, &ContentRef::Quiz { id: 5 }).map(|r| r.id),
            Some(2)
        );
        assert!(select_rule(&rules, &ContentRef::Quiz { id: 6 }).is_none());
    }

    // -----------------------------------------------------------------------
    // Schedule resolution
    // -----------------------------------------------------------------------

    #[test]
    fn unconfigured_content_is_available() {
        let rules: Vec<TestRule> = vec![TestRule::new(1, TRIGGER_MANUAL).on_lecture(1)];
        let content = ContentRef::Lecture {
            id: 2,
            section_id: None,
        };
        let resolution = resolve_content(&gated(), &rules, &content, &StudentContext::default(), t0());
        assert!(resolution.available);
        assert_eq!(resolution.source, DecisionSource::NoRule);
    }

    #[test]
    fn unlock_all_ignores_rules() {
        let schedule = ScheduleSettings {
            strategy: STRATEGY_FIXED_DATES,
            unlock_all: true,
        };
        let rules = vec![TestRule::new(1, TRIGGER_SPECIFIC_DATE).on_lecture(1)];
        let content = ContentRef::Lecture {
            id: 1,
            section_id: None,
        };
        let mut student = StudentContext::default();
        student.overrides.insert(1, false);
        assert!(get_content_availability(&schedule, &rules, &content, &student, t0()));
    }

    #[test]
    fn self_paced_ignores_rules() {
        let schedule = ScheduleSettings {
            strategy: STRATEGY_SELF_PACED,
            unlock_all: false,
        };
        let rules = vec![TestRule::new(1, TRIGGER_MANUAL).on_quiz(3)];
        let resolution = resolve_content(
            &schedule,
            &rules,
            &ContentRef::Quiz { id: 3 },
            &StudentContext::default(),
            t0(),
        );
        assert_matches!(
            resolution,
            Resolution {
                available: true,
                source: DecisionSource::ScheduleUnlocked,
                rule_id: None
            }
        );
    }

    #[test]
    fn matched_rule_is_evaluated() {
        let rules = vec![TestRule::new(7, TRIGGER_SPECIFIC_DATE).on_section(10)];
        let content = ContentRef::Lecture {
            id: 100,
            section_id: Some(10),
        };
        let resolution = resolve_content(&gated(), &rules, &content, &StudentContext::default(), t0());
        assert!(!resolution.available);
        assert_eq!(resolution.source, DecisionSource::Rule);
        assert_eq!(resolution.rule_id, Some(7));
    }

    #[test]
    fn override_reported_as_source() {
        let rules = vec![TestRule::new(7, TRIGGER_SPECIFIC_DATE).on_quiz(2)];
        let mut student = StudentContext::default();
        student.overrides.insert(7, true);
        let resolution = resolve_content(&gated(), &rules, &ContentRef::Quiz { id: 2 }, &student, t0());
        assert!(resolution.available);
        assert_eq!(resolution.source, DecisionSource::Override);
    }
}
