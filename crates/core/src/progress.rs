//! Enrollment progress arithmetic and completion transitions.
//!
//! `CourseProgress` owns the set of completed lectures; the enrollment's
//! `progress_percentage`, `completed` and `completed_at` are derived from it.
//! [`recompute`] is the single function that derives them and must be called
//! after every mutation of the completed set, inside the same transaction.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// Points granted the first time an enrollment reaches completion.
pub const COURSE_COMPLETION_POINTS: i32 = 100;

/// Ledger reason recorded for the completion award.
pub const REASON_COURSE_COMPLETION: &str = "course_completion";

/// Percentage of lectures completed, rounded to two decimals.
///
/// A course without lectures reports 0.
pub fn progress_percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = completed as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Completion state
// ---------------------------------------------------------------------------

/// The derived completion fields of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionState {
    pub progress_percentage: f64,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
}

/// How a recomputation changed the completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTransition {
    Unchanged,
    /// The enrollment just reached completion.
    Completed,
    /// A completed enrollment dropped below the lecture total.
    Reverted,
}

/// Derive the new completion state from the completed-lecture count.
///
/// - Reaching `total` (with `total > 0`) marks the enrollment completed and
///   stamps `completed_at` once; an already completed enrollment keeps its
///   original timestamp.
/// - A completed enrollment whose count drops below `total`, or whose course
///   no longer has lectures, reverts to incomplete with `completed_at`
///   cleared.
pub fn recompute(
    completed_count: i64,
    total: i64,
    previous: &CompletionState,
    now: Timestamp,
) -> (CompletionState, CompletionTransition) {
    let progress_percentage = progress_percentage(completed_count, total);

    if total > 0 && completed_count >= total {
        if previous.completed {
            let state = CompletionState {
                progress_percentage,
                completed: true,
                completed_at: previous.completed_at.or(Some(now)),
            };
            return (state, CompletionTransition::Unchanged);
        }
        let state = CompletionState {
            progress_percentage,
            completed: true,
            completed_at: Some(now),
        };
        return (state, CompletionTransition::Completed);
    }

    if previous.completed {
        let state = CompletionState {
            progress_percentage,
            completed: false,
            completed_at: None,
        };
        return (state, CompletionTransition::Reverted);
    }

    let state = CompletionState {
        progress_percentage,
        ..*previous
    };
    (state, CompletionTransition::Unchanged)
}

// ---------------------------------------------------------------------------
// Mark-complete validation
// ---------------------------------------------------------------------------

/// Why a lecture could not be marked complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionRejection {
    /// The lecture belongs to another course than the enrollment.
    WrongCourse,
    /// The lecture is already in the completed set.
    AlreadyCompleted,
    /// The course is not published.
    CourseNotPublished,
}

impl CompletionRejection {
    /// Human-readable message for API responses.
    pub fn message(&self) -> &'static str {
        match self {
            Self::WrongCourse => "Lecture does not belong to the enrolled course",
            Self::AlreadyCompleted => "Lecture already completed",
            Self::CourseNotPublished => "Course is not published",
        }
    }
}

/// Facts needed to decide whether a lecture may be marked complete.
#[derive(Debug, Clone, Copy)]
pub struct CompletionCheck {
    pub enrollment_course_id: DbId,
    pub lecture_course_id: DbId,
    pub already_completed: bool,
    pub course_published: bool,
}

/// Validate a mark-complete request. Checks run in a fixed order: course
/// match, then duplicate, then publication.
pub fn check_mark_complete(check: &CompletionCheck) -> Result<(), CompletionRejection> {
    if check.lecture_course_id != check.enrollment_course_id {
        return Err(CompletionRejection::WrongCourse);
    }
    if check.already_completed {
        return Err(CompletionRejection::AlreadyCompleted);
    }
    if !check.course_published {
        return Err(CompletionRejection::CourseNotPublished);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
    }

    fn fresh() -> CompletionState {
        CompletionState {
            progress_percentage: 0.0,
            completed: false,
            completed_at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Percentage
    // -----------------------------------------------------------------------

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(progress_percentage(1, 3), 33.33);
        assert_eq!(progress_percentage(2, 3), 66.67);
        assert_eq!(progress_percentage(3, 3), 100.0);
    }

    #[test]
    fn percentage_with_no_lectures_is_zero() {
        assert_eq!(progress_percentage(0, 0), 0.0);
        assert_eq!(progress_percentage(5, 0), 0.0);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    #[test]
    fn partial_progress_stays_incomplete() {
        let (state, transition) = recompute(1, 4, &fresh(), t0());
        assert_eq!(state.progress_percentage, 25.0);
        assert!(!state.completed);
        assert_eq!(state.completed_at, None);
        assert_eq!(transition, CompletionTransition::Unchanged);
    }

    #[test]
    fn last_lecture_completes_enrollment() {
        let (state, transition) = recompute(3, 3, &fresh(), t0());
        assert!(state.completed);
        assert_eq!(state.completed_at, Some(t0()));
        assert_eq!(transition, CompletionTransition::Completed);
    }

    #[test]
    fn completion_timestamp_not_restamped() {
        let (first, _) = recompute(3, 3, &fresh(), t0());
        let (second, transition) = recompute(3, 3, &first, t0() + Duration::hours(1));
        assert_eq!(second.completed_at, Some(t0()));
        assert_eq!(transition, CompletionTransition::Unchanged);
    }

    #[test]
    fn dropping_below_total_reverts_completion() {
        let (done, _) = recompute(3, 3, &fresh(), t0());
        let (state, transition) = recompute(2, 3, &done, t0());
        assert!(!state.completed);
        assert_eq!(state.completed_at, None);
        assert_eq!(state.progress_percentage, 66.67);
        assert_eq!(transition, CompletionTransition::Reverted);
    }

    #[test]
    fn new_lecture_added_to_course_reverts_completion() {
        let (done, _) = recompute(3, 3, &fresh(), t0());
        let (state, transition) = recompute(3, 4, &done, t0());
        assert!(!state.completed);
        assert_eq!(transition, CompletionTransition::Reverted);
    }

    #[test]
    fn course_emptied_after_completion_reverts() {
        let (done, _) = recompute(2, 2, &fresh(), t0());
        let (state, transition) = recompute(0, 0, &done, t0());
        assert!(!state.completed);
        assert_eq!(state.completed_at, None);
        assert_eq!(state.progress_percentage, 0.0);
        assert_eq!(transition, CompletionTransition::Reverted);
    }

    #[test]
    fn empty_course_never_completes() {
        let (state, transition) = recompute(0, 0, &fresh(), t0());
        assert!(!state.completed);
        assert_eq!(transition, CompletionTransition::Unchanged);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    fn valid_check() -> CompletionCheck {
        CompletionCheck {
            enrollment_course_id: 1,
            lecture_course_id: 1,
            already_completed: false,
            course_published: true,
        }
    }

    #[test]
    fn valid_request_accepted() {
        assert!(check_mark_complete(&valid_check()).is_ok());
    }

    #[test]
    fn other_course_lecture_rejected_first() {
        let check = CompletionCheck {
            lecture_course_id: 2,
            already_completed: true,
            course_published: false,
            ..valid_check()
        };
        assert_matches!(
            check_mark_complete(&check),
            Err(CompletionRejection::WrongCourse)
        );
    }

    #[test]
    fn duplicate_rejected_before_publication() {
        let check = CompletionCheck {
            already_completed: true,
            course_published: false,
            ..valid_check()
        };
        assert_matches!(
            check_mark_complete(&check),
            Err(CompletionRejection::AlreadyCompleted)
        );
    }

    #[test]
    fn unpublished_course_rejected() {
        let check = CompletionCheck {
            course_published: false,
            ..valid_check()
        };
        assert_matches!(
            check_mark_complete(&check),
            Err(CompletionRejection::CourseNotPublished)
        );
    }
}
