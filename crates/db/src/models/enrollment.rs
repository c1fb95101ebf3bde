//! Enrollments and the course progress ledger backing them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use lms_core::progress::{CompletionRejection, CompletionState, CompletionTransition};
use lms_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

/// A row from the `enrollments` table.
///
/// `progress_percentage`, `completed` and `completed_at` are derived from
/// the enrollment's `course_progress` ledger and only written by
/// `CourseProgressRepo`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Enrollment {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub enrolled_at: Timestamp,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
    pub progress_percentage: f64,
    pub time_spent_minutes: i32,
    pub points_awarded: bool,
    pub updated_at: Timestamp,
}

impl Enrollment {
    /// The derived completion fields as a core value.
    pub fn completion_state(&self) -> CompletionState {
        CompletionState {
            progress_percentage: self.progress_percentage,
            completed: self.completed,
            completed_at: self.completed_at,
        }
    }
}

/// DTO for enrolling a student in a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEnrollment {
    /// Defaults to the caller when omitted.
    pub student_id: Option<DbId>,
    pub course_id: DbId,
}

/// DTO for adding time spent on a course.
#[derive(Debug, Clone, Deserialize)]
pub struct AddTimeSpent {
    pub minutes: i32,
}

// ---------------------------------------------------------------------------
// Course progress
// ---------------------------------------------------------------------------

/// A row from the `course_progress` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseProgress {
    pub id: DbId,
    pub enrollment_id: DbId,
    pub last_accessed_lecture_id: Option<DbId>,
    pub updated_at: Timestamp,
}

/// Progress ledger with its completed lecture ids (computed, not a DB row).
#[derive(Debug, Clone, Serialize)]
pub struct ProgressDetail {
    pub progress: CourseProgress,
    pub completed_lecture_ids: Vec<DbId>,
    pub enrollment: Enrollment,
}

/// Result of a successful progress mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub enrollment: Enrollment,
    pub transition: CompletionTransition,
    /// Points granted by this call; 0 unless it produced the first completion.
    pub points_granted: i32,
}

/// Outcome of marking a lecture complete.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarkCompleteOutcome {
    Applied(ProgressUpdate),
    Rejected { reason: CompletionRejection },
}
