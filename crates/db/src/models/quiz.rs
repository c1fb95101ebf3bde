use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use lms_core::types::{DbId, Timestamp};

/// A row from the `quizzes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quiz {
    pub id: DbId,
    pub course_id: DbId,
    pub section_id: Option<DbId>,
    pub title: String,
    pub created_at: Timestamp,
}

/// DTO for creating a quiz. `course_id` comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuiz {
    pub section_id: Option<DbId>,
    pub title: String,
}

/// A row from the `quiz_attempts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizAttempt {
    pub id: DbId,
    pub quiz_id: DbId,
    pub student_id: DbId,
    pub score_percentage: f64,
    pub is_completed: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// DTO for recording a finished attempt. Grading happens upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitQuizAttempt {
    pub score_percentage: f64,
}

/// Best completed score for one quiz (computed, not a DB row).
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct QuizBestScore {
    pub quiz_id: DbId,
    pub best_score: f64,
}
