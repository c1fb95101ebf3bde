//! Repositories for `quizzes` and `quiz_attempts`.

use sqlx::PgPool;
use lms_core::types::DbId;

use crate::models::quiz::{CreateQuiz, Quiz, QuizAttempt, QuizBestScore};

// ===========================================================================
// QuizRepo
// ===========================================================================

const QUIZ_COLUMNS: &str = "id, course_id, section_id, title, created_at";

/// CRUD for the `quizzes` table.
pub struct QuizRepo;

impl QuizRepo {
    /// Insert a quiz into a course.
    pub async fn create(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateQuiz,
    ) -> Result<Quiz, sqlx::Error> {
        let query = format!(
            "INSERT INTO quizzes (course_id, section_id, title) \
             VALUES ($1, $2, $3) \
             RETURNING {QUIZ_COLUMNS}"
        );
        sqlx::query_as::<_, Quiz>(&query)
            .bind(course_id)
            .bind(input.section_id)
            .bind(&input.title)
            .fetch_one(pool)
            .await
    }

    /// Find a quiz by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Quiz>, sqlx::Error> {
        let query = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        sqlx::query_as::<_, Quiz>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a course's quizzes.
    pub async fn list_by_course(pool: &PgPool, course_id: DbId) -> Result<Vec<Quiz>, sqlx::Error> {
        let query = format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE course_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, Quiz>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }
}

// ===========================================================================
// QuizAttemptRepo
// ===========================================================================

const ATTEMPT_COLUMNS: &str = "\
    id, quiz_id, student_id, score_percentage, is_completed, started_at, completed_at";

/// Data access for `quiz_attempts`.
pub struct QuizAttemptRepo;

impl QuizAttemptRepo {
    /// Record a finished attempt with its final score.
    pub async fn create_completed(
        pool: &PgPool,
        quiz_id: DbId,
        student_id: DbId,
        score_percentage: f64,
    ) -> Result<QuizAttempt, sqlx::Error> {
        let query = format!(
            "INSERT INTO quiz_attempts (quiz_id, student_id, score_percentage, is_completed, completed_at) \
             VALUES ($1, $2, $3, true, NOW()) \
             RETURNING {ATTEMPT_COLUMNS}"
        );
        sqlx::query_as::<_, QuizAttempt>(&query)
            .bind(quiz_id)
            .bind(student_id)
            .bind(score_percentage)
            .fetch_one(pool)
            .await
    }

    /// Best completed-attempt score per quiz for a student. Quizzes without a
    /// completed attempt are absent from the result.
    pub async fn best_scores_for_student(
        pool: &PgPool,
        student_id: DbId,
        quiz_ids: &[DbId],
    ) -> Result<Vec<QuizBestScore>, sqlx::Error> {
        if quiz_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, QuizBestScore>(
            "SELECT quiz_id, MAX(score_percentage) AS best_score \
             FROM quiz_attempts \
             WHERE student_id = $1 AND quiz_id = ANY($2) AND is_completed = true \
             GROUP BY quiz_id",
        )
        .bind(student_id)
        .bind(quiz_ids)
        .fetch_all(pool)
        .await
    }
}
