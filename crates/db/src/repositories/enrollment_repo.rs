//! Repository for the `enrollments` table.
//!
//! Derived progress fields are never written here; see `CourseProgressRepo`.

use sqlx::PgPool;
use lms_core::types::DbId;

use crate::models::enrollment::Enrollment;

/// Column list for enrollments queries.
pub(crate) const COLUMNS: &str = "\
    id, student_id, course_id, enrolled_at, completed, completed_at, \
    progress_percentage, time_spent_minutes, points_awarded, updated_at";

/// Provides data access for enrollments.
pub struct EnrollmentRepo;

impl EnrollmentRepo {
    /// Enroll a student and create the empty progress ledger in one
    /// transaction.
    pub async fn create(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
    ) -> Result<Enrollment, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO enrollments (student_id, course_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let enrollment = sqlx::query_as::<_, Enrollment>(&query)
            .bind(student_id)
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO course_progress (enrollment_id) VALUES ($1)")
            .bind(enrollment.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    /// Find an enrollment by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1");
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a student's enrollment in a course.
    pub async fn find_by_student_and_course(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM enrollments WHERE student_id = $1 AND course_id = $2"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(pool)
            .await
    }

    /// Add minutes to the time spent on the course.
    pub async fn add_time_spent(
        pool: &PgPool,
        id: DbId,
        minutes: i32,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "UPDATE enrollments SET time_spent_minutes = time_spent_minutes + $2 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(minutes)
            .fetch_optional(pool)
            .await
    }
}
