//! Repository for the `release_schedules` table.

use sqlx::PgPool;
use lms_core::types::DbId;

use crate::models::release::{CreateReleaseSchedule, ReleaseSchedule, UpdateReleaseSchedule};

/// Column list for release_schedules queries.
const COLUMNS: &str = "\
    id, course_id, strategy, start_date, end_date, unlock_all, \
    days_between_releases, release_time, created_at, updated_at";

/// Provides data access for release schedules.
pub struct ReleaseScheduleRepo;

impl ReleaseScheduleRepo {
    /// Insert a schedule for a course. A course has at most one schedule
    /// (`uq_release_schedules_course`).
    pub async fn create(
        pool: &PgPool,
        input: &CreateReleaseSchedule,
    ) -> Result<ReleaseSchedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO release_schedules
                (course_id, strategy, start_date, end_date, unlock_all,
                 days_between_releases, release_time)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, TIME '09:00'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReleaseSchedule>(&query)
            .bind(input.course_id)
            .bind(&input.strategy)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.unlock_all)
            .bind(input.days_between_releases)
            .bind(input.release_time)
            .fetch_one(pool)
            .await
    }

    /// Find a schedule by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ReleaseSchedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM release_schedules WHERE id = $1");
        sqlx::query_as::<_, ReleaseSchedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the schedule configured for a course.
    pub async fn find_by_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Option<ReleaseSchedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM release_schedules WHERE course_id = $1");
        sqlx::query_as::<_, ReleaseSchedule>(&query)
            .bind(course_id)
            .fetch_optional(pool)
            .await
    }

    /// Partially update a schedule.
    ///
    /// `strategy`, `unlock_all` and `release_time` use `COALESCE`. The
    /// nullable settings are replaced whenever the field was sent, so an
    /// explicit `null` clears them.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateReleaseSchedule,
    ) -> Result<Option<ReleaseSchedule>, sqlx::Error> {
        let query = format!(
            "UPDATE release_schedules SET
                strategy = COALESCE($2, strategy),
                start_date = CASE WHEN $3 THEN $4 ELSE start_date END,
                end_date = CASE WHEN $5 THEN $6 ELSE end_date END,
                unlock_all = COALESCE($7, unlock_all),
                days_between_releases = CASE WHEN $8 THEN $9 ELSE days_between_releases END,
                release_time = COALESCE($10, release_time)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReleaseSchedule>(&query)
            .bind(id)
            .bind(&input.strategy)
            .bind(input.start_date.is_some())
            .bind(input.start_date.flatten())
            .bind(input.end_date.is_some())
            .bind(input.end_date.flatten())
            .bind(input.unlock_all)
            .bind(input.days_between_releases.is_some())
            .bind(input.days_between_releases.flatten())
            .bind(input.release_time)
            .fetch_optional(pool)
            .await
    }

    /// Delete a schedule and, by cascade, its rules and overrides.
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM release_schedules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
