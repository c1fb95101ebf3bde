//! Repository for the `student_progress_overrides` table.

use sqlx::PgPool;
use lms_core::types::DbId;

use crate::models::release::{StudentProgressOverride, UpsertProgressOverride};

/// Column list for student_progress_overrides queries.
const COLUMNS: &str = "\
    id, rule_id, student_id, override_release_date, is_released, notes, \
    created_at, updated_at";

/// Provides data access for per-student rule overrides.
pub struct ProgressOverrideRepo;

impl ProgressOverrideRepo {
    /// Create or replace the override for a (rule, student) pair.
    pub async fn upsert(
        pool: &PgPool,
        rule_id: DbId,
        student_id: DbId,
        input: &UpsertProgressOverride,
    ) -> Result<StudentProgressOverride, sqlx::Error> {
        let query = format!(
            "INSERT INTO student_progress_overrides
                (rule_id, student_id, override_release_date, is_released, notes)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (rule_id, student_id) DO UPDATE SET
                override_release_date = EXCLUDED.override_release_date,
                is_released = EXCLUDED.is_released,
                notes = EXCLUDED.notes
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StudentProgressOverride>(&query)
            .bind(rule_id)
            .bind(student_id)
            .bind(input.override_release_date)
            .bind(input.is_released)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// List overrides on a rule.
    pub async fn list_by_rule(
        pool: &PgPool,
        rule_id: DbId,
    ) -> Result<Vec<StudentProgressOverride>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_progress_overrides \
             WHERE rule_id = $1 \
             ORDER BY student_id"
        );
        sqlx::query_as::<_, StudentProgressOverride>(&query)
            .bind(rule_id)
            .fetch_all(pool)
            .await
    }

    /// `(rule_id, is_released)` for every override a student holds on the
    /// rules of a schedule.
    pub async fn released_flags_for_student(
        pool: &PgPool,
        schedule_id: DbId,
        student_id: DbId,
    ) -> Result<Vec<(DbId, bool)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT o.rule_id, o.is_released \
             FROM student_progress_overrides o \
             JOIN release_rules r ON r.id = o.rule_id \
             WHERE r.schedule_id = $1 AND o.student_id = $2",
        )
        .bind(schedule_id)
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// Delete the override for a (rule, student) pair. Returns `true` if a
    /// row was deleted.
    pub async fn delete(pool: &PgPool, rule_id: DbId, student_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM student_progress_overrides WHERE rule_id = $1 AND student_id = $2",
        )
        .bind(rule_id)
        .bind(student_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
