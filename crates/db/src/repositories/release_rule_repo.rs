//! Repository for the `release_rules` table.

use sqlx::PgPool;
use lms_core::release::{TRIGGER_ENROLLMENT_OFFSET, TRIGGER_MANUAL, TRIGGER_SPECIFIC_DATE};
use lms_core::types::{DbId, Timestamp};

use crate::models::release::{CreateReleaseRule, ReleaseRule, UpdateReleaseRule};

/// Column list for release_rules queries.
const COLUMNS: &str = "\
    id, schedule_id, section_id, lecture_id, quiz_id, trigger_kind, offset_days, \
    release_date, is_manually_unlocked, required_progress_percentage, \
    required_completion_item, required_quiz_id, required_quiz_score, \
    calendar_event_id, is_released, created_at, updated_at";

/// Provides data access for release rules.
pub struct ReleaseRuleRepo;

impl ReleaseRuleRepo {
    /// Insert a rule into a schedule.
    ///
    /// A second rule for the same target violates `uq_release_rules_target`.
    pub async fn create(
        pool: &PgPool,
        schedule_id: DbId,
        input: &CreateReleaseRule,
    ) -> Result<ReleaseRule, sqlx::Error> {
        let query = format!(
            "INSERT INTO release_rules
                (schedule_id, section_id, lecture_id, quiz_id, trigger_kind, offset_days,
                 release_date, is_manually_unlocked, required_progress_percentage,
                 required_completion_item, required_quiz_id, required_quiz_score)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(schedule_id)
            .bind(input.section_id)
            .bind(input.lecture_id)
            .bind(input.quiz_id)
            .bind(&input.trigger_kind)
            .bind(input.offset_days)
            .bind(input.release_date)
            .bind(input.is_manually_unlocked)
            .bind(input.required_progress_percentage)
            .bind(&input.required_completion_item)
            .bind(input.required_quiz_id)
            .bind(input.required_quiz_score)
            .fetch_one(pool)
            .await
    }

    /// Insert an enrollment-offset rule for a lecture unless the schedule
    /// already has a rule for it. Returns `true` if a rule was created.
    pub async fn create_offset_rule_if_absent(
        pool: &PgPool,
        schedule_id: DbId,
        lecture_id: DbId,
        offset_days: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO release_rules (schedule_id, lecture_id, trigger_kind, offset_days) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT DO NOTHING",
        )
        .bind(schedule_id)
        .bind(lecture_id)
        .bind(TRIGGER_ENROLLMENT_OFFSET)
        .bind(offset_days)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a rule by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ReleaseRule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM release_rules WHERE id = $1");
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all rules of a schedule.
    pub async fn list_by_schedule(
        pool: &PgPool,
        schedule_id: DbId,
    ) -> Result<Vec<ReleaseRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM release_rules WHERE schedule_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(schedule_id)
            .fetch_all(pool)
            .await
    }

    /// List the date-triggered rules of a schedule that have a release date.
    pub async fn list_dated_by_schedule(
        pool: &PgPool,
        schedule_id: DbId,
    ) -> Result<Vec<ReleaseRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM release_rules \
             WHERE schedule_id = $1 AND trigger_kind = $2 AND release_date IS NOT NULL \
             ORDER BY release_date, id"
        );
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(schedule_id)
            .bind(TRIGGER_SPECIFIC_DATE)
            .fetch_all(pool)
            .await
    }

    /// Replace a rule's trigger configuration. The target is left untouched.
    ///
    /// `is_released` survives only if the new configuration is still due;
    /// otherwise it is cleared so the sweep releases the rule again.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateReleaseRule,
    ) -> Result<Option<ReleaseRule>, sqlx::Error> {
        let query = format!(
            "UPDATE release_rules SET
                trigger_kind = $2,
                offset_days = $3,
                release_date = $4,
                is_manually_unlocked = $5,
                required_progress_percentage = $6,
                required_completion_item = $7,
                required_quiz_id = $8,
                required_quiz_score = $9,
                is_released = is_released AND (
                    ($2 = $10 AND $4::timestamptz IS NOT NULL AND $4::timestamptz <= NOW())
                    OR ($2 = $11 AND $5)
                )
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(id)
            .bind(&input.trigger_kind)
            .bind(input.offset_days)
            .bind(input.release_date)
            .bind(input.is_manually_unlocked)
            .bind(input.required_progress_percentage)
            .bind(&input.required_completion_item)
            .bind(input.required_quiz_id)
            .bind(input.required_quiz_score)
            .bind(TRIGGER_SPECIFIC_DATE)
            .bind(TRIGGER_MANUAL)
            .fetch_optional(pool)
            .await
    }

    /// Set the manual unlock flag. Re-locking clears `is_released`.
    pub async fn set_manual_unlock(
        pool: &PgPool,
        id: DbId,
        unlocked: bool,
    ) -> Result<Option<ReleaseRule>, sqlx::Error> {
        let query = format!(
            "UPDATE release_rules SET is_manually_unlocked = $2, is_released = is_released AND $2 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(id)
            .bind(unlocked)
            .fetch_optional(pool)
            .await
    }

    /// Flip `is_released` on every unreleased rule whose release condition
    /// no longer depends on the student: date rules past their date and
    /// manually unlocked rules. Returns the flipped rules.
    pub async fn mark_due_released(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<ReleaseRule>, sqlx::Error> {
        let query = format!(
            "UPDATE release_rules SET is_released = true \
             WHERE is_released = false AND ( \
                 (trigger_kind = $1 AND release_date IS NOT NULL AND release_date <= $2) \
                 OR (trigger_kind = $3 AND is_manually_unlocked = true) \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReleaseRule>(&query)
            .bind(TRIGGER_SPECIFIC_DATE)
            .bind(now)
            .bind(TRIGGER_MANUAL)
            .fetch_all(pool)
            .await
    }

    /// Delete a rule. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM release_rules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
