//! Repository for the `calendar_events` table.

use sqlx::PgPool;
use lms_core::calendar::CalendarEventDraft;
use lms_core::types::DbId;

use crate::models::calendar::CalendarEvent;

/// Column list for calendar_events queries.
const COLUMNS: &str = "\
    id, title, description, event_type, course_id, section_id, lecture_id, \
    start_time, end_time, created_at";

/// Provides data access for calendar events.
pub struct CalendarEventRepo;

impl CalendarEventRepo {
    /// Get or create the calendar event for a release rule.
    ///
    /// The rule row is locked for the duration of the transaction so two
    /// concurrent generations for the same rule serialize. An existing event
    /// matching every field of the draft is reused; otherwise one is inserted
    /// and linked from the rule. Returns the event and whether it was created.
    pub async fn get_or_create_for_rule(
        pool: &PgPool,
        rule_id: DbId,
        draft: &CalendarEventDraft,
    ) -> Result<(CalendarEvent, bool), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM release_rules WHERE id = $1 FOR UPDATE")
            .bind(rule_id)
            .fetch_one(&mut *tx)
            .await?;

        let find = format!(
            "SELECT {COLUMNS} FROM calendar_events \
             WHERE title = $1 AND description = $2 AND event_type = $3 \
               AND course_id = $4 \
               AND section_id IS NOT DISTINCT FROM $5 \
               AND lecture_id IS NOT DISTINCT FROM $6 \
               AND start_time = $7 \
             ORDER BY id \
             LIMIT 1"
        );
        let existing = sqlx::query_as::<_, CalendarEvent>(&find)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.event_type)
            .bind(draft.course_id)
            .bind(draft.section_id)
            .bind(draft.lecture_id)
            .bind(draft.start_time)
            .fetch_optional(&mut *tx)
            .await?;

        let (event, created) = match existing {
            Some(event) => (event, false),
            None => {
                let insert = format!(
                    "INSERT INTO calendar_events
                        (title, description, event_type, course_id, section_id,
                         lecture_id, start_time)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     RETURNING {COLUMNS}"
                );
                let event = sqlx::query_as::<_, CalendarEvent>(&insert)
                    .bind(&draft.title)
                    .bind(&draft.description)
                    .bind(draft.event_type)
                    .bind(draft.course_id)
                    .bind(draft.section_id)
                    .bind(draft.lecture_id)
                    .bind(draft.start_time)
                    .fetch_one(&mut *tx)
                    .await?;
                (event, true)
            }
        };

        sqlx::query(
            "UPDATE release_rules SET calendar_event_id = $2 \
             WHERE id = $1 AND calendar_event_id IS DISTINCT FROM $2",
        )
        .bind(rule_id)
        .bind(event.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((event, created))
    }

    /// List a course's events in chronological order.
    pub async fn list_by_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM calendar_events \
             WHERE course_id = $1 \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, CalendarEvent>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }
}
