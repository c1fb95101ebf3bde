use serde::Serialize;
use sqlx::FromRow;
use lms_core::types::{DbId, Timestamp};

/// A row from the `calendar_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CalendarEvent {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub course_id: DbId,
    pub section_id: Option<DbId>,
    pub lecture_id: Option<DbId>,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub created_at: Timestamp,
}
