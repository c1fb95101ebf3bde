//! Calendar event drafting for date-triggered release rules, plus the
//! offset plan used to generate drip rules.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// Event type stored on calendar events materialized from release rules.
pub const EVENT_TYPE_CONTENT_RELEASE: &str = "content_release";

/// Maximum title length accepted by the `calendar_events.title` column.
pub const MAX_TITLE_LENGTH: usize = 200;

/// The kind of content a release event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasedContent<'a> {
    Section { id: DbId, title: &'a str },
    Lecture { id: DbId, section_id: Option<DbId>, title: &'a str },
    Quiz { id: DbId, section_id: Option<DbId>, title: &'a str },
}

impl ReleasedContent<'_> {
    fn kind_label(&self) -> &'static str {
        match self {
            Self::Section { .. } => "Section",
            Self::Lecture { .. } => "Lecture",
            Self::Quiz { .. } => "Quiz",
        }
    }

    fn title(&self) -> &str {
        match self {
            Self::Section { title, .. } | Self::Lecture { title, .. } | Self::Quiz { title, .. } => {
                title
            }
        }
    }
}

/// A calendar event to get-or-create. Every field is part of the identity
/// key, so drafting the same rule twice yields an identical draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEventDraft {
    pub title: String,
    pub description: String,
    pub event_type: &'static str,
    pub course_id: DbId,
    pub section_id: Option<DbId>,
    pub lecture_id: Option<DbId>,
    pub start_time: Timestamp,
}

/// Draft the release event for one date-triggered rule.
pub fn draft_release_event(
    course_id: DbId,
    content: &ReleasedContent<'_>,
    release_date: Timestamp,
) -> CalendarEventDraft {
    let (section_id, lecture_id) = match *content {
        ReleasedContent::Section { id, .. } => (Some(id), None),
        ReleasedContent::Lecture { id, section_id, .. } => (section_id, Some(id)),
        ReleasedContent::Quiz { section_id, .. } => (section_id, None),
    };

    let title = truncate(&format!("{} released: {}", content.kind_label(), content.title()));
    let description = format!(
        "{} \"{}\" becomes available on {}.",
        content.kind_label(),
        content.title(),
        release_date.format("%Y-%m-%d %H:%M UTC")
    );

    CalendarEventDraft {
        title,
        description,
        event_type: EVENT_TYPE_CONTENT_RELEASE,
        course_id,
        section_id,
        lecture_id,
        start_time: release_date,
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_TITLE_LENGTH).collect()
}

/// Offsets (in days) for drip rules over `lecture_count` lectures in course
/// order: the first lecture opens on enrollment, each following one
/// `days_between` days later.
pub fn drip_offsets(lecture_count: usize, days_between: i32) -> Vec<i32> {
    (0..lecture_count)
        .map(|index| {
            i32::try_from(index)
                .unwrap_or(i32::MAX)
                .saturating_mul(days_between)
        })
        .collect()
}
