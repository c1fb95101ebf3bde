//! Materialize calendar events from date-triggered release rules.

use sqlx::PgPool;
use lms_core::calendar::{draft_release_event, CalendarEventDraft, ReleasedContent};
use lms_core::types::{DbId, Timestamp};
use lms_db::models::release::{ReleaseRule, ReleaseSchedule};
use lms_db::repositories::{
    CalendarEventRepo, CourseSectionRepo, LectureRepo, QuizRepo, ReleaseRuleRepo,
};

/// Get-or-create one calendar event per `specific_date` rule that has a
/// release date. Returns the number of events created; rerunning on an
/// unchanged schedule creates none.
pub async fn generate_events(pool: &PgPool, schedule: &ReleaseSchedule) -> Result<usize, sqlx::Error> {
    let rules = ReleaseRuleRepo::list_dated_by_schedule(pool, schedule.id).await?;
    let mut created = 0;

    for rule in &rules {
        let Some(release_date) = rule.release_date else {
            continue;
        };
        let Some(draft) = draft_for_rule(pool, schedule.course_id, rule, release_date).await?
        else {
            tracing::warn!(rule_id = rule.id, "Release rule target no longer exists, skipping");
            continue;
        };

        let (event, was_created) =
            CalendarEventRepo::get_or_create_for_rule(pool, rule.id, &draft).await?;
        if was_created {
            created += 1;
            tracing::debug!(rule_id = rule.id, event_id = event.id, "Calendar event created");
        }
    }

    tracing::info!(
        schedule_id = schedule.id,
        dated_rules = rules.len(),
        created,
        "Calendar events generated"
    );
    Ok(created)
}

/// Draft the event for a rule from its target's current title.
async fn draft_for_rule(
    pool: &PgPool,
    course_id: DbId,
    rule: &ReleaseRule,
    release_date: Timestamp,
) -> Result<Option<CalendarEventDraft>, sqlx::Error> {
    if let Some(lecture_id) = rule.lecture_id {
        let Some(lecture) = LectureRepo::find_by_id(pool, lecture_id).await? else {
            return Ok(None);
        };
        let content = ReleasedContent::Lecture {
            id: lecture.id,
            section_id: lecture.section_id,
            title: &lecture.title,
        };
        return Ok(Some(draft_release_event(course_id, &content, release_date)));
    }

    if let Some(quiz_id) = rule.quiz_id {
        let Some(quiz) = QuizRepo::find_by_id(pool, quiz_id).await? else {
            return Ok(None);
        };
        let content = ReleasedContent::Quiz {
            id: quiz.id,
            section_id: quiz.section_id,
            title: &quiz.title,
        };
        return Ok(Some(draft_release_event(course_id, &content, release_date)));
    }

    if let Some(section_id) = rule.section_id {
        let Some(section) = CourseSectionRepo::find_by_id(pool, section_id).await? else {
            return Ok(None);
        };
        let content = ReleasedContent::Section {
            id: section.id,
            title: &section.title,
        };
        return Ok(Some(draft_release_event(course_id, &content, release_date)));
    }

    Ok(None)
}
