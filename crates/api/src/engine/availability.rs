//! Schedule resolution against the database.
//!
//! [`ReleaseContext::load`] reads everything needed to decide availability
//! for one student in one course (the schedule, its rules, the student's
//! overrides, enrollment and best quiz scores) in a fixed number of queries.
//! Every content item of the course is then resolved in memory.
//!
//! Lookup misses never surface as errors: a missing enrollment or quiz
//! attempt leaves the corresponding [`StudentContext`] field empty, which the
//! evaluator treats as unavailable. Only a missing *content item* is an
//! error, and it is reported as not-found before any evaluation happens.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use lms_core::availability::{
    self, ContentRef, DecisionSource, ReleaseRuleData, Resolution, StudentContext,
};
use lms_core::error::CoreError;
use lms_core::types::{DbId, Timestamp};
use lms_db::models::release::{ReleaseRule, ReleaseSchedule};
use lms_db::repositories::{
    CourseSectionRepo, EnrollmentRepo, LectureRepo, ProgressOverrideRepo, QuizAttemptRepo,
    QuizRepo, ReleaseRuleRepo, ReleaseScheduleRepo,
};

use crate::error::{AppError, AppResult};

/// Content type segment accepted by `GET /availability/{content_type}/{id}`.
pub const CONTENT_TYPE_LECTURE: &str = "lecture";
pub const CONTENT_TYPE_SECTION: &str = "section";
pub const CONTENT_TYPE_QUIZ: &str = "quiz";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// The availability of one content item for one student.
#[derive(Debug, Clone, Serialize)]
pub struct ContentAvailability {
    pub content_type: &'static str,
    pub content_id: DbId,
    pub student_id: DbId,
    pub available: bool,
    pub source: DecisionSource,
    pub rule_id: Option<DbId>,
    /// When a date or offset rule will release the content, if known.
    pub unlocks_at: Option<Timestamp>,
}

/// One item of the course outline.
#[derive(Debug, Clone, Serialize)]
pub struct OutlineItem {
    pub id: DbId,
    pub title: String,
    pub section_id: Option<DbId>,
    pub available: bool,
    pub source: DecisionSource,
    pub rule_id: Option<DbId>,
    pub unlocks_at: Option<Timestamp>,
}

/// Availability of every section, lecture and quiz of a course.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAvailability {
    pub course_id: DbId,
    pub student_id: DbId,
    pub schedule_id: Option<DbId>,
    pub sections: Vec<OutlineItem>,
    pub lectures: Vec<OutlineItem>,
    pub quizzes: Vec<OutlineItem>,
}

// ---------------------------------------------------------------------------
// Release context
// ---------------------------------------------------------------------------

/// Everything needed to resolve content of one course for one student.
pub struct ReleaseContext {
    pub schedule: Option<ReleaseSchedule>,
    pub rules: Vec<ReleaseRule>,
    pub student: StudentContext,
}

impl ReleaseContext {
    /// Load the course's schedule and the student's data.
    ///
    /// A course without a schedule releases everything.
    pub async fn load(pool: &PgPool, course_id: DbId, student_id: DbId) -> AppResult<Self> {
        let Some(schedule) = ReleaseScheduleRepo::find_by_course(pool, course_id).await? else {
            return Ok(Self {
                schedule: None,
                rules: Vec::new(),
                student: StudentContext::default(),
            });
        };

        let rules = ReleaseRuleRepo::list_by_schedule(pool, schedule.id).await?;
        let enrollment =
            EnrollmentRepo::find_by_student_and_course(pool, student_id, course_id).await?;
        let overrides: HashMap<DbId, bool> =
            ProgressOverrideRepo::released_flags_for_student(pool, schedule.id, student_id)
                .await?
                .into_iter()
                .collect();

        let mut quiz_ids: Vec<DbId> = rules.iter().filter_map(|r| r.required_quiz_id).collect();
        quiz_ids.sort_unstable();
        quiz_ids.dedup();
        let best_quiz_scores = QuizAttemptRepo::best_scores_for_student(pool, student_id, &quiz_ids)
            .await?
            .into_iter()
            .map(|s| (s.quiz_id, s.best_score))
            .collect();

        let student = StudentContext {
            enrolled_at: enrollment.as_ref().map(|e| e.enrolled_at),
            progress_percentage: enrollment.as_ref().map(|e| e.progress_percentage),
            overrides,
            best_quiz_scores,
        };

        Ok(Self {
            schedule: Some(schedule),
            rules,
            student,
        })
    }

    /// Resolve one content item at `now`, with the rule's release instant
    /// when the decision came from a time-based rule.
    pub fn resolve(&self, content: &ContentRef, now: Timestamp) -> (Resolution, Option<Timestamp>) {
        let Some(schedule) = &self.schedule else {
            let resolution = Resolution {
                available: true,
                source: DecisionSource::NoRule,
                rule_id: None,
            };
            return (resolution, None);
        };

        let resolution = availability::resolve_content(
            &schedule.settings(),
            &self.rules,
            content,
            &self.student,
            now,
        );

        let unlocks_at = match (resolution.source, resolution.rule_id) {
            (DecisionSource::Rule, Some(rule_id)) => self
                .rules
                .iter()
                .find(|r| r.id == rule_id)
                .and_then(|r| availability::unlocks_at(&r.condition(), self.student.enrolled_at)),
            _ => None,
        };

        (resolution, unlocks_at)
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Look up a content item by type and id, returning its course and
/// [`ContentRef`]. Unknown ids are not-found errors, distinct from
/// "unavailable".
pub async fn find_content(
    pool: &PgPool,
    content_type: &str,
    content_id: DbId,
) -> AppResult<(DbId, ContentRef, &'static str)> {
    match content_type {
        CONTENT_TYPE_LECTURE => {
            let lecture = LectureRepo::find_by_id(pool, content_id)
                .await?
                .ok_or(CoreError::not_found("Lecture", content_id))?;
            let content = ContentRef::Lecture {
                id: lecture.id,
                section_id: lecture.section_id,
            };
            Ok((lecture.course_id, content, CONTENT_TYPE_LECTURE))
        }
        CONTENT_TYPE_SECTION => {
            let section = CourseSectionRepo::find_by_id(pool, content_id)
                .await?
                .ok_or(CoreError::not_found("CourseSection", content_id))?;
            Ok((
                section.course_id,
                ContentRef::Section { id: section.id },
                CONTENT_TYPE_SECTION,
            ))
        }
        CONTENT_TYPE_QUIZ => {
            let quiz = QuizRepo::find_by_id(pool, content_id)
                .await?
                .ok_or(CoreError::not_found("Quiz", content_id))?;
            Ok((quiz.course_id, ContentRef::Quiz { id: quiz.id }, CONTENT_TYPE_QUIZ))
        }
        other => Err(AppError::BadRequest(format!(
            "Unknown content type '{other}'. Must be one of: \
             {CONTENT_TYPE_LECTURE}, {CONTENT_TYPE_SECTION}, {CONTENT_TYPE_QUIZ}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Resolve one content item for one student.
pub async fn content_availability(
    pool: &PgPool,
    content_type: &str,
    content_id: DbId,
    student_id: DbId,
) -> AppResult<ContentAvailability> {
    let (course_id, content, content_type) = find_content(pool, content_type, content_id).await?;
    let context = ReleaseContext::load(pool, course_id, student_id).await?;
    let (resolution, unlocks_at) = context.resolve(&content, Utc::now());

    tracing::debug!(
        content_type,
        content_id,
        student_id,
        available = resolution.available,
        source = ?resolution.source,
        "Content availability resolved"
    );

    Ok(ContentAvailability {
        content_type,
        content_id,
        student_id,
        available: resolution.available,
        source: resolution.source,
        rule_id: resolution.rule_id,
        unlocks_at,
    })
}

/// Require that content is available to a student, rejecting with 403
/// otherwise.
pub async fn ensure_available(
    pool: &PgPool,
    course_id: DbId,
    content: &ContentRef,
    student_id: DbId,
) -> AppResult<()> {
    let context = ReleaseContext::load(pool, course_id, student_id).await?;
    let (resolution, unlocks_at) = context.resolve(content, Utc::now());
    if resolution.available {
        return Ok(());
    }

    let message = match unlocks_at {
        Some(at) => format!("Content is locked until {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "Content is not yet available".to_string(),
    };
    Err(AppError::Core(CoreError::Forbidden(message)))
}

/// Resolve every section, lecture and quiz of a course for one student.
pub async fn course_availability(
    pool: &PgPool,
    course_id: DbId,
    student_id: DbId,
) -> AppResult<CourseAvailability> {
    let sections = CourseSectionRepo::list_by_course(pool, course_id).await?;
    let lectures = LectureRepo::list_by_course(pool, course_id).await?;
    let quizzes = QuizRepo::list_by_course(pool, course_id).await?;
    let context = ReleaseContext::load(pool, course_id, student_id).await?;
    let now = Utc::now();

    let item = |id: DbId, title: &str, section_id: Option<DbId>, content: ContentRef| {
        let (resolution, unlocks_at) = context.resolve(&content, now);
        OutlineItem {
            id,
            title: title.to_string(),
            section_id,
            available: resolution.available,
            source: resolution.source,
            rule_id: resolution.rule_id,
            unlocks_at,
        }
    };

    let sections = sections
        .iter()
        .map(|s| item(s.id, &s.title, Some(s.id), ContentRef::Section { id: s.id }))
        .collect();
    let lectures = lectures
        .iter()
        .map(|l| {
            let content = ContentRef::Lecture {
                id: l.id,
                section_id: l.section_id,
            };
            item(l.id, &l.title, l.section_id, content)
        })
        .collect();
    let quizzes = quizzes
        .iter()
        .map(|q| item(q.id, &q.title, q.section_id, ContentRef::Quiz { id: q.id }))
        .collect();

    Ok(CourseAvailability {
        course_id,
        student_id,
        schedule_id: context.schedule.as_ref().map(|s| s.id),
        sections,
        lectures,
        quizzes,
    })
}
