//! Handlers for release rules and their per-student overrides.
//!
//! Rules are created under a schedule (`/release-schedules/{id}/rules`) and
//! addressed directly afterwards (`/release-rules/{id}`). A rule's target
//! and prerequisite quiz must belong to the schedule's course.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;
use lms_core::error::CoreError;
use lms_core::release::{validate_rule_config, RuleFields, TriggerKind};
use lms_core::types::DbId;
use lms_db::models::release::{
    CreateReleaseRule, ReleaseRule, StudentProgressOverride, UpdateReleaseRule,
    UpsertProgressOverride,
};
use lms_db::repositories::{
    CourseSectionRepo, LectureRepo, ProgressOverrideRepo, QuizRepo, ReleaseRuleRepo, UserRepo,
};

use crate::error::{AppError, AppResult};
use crate::handlers::release_schedule::load_schedule;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireInstructor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_rule(pool: &PgPool, id: DbId) -> AppResult<ReleaseRule> {
    ReleaseRuleRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("ReleaseRule", id)))
}

fn parse_trigger(value: &str) -> AppResult<TriggerKind> {
    TriggerKind::from_str_value(value).map_err(|e| AppError::Core(CoreError::Validation(e)))
}

fn validate_config(trigger: TriggerKind, fields: &RuleFields<'_>) -> AppResult<()> {
    validate_rule_config(trigger, fields).map_err(|e| AppError::Core(CoreError::Validation(e)))
}

fn outside_course(entity: &str, id: DbId, course_id: DbId) -> AppError {
    AppError::Core(CoreError::Validation(format!(
        "{entity} {id} does not belong to course {course_id}"
    )))
}

/// Check the rule's target and prerequisite quiz exist in `course_id`.
async fn ensure_references_in_course(
    pool: &PgPool,
    course_id: DbId,
    fields: &RuleFields<'_>,
) -> AppResult<()> {
    if let Some(id) = fields.section_id {
        let section = CourseSectionRepo::find_by_id(pool, id)
            .await?
            .ok_or(CoreError::not_found("CourseSection", id))?;
        if section.course_id != course_id {
            return Err(outside_course("Section", id, course_id));
        }
    }
    if let Some(id) = fields.lecture_id {
        let lecture = LectureRepo::find_by_id(pool, id)
            .await?
            .ok_or(CoreError::not_found("Lecture", id))?;
        if lecture.course_id != course_id {
            return Err(outside_course("Lecture", id, course_id));
        }
    }
    for id in [fields.quiz_id, fields.required_quiz_id].into_iter().flatten() {
        let quiz = QuizRepo::find_by_id(pool, id)
            .await?
            .ok_or(CoreError::not_found("Quiz", id))?;
        if quiz.course_id != course_id {
            return Err(outside_course("Quiz", id, course_id));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// POST /api/v1/release-schedules/{id}/rules
///
/// A second rule for the same target in the schedule is a 409.
pub async fn create(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(schedule_id): Path<DbId>,
    Json(mut input): Json<CreateReleaseRule>,
) -> AppResult<(StatusCode, Json<DataResponse<ReleaseRule>>)> {
    let trigger = parse_trigger(&input.trigger_kind)?;
    validate_config(trigger, &input.fields())?;

    let schedule = load_schedule(&state.pool, schedule_id).await?;
    ensure_references_in_course(&state.pool, schedule.course_id, &input.fields()).await?;

    input.trigger_kind = trigger.as_str().to_string();
    let rule = ReleaseRuleRepo::create(&state.pool, schedule_id, &input).await?;
    tracing::info!(
        rule_id = rule.id,
        schedule_id,
        trigger = trigger.as_str(),
        "Release rule created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// GET /api/v1/release-schedules/{id}/rules
pub async fn list_by_schedule(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(schedule_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ReleaseRule>>>> {
    load_schedule(&state.pool, schedule_id).await?;
    let rules = ReleaseRuleRepo::list_by_schedule(&state.pool, schedule_id).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// GET /api/v1/release-rules/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReleaseRule>>> {
    let rule = load_rule(&state.pool, id).await?;
    Ok(Json(DataResponse { data: rule }))
}

/// PUT /api/v1/release-rules/{id}
///
/// Replaces the trigger configuration; the target cannot change.
pub async fn update(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateReleaseRule>,
) -> AppResult<Json<DataResponse<ReleaseRule>>> {
    let existing = load_rule(&state.pool, id).await?;
    let trigger = parse_trigger(&input.trigger_kind)?;
    validate_config(trigger, &input.fields_for(&existing))?;

    if let Some(quiz_id) = input.required_quiz_id {
        let schedule = load_schedule(&state.pool, existing.schedule_id).await?;
        let fields = RuleFields {
            required_quiz_id: Some(quiz_id),
            ..RuleFields::default()
        };
        ensure_references_in_course(&state.pool, schedule.course_id, &fields).await?;
    }

    input.trigger_kind = trigger.as_str().to_string();
    let rule = ReleaseRuleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::not_found("ReleaseRule", id))?;
    Ok(Json(DataResponse { data: rule }))
}

/// DELETE /api/v1/release-rules/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ReleaseRuleRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::not_found("ReleaseRule", id)))
    }
}

/// POST /api/v1/release-rules/{id}/unlock
///
/// Unlock a `manual` rule for every student. The release sweep later flips
/// `is_released` and publishes `content.released`.
pub async fn unlock(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReleaseRule>>> {
    let rule = load_rule(&state.pool, id).await?;
    if parse_trigger(&rule.trigger_kind)? != TriggerKind::Manual {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Only manual rules can be unlocked, rule {id} uses '{}'",
            rule.trigger_kind
        ))));
    }

    let rule = ReleaseRuleRepo::set_manual_unlock(&state.pool, id, true)
        .await?
        .ok_or(CoreError::not_found("ReleaseRule", id))?;
    tracing::info!(rule_id = id, unlocked_by = user.user_id, "Release rule unlocked");
    Ok(Json(DataResponse { data: rule }))
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// PUT /api/v1/release-rules/{id}/overrides/{student_id}
///
/// Create or replace the student's override. Its `is_released` flag takes
/// precedence over the rule's trigger for that student.
pub async fn upsert_override(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path((id, student_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpsertProgressOverride>,
) -> AppResult<Json<DataResponse<StudentProgressOverride>>> {
    load_rule(&state.pool, id).await?;
    UserRepo::find_by_id(&state.pool, student_id)
        .await?
        .ok_or(CoreError::not_found("User", student_id))?;

    let entry = ProgressOverrideRepo::upsert(&state.pool, id, student_id, &input).await?;
    tracing::info!(
        rule_id = id,
        student_id,
        is_released = entry.is_released,
        "Progress override saved"
    );
    Ok(Json(DataResponse { data: entry }))
}

/// DELETE /api/v1/release-rules/{id}/overrides/{student_id}
pub async fn delete_override(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path((id, student_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if ProgressOverrideRepo::delete(&state.pool, id, student_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::not_found("StudentProgressOverride", student_id)))
    }
}

/// GET /api/v1/release-rules/{id}/overrides
pub async fn list_overrides(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StudentProgressOverride>>>> {
    load_rule(&state.pool, id).await?;
    let overrides = ProgressOverrideRepo::list_by_rule(&state.pool, id).await?;
    Ok(Json(DataResponse { data: overrides }))
}
