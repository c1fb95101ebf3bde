//! Handlers for `/release-schedules` and the per-course schedule lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use lms_core::error::CoreError;
use lms_core::release::{validate_schedule_config, ReleaseStrategy};
use lms_core::types::DbId;
use lms_db::models::release::{
    CreateReleaseSchedule, ReleaseSchedule, UpdateReleaseSchedule,
};
use lms_db::repositories::{CourseRepo, ReleaseScheduleRepo};
use lms_events::PlatformEvent;

use crate::engine::{calendar, drip};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireInstructor;
use crate::response::DataResponse;
use crate::state::AppState;

/// Number of rows a generation endpoint created.
#[derive(Debug, Serialize)]
pub struct GenerationResult {
    pub created: usize,
}

pub(crate) async fn load_schedule(pool: &PgPool, id: DbId) -> AppResult<ReleaseSchedule> {
    ReleaseScheduleRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("ReleaseSchedule", id)))
}

fn validate(
    strategy: &str,
    start_date: Option<chrono::NaiveDate>,
    end_date: Option<chrono::NaiveDate>,
    days_between_releases: Option<i32>,
) -> AppResult<()> {
    let strategy = ReleaseStrategy::from_str_value(strategy)
        .map_err(|e| AppError::Core(CoreError::Validation(e)))?;
    validate_schedule_config(strategy, start_date, end_date, days_between_releases)
        .map_err(|e| AppError::Core(CoreError::Validation(e)))
}

/// POST /api/v1/release-schedules
///
/// A course has at most one schedule; a second one is a 409.
pub async fn create(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Json(input): Json<CreateReleaseSchedule>,
) -> AppResult<(StatusCode, Json<DataResponse<ReleaseSchedule>>)> {
    validate(
        &input.strategy,
        input.start_date,
        input.end_date,
        input.days_between_releases,
    )?;
    CourseRepo::find_by_id(&state.pool, input.course_id)
        .await?
        .ok_or(CoreError::not_found("Course", input.course_id))?;

    let schedule = ReleaseScheduleRepo::create(&state.pool, &input).await?;
    tracing::info!(
        schedule_id = schedule.id,
        course_id = schedule.course_id,
        strategy = %schedule.strategy,
        "Release schedule created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: schedule })))
}

/// GET /api/v1/release-schedules/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReleaseSchedule>>> {
    let schedule = load_schedule(&state.pool, id).await?;
    Ok(Json(DataResponse { data: schedule }))
}

/// GET /api/v1/courses/{id}/release-schedule
pub async fn get_by_course(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(course_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReleaseSchedule>>> {
    let schedule = ReleaseScheduleRepo::find_by_course(&state.pool, course_id)
        .await?
        .ok_or(CoreError::not_found("ReleaseSchedule", course_id))?;
    Ok(Json(DataResponse { data: schedule }))
}

/// PUT /api/v1/release-schedules/{id}
///
/// The patched schedule is validated as a whole, so switching to `drip`
/// without a positive `days_between_releases` is rejected. Sending `null`
/// for `start_date`, `end_date` or `days_between_releases` clears it.
pub async fn update(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateReleaseSchedule>,
) -> AppResult<Json<DataResponse<ReleaseSchedule>>> {
    let existing = load_schedule(&state.pool, id).await?;
    let merged = input.merged_with(&existing);
    validate(
        &merged.strategy,
        merged.start_date,
        merged.end_date,
        merged.days_between_releases,
    )?;

    let schedule = ReleaseScheduleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::not_found("ReleaseSchedule", id))?;
    Ok(Json(DataResponse { data: schedule }))
}

/// DELETE /api/v1/release-schedules/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ReleaseScheduleRepo::delete(&state.pool, id).await? {
        tracing::info!(schedule_id = id, "Release schedule deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::not_found("ReleaseSchedule", id)))
    }
}

/// POST /api/v1/release-schedules/{id}/generate-events
///
/// Get-or-create a calendar event for every dated `specific_date` rule.
/// Safe to repeat: an unchanged schedule reports `created: 0`.
pub async fn generate_events(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GenerationResult>>> {
    let schedule = load_schedule(&state.pool, id).await?;
    let created = calendar::generate_events(&state.pool, &schedule).await?;
    state
        .event_bus
        .publish(PlatformEvent::calendar_events_generated(schedule.id, created));
    Ok(Json(DataResponse {
        data: GenerationResult { created },
    }))
}

/// POST /api/v1/release-schedules/{id}/generate-drip-rules
pub async fn generate_drip_rules(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GenerationResult>>> {
    let schedule = load_schedule(&state.pool, id).await?;
    let created = drip::generate_drip_rules(&state.pool, &schedule).await?;
    Ok(Json(DataResponse {
        data: GenerationResult { created },
    }))
}
