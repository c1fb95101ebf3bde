//! Handlers for `/enrollments` and lecture progress.
//!
//! Students act on their own enrollments; instructors and admins may act on
//! any. Completion mutations go through `CourseProgressRepo`, which runs each
//! one in a single transaction holding the enrollment row lock.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;
use lms_core::availability::ContentRef;
use lms_core::error::CoreError;
use lms_core::progress::CompletionTransition;
use lms_core::types::DbId;
use lms_db::models::course::Lecture;
use lms_db::models::enrollment::{
    AddTimeSpent, CourseProgress, CreateEnrollment, Enrollment, MarkCompleteOutcome,
    ProgressDetail, ProgressUpdate,
};
use lms_db::repositories::{CourseProgressRepo, CourseRepo, EnrollmentRepo, LectureRepo};
use lms_events::PlatformEvent;

use crate::engine::availability::ensure_available;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load an enrollment the caller may act on.
async fn load_enrollment(pool: &PgPool, user: &AuthUser, id: DbId) -> AppResult<Enrollment> {
    let enrollment = EnrollmentRepo::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::not_found("Enrollment", id))?;
    user.ensure_self_or_manager(enrollment.student_id)?;
    Ok(enrollment)
}

async fn load_lecture(pool: &PgPool, id: DbId) -> AppResult<Lecture> {
    LectureRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Lecture", id)))
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

/// POST /api/v1/enrollments
///
/// Enrolls the caller, or `student_id` when the caller is an instructor or
/// admin. A second enrollment in the same course is a 409.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateEnrollment>,
) -> AppResult<(StatusCode, Json<DataResponse<Enrollment>>)> {
    let student_id = user.resolve_student(input.student_id)?;
    CourseRepo::find_by_id(&state.pool, input.course_id)
        .await?
        .ok_or(CoreError::not_found("Course", input.course_id))?;

    let enrollment = EnrollmentRepo::create(&state.pool, student_id, input.course_id).await?;
    tracing::info!(
        enrollment_id = enrollment.id,
        student_id,
        course_id = input.course_id,
        "Student enrolled"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: enrollment })))
}

/// GET /api/v1/enrollments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Enrollment>>> {
    let enrollment = load_enrollment(&state.pool, &user, id).await?;
    Ok(Json(DataResponse { data: enrollment }))
}

/// GET /api/v1/enrollments/{id}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProgressDetail>>> {
    load_enrollment(&state.pool, &user, id).await?;
    let detail = CourseProgressRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(CoreError::not_found("CourseProgress", id))?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/enrollments/{id}/time
pub async fn add_time(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<AddTimeSpent>,
) -> AppResult<Json<DataResponse<Enrollment>>> {
    if input.minutes <= 0 {
        return Err(AppError::Core(CoreError::Validation(format!(
            "'minutes' must be greater than 0, got {}",
            input.minutes
        ))));
    }
    load_enrollment(&state.pool, &user, id).await?;
    let enrollment = EnrollmentRepo::add_time_spent(&state.pool, id, input.minutes)
        .await?
        .ok_or(CoreError::not_found("Enrollment", id))?;
    Ok(Json(DataResponse { data: enrollment }))
}

// ---------------------------------------------------------------------------
// Lecture progress
// ---------------------------------------------------------------------------

/// POST /api/v1/enrollments/{id}/lectures/{lecture_id}/complete
///
/// Rejections: other course or unpublished course (400), already completed
/// (409). The first completion of the course publishes `course.completed`.
pub async fn complete_lecture(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lecture_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ProgressUpdate>>> {
    let enrollment = load_enrollment(&state.pool, &user, id).await?;
    load_lecture(&state.pool, lecture_id).await?;

    let update = match CourseProgressRepo::mark_lecture_complete(&state.pool, id, lecture_id)
        .await?
    {
        MarkCompleteOutcome::Applied(update) => update,
        MarkCompleteOutcome::Rejected { reason } => return Err(reason.into()),
    };

    if update.transition == CompletionTransition::Completed {
        tracing::info!(
            enrollment_id = id,
            student_id = enrollment.student_id,
            points_granted = update.points_granted,
            "Course completed"
        );
        state.event_bus.publish(PlatformEvent::course_completed(
            id,
            enrollment.student_id,
            enrollment.course_id,
            update.points_granted,
        ));
    }

    Ok(Json(DataResponse { data: update }))
}

/// DELETE /api/v1/enrollments/{id}/lectures/{lecture_id}/complete
///
/// Removes the lecture from the completed set. A completed enrollment that
/// drops below the lecture total reverts to incomplete; awarded points stay.
pub async fn uncomplete_lecture(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lecture_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ProgressUpdate>>> {
    load_enrollment(&state.pool, &user, id).await?;
    load_lecture(&state.pool, lecture_id).await?;

    let update = CourseProgressRepo::mark_lecture_incomplete(&state.pool, id, lecture_id).await?;
    if update.transition == CompletionTransition::Reverted {
        tracing::info!(enrollment_id = id, lecture_id, "Course completion reverted");
    }
    Ok(Json(DataResponse { data: update }))
}

/// POST /api/v1/enrollments/{id}/lectures/{lecture_id}/access
///
/// Record the lecture as last accessed. The lecture must be released to the
/// enrolled student (403 otherwise).
pub async fn access_lecture(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lecture_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<CourseProgress>>> {
    let enrollment = load_enrollment(&state.pool, &user, id).await?;
    let lecture = load_lecture(&state.pool, lecture_id).await?;
    if lecture.course_id != enrollment.course_id {
        return Err(AppError::Core(CoreError::Validation(
            "Lecture does not belong to the enrolled course".into(),
        )));
    }

    let content = ContentRef::Lecture {
        id: lecture.id,
        section_id: lecture.section_id,
    };
    ensure_available(&state.pool, enrollment.course_id, &content, enrollment.student_id).await?;

    let progress = CourseProgressRepo::record_access(&state.pool, id, lecture_id)
        .await?
        .ok_or(CoreError::not_found("CourseProgress", id))?;
    Ok(Json(DataResponse { data: progress }))
}
