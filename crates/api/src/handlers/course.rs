//! Handlers for `/courses` and the course structure beneath it
//! (sections, lectures, quizzes).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;
use lms_core::error::CoreError;
use lms_core::types::DbId;
use lms_db::models::calendar::CalendarEvent;
use lms_db::models::course::{
    Course, CourseSection, CreateCourse, CreateCourseSection, CreateLecture, Lecture,
    UpdateCourse,
};
use lms_db::models::quiz::{CreateQuiz, Quiz};
use lms_db::repositories::{
    CalendarEventRepo, CourseProgressRepo, CourseRepo, CourseSectionRepo, LectureRepo, QuizRepo,
};

use crate::engine::availability::{self, CourseAvailability};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireInstructor;
use crate::query::{PaginationParams, StudentParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_course_exists(pool: &PgPool, id: DbId) -> AppResult<Course> {
    CourseRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Course", id)))
}

/// Reject a section id that belongs to another course.
async fn ensure_section_in_course(
    pool: &PgPool,
    course_id: DbId,
    section_id: Option<DbId>,
) -> AppResult<()> {
    let Some(section_id) = section_id else {
        return Ok(());
    };
    let section = CourseSectionRepo::find_by_id(pool, section_id)
        .await?
        .ok_or(CoreError::not_found("CourseSection", section_id))?;
    if section.course_id != course_id {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Section {section_id} does not belong to course {course_id}"
        ))));
    }
    Ok(())
}

fn require_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "'title' must not be empty".into(),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// POST /api/v1/courses
///
/// The instructor defaults to the caller.
pub async fn create(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Json(mut input): Json<CreateCourse>,
) -> AppResult<(StatusCode, Json<DataResponse<Course>>)> {
    require_title(&input.title)?;
    input.instructor_id.get_or_insert(user.user_id);
    let course = CourseRepo::create(&state.pool, &input).await?;
    tracing::info!(course_id = course.id, user_id = user.user_id, "Course created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: course })))
}

/// GET /api/v1/courses
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Course>>>> {
    let courses = CourseRepo::list(&state.pool, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: courses }))
}

/// GET /api/v1/courses/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Course>>> {
    let course = ensure_course_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: course }))
}

/// PUT /api/v1/courses/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCourse>,
) -> AppResult<Json<DataResponse<Course>>> {
    if let Some(title) = &input.title {
        require_title(title)?;
    }
    let course = CourseRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::not_found("Course", id))?;
    Ok(Json(DataResponse { data: course }))
}

/// GET /api/v1/courses/{id}/availability
///
/// Availability of every section, lecture and quiz for the caller, or for
/// `?student_id=` when the caller is an instructor or admin.
pub async fn get_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<StudentParams>,
) -> AppResult<Json<DataResponse<CourseAvailability>>> {
    let student_id = user.resolve_student(params.student_id)?;
    ensure_course_exists(&state.pool, id).await?;
    let outline = availability::course_availability(&state.pool, id, student_id).await?;
    Ok(Json(DataResponse { data: outline }))
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/sections
pub async fn create_section(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(course_id): Path<DbId>,
    Json(input): Json<CreateCourseSection>,
) -> AppResult<(StatusCode, Json<DataResponse<CourseSection>>)> {
    require_title(&input.title)?;
    ensure_course_exists(&state.pool, course_id).await?;
    let section = CourseSectionRepo::create(&state.pool, course_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: section })))
}

/// GET /api/v1/courses/{id}/sections
pub async fn list_sections(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(course_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<CourseSection>>>> {
    ensure_course_exists(&state.pool, course_id).await?;
    let sections = CourseSectionRepo::list_by_course(&state.pool, course_id).await?;
    Ok(Json(DataResponse { data: sections }))
}

// ---------------------------------------------------------------------------
// Lectures
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/lectures
///
/// A new lecture changes the lecture total, so every enrollment of the
/// course is recomputed; completed enrollments revert to incomplete.
pub async fn create_lecture(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(course_id): Path<DbId>,
    Json(input): Json<CreateLecture>,
) -> AppResult<(StatusCode, Json<DataResponse<Lecture>>)> {
    require_title(&input.title)?;
    ensure_course_exists(&state.pool, course_id).await?;
    ensure_section_in_course(&state.pool, course_id, input.section_id).await?;

    let (lecture, updates) =
        CourseProgressRepo::add_lecture(&state.pool, course_id, &input).await?;
    tracing::info!(
        lecture_id = lecture.id,
        course_id,
        recomputed = updates.len(),
        "Lecture created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: lecture })))
}

/// GET /api/v1/courses/{id}/lectures
pub async fn list_lectures(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(course_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Lecture>>>> {
    ensure_course_exists(&state.pool, course_id).await?;
    let lectures = LectureRepo::list_by_course(&state.pool, course_id).await?;
    Ok(Json(DataResponse { data: lectures }))
}

// ---------------------------------------------------------------------------
// Quizzes
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/quizzes
pub async fn create_quiz(
    State(state): State<AppState>,
    RequireInstructor(_user): RequireInstructor,
    Path(course_id): Path<DbId>,
    Json(input): Json<CreateQuiz>,
) -> AppResult<(StatusCode, Json<DataResponse<Quiz>>)> {
    require_title(&input.title)?;
    ensure_course_exists(&state.pool, course_id).await?;
    ensure_section_in_course(&state.pool, course_id, input.section_id).await?;
    let quiz = QuizRepo::create(&state.pool, course_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: quiz })))
}

/// GET /api/v1/courses/{id}/quizzes
pub async fn list_quizzes(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(course_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Quiz>>>> {
    ensure_course_exists(&state.pool, course_id).await?;
    let quizzes = QuizRepo::list_by_course(&state.pool, course_id).await?;
    Ok(Json(DataResponse { data: quizzes }))
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// GET /api/v1/courses/{id}/calendar-events
pub async fn list_calendar_events(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(course_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<CalendarEvent>>>> {
    ensure_course_exists(&state.pool, course_id).await?;
    let events = CalendarEventRepo::list_by_course(&state.pool, course_id).await?;
    Ok(Json(DataResponse { data: events }))
}
