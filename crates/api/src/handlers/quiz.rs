//! Handlers for `/quizzes`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use lms_core::availability::ContentRef;
use lms_core::error::CoreError;
use lms_core::types::DbId;
use lms_db::models::quiz::{QuizAttempt, SubmitQuizAttempt};
use lms_db::repositories::{EnrollmentRepo, QuizAttemptRepo, QuizRepo};

use crate::engine::availability::ensure_available;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/quizzes/{id}/attempts
///
/// Record a finished attempt for the caller. The caller must be enrolled in
/// the quiz's course and the quiz must be released to them.
pub async fn submit_attempt(
    State(state): State<AppState>,
    user: AuthUser,
    Path(quiz_id): Path<DbId>,
    Json(input): Json<SubmitQuizAttempt>,
) -> AppResult<(StatusCode, Json<DataResponse<QuizAttempt>>)> {
    if !(0.0..=100.0).contains(&input.score_percentage) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "'score_percentage' must be between 0 and 100, got {}",
            input.score_percentage
        ))));
    }

    let quiz = QuizRepo::find_by_id(&state.pool, quiz_id)
        .await?
        .ok_or(CoreError::not_found("Quiz", quiz_id))?;

    if EnrollmentRepo::find_by_student_and_course(&state.pool, user.user_id, quiz.course_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not enrolled in this course".into(),
        )));
    }

    ensure_available(
        &state.pool,
        quiz.course_id,
        &ContentRef::Quiz { id: quiz.id },
        user.user_id,
    )
    .await?;

    let attempt = QuizAttemptRepo::create_completed(
        &state.pool,
        quiz.id,
        user.user_id,
        input.score_percentage,
    )
    .await?;

    tracing::info!(
        quiz_id,
        student_id = user.user_id,
        score = input.score_percentage,
        "Quiz attempt recorded"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: attempt })))
}
