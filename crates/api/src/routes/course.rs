//! Route definitions for the `/courses` resource and its structure.

use axum::routing::get;
use axum::Router;

use crate::handlers::{course, release_schedule};
use crate::state::AppState;

/// Routes mounted at `/courses`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create
/// GET    /{id}                      -> get_by_id
/// PUT    /{id}                      -> update
/// GET    /{id}/sections             -> list_sections
/// POST   /{id}/sections             -> create_section
/// GET    /{id}/lectures             -> list_lectures
/// POST   /{id}/lectures             -> create_lecture
/// GET    /{id}/quizzes              -> list_quizzes
/// POST   /{id}/quizzes              -> create_quiz
/// GET    /{id}/availability         -> get_availability
/// GET    /{id}/release-schedule     -> release_schedule::get_by_course
/// GET    /{id}/calendar-events      -> list_calendar_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(course::list).post(course::create))
        .route("/{id}", get(course::get_by_id).put(course::update))
        .route(
            "/{id}/sections",
            get(course::list_sections).post(course::create_section),
        )
        .route(
            "/{id}/lectures",
            get(course::list_lectures).post(course::create_lecture),
        )
        .route(
            "/{id}/quizzes",
            get(course::list_quizzes).post(course::create_quiz),
        )
        .route("/{id}/availability", get(course::get_availability))
        .route(
            "/{id}/release-schedule",
            get(release_schedule::get_by_course),
        )
        .route("/{id}/calendar-events", get(course::list_calendar_events))
}
