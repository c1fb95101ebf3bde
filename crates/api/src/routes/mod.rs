pub mod admin;
pub mod course;
pub mod enrollment;
pub mod health;
pub mod quiz;
pub mod release;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /admin/users                                     create (admin only)
/// /admin/users/{id}                                get
///
/// /courses                                         list, create
/// /courses/{id}                                    get, update
/// /courses/{id}/sections                           list, create
/// /courses/{id}/lectures                           list, create
/// /courses/{id}/quizzes                            list, create
/// /courses/{id}/availability                       outline availability
/// /courses/{id}/release-schedule                   schedule for course
/// /courses/{id}/calendar-events                    release calendar
///
/// /quizzes/{id}/attempts                           submit (availability-gated)
///
/// /enrollments                                     enroll
/// /enrollments/{id}                                get
/// /enrollments/{id}/progress                       progress detail
/// /enrollments/{id}/time                           add time spent
/// /enrollments/{id}/lectures/{lecture_id}/complete complete, uncomplete
/// /enrollments/{id}/lectures/{lecture_id}/access   record access (gated)
///
/// /release-schedules                               create
/// /release-schedules/{id}                          get, update, delete
/// /release-schedules/{id}/rules                    list, create
/// /release-schedules/{id}/generate-events          calendar events (POST)
/// /release-schedules/{id}/generate-drip-rules      drip rules (POST)
///
/// /release-rules/{id}                              get, update, delete
/// /release-rules/{id}/unlock                       manual unlock (POST)
/// /release-rules/{id}/overrides                    list
/// /release-rules/{id}/overrides/{student_id}       upsert, delete
///
/// /availability/{content_type}/{content_id}        single item availability
///
/// /me/points                                       caller's points ledger
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", admin::router())
        .nest("/courses", course::router())
        .nest("/quizzes", quiz::router())
        .nest("/enrollments", enrollment::router())
        .nest("/release-schedules", release::schedule_router())
        .nest("/release-rules", release::rule_router())
        .route(
            "/availability/{content_type}/{content_id}",
            get(handlers::availability::get_content_availability),
        )
        .route("/me/points", get(handlers::points::my_points))
}
