//! Route definitions for the `/enrollments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::enrollment;
use crate::state::AppState;

/// Routes mounted at `/enrollments`.
///
/// ```text
/// POST   /                                      -> create
/// GET    /{id}                                  -> get_by_id
/// GET    /{id}/progress                         -> get_progress
/// POST   /{id}/time                             -> add_time
/// POST   /{id}/lectures/{lecture_id}/complete   -> complete_lecture
/// DELETE /{id}/lectures/{lecture_id}/complete   -> uncomplete_lecture
/// POST   /{id}/lectures/{lecture_id}/access     -> access_lecture
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(enrollment::create))
        .route("/{id}", get(enrollment::get_by_id))
        .route("/{id}/progress", get(enrollment::get_progress))
        .route("/{id}/time", post(enrollment::add_time))
        .route(
            "/{id}/lectures/{lecture_id}/complete",
            post(enrollment::complete_lecture).delete(enrollment::uncomplete_lecture),
        )
        .route(
            "/{id}/lectures/{lecture_id}/access",
            post(enrollment::access_lecture),
        )
}
