//! Route definitions for the `/quizzes` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::quiz;
use crate::state::AppState;

/// Routes mounted at `/quizzes`.
///
/// ```text
/// POST   /{id}/attempts             -> submit_attempt
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/attempts", post(quiz::submit_attempt))
}
