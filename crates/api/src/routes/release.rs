//! Route definitions for release schedules, rules and overrides.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{release_rule, release_schedule};
use crate::state::AppState;

/// Routes mounted at `/release-schedules`.
///
/// Creation and mutation require the `instructor` or `admin` role.
///
/// ```text
/// POST   /                            -> create
/// GET    /{id}                        -> get_by_id
/// PUT    /{id}                        -> update
/// DELETE /{id}                        -> delete
/// GET    /{id}/rules                  -> release_rule::list_by_schedule
/// POST   /{id}/rules                  -> release_rule::create
/// POST   /{id}/generate-events        -> generate_events
/// POST   /{id}/generate-drip-rules    -> generate_drip_rules
/// ```
pub fn schedule_router() -> Router<AppState> {
    Router::new()
        .route("/", post(release_schedule::create))
        .route(
            "/{id}",
            get(release_schedule::get_by_id)
                .put(release_schedule::update)
                .delete(release_schedule::delete),
        )
        .route(
            "/{id}/rules",
            get(release_rule::list_by_schedule).post(release_rule::create),
        )
        .route(
            "/{id}/generate-events",
            post(release_schedule::generate_events),
        )
        .route(
            "/{id}/generate-drip-rules",
            post(release_schedule::generate_drip_rules),
        )
}

/// Routes mounted at `/release-rules`.
///
/// ```text
/// GET    /{id}                            -> get_by_id
/// PUT    /{id}                            -> update
/// DELETE /{id}                            -> delete
/// POST   /{id}/unlock                     -> unlock
/// GET    /{id}/overrides                  -> list_overrides
/// PUT    /{id}/overrides/{student_id}     -> upsert_override
/// DELETE /{id}/overrides/{student_id}     -> delete_override
/// ```
pub fn rule_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(release_rule::get_by_id)
                .put(release_rule::update)
                .delete(release_rule::delete),
        )
        .route("/{id}/unlock", post(release_rule::unlock))
        .route("/{id}/overrides", get(release_rule::list_overrides))
        .route(
            "/{id}/overrides/{student_id}",
            put(release_rule::upsert_override).delete(release_rule::delete_override),
        )
}
