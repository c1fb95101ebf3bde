//! Handler for single-item content availability.

use axum::extract::{Path, Query, State};
use axum::Json;
use lms_core::types::DbId;

use crate::engine::availability::{self, ContentAvailability};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::StudentParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/availability/{content_type}/{content_id}
///
/// `content_type` is `lecture`, `section` or `quiz`. A missing content id
/// is a 404; existing but locked content is `available: false`.
pub async fn get_content_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Path((content_type, content_id)): Path<(String, DbId)>,
    Query(params): Query<StudentParams>,
) -> AppResult<Json<DataResponse<ContentAvailability>>> {
    let student_id = user.resolve_student(params.student_id)?;
    let result =
        availability::content_availability(&state.pool, &content_type, content_id, student_id)
            .await?;
    Ok(Json(DataResponse { data: result }))
}
