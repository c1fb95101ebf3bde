//! Handlers for `/admin/users`.
//!
//! Account provisioning only; credentials and sessions live in the external
//! identity service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use lms_core::error::CoreError;
use lms_core::roles::{validate_role, ROLE_STUDENT};
use lms_core::types::DbId;
use lms_db::models::user::{CreateUser, User};
use lms_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    if input.username.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "'username' must not be empty".into(),
        )));
    }
    validate_role(input.role.as_deref().unwrap_or(ROLE_STUDENT))
        .map_err(|e| AppError::Core(CoreError::Validation(e)))?;

    let user = UserRepo::create(&state.pool, &input).await?;
    tracing::info!(user_id = user.id, role = %user.role, admin_id = admin.user_id, "User created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::not_found("User", id))?;
    Ok(Json(DataResponse { data: user }))
}
