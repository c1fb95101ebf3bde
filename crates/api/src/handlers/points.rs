//! Handler for the caller's point balance.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use lms_db::models::points::PointTransaction;
use lms_db::repositories::PointTransactionRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Point balance with the ledger behind it.
#[derive(Debug, Serialize)]
pub struct PointsSummary {
    pub total: i64,
    pub transactions: Vec<PointTransaction>,
}

/// GET /api/v1/me/points
pub async fn my_points(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<PointsSummary>>> {
    let total = PointTransactionRepo::total_for_user(&state.pool, user.user_id).await?;
    let transactions = PointTransactionRepo::list_by_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse {
        data: PointsSummary {
            total,
            transactions,
        },
    }))
}
