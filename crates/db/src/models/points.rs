use serde::Serialize;
use sqlx::FromRow;
use lms_core::types::{DbId, Timestamp};

/// A row from the `point_transactions` ledger.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PointTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub enrollment_id: Option<DbId>,
    pub points: i32,
    pub reason: String,
    pub created_at: Timestamp,
}
