//! Repository for the `point_transactions` ledger.

use sqlx::PgPool;
use lms_core::types::DbId;

use crate::models::points::PointTransaction;

const COLUMNS: &str = "id, user_id, enrollment_id, points, reason, created_at";

/// Read access to awarded points. Awards are written by
/// `CourseProgressRepo` inside the completion transaction.
pub struct PointTransactionRepo;

impl PointTransactionRepo {
    /// List a user's point transactions, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PointTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM point_transactions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, PointTransaction>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Total points held by a user.
    pub async fn total_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM point_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }
}
