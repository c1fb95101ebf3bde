//! Shared query parameter types for API handlers.

use serde::Deserialize;
use lms_core::types::DbId;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the repository layer via `clamp_limit` /
/// `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `?student_id=` for availability endpoints. Instructors and admins may
/// evaluate content for another student; students always get their own view.
#[derive(Debug, Deserialize)]
pub struct StudentParams {
    pub student_id: Option<DbId>,
}
