//! Course progress ledger and the derived enrollment fields.
//!
//! Every mutation of the completed-lecture set runs in one transaction that
//! first locks the enrollment row, mutates the set, and recomputes the
//! enrollment's `progress_percentage` / `completed` / `completed_at` via
//! [`lms_core::progress::recompute`]. Concurrent calls for the same
//! enrollment therefore serialize, and the set and the derived fields are
//! always committed together.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use lms_core::progress::{
    self, CompletionCheck, CompletionTransition, COURSE_COMPLETION_POINTS,
    REASON_COURSE_COMPLETION,
};
use lms_core::types::DbId;

use crate::models::course::{CreateLecture, Lecture};
use crate::models::enrollment::{
    CourseProgress, Enrollment, MarkCompleteOutcome, ProgressDetail, ProgressUpdate,
};
use crate::repositories::course_repo::LectureRepo;
use crate::repositories::enrollment_repo::COLUMNS as ENROLLMENT_COLUMNS;

const PROGRESS_COLUMNS: &str = "id, enrollment_id, last_accessed_lecture_id, updated_at";

/// Provides data access for `course_progress` and its completed lectures.
pub struct CourseProgressRepo;

impl CourseProgressRepo {
    /// Load an enrollment's progress ledger with its completed lecture ids.
    pub async fn find_detail(
        pool: &PgPool,
        enrollment_id: DbId,
    ) -> Result<Option<ProgressDetail>, sqlx::Error> {
        let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1");
        let Some(enrollment) = sqlx::query_as::<_, Enrollment>(&query)
            .bind(enrollment_id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };

        let query =
            format!("SELECT {PROGRESS_COLUMNS} FROM course_progress WHERE enrollment_id = $1");
        let Some(progress) = sqlx::query_as::<_, CourseProgress>(&query)
            .bind(enrollment_id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };

        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT lecture_id FROM course_progress_lectures \
             WHERE progress_id = $1 \
             ORDER BY completed_at, lecture_id",
        )
        .bind(progress.id)
        .fetch_all(pool)
        .await?;

        Ok(Some(ProgressDetail {
            progress,
            completed_lecture_ids: rows.into_iter().map(|(id,)| id).collect(),
            enrollment,
        }))
    }

    /// Mark a lecture complete for an enrollment.
    ///
    /// Rejections (other course, already completed, unpublished course)
    /// leave no trace. A missing enrollment or lecture yields
    /// `sqlx::Error::RowNotFound`.
    pub async fn mark_lecture_complete(
        pool: &PgPool,
        enrollment_id: DbId,
        lecture_id: DbId,
    ) -> Result<MarkCompleteOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let enrollment = lock_enrollment(&mut tx, enrollment_id).await?;
        let progress_id = progress_id(&mut tx, enrollment_id).await?;

        let (lecture_course_id,): (DbId,) =
            sqlx::query_as("SELECT course_id FROM lectures WHERE id = $1")
                .bind(lecture_id)
                .fetch_one(&mut *tx)
                .await?;

        let (already_completed,): (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                 SELECT 1 FROM course_progress_lectures \
                 WHERE progress_id = $1 AND lecture_id = $2 \
             )",
        )
        .bind(progress_id)
        .bind(lecture_id)
        .fetch_one(&mut *tx)
        .await?;

        let (course_published,): (bool,) =
            sqlx::query_as("SELECT is_published FROM courses WHERE id = $1")
                .bind(enrollment.course_id)
                .fetch_one(&mut *tx)
                .await?;

        let check = CompletionCheck {
            enrollment_course_id: enrollment.course_id,
            lecture_course_id,
            already_completed,
            course_published,
        };
        if let Err(reason) = progress::check_mark_complete(&check) {
            tx.rollback().await?;
            tracing::debug!(
                enrollment_id,
                lecture_id,
                reason = ?reason,
                "Lecture completion rejected"
            );
            return Ok(MarkCompleteOutcome::Rejected { reason });
        }

        sqlx::query(
            "INSERT INTO course_progress_lectures (progress_id, lecture_id) VALUES ($1, $2)",
        )
        .bind(progress_id)
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE course_progress SET last_accessed_lecture_id = $2 WHERE id = $1")
            .bind(progress_id)
            .bind(lecture_id)
            .execute(&mut *tx)
            .await?;

        let update = recompute_locked(&mut tx, &enrollment, progress_id).await?;

        tx.commit().await?;
        Ok(MarkCompleteOutcome::Applied(update))
    }

    /// Remove a lecture from the completed set and recompute. Removing a
    /// lecture that is not in the set only recomputes.
    ///
    /// A missing enrollment or lecture yields `sqlx::Error::RowNotFound`.
    pub async fn mark_lecture_incomplete(
        pool: &PgPool,
        enrollment_id: DbId,
        lecture_id: DbId,
    ) -> Result<ProgressUpdate, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let enrollment = lock_enrollment(&mut tx, enrollment_id).await?;
        let progress_id = progress_id(&mut tx, enrollment_id).await?;

        sqlx::query("SELECT id FROM lectures WHERE id = $1")
            .bind(lecture_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "DELETE FROM course_progress_lectures WHERE progress_id = $1 AND lecture_id = $2",
        )
        .bind(progress_id)
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;

        let update = recompute_locked(&mut tx, &enrollment, progress_id).await?;

        tx.commit().await?;
        Ok(update)
    }

    /// Recompute an enrollment's derived fields from its ledger, e.g. after
    /// the course gained or lost lectures.
    pub async fn recompute(
        pool: &PgPool,
        enrollment_id: DbId,
    ) -> Result<ProgressUpdate, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let update = Self::recompute_in(&mut tx, enrollment_id).await?;
        tx.commit().await?;
        Ok(update)
    }

    /// Lock and recompute an enrollment inside the caller's transaction.
    pub async fn recompute_in(
        conn: &mut PgConnection,
        enrollment_id: DbId,
    ) -> Result<ProgressUpdate, sqlx::Error> {
        let enrollment = lock_enrollment(conn, enrollment_id).await?;
        let progress_id = progress_id(conn, enrollment_id).await?;
        recompute_locked(conn, &enrollment, progress_id).await
    }

    /// Insert a lecture and recompute every enrollment of its course in one
    /// transaction. Either the lecture and all recomputed enrollments are
    /// committed, or nothing is.
    pub async fn add_lecture(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateLecture,
    ) -> Result<(Lecture, Vec<ProgressUpdate>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let lecture = LectureRepo::create_in(&mut tx, course_id, input).await?;

        let rows: Vec<(DbId,)> =
            sqlx::query_as("SELECT id FROM enrollments WHERE course_id = $1 ORDER BY id")
                .bind(course_id)
                .fetch_all(&mut *tx)
                .await?;

        let mut updates = Vec::with_capacity(rows.len());
        for (enrollment_id,) in rows {
            updates.push(Self::recompute_in(&mut tx, enrollment_id).await?);
        }

        tx.commit().await?;
        Ok((lecture, updates))
    }

    /// Record the lecture a student last opened.
    pub async fn record_access(
        pool: &PgPool,
        enrollment_id: DbId,
        lecture_id: DbId,
    ) -> Result<Option<CourseProgress>, sqlx::Error> {
        let query = format!(
            "UPDATE course_progress SET last_accessed_lecture_id = $2 \
             WHERE enrollment_id = $1 \
             RETURNING {PROGRESS_COLUMNS}"
        );
        sqlx::query_as::<_, CourseProgress>(&query)
            .bind(enrollment_id)
            .bind(lecture_id)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

/// Lock the enrollment row for the rest of the transaction.
async fn lock_enrollment(
    conn: &mut PgConnection,
    enrollment_id: DbId,
) -> Result<Enrollment, sqlx::Error> {
    let query = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Enrollment>(&query)
        .bind(enrollment_id)
        .fetch_one(&mut *conn)
        .await
}

/// The progress ledger id for an enrollment, creating the ledger if an
/// older enrollment has none.
async fn progress_id(conn: &mut PgConnection, enrollment_id: DbId) -> Result<DbId, sqlx::Error> {
    sqlx::query("INSERT INTO course_progress (enrollment_id) VALUES ($1) ON CONFLICT (enrollment_id) DO NOTHING")
        .bind(enrollment_id)
        .execute(&mut *conn)
        .await?;
    let (id,): (DbId,) = sqlx::query_as("SELECT id FROM course_progress WHERE enrollment_id = $1")
        .bind(enrollment_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Recompute and persist the derived fields of a locked enrollment, granting
/// the completion award on the first completion.
async fn recompute_locked(
    conn: &mut PgConnection,
    enrollment: &Enrollment,
    progress_id: DbId,
) -> Result<ProgressUpdate, sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lectures WHERE course_id = $1")
        .bind(enrollment.course_id)
        .fetch_one(&mut *conn)
        .await?;

    let (completed,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM course_progress_lectures cpl \
         JOIN lectures l ON l.id = cpl.lecture_id \
         WHERE cpl.progress_id = $1 AND l.course_id = $2",
    )
    .bind(progress_id)
    .bind(enrollment.course_id)
    .fetch_one(&mut *conn)
    .await?;

    let (state, transition) =
        progress::recompute(completed, total, &enrollment.completion_state(), Utc::now());

    let query = format!(
        "UPDATE enrollments \
         SET progress_percentage = $2, completed = $3, completed_at = $4 \
         WHERE id = $1 \
         RETURNING {ENROLLMENT_COLUMNS}"
    );
    let mut updated = sqlx::query_as::<_, Enrollment>(&query)
        .bind(enrollment.id)
        .bind(state.progress_percentage)
        .bind(state.completed)
        .bind(state.completed_at)
        .fetch_one(&mut *conn)
        .await?;

    let mut points_granted = 0;
    if transition == CompletionTransition::Completed && award_completion(conn, &updated).await? {
        points_granted = COURSE_COMPLETION_POINTS;
        updated.points_awarded = true;
    }

    tracing::debug!(
        enrollment_id = enrollment.id,
        completed,
        total,
        progress = state.progress_percentage,
        transition = ?transition,
        points_granted,
        "Enrollment progress recomputed"
    );

    Ok(ProgressUpdate {
        enrollment: updated,
        transition,
        points_granted,
    })
}

/// Grant the completion award once per enrollment. Returns whether this call
/// granted it.
async fn award_completion(
    conn: &mut PgConnection,
    enrollment: &Enrollment,
) -> Result<bool, sqlx::Error> {
    let flipped = sqlx::query(
        "UPDATE enrollments SET points_awarded = true \
         WHERE id = $1 AND points_awarded = false",
    )
    .bind(enrollment.id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if flipped == 0 {
        return Ok(false);
    }

    let inserted = sqlx::query(
        "INSERT INTO point_transactions (user_id, enrollment_id, points, reason) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (enrollment_id, reason) DO NOTHING",
    )
    .bind(enrollment.student_id)
    .bind(enrollment.id)
    .bind(COURSE_COMPLETION_POINTS)
    .bind(REASON_COURSE_COMPLETION)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}
