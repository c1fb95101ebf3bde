//! Repositories for course structure tables.
//!
//! Covers: `courses`, `course_sections`, `lectures`.

use sqlx::{PgConnection, PgPool};
use lms_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use lms_core::types::DbId;

use crate::models::course::{
    Course, CourseSection, CreateCourse, CreateCourseSection, CreateLecture, Lecture,
    UpdateCourse,
};

// ===========================================================================
// CourseRepo
// ===========================================================================

const COURSE_COLUMNS: &str = "\
    id, title, description, instructor_id, is_published, created_at, updated_at";

/// CRUD for the `courses` table.
pub struct CourseRepo;

impl CourseRepo {
    /// Insert a new course. Courses start unpublished unless stated.
    pub async fn create(pool: &PgPool, input: &CreateCourse) -> Result<Course, sqlx::Error> {
        let query = format!(
            "INSERT INTO courses (title, description, instructor_id, is_published) \
             VALUES ($1, $2, $3, COALESCE($4, false)) \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.instructor_id)
            .bind(input.is_published)
            .fetch_one(pool)
            .await
    }

    /// Find a course by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List courses, newest first. Limit and offset are clamped.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Course>, sqlx::Error> {
        let limit = clamp_limit(limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let offset = clamp_offset(offset);
        let query = format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update a course. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCourse,
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!(
            "UPDATE courses SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                is_published = COALESCE($4, is_published) \
             WHERE id = $1 \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.is_published)
            .fetch_optional(pool)
            .await
    }
}

// ===========================================================================
// CourseSectionRepo
// ===========================================================================

const SECTION_COLUMNS: &str = "id, course_id, title, sort_order, created_at";

/// CRUD for the `course_sections` table.
pub struct CourseSectionRepo;

impl CourseSectionRepo {
    /// Insert a section into a course.
    pub async fn create(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateCourseSection,
    ) -> Result<CourseSection, sqlx::Error> {
        let query = format!(
            "INSERT INTO course_sections (course_id, title, sort_order) \
             VALUES ($1, $2, COALESCE($3, 0)) \
             RETURNING {SECTION_COLUMNS}"
        );
        sqlx::query_as::<_, CourseSection>(&query)
            .bind(course_id)
            .bind(&input.title)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    /// Find a section by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CourseSection>, sqlx::Error> {
        let query = format!("SELECT {SECTION_COLUMNS} FROM course_sections WHERE id = $1");
        sqlx::query_as::<_, CourseSection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a course's sections in display order.
    pub async fn list_by_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<CourseSection>, sqlx::Error> {
        let query = format!(
            "SELECT {SECTION_COLUMNS} FROM course_sections \
             WHERE course_id = $1 \
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, CourseSection>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }
}

// ===========================================================================
// LectureRepo
// ===========================================================================

const LECTURE_COLUMNS: &str = "id, course_id, section_id, title, sort_order, created_at";

/// CRUD for the `lectures` table.
pub struct LectureRepo;

impl LectureRepo {
    /// Insert a lecture into a course.
    ///
    /// Enrollments of the course are not recomputed; use
    /// [`CourseProgressRepo::add_lecture`](crate::repositories::CourseProgressRepo::add_lecture)
    /// once students are enrolled.
    pub async fn create(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateLecture,
    ) -> Result<Lecture, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::create_in(&mut conn, course_id, input).await
    }

    /// Insert a lecture on an existing connection or transaction.
    pub async fn create_in(
        conn: &mut PgConnection,
        course_id: DbId,
        input: &CreateLecture,
    ) -> Result<Lecture, sqlx::Error> {
        let query = format!(
            "INSERT INTO lectures (course_id, section_id, title, sort_order) \
             VALUES ($1, $2, $3, COALESCE($4, 0)) \
             RETURNING {LECTURE_COLUMNS}"
        );
        sqlx::query_as::<_, Lecture>(&query)
            .bind(course_id)
            .bind(input.section_id)
            .bind(&input.title)
            .bind(input.sort_order)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a lecture by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Lecture>, sqlx::Error> {
        let query = format!("SELECT {LECTURE_COLUMNS} FROM lectures WHERE id = $1");
        sqlx::query_as::<_, Lecture>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a course's lectures in course order: section order first
    /// (lectures without a section last), then lecture order.
    pub async fn list_by_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<Lecture>, sqlx::Error> {
        sqlx::query_as::<_, Lecture>(
            "SELECT l.id, l.course_id, l.section_id, l.title, l.sort_order, l.created_at \
             FROM lectures l \
             LEFT JOIN course_sections s ON s.id = l.section_id \
             WHERE l.course_id = $1 \
             ORDER BY s.sort_order NULLS LAST, s.id NULLS LAST, l.sort_order, l.id",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
    }
}
