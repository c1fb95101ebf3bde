//! Course structure: courses, sections and lectures.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use lms_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: Option<DbId>,
    pub is_published: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: Option<DbId>,
    pub is_published: Option<bool>,
}

/// DTO for updating a course. All fields optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A row from the `course_sections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseSection {
    pub id: DbId,
    pub course_id: DbId,
    pub title: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

/// DTO for creating a section. `course_id` comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseSection {
    pub title: String,
    pub sort_order: Option<i32>,
}

// ---------------------------------------------------------------------------
// Lectures
// ---------------------------------------------------------------------------

/// A row from the `lectures` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lecture {
    pub id: DbId,
    pub course_id: DbId,
    pub section_id: Option<DbId>,
    pub title: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

/// DTO for creating a lecture. `course_id` comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLecture {
    pub section_id: Option<DbId>,
    pub title: String,
    pub sort_order: Option<i32>,
}
