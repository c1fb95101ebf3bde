//! Integration tests for lecture completion tracking.
//!
//! Exercises `CourseProgressRepo` against a real database:
//! - Idempotent completion and rejection reasons
//! - Completion and revert transitions
//! - The completion award is granted at most once per enrollment

use assert_matches::assert_matches;
use sqlx::PgPool;
use lms_core::progress::{CompletionRejection, CompletionTransition, COURSE_COMPLETION_POINTS};
use lms_db::models::course::{CreateCourse, CreateLecture};
use lms_db::models::enrollment::MarkCompleteOutcome;
use lms_db::models::user::CreateUser;
use lms_db::repositories::{
    CourseProgressRepo, CourseRepo, EnrollmentRepo, LectureRepo, PointTransactionRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    student_id: i64,
    course_id: i64,
    enrollment_id: i64,
    lecture_ids: Vec<i64>,
}

async fn seed_course(pool: &PgPool, title: &str, published: bool, lectures: usize) -> (i64, Vec<i64>) {
    let course = CourseRepo::create(
        pool,
        &CreateCourse {
            title: title.to_string(),
            description: None,
            instructor_id: None,
            is_published: Some(published),
        },
    )
    .await
    .unwrap();

    let mut lecture_ids = Vec::new();
    for i in 0..lectures {
        let lecture = LectureRepo::create(
            pool,
            course.id,
            &CreateLecture {
                section_id: None,
                title: format!("Lecture {i}"),
                sort_order: Some(i as i32),
            },
        )
        .await
        .unwrap();
        lecture_ids.push(lecture.id);
    }
    (course.id, lecture_ids)
}

async fn setup(pool: &PgPool, published: bool, lectures: usize) -> Fixture {
    let student = UserRepo::create(
        pool,
        &CreateUser {
            username: "student".to_string(),
            email: "student@example.com".to_string(),
            role: None,
        },
    )
    .await
    .unwrap();
    let (course_id, lecture_ids) = seed_course(pool, "Rust 101", published, lectures).await;
    let enrollment = EnrollmentRepo::create(pool, student.id, course_id).await.unwrap();
    Fixture {
        student_id: student.id,
        course_id,
        enrollment_id: enrollment.id,
        lecture_ids,
    }
}

async fn complete(pool: &PgPool, enrollment_id: i64, lecture_id: i64) -> MarkCompleteOutcome {
    CourseProgressRepo::mark_lecture_complete(pool, enrollment_id, lecture_id)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Marking lectures complete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_complete_updates_percentage(pool: PgPool) {
    let f = setup(&pool, true, 4).await;

    let outcome = complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    let update = assert_matches!(outcome, MarkCompleteOutcome::Applied(u) => u);
    assert_eq!(update.enrollment.progress_percentage, 25.0);
    assert!(!update.enrollment.completed);
    assert_eq!(update.transition, CompletionTransition::Unchanged);

    let detail = CourseProgressRepo::find_detail(&pool, f.enrollment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.completed_lecture_ids, vec![f.lecture_ids[0]]);
    assert_eq!(detail.progress.last_accessed_lecture_id, Some(f.lecture_ids[0]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_complete_twice_is_rejected(pool: PgPool) {
    let f = setup(&pool, true, 3).await;

    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    let outcome = complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    assert_matches!(
        outcome,
        MarkCompleteOutcome::Rejected {
            reason: CompletionRejection::AlreadyCompleted
        }
    );

    let enrollment = EnrollmentRepo::find_by_id(&pool, f.enrollment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress_percentage, 33.33);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lecture_from_other_course_rejected(pool: PgPool) {
    let f = setup(&pool, true, 2).await;
    let (_, other_lectures) = seed_course(&pool, "Other", true, 1).await;

    let outcome = complete(&pool, f.enrollment_id, other_lectures[0]).await;
    assert_matches!(
        outcome,
        MarkCompleteOutcome::Rejected {
            reason: CompletionRejection::WrongCourse
        }
    );

    let detail = CourseProgressRepo::find_detail(&pool, f.enrollment_id)
        .await
        .unwrap()
        .unwrap();
    assert!(detail.completed_lecture_ids.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unpublished_course_rejected(pool: PgPool) {
    let f = setup(&pool, false, 2).await;

    let outcome = complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    assert_matches!(
        outcome,
        MarkCompleteOutcome::Rejected {
            reason: CompletionRejection::CourseNotPublished
        }
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_lecture_is_row_not_found(pool: PgPool) {
    let f = setup(&pool, true, 1).await;

    let result = CourseProgressRepo::mark_lecture_complete(&pool, f.enrollment_id, 999_999).await;
    assert_matches!(result, Err(sqlx::Error::RowNotFound));
}

// ---------------------------------------------------------------------------
// Completion and award
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_last_lecture_completes_and_awards_points(pool: PgPool) {
    let f = setup(&pool, true, 2).await;

    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    let outcome = complete(&pool, f.enrollment_id, f.lecture_ids[1]).await;
    let update = assert_matches!(outcome, MarkCompleteOutcome::Applied(u) => u);

    assert!(update.enrollment.completed);
    assert!(update.enrollment.completed_at.is_some());
    assert_eq!(update.enrollment.progress_percentage, 100.0);
    assert_eq!(update.transition, CompletionTransition::Completed);
    assert_eq!(update.points_granted, COURSE_COMPLETION_POINTS);

    let total = PointTransactionRepo::total_for_user(&pool, f.student_id)
        .await
        .unwrap();
    assert_eq!(total, i64::from(COURSE_COMPLETION_POINTS));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_uncomplete_reverts_completion(pool: PgPool) {
    let f = setup(&pool, true, 2).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[1]).await;

    let update =
        CourseProgressRepo::mark_lecture_incomplete(&pool, f.enrollment_id, f.lecture_ids[1])
            .await
            .unwrap();

    assert!(!update.enrollment.completed);
    assert_eq!(update.enrollment.completed_at, None);
    assert_eq!(update.enrollment.progress_percentage, 50.0);
    assert_eq!(update.transition, CompletionTransition::Reverted);
    // The award flag survives the revert.
    assert!(update.enrollment.points_awarded);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recompletion_does_not_award_again(pool: PgPool) {
    let f = setup(&pool, true, 1).await;

    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    CourseProgressRepo::mark_lecture_incomplete(&pool, f.enrollment_id, f.lecture_ids[0])
        .await
        .unwrap();
    let outcome = complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    let update = assert_matches!(outcome, MarkCompleteOutcome::Applied(u) => u);

    assert_eq!(update.transition, CompletionTransition::Completed);
    assert_eq!(update.points_granted, 0);

    let transactions = PointTransactionRepo::list_by_user(&pool, f.student_id)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_completion_awards_once(pool: PgPool) {
    let f = setup(&pool, true, 2).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;

    let (a, b) = tokio::join!(
        CourseProgressRepo::mark_lecture_complete(&pool, f.enrollment_id, f.lecture_ids[1]),
        CourseProgressRepo::mark_lecture_complete(&pool, f.enrollment_id, f.lecture_ids[1]),
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, MarkCompleteOutcome::Applied(_)))
        .count();
    assert_eq!(applied, 1);

    let total = PointTransactionRepo::total_for_user(&pool, f.student_id)
        .await
        .unwrap();
    assert_eq!(total, i64::from(COURSE_COMPLETION_POINTS));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_lecture_reverts_on_recompute(pool: PgPool) {
    let f = setup(&pool, true, 1).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;

    LectureRepo::create(
        &pool,
        f.course_id,
        &CreateLecture {
            section_id: None,
            title: "Bonus".to_string(),
            sort_order: Some(9),
        },
    )
    .await
    .unwrap();

    let update = CourseProgressRepo::recompute(&pool, f.enrollment_id)
        .await
        .unwrap();
    assert_eq!(update.transition, CompletionTransition::Reverted);
    assert_eq!(update.enrollment.progress_percentage, 50.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_lecture_reverts_every_completed_enrollment(pool: PgPool) {
    let f = setup(&pool, true, 1).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;

    let second = UserRepo::create(
        &pool,
        &CreateUser {
            username: "second".to_string(),
            email: "second@example.com".to_string(),
            role: None,
        },
    )
    .await
    .unwrap();
    let other = EnrollmentRepo::create(&pool, second.id, f.course_id).await.unwrap();
    complete(&pool, other.id, f.lecture_ids[0]).await;

    let (lecture, updates) = CourseProgressRepo::add_lecture(
        &pool,
        f.course_id,
        &CreateLecture {
            section_id: None,
            title: "Bonus".to_string(),
            sort_order: Some(9),
        },
    )
    .await
    .unwrap();
    assert_eq!(lecture.course_id, f.course_id);
    assert_eq!(updates.len(), 2);
    assert!(updates
        .iter()
        .all(|u| u.transition == CompletionTransition::Reverted));

    for id in [f.enrollment_id, other.id] {
        let enrollment = EnrollmentRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(!enrollment.completed);
        assert_eq!(enrollment.completed_at, None);
        assert_eq!(enrollment.progress_percentage, 50.0);
        assert!(enrollment.points_awarded);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_lecture_leaves_other_courses_alone(pool: PgPool) {
    let f = setup(&pool, true, 1).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;
    let (other_course, _) = seed_course(&pool, "Go 101", true, 1).await;

    let (_, updates) = CourseProgressRepo::add_lecture(
        &pool,
        other_course,
        &CreateLecture {
            section_id: None,
            title: "Extra".to_string(),
            sort_order: None,
        },
    )
    .await
    .unwrap();
    assert!(updates.is_empty());

    let enrollment = EnrollmentRepo::find_by_id(&pool, f.enrollment_id)
        .await
        .unwrap()
        .unwrap();
    assert!(enrollment.completed);
    assert_eq!(enrollment.progress_percentage, 100.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_add_lecture_persists_nothing(pool: PgPool) {
    let f = setup(&pool, true, 1).await;
    complete(&pool, f.enrollment_id, f.lecture_ids[0]).await;

    let result = CourseProgressRepo::add_lecture(
        &pool,
        f.course_id,
        &CreateLecture {
            section_id: Some(999_999),
            title: "Orphan".to_string(),
            sort_order: None,
        },
    )
    .await;
    assert!(result.is_err());

    let lectures = LectureRepo::list_by_course(&pool, f.course_id).await.unwrap();
    assert_eq!(lectures.len(), 1);
    let enrollment = EnrollmentRepo::find_by_id(&pool, f.enrollment_id)
        .await
        .unwrap()
        .unwrap();
    assert!(enrollment.completed);
}
