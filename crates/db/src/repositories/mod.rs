//! Repository layer: zero-sized structs with async methods taking `&PgPool`.

pub mod calendar_event_repo;
pub mod course_repo;
pub mod enrollment_repo;
pub mod points_repo;
pub mod progress_override_repo;
pub mod progress_repo;
pub mod quiz_repo;
pub mod release_rule_repo;
pub mod release_schedule_repo;
pub mod user_repo;

pub use calendar_event_repo::CalendarEventRepo;
pub use course_repo::{CourseRepo, CourseSectionRepo, LectureRepo};
pub use enrollment_repo::EnrollmentRepo;
pub use points_repo::PointTransactionRepo;
pub use progress_override_repo::ProgressOverrideRepo;
pub use progress_repo::CourseProgressRepo;
pub use quiz_repo::{QuizAttemptRepo, QuizRepo};
pub use release_rule_repo::ReleaseRuleRepo;
pub use release_schedule_repo::ReleaseScheduleRepo;
pub use user_repo::UserRepo;
