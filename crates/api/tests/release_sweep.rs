//! Tests for the periodic release sweep.

use chrono::{Duration, Utc};
use lms_api::background::release_sweep::sweep_once;
use lms_core::release::{STRATEGY_FIXED_DATES, TRIGGER_MANUAL, TRIGGER_SPECIFIC_DATE};
use lms_db::models::course::{CreateCourse, CreateLecture};
use lms_db::models::release::{CreateReleaseRule, CreateReleaseSchedule};
use lms_db::repositories::{CourseRepo, LectureRepo, ReleaseRuleRepo, ReleaseScheduleRepo};
use lms_events::bus::EVENT_CONTENT_RELEASED;
use lms_events::EventBus;
use sqlx::PgPool;

async fn seed_lectures(pool: &PgPool, count: usize) -> (i64, Vec<i64>) {
    let course = CourseRepo::create(
        pool,
        &CreateCourse {
            title: "Networks".to_string(),
            description: None,
            instructor_id: None,
            is_published: Some(true),
        },
    )
    .await
    .unwrap();
    let schedule = ReleaseScheduleRepo::create(
        pool,
        &CreateReleaseSchedule {
            course_id: course.id,
            strategy: STRATEGY_FIXED_DATES.to_string(),
            start_date: None,
            end_date: None,
            unlock_all: false,
            days_between_releases: None,
            release_time: None,
        },
    )
    .await
    .unwrap();

    let mut lectures = Vec::new();
    for n in 0..count {
        let lecture = LectureRepo::create(
            pool,
            course.id,
            &CreateLecture {
                section_id: None,
                title: format!("Lecture {n}"),
                sort_order: None,
            },
        )
        .await
        .unwrap();
        lectures.push(lecture.id);
    }
    (schedule.id, lectures)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_releases_due_rules_once(pool: PgPool) {
    let (schedule_id, lectures) = seed_lectures(&pool, 4).await;
    let rule = |lecture_id: i64| CreateReleaseRule {
        lecture_id: Some(lecture_id),
        trigger_kind: TRIGGER_SPECIFIC_DATE.to_string(),
        ..CreateReleaseRule::default()
    };

    let past = ReleaseRuleRepo::create(
        &pool,
        schedule_id,
        &CreateReleaseRule {
            release_date: Some(Utc::now() - Duration::hours(1)),
            ..rule(lectures[0])
        },
    )
    .await
    .unwrap();
    ReleaseRuleRepo::create(
        &pool,
        schedule_id,
        &CreateReleaseRule {
            release_date: Some(Utc::now() + Duration::days(30)),
            ..rule(lectures[1])
        },
    )
    .await
    .unwrap();
    let unlocked = ReleaseRuleRepo::create(
        &pool,
        schedule_id,
        &CreateReleaseRule {
            lecture_id: Some(lectures[2]),
            trigger_kind: TRIGGER_MANUAL.to_string(),
            is_manually_unlocked: true,
            ..CreateReleaseRule::default()
        },
    )
    .await
    .unwrap();
    ReleaseRuleRepo::create(
        &pool,
        schedule_id,
        &CreateReleaseRule {
            lecture_id: Some(lectures[3]),
            trigger_kind: TRIGGER_MANUAL.to_string(),
            ..CreateReleaseRule::default()
        },
    )
    .await
    .unwrap();

    let bus = EventBus::default();
    let mut rx = bus.subscribe();

    assert_eq!(sweep_once(&pool, &bus).await.unwrap(), 2);
    assert_eq!(sweep_once(&pool, &bus).await.unwrap(), 0);

    let mut released = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.event_type, EVENT_CONTENT_RELEASED);
        assert_eq!(event.payload["schedule_id"], schedule_id);
        released.push(event.source_entity_id.unwrap());
    }
    released.sort_unstable();
    let mut expected = vec![past.id, unlocked.id];
    expected.sort_unstable();
    assert_eq!(released, expected);

    let rule = ReleaseRuleRepo::find_by_id(&pool, past.id).await.unwrap().unwrap();
    assert!(rule.is_released);
}
