//! Drip rule generation.

use sqlx::PgPool;
use lms_core::calendar::drip_offsets;
use lms_core::error::CoreError;
use lms_core::release::ReleaseStrategy;
use lms_db::models::release::ReleaseSchedule;
use lms_db::repositories::{LectureRepo, ReleaseRuleRepo};

use crate::error::{AppError, AppResult};

/// Create one `enrollment_offset` rule per lecture of a drip schedule, in
/// course order, spaced `days_between_releases` apart. Lectures that already
/// have a rule keep it. Returns the number of rules created.
pub async fn generate_drip_rules(pool: &PgPool, schedule: &ReleaseSchedule) -> AppResult<usize> {
    let strategy = ReleaseStrategy::from_str_value(&schedule.strategy)
        .map_err(|e| AppError::Core(CoreError::Validation(e)))?;
    if strategy != ReleaseStrategy::Drip {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Drip rules can only be generated for the drip strategy, schedule uses '{}'",
            schedule.strategy
        ))));
    }
    let days_between = match schedule.days_between_releases {
        Some(days) if days > 0 => days,
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "'days_between_releases' must be greater than 0 for the drip strategy".into(),
            )))
        }
    };

    let lectures = LectureRepo::list_by_course(pool, schedule.course_id).await?;
    let offsets = drip_offsets(lectures.len(), days_between);

    let mut created = 0;
    for (lecture, offset) in lectures.iter().zip(offsets) {
        if ReleaseRuleRepo::create_offset_rule_if_absent(pool, schedule.id, lecture.id, offset)
            .await?
        {
            created += 1;
        }
    }

    tracing::info!(
        schedule_id = schedule.id,
        lectures = lectures.len(),
        created,
        "Drip rules generated"
    );
    Ok(created)
}
