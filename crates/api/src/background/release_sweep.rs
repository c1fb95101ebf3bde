//! Periodic flip of the cached `release_rules.is_released` flag.
//!
//! Date rules past their release date and unlocked manual rules are marked
//! released and a `content.released` event is published for each. The
//! evaluator never reads the flag; it serves listings and notifications.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use lms_db::models::release::ReleaseRule;
use lms_db::repositories::ReleaseRuleRepo;
use lms_events::{EventBus, PlatformEvent};

/// Run the release sweep loop until `cancel` is triggered.
pub async fn run(pool: PgPool, event_bus: Arc<EventBus>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Release sweep started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Release sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(&pool, &event_bus).await {
                    Ok(0) => tracing::debug!("Release sweep: nothing due"),
                    Ok(released) => tracing::info!(released, "Release sweep: rules released"),
                    Err(e) => tracing::error!(error = %e, "Release sweep failed"),
                }
            }
        }
    }
}

/// Flip every due rule once and publish its event. Returns the number of
/// rules flipped.
pub async fn sweep_once(pool: &PgPool, event_bus: &EventBus) -> Result<usize, sqlx::Error> {
    let released = ReleaseRuleRepo::mark_due_released(pool, Utc::now()).await?;
    for rule in &released {
        event_bus.publish(PlatformEvent::content_released(
            rule.id,
            rule.schedule_id,
            rule_target(rule),
        ));
    }
    Ok(released.len())
}

fn rule_target(rule: &ReleaseRule) -> serde_json::Value {
    serde_json::json!({
        "section_id": rule.section_id,
        "lecture_id": rule.lecture_id,
        "quiz_id": rule.quiz_id,
    })
}
