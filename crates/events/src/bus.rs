//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PlatformEvent`]s and is
//! shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use lms_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An enrollment reached 100% progress for the first time since its last
/// revert.
pub const EVENT_COURSE_COMPLETED: &str = "course.completed";

/// A release rule's cached `is_released` flag flipped to true.
pub const EVENT_CONTENT_RELEASED: &str = "content.released";

/// Calendar events were materialized for a release schedule.
pub const EVENT_CALENDAR_EVENTS_GENERATED: &str = "calendar.events_generated";

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event.
///
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_source`](PlatformEvent::with_source),
/// [`with_actor`](PlatformEvent::with_actor) and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"course.completed"`.
    pub event_type: String,

    /// Source entity kind (e.g. `"enrollment"`, `"release_rule"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// The user that triggered the event, if any.
    pub actor_user_id: Option<DbId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create an event with only its type set.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// `course.completed` for an enrollment.
    pub fn course_completed(
        enrollment_id: DbId,
        student_id: DbId,
        course_id: DbId,
        points_awarded: i32,
    ) -> Self {
        Self::new(EVENT_COURSE_COMPLETED)
            .with_source("enrollment", enrollment_id)
            .with_actor(student_id)
            .with_payload(serde_json::json!({
                "course_id": course_id,
                "points_awarded": points_awarded,
            }))
    }

    /// `content.released` for a release rule. `target` names the gated
    /// content, e.g. `{"lecture_id": 4}`.
    pub fn content_released(rule_id: DbId, schedule_id: DbId, target: serde_json::Value) -> Self {
        Self::new(EVENT_CONTENT_RELEASED)
            .with_source("release_rule", rule_id)
            .with_payload(serde_json::json!({
                "schedule_id": schedule_id,
                "target": target,
            }))
    }

    /// `calendar.events_generated` for a release schedule.
    pub fn calendar_events_generated(schedule_id: DbId, created: usize) -> Self {
        Self::new(EVENT_CALENDAR_EVENTS_GENERATED)
            .with_source("release_schedule", schedule_id)
            .with_payload(serde_json::json!({ "created": created }))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Every subscriber independently receives every published event.
///
/// ```rust
/// use lms_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("course.completed"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed messages are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Without subscribers the
    /// event is dropped.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
