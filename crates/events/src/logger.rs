//! Background subscriber that writes every published event to the log.

use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Logs each [`PlatformEvent`] received from the bus at `info` level.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        source_entity_type = ?event.source_entity_type,
                        source_entity_id = ?event.source_entity_id,
                        actor_user_id = ?event.actor_user_id,
                        payload = %event.payload,
                        "Platform event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }
}
