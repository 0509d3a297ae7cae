//! Event Publisher (C3, spec §4.3): every state transition C4/C5 commits is
//! mirrored onto the `ocr:events` Redis pub/sub channel as a `GatewayEvent`.
//! Publish failures are logged and swallowed: a dropped event never
//! reverses or blocks the state transition that produced it (spec §4.3:
//! "the event bus is best-effort; persistence is the source of truth").

use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};

use crate::error::{GatewayError, Result};
use crate::types::GatewayEvent;

pub const EVENTS_CHANNEL: &str = "ocr:events";

#[derive(Clone)]
pub struct EventPublisher {
    pool: Pool,
}

impl EventPublisher {
    pub fn new(redis_url: &str) -> Result<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| GatewayError::internal(format!("failed to build redis pool: {e}")))?;
        Ok(Self { pool })
    }

    pub async fn publish(&self, event: &GatewayEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize gateway event, dropping");
                return;
            }
        };

        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, "redis pool exhausted, dropping event");
                return;
            }
        };

        if let Err(err) = conn.publish::<_, _, ()>(EVENTS_CHANNEL, payload).await {
            tracing::warn!(error = %err, "failed to publish gateway event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventContext, GatewayEvent, QueuedPayload};

    #[test]
    fn queued_event_serializes_with_event_tag() {
        let event = GatewayEvent::Queued {
            timestamp: 1_753_700_000,
            payload: QueuedPayload {
                context: EventContext {
                    image_id: "img-1".into(),
                    recognition_id: "rec-1".into(),
                    source_service: None,
                    source_reference: None,
                },
                position: 3,
                estimated_wait_ms: 300,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"ocr.queued\""));
        assert!(json.contains("\"position\":3"));
    }
}
