//! The `ocr-jobs` queue (spec §6): a single durable FIFO carrying the `Job`
//! envelope, with the retry policy from spec §4.4 (3 attempts, exponential
//! backoff starting at 2s, retaining 100 completed / 1000 failed job
//! artifacts). Built directly on Redis lists; the same `REDIS_URL` backs
//! cache, queue, and event bus (spec §4.2, §4.3), in the spirit of the
//! pack's `other_examples/86338562_yonasBSD-readur__src-ocr_queue.rs.rs`
//! queue-service shape, adapted from a Postgres table to Redis lists since
//! this queue lives on `REDIS_URL`, not `DATABASE_URL`.

use std::time::Duration;

use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::types::Job;

const QUEUE_KEY: &str = "ocr-jobs";
const PROCESSING_KEY: &str = "ocr-jobs:processing";
const COMPLETED_KEY: &str = "ocr-jobs:completed";
const FAILED_KEY: &str = "ocr-jobs:failed";

pub const MAX_JOB_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_BACKOFF: Duration = Duration::from_secs(2);
const RETAIN_COMPLETED: isize = 100;
const RETAIN_FAILED: isize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    job: Job,
    attempts: u32,
    enqueued_at_ms: i64,
}

/// A job pulled off the queue, carrying enough bookkeeping to ack/retry it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub job: Job,
    pub attempts: u32,
    /// Wall-clock millis at original enqueue, carried across redeliveries,
    /// so the processor can compute `queueWaitTime` (spec §3) at dequeue.
    pub enqueued_at_ms: i64,
    raw: String,
}

#[derive(Clone)]
pub struct JobQueue {
    pool: Pool,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| GatewayError::internal(format!("failed to build redis pool: {e}")))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| GatewayError::internal(format!("redis pool exhausted: {e}")))
    }

    /// Enqueues a new job with retry policy 3 attempts / backoff-from-2s
    /// (spec §4.4 step 5).
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        let envelope = Envelope { job, attempts: 0, enqueued_at_ms: chrono::Utc::now().timestamp_millis() };
        let raw = serde_json::to_string(&envelope)?;
        let mut conn = self.conn().await?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, raw).await?;
        Ok(())
    }

    /// Current waiting count, used to compute `position`/`estimatedWait`
    /// for the `ocr.queued` event (spec §4.3).
    pub async fn waiting_count(&self) -> Result<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(QUEUE_KEY).await?)
    }

    /// Blocking dequeue with at-least-once delivery: the job moves onto
    /// `ocr-jobs:processing` until `ack`/`retry_or_fail` removes it.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Delivery>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.brpoplpush(QUEUE_KEY, PROCESSING_KEY, timeout.as_secs_f64()).await?;
        let Some(raw) = raw else { return Ok(None) };
        let envelope: Envelope = serde_json::from_str(&raw)?;
        Ok(Some(Delivery { job: envelope.job, attempts: envelope.attempts, enqueued_at_ms: envelope.enqueued_at_ms, raw }))
    }

    /// Marks a delivery permanently done (terminal `completed` or `failed`
    /// write already committed by the caller) and retires the artifact,
    /// trimming to the retention window from spec §4.4.
    pub async fn ack(&self, delivery: &Delivery, succeeded: bool) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &delivery.raw).await?;
        let (key, retain) = if succeeded { (COMPLETED_KEY, RETAIN_COMPLETED) } else { (FAILED_KEY, RETAIN_FAILED) };
        conn.lpush::<_, _, ()>(key, &delivery.raw).await?;
        conn.ltrim::<_, ()>(key, 0, retain - 1).await?;
        Ok(())
    }

    /// Re-enqueues a delivery whose job-level attempt failed but has
    /// attempts remaining, after the exponential backoff from spec §4.4.
    /// Returns `true` if it was retried, `false` if attempts are exhausted
    /// and the caller should instead write a terminal `failed` status.
    pub async fn retry_or_exhaust(&self, delivery: Delivery) -> Result<bool> {
        let mut conn = self.conn().await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &delivery.raw).await?;

        if delivery.attempts + 1 >= MAX_JOB_ATTEMPTS {
            return Ok(false);
        }

        let backoff = RETRY_BASE_BACKOFF * 2u32.pow(delivery.attempts);
        tokio::time::sleep(backoff).await;

        let envelope =
            Envelope { job: delivery.job, attempts: delivery.attempts + 1, enqueued_at_ms: delivery.enqueued_at_ms };
        let raw = serde_json::to_string(&envelope)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, raw).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let job = Job {
            image_id: "img".into(),
            recognition_id: "rec".into(),
            source_service: None,
            source_reference: None,
            accepted_qr_formats: None,
        };
        let envelope = Envelope { job, attempts: 2, enqueued_at_ms: 1_753_700_000_000 };
        let raw = serde_json::to_string(&envelope).unwrap();
        let restored: Envelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored.attempts, 2);
        assert_eq!(restored.job.image_id, "img");
        assert_eq!(restored.enqueued_at_ms, 1_753_700_000_000);
    }
}
