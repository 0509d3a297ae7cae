//! `gateway-worker`: the C5 job executor fleet. Runs `WORKER_CONCURRENCY`
//! executor loops, each dequeuing from `ocr-jobs` and driving a job through
//! `Processor`, gated by a fleet-wide 10 jobs/s rate limiter (spec §5).

mod processor;
mod rate_limiter;

use std::sync::Arc;
use std::time::Duration;

use gateway_core::clients::{AlignerClient, ImageAligner, PaddleOcrClient, TesseractClient, TextRecognizer};
use gateway_core::persistence::{Cache, ImagesRepo, RecognitionsRepo, RedisCache, S3BlobStore};
use gateway_core::{AppConfig, EventPublisher, JobQueue};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use processor::Processor;

const DEQUEUE_POLL_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(&config.redis_url)?);
    let blob = S3BlobStore::new(&config.blob).await?;
    let queue = JobQueue::new(&config.redis_url)?;
    let events = EventPublisher::new(&config.redis_url)?;

    let http = reqwest::Client::new();
    let aligner: Arc<dyn ImageAligner> = Arc::new(AlignerClient::new(http.clone(), config.aligner_url.clone(), config.ocr_engine_timeout));
    let tesseract: Arc<dyn TextRecognizer> = Arc::new(TesseractClient::new(http.clone(), config.tesseract_url.clone(), config.ocr_engine_timeout));
    let paddleocr: Arc<dyn TextRecognizer> = Arc::new(PaddleOcrClient::new(http, config.paddleocr_url.clone(), config.ocr_engine_timeout));

    let processor = Arc::new(Processor {
        images: ImagesRepo::new(pool.clone(), cache.clone()),
        recognitions: RecognitionsRepo::new(pool, cache.clone()),
        cache,
        blob,
        aligner,
        tesseract,
        paddleocr,
        events,
        confidence_threshold_low: config.confidence_threshold_low,
        confidence_threshold_high: config.confidence_threshold_high,
    });

    let limiter = rate_limiter::new_fleet_limiter();
    let concurrency = config.worker_concurrency;
    tracing::info!(concurrency, "starting gateway-worker executor fleet");

    let mut executors = Vec::with_capacity(concurrency);
    for id in 0..concurrency {
        let queue = queue.clone();
        let processor = processor.clone();
        let limiter = limiter.clone();
        executors.push(tokio::spawn(executor_loop(id, queue, processor, limiter)));
    }

    for executor in executors {
        let _ = executor.await;
    }

    Ok(())
}

async fn executor_loop(id: usize, queue: JobQueue, processor: Arc<Processor>, limiter: rate_limiter::JobRateLimiter) {
    loop {
        let delivery = match queue.dequeue(DEQUEUE_POLL_TIMEOUT).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(err) => {
                tracing::error!(executor = id, error = %err, "dequeue failed, backing off");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        limiter.until_ready().await;

        let job = delivery.job.clone();
        let queue_wait_time_ms = (chrono::Utc::now().timestamp_millis() - delivery.enqueued_at_ms).max(0);

        let succeeded = match processor.process_job(job, queue_wait_time_ms).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(executor = id, error = %err, recognition_id = %delivery.job.recognition_id, "job failed");
                false
            }
        };

        if succeeded {
            if let Err(err) = queue.ack(&delivery, true).await {
                tracing::error!(executor = id, error = %err, "failed to ack completed job");
            }
            continue;
        }

        match queue.retry_or_exhaust(delivery).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(executor = id, "job exhausted retry attempts, left in failed state"),
            Err(err) => tracing::error!(executor = id, error = %err, "failed to requeue job"),
        }
    }
}
