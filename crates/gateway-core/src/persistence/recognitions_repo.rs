//! `RecognitionsRepo` (spec §4.2, §4.5): same read-through/write-through
//! shape as `ImagesRepo`, plus the state-machine transitions C5 drives a
//! `Recognition` through. Every transition method is a single
//! `UPDATE ... WHERE status = '<expected>'` so a queue redelivery that
//! races a prior terminal write is a no-op (spec §8 property 9) rather than
//! a second mutation of a single-writer row.

use std::sync::Arc;

use sqlx::PgPool;

use super::cache::{metadata_key, Cache, METADATA_TTL};
use crate::error::{GatewayError, Result};
use crate::types::{Engine, QrCompletion, QrFormat, Recognition, RecognitionStatus, ResultType, TextCompletion};

#[derive(Clone)]
pub struct RecognitionsRepo {
    pool: PgPool,
    cache: Arc<dyn Cache>,
}

/// Fields needed to insert a new `Recognition` row (spec §4.4 step 4).
#[derive(Debug, Clone)]
pub struct NewRecognition {
    pub id: String,
    pub image_id: String,
}

impl RecognitionsRepo {
    pub fn new(pool: PgPool, cache: Arc<dyn Cache>) -> Self {
        Self { pool, cache }
    }

    pub async fn create(&self, dto: NewRecognition) -> Result<Recognition> {
        let recognition: Recognition = sqlx::query_as(
            r#"
            INSERT INTO recognition_results (id, image_id, status, attempt_number, created_at)
            VALUES ($1, $2, 'queued', 1, now())
            RETURNING *
            "#,
        )
        .bind(&dto.id)
        .bind(&dto.image_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(recognition)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Recognition> {
        let key = metadata_key("recognition", id);

        if let Some(cached) = self.cache.get(&key).await.ok().flatten() {
            if let Ok(recognition) = serde_json::from_str::<Recognition>(&cached) {
                return Ok(recognition);
            }
        }

        let recognition = self.fetch_fresh(id).await?;
        self.cache_write(&recognition).await;
        Ok(recognition)
    }

    async fn fetch_fresh(&self, id: &str) -> Result<Recognition> {
        sqlx::query_as("SELECT * FROM recognition_results WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GatewayError::not_found("recognition", id))
    }

    async fn cache_write(&self, recognition: &Recognition) {
        if let Ok(serialized) = serde_json::to_string(recognition) {
            let _ = self.cache.set(&metadata_key("recognition", &recognition.id), &serialized, Some(METADATA_TTL)).await;
        }
    }

    async fn invalidate(&self, id: &str) {
        let _ = self.cache.delete(&metadata_key("recognition", id)).await;
    }

    /// `queued -> processing` (spec §4.5: "the first action after dequeue").
    /// Returns `None` if the row was already past `queued`, i.e. a queue
    /// redelivery of an already-started or already-terminal job.
    pub async fn mark_processing(&self, id: &str) -> Result<Option<Recognition>> {
        let updated: Option<Recognition> = sqlx::query_as(
            r#"
            UPDATE recognition_results
            SET status = 'processing', attempt_number = attempt_number + 1
            WHERE id = $1 AND status = 'queued'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(recognition) = &updated {
            self.invalidate(id).await;
            self.cache_write(recognition).await;
        }

        Ok(updated)
    }

    /// `processing -> completed` with a text result (spec §4.5 step 4).
    pub async fn complete_text(&self, id: &str, completion: TextCompletion, queue_wait_time_ms: i64) -> Result<Recognition> {
        let updated: Option<Recognition> = sqlx::query_as(
            r#"
            UPDATE recognition_results
            SET status = 'completed',
                result_type = 'text',
                raw_text = $2,
                confidence = $3,
                engine = $4,
                aligned = $5,
                processing_time_ms = $6,
                queue_wait_time_ms = $7,
                completed_at = now()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&completion.raw_text)
        .bind(completion.confidence)
        .bind(completion.engine.as_str())
        .bind(completion.aligned)
        .bind(completion.processing_time_ms)
        .bind(queue_wait_time_ms)
        .fetch_optional(&self.pool)
        .await?;

        self.invalidate(id).await;

        match updated {
            Some(recognition) => {
                self.cache_write(&recognition).await;
                Ok(recognition)
            }
            // Already terminal from a prior delivery of the same job: return
            // the existing row unchanged (spec §8 property 9).
            None => self.fetch_fresh(id).await,
        }
    }

    /// `processing -> completed` with a QR result (spec §4.5 step 3).
    pub async fn complete_qr(&self, id: &str, completion: QrCompletion, queue_wait_time_ms: i64) -> Result<Recognition> {
        let updated: Option<Recognition> = sqlx::query_as(
            r#"
            UPDATE recognition_results
            SET status = 'completed',
                result_type = 'qr',
                qr_data = $2,
                qr_format = $3,
                qr_location_x = $4,
                qr_location_y = $5,
                qr_location_width = $6,
                qr_location_height = $7,
                processing_time_ms = $8,
                queue_wait_time_ms = $9,
                completed_at = now()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&completion.qr_data)
        .bind(completion.qr_format.as_str())
        .bind(completion.qr_location.x as i32)
        .bind(completion.qr_location.y as i32)
        .bind(completion.qr_location.width as i32)
        .bind(completion.qr_location.height as i32)
        .bind(completion.processing_time_ms)
        .bind(queue_wait_time_ms)
        .fetch_optional(&self.pool)
        .await?;

        self.invalidate(id).await;

        match updated {
            Some(recognition) => {
                self.cache_write(&recognition).await;
                Ok(recognition)
            }
            None => self.fetch_fresh(id).await,
        }
    }

    /// `processing -> failed` (spec §4.5 step 5).
    pub async fn fail(&self, id: &str, error: &str, processing_time_ms: i64, queue_wait_time_ms: i64) -> Result<Recognition> {
        let updated: Option<Recognition> = sqlx::query_as(
            r#"
            UPDATE recognition_results
            SET status = 'failed',
                error = $2,
                processing_time_ms = $3,
                queue_wait_time_ms = $4,
                completed_at = now()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(processing_time_ms)
        .bind(queue_wait_time_ms)
        .fetch_optional(&self.pool)
        .await?;

        self.invalidate(id).await;

        match updated {
            Some(recognition) => {
                self.cache_write(&recognition).await;
                Ok(recognition)
            }
            None => self.fetch_fresh(id).await,
        }
    }
}

/// Helper validating a projected `(status, resultType)` pair against
/// spec §8 property 2/3, used by both the repo's callers and its tests.
pub fn result_type_matches_status(status: RecognitionStatus, result_type: Option<ResultType>) -> bool {
    match status {
        RecognitionStatus::Completed => result_type.is_some(),
        _ => result_type.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_requires_a_result_type() {
        assert!(result_type_matches_status(RecognitionStatus::Completed, Some(ResultType::Text)));
        assert!(!result_type_matches_status(RecognitionStatus::Completed, None));
    }

    #[test]
    fn non_completed_forbids_a_result_type() {
        assert!(!result_type_matches_status(RecognitionStatus::Queued, Some(ResultType::Qr)));
        assert!(result_type_matches_status(RecognitionStatus::Failed, None));
    }

    #[test]
    fn qr_format_round_trips_through_str() {
        for format in [QrFormat::Fiscal, QrFormat::Url, QrFormat::Unknown] {
            assert_eq!(QrFormat::from_str_opt(format.as_str()), Some(format));
        }
    }

    #[test]
    fn engine_names_match_spec_vocabulary() {
        assert_eq!(Engine::Tesseract.as_str(), "tesseract");
        assert_eq!(Engine::Paddleocr.as_str(), "paddleocr");
    }
}
