//! `Processor` (C5, spec §4.5): the state machine every dequeued job is
//! driven through: load, align, QR-attempt, OCR-fallback-chain, persist,
//! publish. Step 1 (image not found) and step 4 (every OCR attempt failed)
//! are the only failures that terminate a job (spec §7 Propagation); every
//! other exception bubbles to the job-level catch in `process_job`.

use std::sync::Arc;
use std::time::Instant;

use gateway_core::clients::{AlignOptions, ImageAligner, OcrResult, TextRecognizer};
use gateway_core::persistence::blob_store::BlobStore;
use gateway_core::persistence::cache::{image_bytes_key, IMAGE_BYTES_TTL};
use gateway_core::persistence::{Cache, ImagesRepo, RecognitionsRepo, S3BlobStore};
use gateway_core::types::{
    CompletedPayload, CompletedResult, Engine, EventContext, FailedPayload, GatewayEvent, Image, ImagePatch, Job,
    ProcessingPayload, QrCompletion, Recognition, TextCompletion,
};
use gateway_core::{image_ops, qr, EventPublisher, GatewayError, Result};

pub struct Processor {
    pub images: ImagesRepo,
    pub recognitions: RecognitionsRepo,
    pub cache: Arc<dyn Cache>,
    pub blob: S3BlobStore,
    pub aligner: Arc<dyn ImageAligner>,
    pub tesseract: Arc<dyn TextRecognizer>,
    pub paddleocr: Arc<dyn TextRecognizer>,
    pub events: EventPublisher,
    pub confidence_threshold_low: f64,
    pub confidence_threshold_high: f64,
}

struct AlignedBuffers {
    warped: Vec<u8>,
    preprocessed: Vec<u8>,
}

impl Processor {
    /// Runs one job end to end. `queue_wait_time_ms` is supplied by the
    /// caller, measured from enqueue to dequeue (spec §3 `queueWaitTime`).
    pub async fn process_job(&self, job: Job, queue_wait_time_ms: i64) -> Result<()> {
        let start = Instant::now();

        let Some(recognition) = self.recognitions.mark_processing(&job.recognition_id).await? else {
            // Already past `queued`: a redelivery of an already-started or
            // already-terminal job (spec §8 property 9). No-op.
            return Ok(());
        };

        self.events
            .publish(&GatewayEvent::Processing {
                timestamp: chrono::Utc::now().timestamp_millis(),
                payload: ProcessingPayload { context: context_for(&job, &recognition) },
            })
            .await;

        if let Err(err) = self.run(&job, queue_wait_time_ms, start).await {
            let processing_time_ms = elapsed_ms(start);
            self.recognitions.fail(&job.recognition_id, &err.to_string(), processing_time_ms, queue_wait_time_ms).await?;
            self.events
                .publish(&GatewayEvent::Failed {
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    payload: FailedPayload { context: context_for(&job, &recognition), error: err.to_string() },
                })
                .await;
            return Err(err);
        }

        Ok(())
    }

    async fn run(&self, job: &Job, queue_wait_time_ms: i64, start: Instant) -> Result<()> {
        // Step 1: load.
        let image = self.images.find_by_id(&job.image_id).await?;
        let bytes = self.load_original_bytes(&image).await?;

        // Step 2: align, with local degrade on failure.
        let buffers = self.align(&image, &bytes).await;

        // Step 3: QR attempt.
        if let Some(qr) = qr::decode_warped_then_preprocessed(&buffers.warped, &buffers.preprocessed) {
            if job.accepts(qr.format) {
                let processing_time_ms = elapsed_ms(start);
                let completion = QrCompletion {
                    qr_data: qr.data.clone(),
                    qr_format: qr.format,
                    qr_location: qr.location,
                    processing_time_ms,
                };
                let recognition = self.recognitions.complete_qr(&job.recognition_id, completion, queue_wait_time_ms).await?;
                self.publish_completed(
                    job,
                    &recognition,
                    CompletedResult::Qr { qr_data: qr.data, qr_format: qr.format, qr_location: qr.location },
                    processing_time_ms,
                )
                .await;
                return Ok(());
            }
        }

        // Step 4: OCR fallback chain.
        self.run_ocr_chain(job, &buffers, queue_wait_time_ms, start).await
    }

    async fn load_original_bytes(&self, image: &Image) -> Result<Vec<u8>> {
        let key = image_bytes_key(&image.id);
        if let Ok(Some(cached)) = self.cache.get_binary(&key).await {
            return Ok(cached);
        }

        let blob_key = gateway_core::persistence::blob_store::key_from_url(&image.original_url)
            .ok_or_else(|| GatewayError::internal("malformed original blob url"))?;
        let bytes = self.blob.get(blob_key).await?;

        let _ = self.cache.set_binary(&key, &bytes, Some(IMAGE_BYTES_TTL)).await;
        Ok(bytes)
    }

    /// Step 2: on aligner success, persist `warped` and set `processedUrl`.
    /// On failure, degrade to the original bytes plus a locally computed
    /// preprocessed buffer (spec §4.5 step 2).
    async fn align(&self, image: &Image, bytes: &[u8]) -> AlignedBuffers {
        match self.aligner.align(bytes, AlignOptions::default()).await {
            Ok(result) => {
                let key = format!("{}-processed.jpg", nanoid::nanoid!());
                match self.blob.put(&key, result.warped.clone(), "image/jpeg").await {
                    Ok(url) => {
                        if let Err(err) = self.images.update(&image.id, ImagePatch { processed_url: Some(url) }).await {
                            tracing::warn!(error = %err, image_id = %image.id, "failed to persist processedUrl");
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, image_id = %image.id, "failed to store aligned blob"),
                }
                AlignedBuffers { warped: result.warped, preprocessed: result.preprocessed }
            }
            Err(err) => {
                tracing::warn!(error = %err, image_id = %image.id, "aligner unavailable, degrading to local preprocessing");
                degrade_to_local_preprocessing(bytes)
            }
        }
    }

    /// Step 4: Tesseract/preprocessed -> PaddleOCR/preprocessed ->
    /// PaddleOCR/warped, accepting the first attempt at or above `T_low`,
    /// else the last attempt produced, else a terminal failure. Attempts
    /// run in order and stop early on acceptance; the accept/fallback rule
    /// itself lives in `choose_ocr_result` so it's testable without a
    /// live engine.
    async fn run_ocr_chain(&self, job: &Job, buffers: &AlignedBuffers, queue_wait_time_ms: i64, start: Instant) -> Result<()> {
        let chain: [(Engine, &[u8]); 3] = [
            (Engine::Tesseract, &buffers.preprocessed),
            (Engine::Paddleocr, &buffers.preprocessed),
            (Engine::Paddleocr, &buffers.warped),
        ];

        let mut attempted = Vec::with_capacity(chain.len());

        for (engine, buffer) in chain {
            let recognizer: &Arc<dyn TextRecognizer> = match engine {
                Engine::Tesseract => &self.tesseract,
                Engine::Paddleocr => &self.paddleocr,
            };

            match recognizer.recognize(buffer).await {
                Ok(result) => {
                    let accept = result.confidence >= self.confidence_threshold_low;
                    attempted.push((engine, result));
                    if accept {
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, ?engine, "ocr attempt failed, treating as skip"),
            }
        }

        match choose_ocr_result(attempted, self.confidence_threshold_low) {
            Some((engine, result)) => self.complete_text(job, engine, result, queue_wait_time_ms, start).await,
            None => Err(GatewayError::internal("all ocr engines failed")),
        }
    }

    async fn complete_text(&self, job: &Job, engine: Engine, result: OcrResult, queue_wait_time_ms: i64, start: Instant) -> Result<()> {
        let processing_time_ms = elapsed_ms(start);
        let completion = TextCompletion {
            raw_text: result.text.clone(),
            confidence: result.confidence,
            engine,
            aligned: true,
            processing_time_ms,
        };
        let recognition = self.recognitions.complete_text(&job.recognition_id, completion, queue_wait_time_ms).await?;
        self.publish_completed(
            job,
            &recognition,
            CompletedResult::Text { text: result.text, confidence: result.confidence, engine },
            processing_time_ms,
        )
        .await;
        Ok(())
    }

    async fn publish_completed(&self, job: &Job, recognition: &Recognition, result: CompletedResult, processing_time_ms: i64) {
        self.events
            .publish(&GatewayEvent::Completed {
                timestamp: chrono::Utc::now().timestamp_millis(),
                payload: CompletedPayload { context: context_for(job, recognition), result, processing_time_ms },
            })
            .await;
    }
}

fn context_for(job: &Job, recognition: &Recognition) -> EventContext {
    EventContext {
        image_id: recognition.image_id.clone(),
        recognition_id: recognition.id.clone(),
        source_service: job.source_service.clone(),
        source_reference: job.source_reference.clone(),
    }
}

fn elapsed_ms(start: Instant) -> i64 {
    start.elapsed().as_millis() as i64
}

/// Step 2's degrade path (spec §4.5 step 2, scenario S5): when the aligner
/// is unreachable, `warped` falls back to the original bytes untouched and
/// `preprocessed` is computed locally; no `processedUrl` is ever written in
/// this branch.
fn degrade_to_local_preprocessing(bytes: &[u8]) -> AlignedBuffers {
    let preprocessed = image_ops::local_preprocess(bytes).unwrap_or_else(|_| bytes.to_vec());
    AlignedBuffers { warped: bytes.to_vec(), preprocessed }
}

/// The step-4 accept/fallback rule (spec §4.5 step 4), pulled out of
/// `run_ocr_chain` so it can be exercised without a live engine: first
/// attempt at or above `threshold_low` wins, else the last attempt
/// produced, else `None` when nothing was produced at all.
fn choose_ocr_result(attempted: Vec<(Engine, OcrResult)>, threshold_low: f64) -> Option<(Engine, OcrResult)> {
    let accepted_index = attempted.iter().position(|(_, result)| result.confidence >= threshold_low);
    match accepted_index {
        Some(index) => attempted.into_iter().nth(index),
        None => attempted.into_iter().last(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(confidence: f64) -> OcrResult {
        OcrResult { text: format!("text@{confidence}"), confidence }
    }

    #[test]
    fn accepts_first_attempt_at_or_above_threshold() {
        // S3: tesseract 0.41, paddleocr/preprocessed 0.55, paddleocr/warped 0.72.
        let attempted = vec![
            (Engine::Tesseract, result(0.41)),
            (Engine::Paddleocr, result(0.55)),
            (Engine::Paddleocr, result(0.72)),
        ];
        let (engine, chosen) = choose_ocr_result(attempted, 0.60).unwrap();
        assert_eq!(engine, Engine::Paddleocr);
        assert_eq!(chosen.confidence, 0.72);
    }

    #[test]
    fn falls_back_to_last_attempt_when_all_below_threshold() {
        // S4: all three below T_low, last one produced (0.50) wins.
        let attempted =
            vec![(Engine::Tesseract, result(0.30)), (Engine::Paddleocr, result(0.40)), (Engine::Paddleocr, result(0.50))];
        let (engine, chosen) = choose_ocr_result(attempted, 0.60).unwrap();
        assert_eq!(engine, Engine::Paddleocr);
        assert_eq!(chosen.confidence, 0.50);
    }

    #[test]
    fn no_attempts_produced_is_a_terminal_failure() {
        assert!(choose_ocr_result(Vec::new(), 0.60).is_none());
    }

    #[test]
    fn degraded_buffers_reuse_original_bytes_as_warped() {
        // S5: aligner down. `warped` must be the original bytes verbatim.
        let original = vec![0xFFu8, 0xD8, 0xFF, 0xE0];
        let buffers = degrade_to_local_preprocessing(&original);
        assert_eq!(buffers.warped, original);
    }

    #[test]
    fn degraded_preprocessing_falls_back_to_original_on_decode_failure() {
        // Non-image bytes can't go through grayscale/normalize/threshold;
        // the degrade path must still produce something rather than panic.
        let not_an_image = vec![1, 2, 3, 4];
        let buffers = degrade_to_local_preprocessing(&not_an_image);
        assert_eq!(buffers.preprocessed, not_an_image);
    }

    #[test]
    fn accepts_a_middle_attempt_without_running_the_rest_in_the_real_chain() {
        // Only the first two are "attempted" here because run_ocr_chain
        // breaks as soon as one meets T_low; the decision function itself
        // just has to pick it out correctly when handed a short list.
        let attempted = vec![(Engine::Tesseract, result(0.80)), (Engine::Paddleocr, result(0.20))];
        let (engine, chosen) = choose_ocr_result(attempted, 0.60).unwrap();
        assert_eq!(engine, Engine::Tesseract);
        assert_eq!(chosen.confidence, 0.80);
    }
}
