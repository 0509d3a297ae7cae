//! `IngestService` (C4, spec §4.4): validate, store, seed, enqueue. The six
//! steps are not transactional across stores (spec §7 Compensation): a
//! blob write that outlives a failed metadata insert is an accepted orphan,
//! and a metadata insert that outlives a failed enqueue leaves the
//! Recognition `queued` forever for an out-of-scope janitor to reap.

use std::time::Duration;

use gateway_core::persistence::{ImagesRepo, RecognitionsRepo};
use gateway_core::types::{
    EventContext, GatewayEvent, Job, MimeType, NewImage, QrFormat, QueuedPayload,
};
use gateway_core::{persistence::cache::image_bytes_key, EventPublisher, GatewayError, JobQueue, Result};

use crate::state::AppState;

pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub source_service: Option<String>,
    pub source_reference: Option<String>,
    pub accepted_qr_formats: Option<Vec<QrFormat>>,
}

pub struct UploadResponse {
    pub image_id: String,
    pub recognition_id: String,
}

const ESTIMATED_JOB_DURATION_MS: u64 = 15_000;

/// Steps 1-6 of spec §4.4, in order.
pub async fn upload_image(state: &AppState, req: UploadRequest) -> Result<UploadResponse> {
    validate(&req)?;
    let mime = MimeType::from_content_type(&req.mime_type)
        .ok_or_else(|| GatewayError::validation(format!("unsupported mime type: {}", req.mime_type)))?;

    let image_id = uuid::Uuid::new_v4().to_string();
    let recognition_id = uuid::Uuid::new_v4().to_string();

    // Step 1: opaque 21-character key.
    let key = format!("{}-original.{}", nanoid::nanoid!(), mime.extension());

    // Step 2: write bytes to blob store.
    let original_url = state.blob.put(&key, req.bytes.clone(), mime.as_str()).await?;

    // Step 3: seed cache, TTL 1h.
    seed_cache(&state.cache, &image_id, &req.bytes).await;

    // Step 4: insert Image, then Recognition(queued).
    let image = state
        .images
        .create(NewImage {
            id: image_id.clone(),
            original_url,
            file_size: req.bytes.len() as i64,
            mime_type: mime,
            width: None,
            height: None,
            source_service: req.source_service.clone(),
            source_reference: req.source_reference.clone(),
        })
        .await?;

    let recognition = state
        .recognitions
        .create(gateway_core::persistence::NewRecognition { id: recognition_id.clone(), image_id: image.id.clone() })
        .await?;

    // Step 5: enqueue.
    let job = Job {
        image_id: image.id.clone(),
        recognition_id: recognition.id.clone(),
        source_service: req.source_service,
        source_reference: req.source_reference,
        accepted_qr_formats: req.accepted_qr_formats,
    };
    let source_service = job.source_service.clone();
    let source_reference = job.source_reference.clone();
    state.queue.enqueue(job).await?;

    // Step 6: publish ocr.queued with the freshly observed waiting count.
    publish_queued(&state.queue, &state.events, &image.id, &recognition.id, source_service, source_reference).await;

    Ok(UploadResponse { image_id: image.id, recognition_id: recognition.id })
}

fn validate(req: &UploadRequest) -> Result<()> {
    if req.bytes.is_empty() {
        return Err(GatewayError::validation("image is empty"));
    }
    if req.bytes.len() as u64 > gateway_core::types::MAX_IMAGE_BYTES {
        return Err(GatewayError::validation("image exceeds the 10 MiB limit"));
    }
    if MimeType::from_content_type(&req.mime_type).is_none() {
        return Err(GatewayError::validation(format!("unsupported mime type: {}", req.mime_type)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(bytes: Vec<u8>, mime_type: &str) -> UploadRequest {
        UploadRequest {
            bytes,
            mime_type: mime_type.to_string(),
            source_service: None,
            source_reference: None,
            accepted_qr_formats: None,
        }
    }

    #[test]
    fn rejects_empty_upload() {
        let err = validate(&request(Vec::new(), "image/jpeg")).unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn rejects_oversized_upload() {
        let oversized = vec![0u8; gateway_core::types::MAX_IMAGE_BYTES as usize + 1];
        let err = validate(&request(oversized, "image/jpeg")).unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn rejects_unsupported_mime_type() {
        // S6: a pdf upload never gets past validation, so no blob/metadata
        // write or queue/event side effect is ever attempted.
        let err = validate(&request(vec![1, 2, 3], "application/pdf")).unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn accepts_a_well_formed_jpeg_upload() {
        assert!(validate(&request(vec![1, 2, 3], "image/jpeg")).is_ok());
    }
}

async fn seed_cache(cache: &std::sync::Arc<dyn gateway_core::persistence::Cache>, image_id: &str, bytes: &[u8]) {
    let key = image_bytes_key(image_id);
    if let Err(err) = cache.set_binary(&key, bytes, Some(gateway_core::persistence::cache::IMAGE_BYTES_TTL)).await {
        tracing::warn!(error = %err, image_id, "failed to seed image bytes cache");
    }
}

async fn publish_queued(
    queue: &JobQueue,
    events: &EventPublisher,
    image_id: &str,
    recognition_id: &str,
    source_service: Option<String>,
    source_reference: Option<String>,
) {
    let position = queue.waiting_count().await.unwrap_or(0);
    let event = GatewayEvent::Queued {
        timestamp: chrono::Utc::now().timestamp_millis(),
        payload: QueuedPayload {
            context: EventContext {
                image_id: image_id.to_string(),
                recognition_id: recognition_id.to_string(),
                source_service,
                source_reference,
            },
            position,
            estimated_wait_ms: position * ESTIMATED_JOB_DURATION_MS,
        },
    };
    events.publish(&event).await;
}

/// Resolves the requested image variant's presigned url (spec §6
/// `GET /api/v1/images/:id`).
pub async fn presigned_image_url(images: &ImagesRepo, blob: &gateway_core::persistence::S3BlobStore, id: &str, processed: bool) -> Result<String> {
    let image = images.find_by_id(id).await?;
    let url = if processed {
        image.processed_url.ok_or_else(|| GatewayError::not_found("image variant", format!("{id}:processed")))?
    } else {
        image.original_url
    };
    let key = gateway_core::persistence::blob_store::key_from_url(&url)
        .ok_or_else(|| GatewayError::internal("malformed blob url"))?;
    blob.presign(key, Duration::from_secs(3600)).await
}

pub async fn get_recognition(recognitions: &RecognitionsRepo, id: &str) -> Result<gateway_core::types::Recognition> {
    recognitions.find_by_id(id).await
}
