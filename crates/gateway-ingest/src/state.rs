//! Shared application state, built once at startup and cloned into every
//! Axum handler (spec §5: "the ingest process ... does not execute
//! recognition work", it only owns the stores and the queue front door).

use std::sync::Arc;

use gateway_core::persistence::{Cache, ImagesRepo, RecognitionsRepo, S3BlobStore};
use gateway_core::{AppConfig, EventPublisher, JobQueue};

#[derive(Clone)]
pub struct AppState(pub Arc<Inner>);

pub struct Inner {
    pub config: AppConfig,
    pub images: ImagesRepo,
    pub recognitions: RecognitionsRepo,
    pub blob: S3BlobStore,
    pub cache: Arc<dyn Cache>,
    pub queue: JobQueue,
    pub events: EventPublisher,
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
