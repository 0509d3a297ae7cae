//! `gateway-ingest`: the C4 HTTP edge. Accepts receipt uploads, stores them,
//! and enqueues a recognition job; it never runs recognition work itself
//! (spec §5).

mod http;
mod service;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use gateway_core::persistence::{Cache, ImagesRepo, RecognitionsRepo, RedisCache, S3BlobStore};
use gateway_core::{AppConfig, EventPublisher, JobQueue};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use state::{AppState, Inner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let config = AppConfig::from_env()?;
    let port = config.port;

    let pool = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(&config.redis_url)?);
    let blob = S3BlobStore::new(&config.blob).await?;
    let queue = JobQueue::new(&config.redis_url)?;
    let events = EventPublisher::new(&config.redis_url)?;

    let images = ImagesRepo::new(pool.clone(), cache.clone());
    let recognitions = RecognitionsRepo::new(pool, cache.clone());

    let state = AppState(Arc::new(Inner { config, images, recognitions, blob, cache, queue, events }));

    let app = http::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "starting gateway-ingest");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
