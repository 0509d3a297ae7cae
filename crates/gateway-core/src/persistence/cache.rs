//! Cache (C2): typed key/value with optional TTL over string and binary
//! values (spec §4.2). Last-write-wins; missing entries fall through to the
//! backing store. Backed by Redis, grounded in the pack's
//! `andresv-qr-lum_rust_backend::cache` (deadpool-redis pooling).

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};

use crate::error::{GatewayError, Result};

pub const IMAGE_BYTES_TTL: Duration = Duration::from_secs(3600);
pub const METADATA_TTL: Duration = Duration::from_secs(3600);

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    async fn get_binary(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set_binary(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Redis-backed `Cache`, pooled via `deadpool-redis`.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| GatewayError::internal(format!("failed to build redis pool: {e}")))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| GatewayError::internal(format!("redis pool exhausted: {e}")))
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get_binary(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn set_binary(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        Ok(conn.exists(key).await?)
    }
}

/// Cache key for the original uploaded bytes (spec §4.2): `image:<imageId>`.
pub fn image_bytes_key(image_id: &str) -> String {
    format!("image:{image_id}")
}

/// Cache key for a cached `Recognition`/`Image` metadata projection.
pub fn metadata_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}:meta")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_bytes_key_matches_spec_format() {
        assert_eq!(image_bytes_key("abc123"), "image:abc123");
    }
}
