//! `ImagesRepo` (spec §4.2): `create`, `findById` (read-through cache, TTL
//! 1h), `update` (write-through: store then invalidate cache).

use std::sync::Arc;

use sqlx::PgPool;

use super::cache::{metadata_key, Cache, METADATA_TTL};
use crate::error::{GatewayError, Result};
use crate::types::{Image, ImagePatch, NewImage};

#[derive(Clone)]
pub struct ImagesRepo {
    pool: PgPool,
    cache: Arc<dyn Cache>,
}

impl ImagesRepo {
    pub fn new(pool: PgPool, cache: Arc<dyn Cache>) -> Self {
        Self { pool, cache }
    }

    pub async fn create(&self, dto: NewImage) -> Result<Image> {
        let image: Image = sqlx::query_as(
            r#"
            INSERT INTO images
                (id, original_url, file_size, mime_type, width, height, source_service, source_reference, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            RETURNING *
            "#,
        )
        .bind(&dto.id)
        .bind(&dto.original_url)
        .bind(dto.file_size)
        .bind(dto.mime_type.as_str())
        .bind(dto.width)
        .bind(dto.height)
        .bind(&dto.source_service)
        .bind(&dto.source_reference)
        .fetch_one(&self.pool)
        .await?;

        Ok(image)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Image> {
        let key = metadata_key("image", id);

        if let Some(cached) = self.cache.get(&key).await.ok().flatten() {
            if let Ok(image) = serde_json::from_str::<Image>(&cached) {
                return Ok(image);
            }
        }

        let image: Image = sqlx::query_as("SELECT * FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GatewayError::not_found("image", id))?;

        if let Ok(serialized) = serde_json::to_string(&image) {
            let _ = self.cache.set(&key, &serialized, Some(METADATA_TTL)).await;
        }

        Ok(image)
    }

    /// Write-through update of `processedUrl` (spec §3: the only field C5
    /// ever writes on an `Image`).
    pub async fn update(&self, id: &str, patch: ImagePatch) -> Result<Image> {
        let image: Image = sqlx::query_as(
            r#"
            UPDATE images
            SET processed_url = COALESCE($2, processed_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.processed_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatewayError::not_found("image", id))?;

        let _ = self.cache.delete(&metadata_key("image", id)).await;

        Ok(image)
    }
}
