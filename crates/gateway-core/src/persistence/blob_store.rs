//! BlobStore (C2): opaque key/bytes storage with presigned-GET support
//! (spec §4.2, §6). Backed by S3 (or an S3-compatible store via
//! `BLOB_ENDPOINT`), grounded in the pack's `manifests/yonasBSD-readur`
//! `aws-sdk-s3` dependency and the trait-abstracted blob access of
//! `other_examples/402efddf_wilsonzlin-aero__crates-aero-storage-server-src-http-images.rs.rs`.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::config::BlobConfig;
use crate::error::{GatewayError, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `key` and returns the `blob://<bucket>/<key>`
    /// url embedding bucket and key (spec §3).
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn presign(&self, key: &str, ttl: Duration) -> Result<String>;
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn new(config: &BlobConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "gateway-static",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if let Some(endpoint) = &config.endpoint {
            let scheme = if config.use_ssl { "https" } else { "http" };
            let endpoint = if endpoint.contains("://") { endpoint.clone() } else { format!("{scheme}://{endpoint}") };
            builder = builder.endpoint_url(endpoint);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());

        Ok(Self { client, bucket: config.bucket.clone() })
    }

    fn url_for(&self, key: &str) -> String {
        format!("blob://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| GatewayError::internal(format!("blob put failed: {e}")))?;
        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| GatewayError::internal(format!("blob get failed: {e}")))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| GatewayError::internal(format!("blob body read failed: {e}")))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| GatewayError::internal(format!("blob delete failed: {e}")))?;
        Ok(())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String> {
        let presign_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| GatewayError::internal(format!("invalid presign ttl: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| GatewayError::internal(format!("presign failed: {e}")))?;
        Ok(presigned.uri().to_string())
    }
}

/// Parses the opaque key out of a `blob://<bucket>/<key>` url (spec §3).
pub fn key_from_url(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("blob://")?;
    let (_, key) = rest.split_once('/')?;
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_url_extracts_key_after_bucket() {
        assert_eq!(key_from_url("blob://receipts/abc-original.jpg"), Some("abc-original.jpg"));
    }

    #[test]
    fn key_from_url_rejects_non_blob_scheme() {
        assert_eq!(key_from_url("https://example.com/x"), None);
    }
}
