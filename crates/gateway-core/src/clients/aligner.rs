use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use super::retry::send_with_retry;
use super::{AlignOptions, AlignResult, ImageAligner};
use crate::error::{GatewayError, Result};

const ENGINE_NAME: &str = "aligner";

/// HTTP client for the aligner backend (spec §4.1, §6: `POST /api/v1/align`).
#[derive(Clone)]
pub struct AlignerClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct AlignResponse {
    warped: String,
    preprocessed: String,
}

impl AlignerClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http, base_url: base_url.into(), timeout }
    }
}

#[async_trait]
impl ImageAligner for AlignerClient {
    async fn align(&self, bytes: &[u8], opts: AlignOptions) -> Result<AlignResult> {
        let url = format!("{}/api/v1/align", self.base_url);

        let response = send_with_retry(ENGINE_NAME, self.timeout, || {
            let form = reqwest::multipart::Form::new().part(
                "image",
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("image"),
            );
            self.http
                .post(&url)
                .query(&[
                    ("mode", opts.mode.as_str().to_string()),
                    ("aggressive", opts.aggressive.to_string()),
                    ("apply_ocr_prep", opts.apply_ocr_prep.to_string()),
                    ("simplify_percent", opts.simplify_percent.to_string()),
                ])
                .multipart(form)
        })
        .await?;

        let body: AlignResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::backend_fatal(ENGINE_NAME, format!("malformed response: {e}")))?;

        let warped = base64::engine::general_purpose::STANDARD
            .decode(body.warped)
            .map_err(|e| GatewayError::backend_fatal(ENGINE_NAME, format!("invalid base64 warped payload: {e}")))?;
        let preprocessed = base64::engine::general_purpose::STANDARD
            .decode(body.preprocessed)
            .map_err(|e| GatewayError::backend_fatal(ENGINE_NAME, format!("invalid base64 preprocessed payload: {e}")))?;

        Ok(AlignResult { warped, preprocessed })
    }
}
