use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::retry::send_with_retry;
use super::{OcrResult, TextRecognizer};
use crate::error::{GatewayError, Result};

const ENGINE_NAME: &str = "paddleocr";

/// HTTP client for the PaddleOCR backend (spec §6: `POST /api/v1/recognize`).
#[derive(Clone)]
pub struct PaddleOcrClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: String,
    confidence: f64,
}

impl PaddleOcrClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http, base_url: base_url.into(), timeout }
    }
}

#[async_trait]
impl TextRecognizer for PaddleOcrClient {
    async fn recognize(&self, bytes: &[u8]) -> Result<OcrResult> {
        let url = format!("{}/api/v1/recognize", self.base_url);

        let response = send_with_retry(ENGINE_NAME, self.timeout, || {
            let form = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("file");
            let form = reqwest::multipart::Form::new().part("file", form);
            self.http.post(&url).multipart(form)
        })
        .await?;

        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::backend_fatal(ENGINE_NAME, format!("malformed response: {e}")))?;

        Ok(OcrResult { text: body.text, confidence: body.confidence })
    }
}
