use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::retry::send_with_retry;
use super::{OcrResult, TextRecognizer};
use crate::error::{GatewayError, Result};

const ENGINE_NAME: &str = "tesseract";

/// Default multilingual language pack used when the caller doesn't specify
/// one (spec §4.1).
pub const DEFAULT_LANG: &str = "rus+eng";

/// HTTP client for the Tesseract backend (spec §6: `POST /api/v1/recognize`).
#[derive(Clone)]
pub struct TesseractClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    lang: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: String,
    confidence: f64,
}

impl TesseractClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
            lang: DEFAULT_LANG.to_string(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

#[async_trait]
impl TextRecognizer for TesseractClient {
    async fn recognize(&self, bytes: &[u8]) -> Result<OcrResult> {
        let url = format!("{}/api/v1/recognize", self.base_url);

        let response = send_with_retry(ENGINE_NAME, self.timeout, || {
            let form = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("file");
            let form = reqwest::multipart::Form::new().part("file", form);
            self.http.post(&url).query(&[("lang", self.lang.as_str())]).multipart(form)
        })
        .await?;

        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::backend_fatal(ENGINE_NAME, format!("malformed response: {e}")))?;

        Ok(OcrResult { text: body.text, confidence: body.confidence })
    }
}
