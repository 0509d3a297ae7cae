//! Request/response DTOs for the ingest HTTP edge (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_id: String,
    pub recognition_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RecognitionResponse {
    pub id: String,
    pub image_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<gateway_core::types::Recognition> for RecognitionResponse {
    fn from(r: gateway_core::types::Recognition) -> Self {
        Self {
            id: r.id,
            image_id: r.image_id,
            status: r.status,
            result_type: r.result_type,
            raw_text: r.raw_text,
            confidence: r.confidence,
            engine: r.engine,
            aligned: r.aligned,
            qr_data: r.qr_data,
            qr_format: r.qr_format,
            processing_time_ms: r.processing_time_ms,
            error: r.error,
            completed_at: r.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageUrlQuery {
    #[serde(rename = "type", default = "default_variant")]
    pub variant: String,
}

fn default_variant() -> String {
    "original".to_string()
}

#[derive(Debug, Serialize)]
pub struct ImageUrlResponse {
    pub image_id: String,
    #[serde(rename = "type")]
    pub variant: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
