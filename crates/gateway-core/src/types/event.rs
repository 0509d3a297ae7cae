use serde::{Deserialize, Serialize};

use super::recognition::{Engine, QrFormat, QrLocation};

/// Common provenance carried by every event (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    pub image_id: String,
    pub recognition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPayload {
    #[serde(flatten)]
    pub context: EventContext,
    pub position: u64,
    pub estimated_wait_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingPayload {
    #[serde(flatten)]
    pub context: EventContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "resultType", rename_all = "lowercase")]
pub enum CompletedResult {
    Text { text: String, confidence: f64, engine: Engine },
    Qr { qr_data: String, qr_format: QrFormat, qr_location: QrLocation },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedPayload {
    #[serde(flatten)]
    pub context: EventContext,
    #[serde(flatten)]
    pub result: CompletedResult,
    pub processing_time_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedPayload {
    #[serde(flatten)]
    pub context: EventContext,
    pub error: String,
}

/// A closed tagged union of event kinds (spec §9 Design Notes). Serializes
/// to the `{event, timestamp, ...}` shape required by spec §4.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum GatewayEvent {
    #[serde(rename = "ocr.queued")]
    Queued {
        timestamp: i64,
        #[serde(flatten)]
        payload: QueuedPayload,
    },
    #[serde(rename = "ocr.processing")]
    Processing {
        timestamp: i64,
        #[serde(flatten)]
        payload: ProcessingPayload,
    },
    #[serde(rename = "ocr.completed")]
    Completed {
        timestamp: i64,
        #[serde(flatten)]
        payload: CompletedPayload,
    },
    #[serde(rename = "ocr.failed")]
    Failed {
        timestamp: i64,
        #[serde(flatten)]
        payload: FailedPayload,
    },
}
