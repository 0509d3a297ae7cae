use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The state machine of spec §4.5. Transitions are enforced by
/// `RecognitionsRepo`, not by this type itself; this is the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl RecognitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is one of the only legal paths in spec §4.5:
    /// `queued -> processing -> {completed, failed}`.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processing) | (Self::Processing, Self::Completed) | (Self::Processing, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Text,
    Qr,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Qr => "qr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Tesseract,
    Paddleocr,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Paddleocr => "paddleocr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrFormat {
    Fiscal,
    Url,
    Unknown,
}

impl QrFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fiscal => "fiscal",
            Self::Url => "url",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "fiscal" => Some(Self::Fiscal),
            "url" => Some(Self::Url),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrLocation {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The `recognition_results` table row (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recognition {
    pub id: String,
    pub image_id: String,
    pub status: String,
    pub result_type: Option<String>,

    pub raw_text: Option<String>,
    pub confidence: Option<f64>,
    pub engine: Option<String>,
    pub aligned: Option<bool>,

    pub qr_data: Option<String>,
    pub qr_format: Option<String>,
    pub qr_location_x: Option<i32>,
    pub qr_location_y: Option<i32>,
    pub qr_location_width: Option<i32>,
    pub qr_location_height: Option<i32>,

    pub processing_time_ms: Option<i64>,
    pub queue_wait_time_ms: Option<i64>,
    pub attempt_number: i32,

    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Recognition {
    pub fn status(&self) -> RecognitionStatus {
        RecognitionStatus::from_str_opt(&self.status).unwrap_or(RecognitionStatus::Queued)
    }
}

/// Terminal write for a successful text recognition (OCR path, step 4).
#[derive(Debug, Clone)]
pub struct TextCompletion {
    pub raw_text: String,
    pub confidence: f64,
    pub engine: Engine,
    pub aligned: bool,
    pub processing_time_ms: i64,
}

/// Terminal write for a successful QR recognition (step 3).
#[derive(Debug, Clone)]
pub struct QrCompletion {
    pub qr_data: String,
    pub qr_format: QrFormat,
    pub qr_location: QrLocation,
    pub processing_time_ms: i64,
}
