use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Allowed upload MIME types (spec §3, §4.4).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MimeType {
    pub fn from_content_type(value: &str) -> Option<Self> {
        match value {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// The `images` table row (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: String,
    pub original_url: String,
    pub processed_url: Option<String>,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub source_service: Option<String>,
    pub source_reference: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields needed to insert a new `Image` row.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub id: String,
    pub original_url: String,
    pub file_size: i64,
    pub mime_type: MimeType,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub source_service: Option<String>,
    pub source_reference: Option<String>,
}

/// Patch applied by C5 when it writes `processedUrl` (the only mutation C5
/// ever makes to an `Image` row).
#[derive(Debug, Clone, Default)]
pub struct ImagePatch {
    pub processed_url: Option<String>,
}
