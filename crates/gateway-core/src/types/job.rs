use serde::{Deserialize, Serialize};

use super::recognition::QrFormat;

/// The job envelope enqueued by C4 and consumed by C5 (spec §3). Read-only
/// after dequeue; never persisted by `gateway-core` itself, only
/// (de)serialized onto the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub image_id: String,
    pub recognition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_qr_formats: Option<Vec<QrFormat>>,
}

impl Job {
    pub fn accepts(&self, format: QrFormat) -> bool {
        match &self.accepted_qr_formats {
            None => true,
            Some(formats) => formats.contains(&format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_accepted_formats_accepts_everything() {
        let job = Job {
            image_id: "i".into(),
            recognition_id: "r".into(),
            source_service: None,
            source_reference: None,
            accepted_qr_formats: None,
        };
        assert!(job.accepts(QrFormat::Fiscal));
        assert!(job.accepts(QrFormat::Unknown));
    }

    #[test]
    fn restricted_formats_filter_out_others() {
        let job = Job {
            image_id: "i".into(),
            recognition_id: "r".into(),
            source_service: None,
            source_reference: None,
            accepted_qr_formats: Some(vec![QrFormat::Url]),
        };
        assert!(job.accepts(QrFormat::Url));
        assert!(!job.accepts(QrFormat::Fiscal));
    }
}
