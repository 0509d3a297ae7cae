//! Engine Clients (C1): stateless HTTP callers for the aligner, Tesseract,
//! and PaddleOCR backends (spec §4.1). `TextRecognizer` and `ImageAligner`
//! are the capability traits named in spec §9; the processor selects
//! attempts as a list of `(name, buffer, &dyn TextRecognizer)` tuples
//! rather than branching on engine identity.

pub mod aligner;
pub mod paddle_ocr;
pub mod retry;
pub mod tesseract;

pub use aligner::AlignerClient;
pub use paddle_ocr::PaddleOcrClient;
pub use tesseract::TesseractClient;

use async_trait::async_trait;

use crate::error::Result;

/// Result of an OCR attempt: recognized text plus the engine's own
/// confidence in it (spec §4.1).
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, bytes: &[u8]) -> Result<OcrResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    Classic,
    Neural,
}

impl AlignMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Neural => "neural",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlignOptions {
    pub mode: AlignMode,
    pub apply_ocr_prep: bool,
    pub aggressive: bool,
    pub simplify_percent: f64,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            mode: AlignMode::Classic,
            apply_ocr_prep: false,
            aggressive: false,
            simplify_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignResult {
    pub warped: Vec<u8>,
    pub preprocessed: Vec<u8>,
}

#[async_trait]
pub trait ImageAligner: Send + Sync {
    async fn align(&self, bytes: &[u8], opts: AlignOptions) -> Result<AlignResult>;
}
