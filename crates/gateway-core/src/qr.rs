//! QR decode + classify (spec §4.5 step 3). Decoding is delegated to
//! `rqrr`, the crate a QR-processing repo in the reference pack depends on
//! (`other_examples/manifests/andresv-qr-lum_rust_backend`); the buffer
//! ordering, fiscal/url/unknown classification, and fiscal-preference rule
//! within a buffer are specified behavior (spec §4.5 step 3) with no
//! precedent elsewhere in the pack.

use image::GrayImage;

use crate::types::{QrFormat, QrLocation};

/// One decoded QR payload plus its pixel bounding box.
#[derive(Debug, Clone)]
pub struct DecodedQr {
    pub data: String,
    pub format: QrFormat,
    pub location: QrLocation,
}

/// Classifies a decoded QR payload per spec §4.5 step 3.
pub fn classify(data: &str) -> QrFormat {
    if data.contains("fn=") || data.contains("&fn=") || (data.contains("t=") && data.contains("s=") && data.contains("fp=")) {
        QrFormat::Fiscal
    } else if data.starts_with("http://") || data.starts_with("https://") {
        QrFormat::Url
    } else {
        QrFormat::Unknown
    }
}

/// Decodes every QR code in an image buffer, returning the fiscal-preferred
/// (or else first) code, mirroring "among codes found in a given buffer,
/// prefer one classified fiscal; otherwise pick the first" (spec §4.5
/// step 3).
pub fn decode_preferred(bytes: &[u8]) -> Option<DecodedQr> {
    let image = image::load_from_memory(bytes).ok()?.to_luma8();
    let codes = decode_all(&image);

    let fiscal = codes.iter().position(|c| c.format == QrFormat::Fiscal);
    match fiscal {
        Some(idx) => codes.into_iter().nth(idx),
        None => codes.into_iter().next(),
    }
}

fn decode_all(image: &GrayImage) -> Vec<DecodedQr> {
    let mut prepared = rqrr::PreparedImage::prepare(image.clone());
    let grids = prepared.detect_grids();

    let mut found = Vec::with_capacity(grids.len());
    for grid in grids {
        let bounds = grid.bounds;
        let Ok((_, content)) = grid.decode() else { continue };

        let xs: Vec<i32> = bounds.iter().map(|p| p.x).collect();
        let ys: Vec<i32> = bounds.iter().map(|p| p.y).collect();
        let (min_x, max_x) = (xs.iter().min().copied().unwrap_or(0), xs.iter().max().copied().unwrap_or(0));
        let (min_y, max_y) = (ys.iter().min().copied().unwrap_or(0), ys.iter().max().copied().unwrap_or(0));

        found.push(DecodedQr {
            format: classify(&content),
            data: content,
            location: QrLocation {
                x: min_x.max(0) as u32,
                y: min_y.max(0) as u32,
                width: (max_x - min_x).max(0) as u32,
                height: (max_y - min_y).max(0) as u32,
            },
        });
    }
    found
}

/// Runs the cross-buffer selection rule: `warped` wins if it yields any
/// code; `preprocessed` is only consulted when `warped` yielded none (spec
/// §4.5 step 3).
pub fn decode_warped_then_preprocessed(warped: &[u8], preprocessed: &[u8]) -> Option<DecodedQr> {
    decode_preferred(warped).or_else(|| decode_preferred(preprocessed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fiscal_payload_by_fn_key() {
        assert_eq!(classify("t=20240101T1200&s=123.45&fn=9280440301000000&i=1&fp=1234567890&n=1"), QrFormat::Fiscal);
    }

    #[test]
    fn classifies_fiscal_payload_without_fn_by_trio() {
        assert_eq!(classify("t=20240101T1200&s=1.00&fp=42"), QrFormat::Fiscal);
    }

    #[test]
    fn classifies_url_payload() {
        assert_eq!(classify("https://example.com/r/abc"), QrFormat::Url);
    }

    #[test]
    fn classifies_unknown_payload() {
        assert_eq!(classify("just some text"), QrFormat::Unknown);
    }

    #[test]
    fn decode_preferred_returns_none_for_non_image_bytes() {
        assert!(decode_preferred(b"not an image").is_none());
    }
}
