//! Local fallback preprocessing (spec §4.5 step 2): when the aligner is
//! unreachable, the processor still needs a `preprocessed` buffer to feed
//! the QR decoder and OCR chain. Grayscale -> normalize -> threshold at 128
//! -> JPEG, done in-process with the `image` crate rather than calling out
//! to a second service.

use image::{GrayImage, ImageFormat};

use crate::error::{GatewayError, Result};

const THRESHOLD: u8 = 128;

/// Produces the degrade-path `preprocessed` buffer from raw image bytes.
pub fn local_preprocess(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).map_err(|e| GatewayError::internal(format!("failed to decode image for local preprocessing: {e}")))?;
    let gray = decoded.to_luma8();
    let normalized = normalize(&gray);
    let thresholded = threshold(&normalized, THRESHOLD);

    let mut out = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut out);
    thresholded
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .map_err(|e| GatewayError::internal(format!("failed to encode preprocessed jpeg: {e}")))?;
    Ok(out)
}

/// Stretches the pixel histogram to span the full `0..=255` range.
fn normalize(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((255u8, 0u8), |(min, max), p| (min.min(p[0]), max.max(p[0])));

    if max <= min {
        return image.clone();
    }

    let range = (max - min) as f32;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let stretched = ((pixel[0].saturating_sub(min)) as f32 / range) * 255.0;
        pixel[0] = stretched.round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] >= level { 255 } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage};

    fn encode_gray_png(image: &GrayImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn threshold_splits_pixels_at_level() {
        let image = GrayImage::from_raw(2, 1, vec![10, 200]).unwrap();
        let thresholded = threshold(&image, THRESHOLD);
        assert_eq!(thresholded.get_pixel(0, 0)[0], 0);
        assert_eq!(thresholded.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn normalize_stretches_to_full_range() {
        let image = GrayImage::from_raw(2, 1, vec![50, 150]).unwrap();
        let normalized = normalize(&image);
        assert_eq!(normalized.get_pixel(0, 0)[0], 0);
        assert_eq!(normalized.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn local_preprocess_round_trips_a_real_image() {
        let image = GrayImage::from_raw(4, 4, vec![30; 16]).unwrap();
        let png = encode_gray_png(&image);
        let out = local_preprocess(&png).unwrap();
        assert!(!out.is_empty());
    }
}
