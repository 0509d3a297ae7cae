//! Engine client contract tests (spec §6 "Engine HTTP contracts"), each
//! backend mocked with `wiremock` rather than a live aligner/OCR service.

use std::time::Duration;

use base64::Engine as _;
use gateway_core::clients::{AlignOptions, AlignerClient, ImageAligner, PaddleOcrClient, TesseractClient, TextRecognizer};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn aligner_decodes_base64_warped_and_preprocessed() {
    let server = MockServer::start().await;
    let warped = base64::engine::general_purpose::STANDARD.encode(b"warped-bytes");
    let preprocessed = base64::engine::general_purpose::STANDARD.encode(b"preprocessed-bytes");

    Mock::given(method("POST"))
        .and(path("/api/v1/align"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "warped": warped, "preprocessed": preprocessed })))
        .mount(&server)
        .await;

    let client = AlignerClient::new(reqwest::Client::new(), server.uri(), TIMEOUT);
    let result = client.align(b"source-bytes", AlignOptions::default()).await.unwrap();

    assert_eq!(result.warped, b"warped-bytes");
    assert_eq!(result.preprocessed, b"preprocessed-bytes");
}

#[tokio::test]
async fn aligner_retries_on_503_then_succeeds() {
    let server = MockServer::start().await;
    let warped = base64::engine::general_purpose::STANDARD.encode(b"w");
    let preprocessed = base64::engine::general_purpose::STANDARD.encode(b"p");

    // First response: 503 (retryable). Second: success. wiremock serves
    // mounted expectations in registration order via up_to_n_times/priority,
    // so two distinct mocks scoped by expected call count stand in for a
    // "fail once, then recover" backend.
    Mock::given(method("POST"))
        .and(path("/api/v1/align"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/align"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "warped": warped, "preprocessed": preprocessed })))
        .mount(&server)
        .await;

    let client = AlignerClient::new(reqwest::Client::new(), server.uri(), TIMEOUT);
    let result = client.align(b"source-bytes", AlignOptions::default()).await.unwrap();
    assert_eq!(result.warped, b"w");
}

#[tokio::test]
async fn aligner_surfaces_backend_fatal_on_persistent_4xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path("/api/v1/align")).respond_with(ResponseTemplate::new(400)).mount(&server).await;

    let client = AlignerClient::new(reqwest::Client::new(), server.uri(), TIMEOUT);
    let err = client.align(b"source-bytes", AlignOptions::default()).await.unwrap_err();
    assert!(matches!(err, gateway_core::GatewayError::BackendFatal { .. }));
}

#[tokio::test]
async fn tesseract_recognizes_text_with_confidence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "TOTAL 12.34", "confidence": 0.41 })))
        .mount(&server)
        .await;

    let client = TesseractClient::new(reqwest::Client::new(), server.uri(), TIMEOUT);
    let result = client.recognize(b"preprocessed-bytes").await.unwrap();

    assert_eq!(result.text, "TOTAL 12.34");
    assert_eq!(result.confidence, 0.41);
}

#[tokio::test]
async fn paddleocr_recognizes_text_with_confidence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "TOTAL 12.34", "confidence": 0.72 })))
        .mount(&server)
        .await;

    let client = PaddleOcrClient::new(reqwest::Client::new(), server.uri(), TIMEOUT);
    let result = client.recognize(b"warped-bytes").await.unwrap();

    assert_eq!(result.text, "TOTAL 12.34");
    assert_eq!(result.confidence, 0.72);
}

#[tokio::test]
async fn ocr_backend_exhausting_retries_is_backend_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path("/api/v1/recognize")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

    let client = TesseractClient::new(reqwest::Client::new(), server.uri(), TIMEOUT);
    let err = client.recognize(b"bytes").await.unwrap_err();
    assert!(matches!(err, gateway_core::GatewayError::BackendTransient { .. }));
}
