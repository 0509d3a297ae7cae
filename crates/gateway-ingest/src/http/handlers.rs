//! Ingest HTTP handlers (spec §6).

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use gateway_core::types::QrFormat;
use gateway_core::GatewayError;

use crate::service;
use crate::state::AppState;

use super::error::ApiError;
use super::types::{HealthResponse, ImageUrlQuery, ImageUrlResponse, RecognitionResponse, UploadResponse};

/// `POST /api/v1/recognize`
pub async fn recognize_handler(State(state): State<AppState>, mut multipart: Multipart) -> Result<(axum::http::StatusCode, Json<UploadResponse>), ApiError> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut mime_type: Option<String> = None;
    let mut source_service = None;
    let mut source_reference = None;
    let mut accepted_qr_formats = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                mime_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| GatewayError::validation(format!("failed to read image field: {e}")))?;
                bytes = Some(data.to_vec());
            }
            "sourceService" => {
                source_service = Some(field.text().await.map_err(|e| GatewayError::validation(e.to_string()))?);
            }
            "sourceReference" => {
                source_reference = Some(field.text().await.map_err(|e| GatewayError::validation(e.to_string()))?);
            }
            "acceptedQrFormats" => {
                let raw = field.text().await.map_err(|e| GatewayError::validation(e.to_string()))?;
                accepted_qr_formats = Some(parse_accepted_formats(&raw)?);
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| GatewayError::validation("missing required field: image"))?;
    let mime_type = mime_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let result = service::upload_image(
        &state,
        service::UploadRequest { bytes, mime_type, source_service, source_reference, accepted_qr_formats },
    )
    .await?;

    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(UploadResponse { image_id: result.image_id, recognition_id: result.recognition_id, status: "queued" }),
    ))
}

fn parse_accepted_formats(raw: &str) -> Result<Vec<QrFormat>, GatewayError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| QrFormat::from_str_opt(s).ok_or_else(|| GatewayError::validation(format!("invalid qr format: {s}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_formats() {
        // S2: acceptedQrFormats=["url"] arrives over multipart as "url".
        let formats = parse_accepted_formats("url").unwrap();
        assert_eq!(formats, vec![QrFormat::Url]);
    }

    #[test]
    fn trims_whitespace_between_entries() {
        let formats = parse_accepted_formats("fiscal, url").unwrap();
        assert_eq!(formats, vec![QrFormat::Fiscal, QrFormat::Url]);
    }

    #[test]
    fn rejects_an_unknown_format_name() {
        assert!(parse_accepted_formats("fiscal,bogus").is_err());
    }
}

/// `GET /api/v1/recognitions/:id`
pub async fn get_recognition_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<RecognitionResponse>, ApiError> {
    let recognition = service::get_recognition(&state.recognitions, &id).await?;
    Ok(Json(recognition.into()))
}

/// `GET /api/v1/images/:id?type=original|processed`
pub async fn get_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ImageUrlQuery>,
) -> Result<Json<ImageUrlResponse>, ApiError> {
    let processed = match query.variant.as_str() {
        "original" => false,
        "processed" => true,
        other => return Err(GatewayError::validation(format!("invalid image type: {other}")).into()),
    };

    let url = service::presigned_image_url(&state.images, &state.blob, &id, processed).await?;
    Ok(Json(ImageUrlResponse { image_id: id, variant: query.variant, url }))
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", service: "gateway-ingest", timestamp: chrono::Utc::now().to_rfc3339() })
}
