//! Maps `GatewayError` onto HTTP status codes (spec §7 taxonomy), the same
//! shape `kreuzberg`'s `ApiError` wrapper uses to bridge a domain error
//! enum into an Axum response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::GatewayError;

use super::types::ErrorResponse;

pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::BackendTransient { .. } | GatewayError::BackendFatal { .. } | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let error = match &err {
            GatewayError::Validation(_) => "validation_error",
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::BackendTransient { .. } => "backend_transient",
            GatewayError::BackendFatal { .. } => "backend_fatal",
            GatewayError::Internal(_) => "internal_error",
        };

        Self { status, body: ErrorResponse { error: error.to_string(), message: err.to_string() } }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
