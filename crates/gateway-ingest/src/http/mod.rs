//! HTTP edge for the Ingest Service (spec §6), assembling an Axum `Router`
//! the way `kreuzberg`'s `api::server::create_router` does: routes, a
//! request-body size limit, CORS, and request tracing as layers.

mod error;
mod handlers;
mod types;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use gateway_core::types::MAX_IMAGE_BYTES;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/recognize", post(handlers::recognize_handler))
        .route("/api/v1/recognitions/:id", get(handlers::get_recognition_handler))
        .route("/api/v1/images/:id", get(handlers::get_image_handler))
        .route("/health", get(handlers::health_handler))
        .layer(RequestBodyLimitLayer::new(MAX_IMAGE_BYTES as usize))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
