//! Error taxonomy shared by every component of the gateway.
//!
//! Mirrors the kind-not-type-name taxonomy of spec §7: callers match on the
//! variant, not on a specific downstream library's error type.

use thiserror::Error;

/// The gateway's error kind. Each variant is one of the kinds named in spec §7.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad input reported straight back to the caller; no state is created.
    #[error("validation error: {0}")]
    Validation(String),

    /// An `Image` or `Recognition` id that does not resolve to a row.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// A retryable upstream failure (408/413/429/5xx, connection errors) that
    /// has exhausted its retries inside the C1 client.
    #[error("{engine} transient failure: {message}")]
    BackendTransient { engine: &'static str, message: String },

    /// A non-retryable upstream failure.
    #[error("{engine} fatal failure: {message}")]
    BackendFatal { engine: &'static str, message: String },

    /// Programmer bug, store write failure, serialization error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { resource, id: id.into() }
    }

    pub fn backend_transient(engine: &'static str, message: impl Into<String>) -> Self {
        Self::BackendTransient { engine, message: message.into() }
    }

    pub fn backend_fatal(engine: &'static str, message: impl Into<String>) -> Self {
        Self::BackendFatal { engine, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound { resource: "row", id: "unknown".into() },
            other => Self::internal(format!("store error: {other}")),
        }
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        Self::internal(format!("cache/queue error: {err}"))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::internal(format!("http client error: {err}"))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("serialization error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found_variant() {
        let err: GatewayError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

}
