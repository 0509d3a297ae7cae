//! Environment-driven configuration, shared by the ingest and worker binaries.
//!
//! Every variable named in spec §6 is read here. Required variables fail
//! fast with a descriptive error instead of falling back to a guessed
//! default, the way upstream engine URLs must be explicit rather than
//! silently pointed at `localhost`.

use std::env;
use std::time::Duration;

use crate::error::{GatewayError, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CONFIDENCE_THRESHOLD_HIGH: f64 = 0.70;
const DEFAULT_CONFIDENCE_THRESHOLD_LOW: f64 = 0.60;
const DEFAULT_WORKER_CONCURRENCY: usize = 4;
const DEFAULT_OCR_ENGINE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub blob: BlobConfig,
    pub aligner_url: String,
    pub tesseract_url: String,
    pub paddleocr_url: String,
    pub ocr_engine_timeout: Duration,
    pub confidence_threshold_high: f64,
    pub confidence_threshold_low: f64,
    pub worker_concurrency: usize,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub use_ssl: bool,
    pub bucket: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl AppConfig {
    /// Load configuration from the process environment, reading a `.env`
    /// file first when present (grounded in the pack's `dotenvy` usage).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            port: parse_or_default("PORT", DEFAULT_PORT)?,
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            blob: BlobConfig {
                endpoint: env::var("BLOB_ENDPOINT").ok(),
                access_key: env::var("BLOB_ACCESS_KEY").ok(),
                secret_key: env::var("BLOB_SECRET_KEY").ok(),
                use_ssl: parse_bool_or_default("BLOB_SSL", true),
                bucket: required("BLOB_BUCKET")?,
            },
            aligner_url: required("ALIGNER_URL")?,
            tesseract_url: required("TESSERACT_URL")?,
            paddleocr_url: required("PADDLEOCR_URL")?,
            ocr_engine_timeout: Duration::from_secs(parse_or_default(
                "OCR_ENGINE_TIMEOUT",
                DEFAULT_OCR_ENGINE_TIMEOUT_SECS,
            )?),
            confidence_threshold_high: parse_or_default(
                "CONFIDENCE_THRESHOLD_HIGH",
                DEFAULT_CONFIDENCE_THRESHOLD_HIGH,
            )?,
            confidence_threshold_low: parse_or_default(
                "CONFIDENCE_THRESHOLD_LOW",
                DEFAULT_CONFIDENCE_THRESHOLD_LOW,
            )?,
            worker_concurrency: parse_or_default("WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String> {
    env::var(name).map_err(|_| GatewayError::internal(format!("missing required environment variable {name}")))
}

fn parse_or_default<T>(name: &'static str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| GatewayError::internal(format!("invalid value for {name}: {value}"))),
        Err(_) => Ok(default),
    }
}

fn parse_bool_or_default(name: &'static str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_default_falls_back_when_unset() {
        // SAFETY: test runs single-threaded per-test env var, scoped to a name
        // that is never set elsewhere in this process.
        std::env::remove_var("GATEWAY_TEST_UNSET_VALUE");
        let value: u16 = parse_or_default("GATEWAY_TEST_UNSET_VALUE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_or_default_rejects_malformed_value() {
        std::env::set_var("GATEWAY_TEST_BAD_VALUE", "not-a-number");
        let result: Result<u16> = parse_or_default("GATEWAY_TEST_BAD_VALUE", 1);
        assert!(result.is_err());
        std::env::remove_var("GATEWAY_TEST_BAD_VALUE");
    }
}
