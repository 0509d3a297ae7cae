//! Shared transport policy for the three engine clients (spec §4.1):
//! per-request timeout, up to 3 attempts on retryable statuses, exponential
//! backoff capped at 10s. Each attempt re-invokes `build`, so every attempt
//! is a fresh upload, so the clients never resend a partially-consumed body.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::GatewayError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        408 | 413 | 429 | 500 | 502 | 503 | 504
    )
}

fn backoff_for_attempt(attempt: u32) -> Duration {
    let millis = BASE_BACKOFF.as_millis().saturating_mul(1u128 << attempt.min(16));
    Duration::from_millis(millis.min(MAX_BACKOFF.as_millis()) as u64)
}

/// Run `build().send()` up to [`MAX_ATTEMPTS`] times, retrying on the
/// retryable status set and on connection-level errors, with capped
/// exponential backoff between attempts. Non-retryable HTTP statuses and
/// the final exhausted attempt surface immediately as [`GatewayError`].
pub async fn send_with_retry<F>(engine: &'static str, timeout: Duration, build: F) -> Result<reqwest::Response, GatewayError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err: Option<GatewayError> = None;

    for attempt in 0..MAX_ATTEMPTS {
        let result = build().timeout(timeout).send().await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if !is_retryable(status) || attempt + 1 == MAX_ATTEMPTS {
                    let message = format!("upstream returned {status}");
                    return Err(if is_retryable(status) {
                        GatewayError::backend_transient(engine, message)
                    } else {
                        GatewayError::backend_fatal(engine, message)
                    });
                }
                last_err = Some(GatewayError::backend_transient(engine, format!("upstream returned {status}")));
            }
            Err(err) => {
                if attempt + 1 == MAX_ATTEMPTS {
                    return Err(GatewayError::backend_transient(engine, format!("transport error: {err}")));
                }
                last_err = Some(GatewayError::backend_transient(engine, format!("transport error: {err}")));
            }
        }

        tokio::time::sleep(backoff_for_attempt(attempt)).await;
    }

    Err(last_err.unwrap_or_else(|| GatewayError::backend_transient(engine, "retry loop exhausted with no response")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped_at_ten_seconds() {
        assert_eq!(backoff_for_attempt(0), Duration::from_millis(500));
        assert_eq!(backoff_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff_for_attempt(10), MAX_BACKOFF);
    }

    #[test]
    fn retryable_statuses_match_spec_set() {
        for code in [408, 413, 429, 500, 502, 503, 504] {
            assert!(is_retryable(StatusCode::from_u16(code).unwrap()));
        }
        for code in [200, 301, 400, 401, 404, 422] {
            assert!(!is_retryable(StatusCode::from_u16(code).unwrap()));
        }
    }
}
