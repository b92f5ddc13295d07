use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

use super::GradingError;
use crate::config::HttpSettings;

const BASE_BACKOFF_MS: u64 = 250;

pub fn build_client(
    backend: &str,
    settings: &HttpSettings,
) -> Result<reqwest::Client, GradingError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(|e| GradingError::unavailable(backend, format!("HTTP client error: {e}")))
}

pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor))
}

/// Outcome of one failed attempt against a remote backend.
#[derive(Debug)]
pub enum AttemptError {
    Retry(GradingError),
    Fatal(GradingError),
}

impl From<GradingError> for AttemptError {
    fn from(err: GradingError) -> Self {
        if err.is_retryable() {
            AttemptError::Retry(err)
        } else {
            AttemptError::Fatal(err)
        }
    }
}

/// Runs `call` until it succeeds, fails fatally, or the retry budget is
/// spent. The last error is returned unchanged. A rate-limit hint longer than
/// `max_wait` ends the loop instead of sleeping.
pub async fn with_retry<T, F, Fut>(
    backend: &str,
    max_retries: u32,
    max_wait: Duration,
    mut call: F,
) -> Result<T, GradingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Retry(e))
                if attempt < max_retries && !waits_too_long(&e, max_wait) =>
            {
                attempt += 1;
                let delay = match &e {
                    GradingError::RateLimited {
                        retry_after: Some(hint),
                        ..
                    } => (*hint).max(backoff_delay(attempt)),
                    _ => backoff_delay(attempt),
                };
                warn!(
                    backend,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "grading request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(AttemptError::Retry(e)) | Err(AttemptError::Fatal(e)) => {
                warn!(backend, attempt, error = %e, "grading request failed");
                return Err(e);
            }
        }
    }
}

fn waits_too_long(err: &GradingError, max_wait: Duration) -> bool {
    matches!(
        err,
        GradingError::RateLimited {
            retry_after: Some(hint),
            ..
        } if *hint > max_wait
    )
}

pub fn transport_error(backend: &str, err: reqwest::Error) -> AttemptError {
    let err = if err.is_timeout() {
        GradingError::unavailable(backend, "request timed out")
    } else {
        GradingError::unavailable(backend, format!("HTTP error: {err}"))
    };
    AttemptError::Retry(err)
}

/// Maps a non-success response onto the grading error taxonomy. Client
/// errors other than 429 will not improve on retry and are fatal.
pub async fn status_error(backend: &str, response: Response) -> AttemptError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);
    let body = response.text().await.unwrap_or_default();
    debug!(backend, %status, body = %body, "grading backend returned an error status");
    let err = classify_status(backend, status, retry_after, &body);
    if is_permanent(status) {
        AttemptError::Fatal(err)
    } else {
        AttemptError::Retry(err)
    }
}

pub fn classify_status(
    backend: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> GradingError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return GradingError::RateLimited {
            backend: backend.to_string(),
            retry_after,
        };
    }
    let snippet: String = body.chars().take(200).collect();
    GradingError::unavailable(backend, format!("backend returned {status}: {snippet}"))
}

pub fn is_permanent(status: StatusCode) -> bool {
    status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
