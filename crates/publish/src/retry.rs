//! Retry with exponential backoff for repository transfers.

use crate::error::{Error, Result, TransportError};
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use depot_core::RetryConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Run `f` until it succeeds, the error is not retryable, or the attempts in
/// `config` are used up. The last error is wrapped as
/// [`Error::Network`] naming `operation`.
///
/// # Errors
///
/// Returns [`Error::Network`] with the last transport error.
pub fn with_retry<T, F>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, TransportError>,
{
    let mut backoff = create_backoff(config);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match f() {
            Ok(value) => {
                if attempts > 1 {
                    debug!(operation, attempts, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempts >= config.max_attempts || !is_retryable(&err) => {
                warn!(operation, attempts, error = %err, "Operation failed");
                return Err(Error::network(operation, err));
            }
            Err(err) => match backoff.next_backoff() {
                Some(duration) => {
                    warn!(
                        operation,
                        attempts,
                        error = %err,
                        retry_in_ms = duration.as_millis(),
                        "Operation failed, retrying"
                    );
                    std::thread::sleep(duration);
                }
                None => return Err(Error::network(operation, err)),
            },
        }
    }
}

fn create_backoff(config: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
        .with_max_interval(Duration::from_millis(config.max_backoff_ms))
        .with_multiplier(config.backoff_multiplier)
        .with_max_elapsed_time(None)
        .build()
}

/// Client errors other than timeouts and throttling will not go away on retry.
fn is_retryable(err: &TransportError) -> bool {
    match err {
        TransportError::Status { status } => !(400..500).contains(status) || matches!(status, 408 | 429),
        TransportError::Io(_) | TransportError::Request { .. } => true,
    }
}
