//! Retry logic with exponential backoff
//!
//! Requests against the log source (probe, range fetch, full fetch) are wrapped
//! in [`with_retry`]. Only transient failures are retried; a 404 or a server
//! that ignores ranges fails straight away.
//!
//! # Example
//!
//! ```no_run
//! use access_log_import::retry::{IsRetryable, with_retry};
//! use access_log_import::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Busy,
//!     Gone,
//! }
//!
//! impl std::fmt::Display for FetchError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for FetchError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, FetchError::Busy)
//!     }
//! }
//!
//! # async fn example() -> Result<(), FetchError> {
//! let config = RetryConfig::default();
//! let body = with_retry(&config, || async { Ok::<_, FetchError>("line\n") }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Classifies an error as transient (worth another attempt) or permanent
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            // Server-side trouble or throttling
            Error::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // A server that ignores Range once will ignore it again
            Error::RangeNotSatisfied { .. } => false,
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::Config { .. } => false,
            Error::InvalidUrl(_) => false,
            Error::NotFound(_) => false,
            Error::ShuttingDown => false,
            Error::Serialization(_) => false,
            Error::ApiServerError(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation runs once, then up to `config.max_attempts` more times while
/// it keeps failing with a retryable error. Returns the first success or the
/// last error.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "request failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(wait).await;

                let next = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt + 1, "request failed after all retries");
                } else {
                    tracing::debug!(error = %e, "request failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Stretch a delay by a uniform random factor in `[1.0, 2.0]`
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    async fn count_calls(
        config: &RetryConfig,
        fail_first: u32,
        error: fn() -> TestError,
    ) -> (Result<u32, TestError>, u32) {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = with_retry(config, || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < fail_first { Err(error()) } else { Ok(n) }
            }
        })
        .await;
        (result, counter.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn success_runs_once() {
        let (result, calls) = count_calls(&fast_config(3), 0, || TestError::Transient).await;
        assert_eq!(result.unwrap(), 0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let (result, calls) = count_calls(&fast_config(3), 2, || TestError::Transient).await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn retries_are_bounded_by_max_attempts() {
        let (result, calls) = count_calls(&fast_config(2), u32::MAX, || TestError::Transient).await;
        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(calls, 3, "initial attempt plus two retries");
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let (result, calls) = count_calls(&fast_config(5), u32::MAX, || TestError::Permanent).await;
        assert!(matches!(result, Err(TestError::Permanent)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn default_config_never_retries() {
        let (result, calls) =
            count_calls(&RetryConfig::default(), u32::MAX, || TestError::Transient).await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn backoff_waits_between_attempts() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        let start = std::time::Instant::now();
        let _ = count_calls(&config, u32::MAX, || TestError::Transient).await;
        let elapsed = start.elapsed();

        // 10ms + 20ms + 40ms
        assert!(elapsed >= Duration::from_millis(70), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for _ in 0..200 {
            let jittered = add_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= delay * 2);
        }
        assert_eq!(add_jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        for status in [500, 502, 503, 504, 429] {
            let err = Error::HttpStatus {
                url: "http://logs.example/access.log".into(),
                status,
            };
            assert!(err.is_retryable(), "{status} should be retried");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for status in [400, 401, 403, 404, 416] {
            let err = Error::HttpStatus {
                url: "http://logs.example/access.log".into(),
                status,
            };
            assert!(!err.is_retryable(), "{status} should not be retried");
        }
    }

    #[test]
    fn ignored_range_is_permanent() {
        let err = Error::RangeNotSatisfied {
            url: "http://logs.example/access.log".into(),
            from: 0,
            to: 9,
            status: 200,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_io_kinds_are_retryable() {
        use std::io::ErrorKind;
        for kind in [
            ErrorKind::TimedOut,
            ErrorKind::ConnectionRefused,
            ErrorKind::ConnectionReset,
            ErrorKind::BrokenPipe,
        ] {
            assert!(Error::Io(std::io::Error::new(kind, "x")).is_retryable());
        }
        assert!(!Error::Io(std::io::Error::new(ErrorKind::PermissionDenied, "x")).is_retryable());
    }

    #[test]
    fn local_failures_are_permanent() {
        use crate::error::DatabaseError;
        assert!(!Error::Database(DatabaseError::QueryFailed("locked".into())).is_retryable());
        assert!(!Error::InvalidUrl("x".into()).is_retryable());
        assert!(!Error::ShuttingDown.is_retryable());
        assert!(!Error::Other("?".into()).is_retryable());
    }
}
