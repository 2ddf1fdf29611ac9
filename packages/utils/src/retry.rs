//! Fixed-delay retries that give up early on cancellation.

use std::{fmt::Display, future::Future, time::Duration};

use backoff::backoff::Backoff;
use tokio_util::sync::CancellationToken;

/// A backoff policy which always returns a constant duration, until it
/// exceeds the maximum retry count.
#[derive(Debug, Clone)]
pub struct ConstantWithMaxRetryCount {
    interval: Duration,
    max_retry_count: usize,
    count: usize,
}

impl ConstantWithMaxRetryCount {
    /// Creates a new constant backoff with `interval` between attempts and at
    /// most `max_retry_count` retries.
    #[must_use]
    pub const fn new(interval: Duration, max_retry_count: usize) -> Self {
        Self {
            interval,
            max_retry_count,
            count: 0,
        }
    }
}

impl Backoff for ConstantWithMaxRetryCount {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.count < self.max_retry_count {
            self.count += 1;
            Some(self.interval)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Why a retried operation did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Cancellation was requested before the operation succeeded.
    #[error("operation cancelled")]
    Cancelled,
    /// Every attempt failed.
    #[error("giving up after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Error of the last attempt.
        source: E,
    },
    /// The operation failed with an error that is not worth retrying.
    #[error("non-retryable failure: {0}")]
    Aborted(#[source] E),
}

impl<E> RetryError<E> {
    /// The last error of the operation, if it ran at all.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Cancelled => None,
            Self::Exhausted { source, .. } | Self::Aborted(source) => Some(source),
        }
    }
}

/// Retry settings as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "defaults::max_retries")]
    pub max_retries: usize,
    /// Fixed delay between attempts.
    #[serde(
        rename = "delay_ms",
        with = "crate::serde::duration_ms",
        default = "defaults::delay"
    )]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            delay: defaults::delay(),
        }
    }
}

impl RetryConfig {
    /// Validates the parsed config.
    ///
    /// # Errors
    /// Fails if the delay is zero or longer than [`defaults::MAX_DELAY`].
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.delay.is_zero() && self.delay <= defaults::MAX_DELAY,
            "Retry delay must be between 1ms and {}ms, got {}ms",
            defaults::MAX_DELAY.as_millis(),
            self.delay.as_millis()
        );
        Ok(())
    }
}

impl From<RetryConfig> for Retrier {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.delay, config.max_retries)
    }
}

/// Default retry settings.
pub mod defaults {
    use std::time::Duration;

    /// Upper bound accepted for the delay between attempts.
    pub const MAX_DELAY: Duration = Duration::from_secs(600);

    pub(super) const fn max_retries() -> usize {
        6
    }

    pub(super) const fn delay() -> Duration {
        Duration::from_secs(10)
    }
}

/// Runs fallible async operations up to `max_retries + 1` times with a fixed
/// delay in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retrier {
    delay: Duration,
    max_retries: usize,
}

impl Retrier {
    /// Creates a new retrier.
    #[must_use]
    pub const fn new(delay: Duration, max_retries: usize) -> Self {
        Self { delay, max_retries }
    }

    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Maximum number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Retries `op` on every error.
    ///
    /// # Errors
    /// See [`Retrier::retry_if`].
    pub async fn retry<T, E, F, Fut>(
        &self,
        token: &CancellationToken,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.retry_if(token, op, |_| true).await
    }

    /// Retries `op` while it fails with errors for which `should_retry` holds.
    ///
    /// The token is checked before every attempt and while waiting, so a
    /// shutdown never sleeps through the remaining delay.
    ///
    /// # Errors
    /// - [`RetryError::Cancelled`] if the token fires first.
    /// - [`RetryError::Aborted`] on the first error `should_retry` rejects.
    /// - [`RetryError::Exhausted`] once all retries failed.
    pub async fn retry_if<T, E, F, Fut, P>(
        &self,
        token: &CancellationToken,
        mut op: F,
        should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut backoff = ConstantWithMaxRetryCount::new(self.delay, self.max_retries);
        let mut attempts = 0;

        loop {
            if token.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            attempts += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !should_retry(&err) => return Err(RetryError::Aborted(err)),
                Err(err) => err,
            };

            let Some(delay) = backoff.next_backoff() else {
                return Err(RetryError::Exhausted {
                    attempts,
                    source: err,
                });
            };

            tracing::debug!(attempts, ?delay, error = %err, "Attempt failed, retrying");
            tokio::select! {
                () = token.cancelled() => return Err(RetryError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
