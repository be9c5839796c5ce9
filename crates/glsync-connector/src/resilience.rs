//! Resilience patterns for connector operations.
//!
//! Provides a bounded-timeout wrapper for every network-bound call and a
//! retry executor with exponential backoff for idempotent reads.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ConnectorError, ConnectorResult};

/// Time budget applied to a single collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeout {
    duration: Duration,
}

impl CallTimeout {
    /// Create a budget of the given length.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Create a budget of `secs` seconds.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// The configured budget.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `fut`, failing with [`ConnectorError::Timeout`] if it does not
    /// complete in time. The future is dropped on expiry.
    pub async fn run<T, Fut>(&self, operation: &str, fut: Fut) -> ConnectorResult<T>
    where
        Fut: Future<Output = ConnectorResult<T>>,
    {
        match tokio::time::timeout(self.duration, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation = operation,
                    timeout_secs = self.duration.as_secs(),
                    "Call exceeded its time budget"
                );
                Err(ConnectorError::Timeout {
                    operation: operation.to_string(),
                    timeout_secs: self.duration.as_secs(),
                })
            }
        }
    }
}

impl Default for CallTimeout {
    fn default() -> Self {
        Self::from_secs(30)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Retry executor with exponential backoff.
///
/// Only transient errors are retried. Timeouts are returned immediately so a
/// stalled call never costs more than one budget.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a new retry executor with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Calculate delay for a given attempt (0-indexed).
    fn calculate_delay(&self, attempt: u32, error: &ConnectorError) -> Duration {
        if let ConnectorError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            return Duration::from_secs(*secs).min(self.config.max_delay);
        }

        let base_delay = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = base_delay.min(self.config.max_delay.as_millis() as f64);

        Duration::from_millis(delay_ms as u64)
    }

    /// Execute an operation with retries.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> ConnectorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ConnectorResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_transient() || e.is_timeout() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt, &e);
                    debug!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
