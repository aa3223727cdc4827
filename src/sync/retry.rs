//! Retrying operation executor
//!
//! Executes a single remote operation with bounded attempts and exponential
//! backoff. Only device-classified faults are retried; every other error
//! propagates immediately. In dry-run mode operations are skipped entirely
//! and counted, so callers can observe what would have run.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::{EngineError, RetryableError};

/// Executor applying the retry policy to one operation at a time
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    skipped: Arc<AtomicU64>,
}

impl RetryExecutor {
    /// Create a new executor with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create an executor with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Number of operations skipped in dry-run mode
    pub fn skipped_operations(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Backoff before the next attempt: 2^attempt seconds, attempt
    /// numbering from 1 (2s, 4s, 8s, ...)
    pub fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(32))
    }

    /// Execute an async operation with the configured retry budget
    ///
    /// Retryable failures are re-attempted up to the budget with an
    /// exponentially increasing backoff between attempts; the final failure
    /// is wrapped as a terminal operation error carrying the attempt count.
    /// Non-retryable failures propagate immediately.
    pub async fn execute<F, Fut, T>(&self, op_name: &str, operation: F) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
        T: Default,
    {
        self.execute_with(op_name, self.config.max_retries, operation)
            .await
    }

    /// Execute an async operation with an explicit retry budget
    pub async fn execute_with<F, Fut, T>(
        &self,
        op_name: &str,
        max_retries: u32,
        operation: F,
    ) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
        T: Default,
    {
        if self.config.dry_run {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            info!(operation = op_name, "dry run, skipping remote call");
            return Ok(T::default());
        }

        // A zero retry budget still permits the initial attempt.
        let max_retries = max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!(
                            operation = op_name,
                            attempts = attempt,
                            "retries exhausted"
                        );
                        return Err(err.into_exhausted(attempt));
                    }

                    let delay = Self::backoff_delay(attempt);
                    warn!(
                        operation = op_name,
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "device call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
