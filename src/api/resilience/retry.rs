//! Retry policies with exponential backoff
//!
//! Each attempt reports an explicit [`AttemptOutcome`]; the policy decides
//! whether to wait and go again or hand the outcome back to the caller.

use log::{debug, info, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Near-instant backoff, for tests against local mock servers
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Types of errors and their retry behavior
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    /// Network-level errors (connection refused, DNS, reset)
    Network,
    /// HTTP 5xx server errors
    ServerError(u16),
    /// HTTP 429 Too Many Requests
    RateLimited,
    /// HTTP 408 or a client-side timeout
    Timeout,
    /// Non-retryable client errors (4xx except 401, 403, 408, 429)
    ClientError(u16),
    /// HTTP 401/403
    AuthError,
    /// Unknown/other errors
    Unknown,
}

impl RetryableError {
    /// Determine if this error type should be retried
    pub fn should_retry(&self) -> bool {
        match self {
            RetryableError::Network => true,
            RetryableError::ServerError(_) => true,
            RetryableError::RateLimited => true,
            RetryableError::Timeout => true,
            RetryableError::ClientError(_) => false,
            RetryableError::AuthError => false,
            RetryableError::Unknown => false,
        }
    }

    /// Classify an HTTP status code into retry behavior
    pub fn from_status_code(status: u16) -> Self {
        match status {
            401 | 403 => RetryableError::AuthError,
            408 => RetryableError::Timeout,
            429 => RetryableError::RateLimited,
            400..=499 => RetryableError::ClientError(status),
            500..=599 => RetryableError::ServerError(status),
            _ => RetryableError::Unknown,
        }
    }

    /// Classify a reqwest error
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            RetryableError::Timeout
        } else if error.is_connect() || error.is_request() || error.is_body() {
            RetryableError::Network
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16())
        } else {
            RetryableError::Unknown
        }
    }
}

/// What one attempt produced
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Done; return this value
    Complete(T),
    /// Worth another try. `last` is returned as-is once attempts run out.
    Transient {
        reason: RetryableError,
        last: anyhow::Result<T>,
    },
    /// Stop now with this error
    Permanent(anyhow::Error),
}

/// Retry policy that implements exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Same backoff, one attempt only
    pub fn without_retries(&self) -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..self.config.clone()
        })
    }

    /// Run `operation` until it completes, fails permanently, or attempts run out.
    /// The closure receives the 1-based attempt number.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> anyhow::Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("{} (attempt {}/{})", label, attempt, max_attempts);

            match operation(attempt).await {
                AttemptOutcome::Complete(value) => {
                    if attempt > 1 {
                        info!("{} succeeded after {} attempts", label, attempt);
                    }
                    return Ok(value);
                }
                AttemptOutcome::Permanent(error) => {
                    warn!("{} failed permanently on attempt {}: {:#}", label, attempt, error);
                    return Err(error);
                }
                AttemptOutcome::Transient { reason, last } => {
                    if attempt >= max_attempts {
                        warn!("{} giving up after {} attempts ({:?})", label, attempt, reason);
                        return last;
                    }

                    let delay = self.calculate_delay(attempt);
                    warn!(
                        "{} failed on attempt {} ({:?}), retrying in {:?}",
                        label, attempt, reason, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculate exponential backoff delay with optional jitter
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.config.base_delay.as_millis() as f64)
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let mut delay = Duration::from_millis(delay_ms as u64);

        if delay > self.config.max_delay {
            delay = self.config.max_delay;
        }

        // Add jitter to prevent thundering herd
        if self.config.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.5);
            let jittered_ms = (delay.as_millis() as f64 * jitter_factor) as u64;
            delay = Duration::from_millis(jittered_ms);
        }

        delay
    }
}
