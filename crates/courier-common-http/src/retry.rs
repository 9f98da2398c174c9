//! Retry decisions.
//!
//! The executor never bounds or delays retries on its own. A policy that
//! always answers `true` loops forever; [`MaxAttempts`] is the ready-made
//! bounded policy.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::HttpError;
use crate::request::RequestDescriptor;

/// Decides whether a failed attempt is dispatched again.
///
/// `attempt` counts dispatches made so far, starting at 1. The policy may
/// suspend (for example to back off) before answering.
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    async fn should_retry(&self, request: &RequestDescriptor, error: &HttpError, attempt: u32) -> bool;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

#[async_trait]
impl RetryPolicy for NeverRetry {
    async fn should_retry(&self, _: &RequestDescriptor, _: &HttpError, _: u32) -> bool {
        false
    }
}

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    None,
    Fixed(Duration),
    /// `initial_delay * base^(attempt - 1)`, capped at `max_delay`.
    Exponential {
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    },
}

impl BackoffStrategy {
    /// Delay to wait after failed attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => *delay,
            Self::Exponential {
                initial_delay,
                base,
                max_delay,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let millis = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = millis.min(max_delay.as_millis() as f64).max(0.0);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            initial_delay: Duration::from_millis(100),
            base: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Retries retry-eligible failures until `max_attempts` dispatches were made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxAttempts {
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl MaxAttempts {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// The decision, without sleeping.
    pub fn allows(&self, error: &HttpError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retry_eligible()
    }
}

#[async_trait]
impl RetryPolicy for MaxAttempts {
    async fn should_retry(&self, request: &RequestDescriptor, error: &HttpError, attempt: u32) -> bool {
        if !self.allows(error, attempt) {
            return false;
        }
        let delay = self.backoff.delay(attempt);
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "backing off before retry"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        true
    }
}

/// Adapts a synchronous closure into a [`RetryPolicy`].
pub struct RetryFn<F>(pub F);

/// Build a policy from `f(request, error, attempt)`.
pub fn retry_fn<F>(f: F) -> RetryFn<F>
where
    F: Fn(&RequestDescriptor, &HttpError, u32) -> bool + Send + Sync,
{
    RetryFn(f)
}

#[async_trait]
impl<F> RetryPolicy for RetryFn<F>
where
    F: Fn(&RequestDescriptor, &HttpError, u32) -> bool + Send + Sync,
{
    async fn should_retry(&self, request: &RequestDescriptor, error: &HttpError, attempt: u32) -> bool {
        (self.0)(request, error, attempt)
    }
}
