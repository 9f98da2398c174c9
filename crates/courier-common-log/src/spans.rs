//! Spans and timers for outbound calls.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug_span, field, Instrument, Span};

/// Span covering one logical call, across all of its attempts.
///
/// `attempt`, `status` and `error` start empty and are filled in as the call
/// progresses.
pub fn request_span(method: &str, url: &str) -> Span {
    debug_span!(
        "request",
        method = %method,
        url = %url,
        attempt = field::Empty,
        status = field::Empty,
        error = field::Empty,
    )
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", field::display(error));
}

/// Record the attempt number on the current span.
pub fn record_attempt(attempt: u32) {
    Span::current().record("attempt", attempt);
}

/// Record the response status on the current span.
pub fn record_status(status: u16) {
    Span::current().record("status", status);
}

/// Measures how long an operation took.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the elapsed time at debug level and return it.
    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
        duration
    }
}

/// Time a block, logging its duration.
#[macro_export]
macro_rules! timed {
    ($name:expr, $body:expr) => {{
        let _timer = $crate::spans::Timer::start($name);
        let result = $body;
        _timer.finish();
        result
    }};
}

pub use tracing::instrument;
