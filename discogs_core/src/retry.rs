use http::StatusCode;
use std::time::Duration;

/// Statuses worth another attempt: rate limiting and transient upstream
/// failures.
pub const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff arithmetic for the attempt loop. Pure apart from the jitter draw.
#[derive(Copy, Clone, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    #[inline]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    #[inline]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts allowed: the retries plus the initial call.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    #[inline]
    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Wait before the attempt after `attempt`. A numeric non-negative
    /// `Retry-After` value wins unconditionally; otherwise exponential
    /// backoff (`2^attempt`, capped at 60s) plus up to a second of jitter so
    /// independent clients do not retry in lockstep.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        if let Some(raw) = retry_after {
            if let Ok(secs) = raw.trim().parse::<f64>() {
                if secs >= 0.0 {
                    return Duration::from_secs_f64(secs);
                }
            }
        }
        let base = 2f64.powi(attempt.min(63) as i32).min(60.0);
        Duration::from_secs_f64(base + rand::random::<f64>())
    }
}
